//! Simulated PICA200.
//!
//! [`Pica200`] implements every picagl backend trait. Command runs, memory fills and display
//! transfers are sent to a GPU thread and complete asynchronously; the host side keeps the VRAM
//! allocator, the loaded shader programs and the applet hook.
//!
//! Besides the backend traits, the type exposes what a test needs to look at the GPU: a
//! [`GpuSnapshot`] of its registers and shader units, VRAM and screen read-back, the register
//! loss a suspension causes ([`Pica200::clobber`]) and [`Counters`] of the backend calls.

use std::collections::BTreeMap;
use std::sync::mpsc;
use std::thread;

use log::{debug, info};
use picagl::backend::{
  BackendError, BinaryFormat, Driver, Fence, Gpu, LifecycleEvent, LifecycleHook, MemoryFill,
  ProgramHandle, ShaderBackend, Surface, Tiler,
};
use picagl::command::CommandBuffer;
use picagl::config::Screen;
use picagl::regs::{self, ShaderRegs};
use picagl::state::NewState;

use crate::dvlb::{Dvlb, ShaderType, Uniform};
use crate::tiling;

pub mod applet;
pub mod gpu;
pub mod vram;

pub use self::applet::Applet;
pub use self::gpu::{GpuSnapshot, ShaderUnit};

use self::applet::AppletHook;
use self::gpu::{GpuThread, Job};
use self::vram::{VramAllocator, VRAM_SIZE};

/// Number of times each backend entry point was called.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Counters {
  pub inits: usize,
  pub resets: usize,
  pub command_buffer_switches: usize,
  pub dispatches: usize,
  pub memory_fills: usize,
  pub display_transfers: usize,
  pub presents: usize,
  pub tilings: usize,
  pub flush_vertices: usize,
  pub state_updates: usize,
  /// Categories passed to the last state update.
  pub last_update: NewState,
  pub hooks: usize,
  pub unhooks: usize,
}

/// Code of one shader stage, as loaded from a binary.
#[derive(Clone, Debug, PartialEq)]
struct Stage {
  code: Vec<u32>,
  opdescs: Vec<u32>,
  main: u32,
  uniforms: Vec<Uniform>,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Program {
  vertex: Option<Stage>,
  geometry: Option<Stage>,
}

/// Simulated PICA200 backend.
#[derive(Debug)]
pub struct Pica200 {
  jobs: mpsc::Sender<Job>,
  worker: Option<thread::JoinHandle<()>>,
  vram: VramAllocator,
  programs: BTreeMap<ProgramHandle, Program>,
  next_program: u32,
  applet: AppletHook,
  counters: Counters,
}

impl Pica200 {
  /// Start a simulated GPU.
  pub fn new() -> Result<Self, BackendError> {
    let (jobs, receiver) = mpsc::channel();
    let gpu = GpuThread::new();
    let worker = thread::Builder::new()
      .name("pica200".to_owned())
      .spawn(move || gpu.run(receiver))
      .map_err(|_| BackendError::GpuGone)?;

    Ok(Pica200 {
      jobs,
      worker: Some(worker),
      vram: VramAllocator::new(VRAM_SIZE),
      programs: BTreeMap::new(),
      next_program: 1,
      applet: AppletHook::new(),
      counters: Counters::default(),
    })
  }

  fn send(&self, job: Job) -> Result<(), BackendError> {
    self.jobs.send(job).map_err(|_| BackendError::GpuGone)
  }

  fn send_fenced(&self, job: impl FnOnce(mpsc::Sender<()>) -> Job) -> Result<Fence, BackendError> {
    let (done, fence) = Fence::new();
    self.send(job(done))?;
    Ok(fence)
  }

  fn request<T>(&self, job: impl FnOnce(mpsc::Sender<T>) -> Job) -> Result<T, BackendError> {
    let (reply, answer) = mpsc::channel();
    self.send(job(reply))?;
    answer.recv().map_err(|_| BackendError::GpuGone)
  }

  /// Handle to send lifecycle signals, the way the OS would.
  pub fn applet(&self) -> Applet {
    self.applet.applet()
  }

  pub fn is_hooked(&self) -> bool {
    self.applet.is_hooked()
  }

  pub fn counters(&self) -> Counters {
    self.counters
  }

  /// State of the GPU once every job sent so far has run.
  pub fn snapshot(&self) -> Result<GpuSnapshot, BackendError> {
    self.request(|reply| Job::Snapshot { reply })
  }

  pub fn read_vram(&self, addr: u32, len: usize) -> Result<Vec<u8>, BackendError> {
    self.request(|reply| Job::ReadVram { addr, len, reply })
  }

  /// Image currently shown on a screen; empty if nothing was ever presented there.
  pub fn read_screen(&self, screen: Screen) -> Result<Vec<u8>, BackendError> {
    self.request(|reply| Job::ReadScreen { screen, reply })
  }

  /// Trash every GPU register and shader unit, as another process using the GPU would.
  pub fn clobber(&self) -> Result<(), BackendError> {
    self.send(Job::Clobber)
  }

  /// Bytes of VRAM not allocated.
  pub fn vram_available(&self) -> usize {
    self.vram.available()
  }

  pub fn vram_allocations(&self) -> usize {
    self.vram.allocations()
  }

  /// Number of live programs.
  pub fn programs(&self) -> usize {
    self.programs.len()
  }

  fn check_range(&self, addr: u32, len: usize) -> Result<(), BackendError> {
    if self.vram.contains(addr, len) {
      Ok(())
    } else {
      Err(BackendError::InvalidVramRange { addr, len })
    }
  }
}

impl Drop for Pica200 {
  fn drop(&mut self) {
    let _ = self.jobs.send(Job::Shutdown);

    if let Some(worker) = self.worker.take() {
      let _ = worker.join();
    }
  }
}

impl Driver for Pica200 {
  fn update_state(&mut self, new_state: NewState) {
    self.counters.state_updates += 1;
    self.counters.last_update = new_state;
  }

  fn flush_vertices(&mut self) {
    self.counters.flush_vertices += 1;
  }
}

impl Gpu for Pica200 {
  fn init(&mut self) -> Result<(), BackendError> {
    self.counters.inits += 1;
    info!("PICA200 initialized, {} bytes of VRAM", VRAM_SIZE);
    Ok(())
  }

  fn reset(&mut self, root: &CommandBuffer) -> Result<(), BackendError> {
    self.counters.resets += 1;
    debug!("reset, root command buffer of {} words", root.capacity());
    self.send(Job::Reset)
  }

  fn set_command_buffer(&mut self, root: &CommandBuffer) -> Result<(), BackendError> {
    self.counters.command_buffer_switches += 1;
    debug!("root command buffer of {} words", root.capacity());
    Ok(())
  }

  fn alloc_vram(&mut self, size: usize) -> Result<u32, BackendError> {
    self.vram.alloc(size)
  }

  fn free_vram(&mut self, addr: u32) {
    if !self.vram.free(addr) {
      debug!("ignoring free of unallocated VRAM at {:#010x}", addr);
    }
  }

  fn dispatch(&mut self, run: Vec<u32>) -> Result<Fence, BackendError> {
    self.counters.dispatches += 1;
    self.send_fenced(|done| Job::Run { words: run, done })
  }

  fn memory_fill(&mut self, fills: &[MemoryFill]) -> Result<Fence, BackendError> {
    for fill in fills {
      self.check_range(fill.surface.addr, fill.surface.len())?;
    }

    self.counters.memory_fills += 1;
    let fills = fills.to_vec();
    self.send_fenced(|done| Job::MemoryFill { fills, done })
  }

  fn display_transfer(&mut self, src: Surface, screen: Screen) -> Result<Fence, BackendError> {
    self.check_range(src.addr, src.len())?;
    self.counters.display_transfers += 1;
    self.send_fenced(|done| Job::DisplayTransfer { src, screen, done })
  }

  fn present(&mut self, screen: Screen) -> Result<Fence, BackendError> {
    self.counters.presents += 1;
    self.send_fenced(|done| Job::Present { screen, done })
  }
}

impl LifecycleHook for Pica200 {
  fn hook(&mut self) -> Result<(), BackendError> {
    self.counters.hooks += 1;
    self.applet.set_hooked(true);
    debug!("lifecycle hook installed");
    Ok(())
  }

  fn unhook(&mut self) {
    self.counters.unhooks += 1;
    self.applet.set_hooked(false);
    debug!("lifecycle hook removed");
  }

  fn poll_lifecycle(&mut self) -> Option<LifecycleEvent> {
    self.applet.poll()
  }
}

fn upload_stage(stage: &Stage, regs: &ShaderRegs, cmd: &mut CommandBuffer) -> Result<(), BackendError> {
  cmd.write(regs.code_transfer_config, 0)?;
  cmd.write_repeated(regs.code_transfer_data, &stage.code)?;
  cmd.write(regs.code_transfer_end, 1)?;
  cmd.write(regs.opdescs_config, 0)?;
  cmd.write_repeated(regs.opdescs_data, &stage.opdescs)?;
  cmd.write(regs.entrypoint, 0x7FFF_0000 | (stage.main & 0xFFFF))?;
  Ok(())
}

impl ShaderBackend for Pica200 {
  fn create_program(&mut self) -> Result<ProgramHandle, BackendError> {
    let handle = ProgramHandle(self.next_program);
    self.next_program += 1;
    self.programs.insert(handle, Program::default());
    Ok(handle)
  }

  fn program_binary(
    &mut self,
    program: ProgramHandle,
    format: BinaryFormat,
    binary: &[u8],
  ) -> Result<(), BackendError> {
    if !self.programs.contains_key(&program) {
      return Err(BackendError::UnknownProgram(program));
    }

    let dvlb = Dvlb::parse(binary)?;
    let kind = match format {
      BinaryFormat::VertexShaderBinary => ShaderType::Vertex,
      BinaryFormat::GeometryShaderBinary => ShaderType::Geometry,
    };

    let entry = dvlb
      .entries
      .iter()
      .find(|entry| entry.kind == kind)
      .ok_or_else(|| BackendError::InvalidShaderBinary(format!("no {:?} entry point", kind)))?;

    let stage = Stage {
      code: dvlb.code.clone(),
      opdescs: dvlb.opdescs.clone(),
      main: entry.main,
      uniforms: entry.uniforms.clone(),
    };

    debug!(
      "program {}: {:?} stage of {} words, {} uniforms",
      program.0,
      kind,
      stage.code.len(),
      stage.uniforms.len()
    );

    if let Some(loaded) = self.programs.get_mut(&program) {
      match kind {
        ShaderType::Vertex => loaded.vertex = Some(stage),
        ShaderType::Geometry => loaded.geometry = Some(stage),
      }
    }

    Ok(())
  }

  fn delete_program(&mut self, program: ProgramHandle) {
    self.programs.remove(&program);
  }

  fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<i32> {
    self
      .programs
      .get(&program)?
      .vertex
      .as_ref()?
      .uniforms
      .iter()
      .find(|uniform| uniform.name == name)
      .and_then(Uniform::location)
  }

  fn use_program(&mut self, program: ProgramHandle, cmd: &mut CommandBuffer) -> Result<(), BackendError> {
    let loaded = self
      .programs
      .get(&program)
      .ok_or(BackendError::UnknownProgram(program))?;

    if let Some(ref stage) = loaded.vertex {
      upload_stage(stage, &regs::VSH, cmd)?;
    }

    if let Some(ref stage) = loaded.geometry {
      upload_stage(stage, &regs::GSH, cmd)?;
    }

    Ok(())
  }
}

impl Tiler for Pica200 {
  fn tile(&mut self, pixels: &[u8], width: u16, height: u16, previous: Option<u32>) -> Result<u32, BackendError> {
    let tiled = tiling::tile_rgba8(pixels, width, height).ok_or(BackendError::InvalidImage { width, height })?;

    let addr = match previous {
      Some(addr) if self.vram.allocation_size(addr) == Some(tiled.len()) => addr,

      previous => {
        let addr = self.vram.alloc(tiled.len())?;

        if let Some(previous) = previous {
          self.vram.free(previous);
        }

        addr
      }
    };

    self.counters.tilings += 1;
    self.send(Job::WriteVram { addr, bytes: tiled })?;

    Ok(addr)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dvlb::DvlbBuilder;
  use picagl::command::Records;
  use pretty_assertions::assert_eq;

  fn binary() -> Vec<u8> {
    DvlbBuilder::new()
      .code(&[0xA, 0xB, 0xC])
      .opdescs(&[0x36F])
      .entry(ShaderType::Vertex, 2, &[("projection", 0x10, 0x13), ("tint", 0x18, 0x18)])
      .build()
  }

  #[test]
  fn program_binaries() {
    let mut gpu = Pica200::new().unwrap();
    let program = gpu.create_program().unwrap();

    gpu
      .program_binary(program, BinaryFormat::VertexShaderBinary, &binary())
      .unwrap();

    assert_eq!(gpu.uniform_location(program, "projection"), Some(0));
    assert_eq!(gpu.uniform_location(program, "tint"), Some(8));
    assert_eq!(gpu.uniform_location(program, "missing"), None);

    assert!(matches!(
      gpu.program_binary(program, BinaryFormat::GeometryShaderBinary, &binary()),
      Err(BackendError::InvalidShaderBinary(_))
    ));
    assert!(matches!(
      gpu.program_binary(program, BinaryFormat::VertexShaderBinary, &[1, 2, 3]),
      Err(BackendError::InvalidShaderBinary(_))
    ));

    gpu.delete_program(program);
    assert_eq!(
      gpu.program_binary(program, BinaryFormat::VertexShaderBinary, &binary()),
      Err(BackendError::UnknownProgram(program))
    );
  }

  #[test]
  fn use_program_uploads_code() {
    let mut gpu = Pica200::new().unwrap();
    let program = gpu.create_program().unwrap();
    gpu
      .program_binary(program, BinaryFormat::VertexShaderBinary, &binary())
      .unwrap();

    let mut cmd = CommandBuffer::new(64);
    gpu.use_program(program, &mut cmd).unwrap();

    let writes: Vec<_> = Records::new(cmd.words()).flat_map(|r| r.writes()).collect();
    assert_eq!(writes.last(), Some(&(regs::VSH.entrypoint, 0x7FFF_0002)));

    cmd.finalize().unwrap();
    gpu.dispatch(cmd.take_run()).unwrap().wait().unwrap();

    let snapshot = gpu.snapshot().unwrap();
    assert_eq!(snapshot.vsh.code, vec![0xA, 0xB, 0xC]);
    assert_eq!(snapshot.vsh.opdescs, vec![0x36F]);
    assert_eq!(snapshot.vsh_entrypoint(), 2);
  }

  #[test]
  fn tiling_reuses_allocations() {
    let mut gpu = Pica200::new().unwrap();
    let pixels = vec![0xFF; 8 * 8 * 4];

    let addr = gpu.tile(&pixels, 8, 8, None).unwrap();
    assert_eq!(gpu.tile(&pixels, 8, 8, Some(addr)).unwrap(), addr);
    assert_eq!(gpu.vram_allocations(), 1);

    let bigger = vec![0x10; 16 * 8 * 4];
    let moved = gpu.tile(&bigger, 16, 8, Some(addr)).unwrap();
    assert_eq!(gpu.vram_allocations(), 1);
    assert_eq!(gpu.read_vram(moved, 4).unwrap(), vec![0x10; 4]);

    assert_eq!(
      gpu.tile(&pixels, 4, 4, None),
      Err(BackendError::InvalidImage { width: 4, height: 4 })
    );
    assert_eq!(gpu.counters().tilings, 3);
  }

  #[test]
  fn fills_are_range_checked() {
    let mut gpu = Pica200::new().unwrap();
    let surface = Surface {
      addr: gpu.alloc_vram(16).unwrap(),
      width: 2,
      height: 2,
      bytes_per_pixel: 4,
    };

    gpu
      .memory_fill(&[MemoryFill { surface, value: 7 }])
      .unwrap()
      .wait()
      .unwrap();
    assert_eq!(gpu.read_vram(surface.addr, 4).unwrap(), vec![7, 0, 0, 0]);

    let wider = Surface { width: 4, ..surface };
    assert_eq!(
      gpu.memory_fill(&[MemoryFill { surface: wider, value: 7 }]).err(),
      Some(BackendError::InvalidVramRange {
        addr: surface.addr,
        len: 32,
      })
    );
  }

  #[test]
  fn lifecycle_signals_need_the_hook() {
    let mut gpu = Pica200::new().unwrap();
    let applet = gpu.applet();

    applet.suspend();
    assert_eq!(gpu.poll_lifecycle(), None);

    gpu.hook().unwrap();
    assert_eq!(gpu.poll_lifecycle(), Some(LifecycleEvent::Suspend));

    gpu.unhook();
    assert!(!gpu.is_hooked());
    assert_eq!(gpu.counters().hooks, 1);
    assert_eq!(gpu.counters().unhooks, 1);
  }
}
