//! Simulated GPU consumer.
//!
//! The GPU runs on its own thread and is fed through a job channel. Jobs are executed in order;
//! the asynchronous ones carry the sending half of a fence, signaled once they are done.

use std::sync::mpsc;

use log::{debug, trace, warn};
use picagl::backend::{MemoryFill, Surface};
use picagl::command::Records;
use picagl::config::Screen;
use picagl::regs::{self, ShaderRegs};
use picagl_layout::DeviceLayout;

use crate::sim::vram::{VRAM_BASE, VRAM_SIZE};

/// Size of the register file, in registers.
pub const REGISTERS: usize = 0x300;

/// Value registers are filled with when another process used the GPU.
pub const CLOBBERED: u32 = 0xDEAD_BEEF;

/// Work sent to the GPU thread.
#[derive(Debug)]
pub(crate) enum Job {
  Run { words: Vec<u32>, done: mpsc::Sender<()> },
  MemoryFill { fills: Vec<MemoryFill>, done: mpsc::Sender<()> },
  DisplayTransfer { src: Surface, screen: Screen, done: mpsc::Sender<()> },
  Present { screen: Screen, done: mpsc::Sender<()> },
  WriteVram { addr: u32, bytes: Vec<u8> },
  ReadVram { addr: u32, len: usize, reply: mpsc::Sender<Vec<u8>> },
  ReadScreen { screen: Screen, reply: mpsc::Sender<Vec<u8>> },
  Snapshot { reply: mpsc::Sender<GpuSnapshot> },
  Reset,
  Clobber,
  Shutdown,
}

/// Float uniforms and program memory of a shader unit.
#[derive(Clone, Debug, PartialEq)]
pub struct ShaderUnit {
  /// Float uniform registers, components in upload order (`w`, `z`, `y`, `x`).
  pub uniforms: Vec<[f32; 4]>,
  pub code: Vec<u32>,
  pub opdescs: Vec<u32>,
  uniform_index: usize,
  pending: Vec<u32>,
  code_offset: usize,
  opdesc_offset: usize,
}

impl ShaderUnit {
  fn new() -> Self {
    ShaderUnit {
      uniforms: vec![[0.; 4]; regs::FLOAT_UNIFORMS],
      code: Vec::new(),
      opdescs: Vec::new(),
      uniform_index: 0,
      pending: Vec::with_capacity(4),
      code_offset: 0,
      opdesc_offset: 0,
    }
  }

  /// Float uniform register `index`, in host component order.
  pub fn uniform(&self, index: usize) -> Option<[f32; 4]> {
    self.uniforms.get(index).map(|&v| <[f32; 4]>::device_decode(v))
  }

  /// Four consecutive float uniform registers starting at `index`, as a host matrix.
  pub fn matrix(&self, index: usize) -> Option<picagl_layout::M44> {
    let rows = self.uniforms.get(index..index + 4)?;
    Some(<picagl_layout::M44 as DeviceLayout>::device_decode([rows[0], rows[1], rows[2], rows[3]]))
  }

  fn clobber(&mut self) {
    self.uniforms.iter_mut().for_each(|v| *v = [f32::NAN; 4]);
    self.code.clear();
    self.opdescs.clear();
    self.pending.clear();
  }

  // Returns whether the register belongs to this unit.
  fn write(&mut self, regs: &ShaderRegs, reg: u16, value: u32) -> bool {
    if reg == regs.float_uniform_config {
      self.uniform_index = (value & 0x7F) as usize;
      self.pending.clear();
    } else if reg == regs.float_uniform_data {
      self.pending.push(value);

      if self.pending.len() == 4 {
        let v = [
          f32::from_bits(self.pending[0]),
          f32::from_bits(self.pending[1]),
          f32::from_bits(self.pending[2]),
          f32::from_bits(self.pending[3]),
        ];

        match self.uniforms.get_mut(self.uniform_index) {
          Some(slot) => *slot = v,
          None => warn!("float uniform {} out of range", self.uniform_index),
        }

        self.uniform_index += 1;
        self.pending.clear();
      }
    } else if reg == regs.code_transfer_config {
      self.code_offset = (value & 0xFFF) as usize;
    } else if reg == regs.code_transfer_data {
      store(&mut self.code, self.code_offset, value);
      self.code_offset += 1;
    } else if reg == regs.opdescs_config {
      self.opdesc_offset = (value & 0x7F) as usize;
    } else if reg == regs.opdescs_data {
      store(&mut self.opdescs, self.opdesc_offset, value);
      self.opdesc_offset += 1;
    } else {
      return reg == regs.entrypoint || reg == regs.code_transfer_end;
    }

    true
  }
}

fn store(memory: &mut Vec<u32>, offset: usize, value: u32) {
  if memory.len() <= offset {
    memory.resize(offset + 1, 0);
  }

  memory[offset] = value;
}

/// Copy of the GPU state, taken between two jobs.
#[derive(Clone, Debug, PartialEq)]
pub struct GpuSnapshot {
  pub regs: Vec<u32>,
  pub vsh: ShaderUnit,
  pub gsh: ShaderUnit,
  /// Triangles batches drawn.
  pub draws: usize,
  /// Command runs executed.
  pub runs: usize,
  /// Register writes executed, all runs included.
  pub register_writes: usize,
  pub resets: usize,
}

impl GpuSnapshot {
  pub fn reg(&self, reg: u16) -> u32 {
    self.regs[reg as usize]
  }

  /// Entry point (offset of `main`) of the vertex shader.
  pub fn vsh_entrypoint(&self) -> u32 {
    self.reg(regs::VSH.entrypoint) & 0xFFFF
  }
}

pub(crate) struct GpuThread {
  regs: Vec<u32>,
  vsh: ShaderUnit,
  gsh: ShaderUnit,
  vram: Vec<u8>,
  /// Images transferred to each screen.
  transferred: [Vec<u8>; 2],
  /// Images shown by each screen.
  presented: [Vec<u8>; 2],
  draws: usize,
  runs: usize,
  register_writes: usize,
  resets: usize,
}

fn screen_index(screen: Screen) -> usize {
  match screen {
    Screen::Top => 0,
    Screen::Bottom => 1,
  }
}

impl GpuThread {
  pub(crate) fn new() -> Self {
    GpuThread {
      regs: vec![0; REGISTERS],
      vsh: ShaderUnit::new(),
      gsh: ShaderUnit::new(),
      vram: vec![0; VRAM_SIZE],
      transferred: [Vec::new(), Vec::new()],
      presented: [Vec::new(), Vec::new()],
      draws: 0,
      runs: 0,
      register_writes: 0,
      resets: 0,
    }
  }

  /// Consume jobs until shut down or until every sender is gone.
  pub(crate) fn run(mut self, jobs: mpsc::Receiver<Job>) {
    debug!("GPU thread started");

    while let Ok(job) = jobs.recv() {
      if !self.execute(job) {
        break;
      }
    }

    debug!("GPU thread stopped");
  }

  fn execute(&mut self, job: Job) -> bool {
    match job {
      Job::Run { words, done } => {
        self.run_commands(&words);
        let _ = done.send(());
      }

      Job::MemoryFill { fills, done } => {
        for fill in fills {
          self.fill(fill);
        }

        let _ = done.send(());
      }

      Job::DisplayTransfer { src, screen, done } => {
        self.transferred[screen_index(screen)] = self.vram_slice(src.addr, src.len()).to_vec();
        let _ = done.send(());
      }

      Job::Present { screen, done } => {
        let i = screen_index(screen);
        self.presented[i] = self.transferred[i].clone();
        let _ = done.send(());
      }

      Job::WriteVram { addr, bytes } => {
        let len = bytes.len();

        match self.vram_range(addr, len) {
          Some(range) => self.vram[range].copy_from_slice(&bytes),
          None => warn!("VRAM write out of bounds: {:#010x}+{}", addr, len),
        }
      }

      Job::ReadVram { addr, len, reply } => {
        let _ = reply.send(self.vram_slice(addr, len).to_vec());
      }

      Job::ReadScreen { screen, reply } => {
        let _ = reply.send(self.presented[screen_index(screen)].clone());
      }

      Job::Snapshot { reply } => {
        let _ = reply.send(self.snapshot());
      }

      Job::Reset => {
        debug!("GPU reset");
        self.regs.iter_mut().for_each(|r| *r = 0);
        self.vsh = ShaderUnit::new();
        self.gsh = ShaderUnit::new();
        self.resets += 1;
      }

      Job::Clobber => {
        debug!("GPU registers clobbered");
        self.regs.iter_mut().for_each(|r| *r = CLOBBERED);
        self.vsh.clobber();
        self.gsh.clobber();
      }

      Job::Shutdown => return false,
    }

    true
  }

  fn run_commands(&mut self, words: &[u32]) {
    self.runs += 1;

    for record in Records::new(words) {
      let mask = record.mask;

      for (reg, value) in record.writes() {
        self.write(reg, mask, value);
      }
    }
  }

  fn write(&mut self, reg: u16, mask: u8, value: u32) {
    trace!("reg {:#06x} <- {:#010x} (mask {:#x})", reg, value, mask);
    self.register_writes += 1;

    let slot = match self.regs.get_mut(reg as usize) {
      Some(slot) => slot,
      None => {
        warn!("write to unknown register {:#06x}", reg);
        return;
      }
    };

    let byte_mask = (0..4)
      .filter(|i| mask & (1 << i) != 0)
      .fold(0_u32, |m, i| m | 0xFF << (8 * i));
    *slot = (*slot & !byte_mask) | (value & byte_mask);

    if reg == regs::DRAWARRAYS {
      self.draws += 1;
    } else if !self.vsh.write(&regs::VSH, reg, value) {
      self.gsh.write(&regs::GSH, reg, value);
    }
  }

  fn fill(&mut self, fill: MemoryFill) {
    let bytes = fill.value.to_le_bytes();
    let len = fill.surface.len();

    match self.vram_range(fill.surface.addr, len) {
      Some(range) => {
        for texel in self.vram[range].chunks_exact_mut(4) {
          texel.copy_from_slice(&bytes);
        }
      }

      None => warn!("memory fill out of bounds: {:#010x}+{}", fill.surface.addr, len),
    }
  }

  fn vram_range(&self, addr: u32, len: usize) -> Option<std::ops::Range<usize>> {
    let start = addr.checked_sub(VRAM_BASE)? as usize;
    let end = start.checked_add(len)?;
    (end <= self.vram.len()).then(|| start..end)
  }

  fn vram_slice(&self, addr: u32, len: usize) -> &[u8] {
    match self.vram_range(addr, len) {
      Some(range) => &self.vram[range],
      None => {
        warn!("VRAM read out of bounds: {:#010x}+{}", addr, len);
        &[]
      }
    }
  }

  fn snapshot(&self) -> GpuSnapshot {
    GpuSnapshot {
      regs: self.regs.clone(),
      vsh: self.vsh.clone(),
      gsh: self.gsh.clone(),
      draws: self.draws,
      runs: self.runs,
      register_writes: self.register_writes,
      resets: self.resets,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use picagl::command::CommandBuffer;
  use pretty_assertions::assert_eq;

  fn run(gpu: &mut GpuThread, cmd: &mut CommandBuffer) {
    cmd.finalize().unwrap();
    let (done, _fence) = mpsc::channel();
    gpu.execute(Job::Run {
      words: cmd.take_run(),
      done,
    });
  }

  #[test]
  fn masked_writes_merge_bytes() {
    let mut gpu = GpuThread::new();
    let mut cmd = CommandBuffer::new(64);
    cmd.write(regs::DEPTH_COLOR_MASK, 0x1122_3344).unwrap();
    cmd.write_masked(regs::DEPTH_COLOR_MASK, 0b0101, 0xAABB_CCDD).unwrap();
    run(&mut gpu, &mut cmd);

    let snapshot = gpu.snapshot();
    assert_eq!(snapshot.reg(regs::DEPTH_COLOR_MASK), 0x11BB_33DD);
    assert_eq!(snapshot.reg(regs::FINALIZE), regs::FINALIZE_MAGIC);
    assert_eq!(snapshot.register_writes, 3);
  }

  #[test]
  fn float_uniform_upload() {
    let mut gpu = GpuThread::new();
    let mut cmd = CommandBuffer::new(64);
    let words: Vec<u32> = [4., 3., 2., 1., 8., 7., 6., 5.]
      .iter()
      .map(|x: &f32| x.to_bits())
      .collect();

    cmd
      .write(regs::VSH.float_uniform_config, regs::float_uniform_config(10))
      .unwrap();
    cmd.write_repeated(regs::VSH.float_uniform_data, &words).unwrap();
    run(&mut gpu, &mut cmd);

    let snapshot = gpu.snapshot();
    assert_eq!(snapshot.vsh.uniform(10), Some([1., 2., 3., 4.]));
    assert_eq!(snapshot.vsh.uniform(11), Some([5., 6., 7., 8.]));
    assert_eq!(snapshot.gsh.uniform(10), Some([0.; 4]));
  }

  #[test]
  fn code_transfer() {
    let mut gpu = GpuThread::new();
    let mut cmd = CommandBuffer::new(64);
    cmd.write(regs::GSH.code_transfer_config, 2).unwrap();
    cmd.write_repeated(regs::GSH.code_transfer_data, &[7, 8]).unwrap();
    cmd.write(regs::GSH.code_transfer_end, 1).unwrap();
    cmd.write(regs::DRAWARRAYS, 1).unwrap();
    run(&mut gpu, &mut cmd);

    let snapshot = gpu.snapshot();
    assert_eq!(snapshot.gsh.code, vec![0, 0, 7, 8]);
    assert!(snapshot.vsh.code.is_empty());
    assert_eq!(snapshot.draws, 1);
  }

  #[test]
  fn fills_and_transfers() {
    let mut gpu = GpuThread::new();
    let surface = Surface {
      addr: VRAM_BASE + 0x100,
      width: 2,
      height: 2,
      bytes_per_pixel: 4,
    };
    let (done, _fence) = mpsc::channel();

    gpu.execute(Job::MemoryFill {
      fills: vec![MemoryFill {
        surface,
        value: 0x0102_0304,
      }],
      done: done.clone(),
    });
    gpu.execute(Job::DisplayTransfer {
      src: surface,
      screen: Screen::Bottom,
      done: done.clone(),
    });
    gpu.execute(Job::Present {
      screen: Screen::Bottom,
      done,
    });

    assert_eq!(gpu.vram_slice(VRAM_BASE + 0xFC, 8), &[0, 0, 0, 0, 4, 3, 2, 1]);
    assert_eq!(gpu.presented[1], [4, 3, 2, 1].repeat(4));
    assert!(gpu.presented[0].is_empty());
  }
}
