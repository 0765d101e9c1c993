//! GPU command processor and memory interface.

use std::sync::mpsc;

use crate::backend::BackendError;
use crate::command::CommandBuffer;
use crate::config::Screen;

/// Completion signal of an asynchronous GPU operation.
#[derive(Debug)]
pub struct Fence {
  done: mpsc::Receiver<()>,
}

impl Fence {
  /// Fence completed by sending on the matching [`mpsc::Sender`].
  pub fn new() -> (mpsc::Sender<()>, Self) {
    let (sender, done) = mpsc::channel();
    (sender, Fence { done })
  }

  /// Fence that is already signaled.
  pub fn signaled() -> Self {
    let (sender, fence) = Fence::new();
    let _ = sender.send(());
    fence
  }

  /// Block until the operation completes.
  pub fn wait(self) -> Result<(), BackendError> {
    self.done.recv().map_err(|_| BackendError::GpuGone)
  }
}

/// A rectangle of VRAM the GPU renders to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Surface {
  pub addr: u32,
  pub width: u16,
  pub height: u16,
  pub bytes_per_pixel: u8,
}

impl Surface {
  pub fn len(&self) -> usize {
    self.width as usize * self.height as usize * self.bytes_per_pixel as usize
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Fill a surface with a repeated 32-bit value.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct MemoryFill {
  pub surface: Surface,
  pub value: u32,
}

/// GPU command processor.
pub trait Gpu {
  /// One-time GPU initialization.
  fn init(&mut self) -> Result<(), BackendError>;

  /// Reset the GPU and make `root` the command buffer it fetches from.
  fn reset(&mut self, root: &CommandBuffer) -> Result<(), BackendError>;

  /// Make `root` the command buffer the GPU fetches from, without resetting it.
  fn set_command_buffer(&mut self, root: &CommandBuffer) -> Result<(), BackendError>;

  /// Allocate `size` bytes of VRAM.
  fn alloc_vram(&mut self, size: usize) -> Result<u32, BackendError>;

  fn free_vram(&mut self, addr: u32);

  /// Start executing a finalized run.
  fn dispatch(&mut self, run: Vec<u32>) -> Result<Fence, BackendError>;

  /// Start filling surfaces.
  fn memory_fill(&mut self, fills: &[MemoryFill]) -> Result<Fence, BackendError>;

  /// Start copying a rendered surface to a screen.
  fn display_transfer(&mut self, src: Surface, screen: Screen) -> Result<Fence, BackendError>;

  /// Present the last transferred image; the fence signals on vertical blank.
  fn present(&mut self, screen: Screen) -> Result<Fence, BackendError>;
}
