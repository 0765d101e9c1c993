//! Backend interfacing.
//!
//! The core never touches the hardware directly: the GPU command processor, the shader binary
//! loader, the texture tiling helper and the OS lifecycle hook are all reached through the traits
//! defined here. A type implementing all of them is a [`Backend`].

use std::error;
use std::fmt;

use crate::command::CommandBufferError;
use crate::error::GlError;

pub mod driver;
pub mod gpu;
pub mod lifecycle;
pub mod shader;
pub mod tiling;

pub use self::driver::Driver;
pub use self::gpu::{Fence, Gpu, MemoryFill, Surface};
pub use self::lifecycle::{LifecycleEvent, LifecycleHook};
pub use self::shader::{BinaryFormat, ProgramHandle, ShaderBackend};
pub use self::tiling::Tiler;

/// Everything the core needs from the outside world.
pub trait Backend: Driver + Gpu + LifecycleHook + ShaderBackend + Tiler {}

impl<B> Backend for B where B: Driver + Gpu + LifecycleHook + ShaderBackend + Tiler {}

/// Errors a backend can emit.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BackendError {
  /// Not enough VRAM left for an allocation.
  OutOfVram { requested: usize, available: usize },
  /// A VRAM range falls outside of what was allocated.
  InvalidVramRange { addr: u32, len: usize },
  /// A shader binary could not be parsed.
  InvalidShaderBinary(String),
  /// Image dimensions the tiling helper cannot handle.
  InvalidImage { width: u16, height: u16 },
  /// The program handle does not designate a program of this backend.
  UnknownProgram(ProgramHandle),
  /// The GPU consumer stopped answering.
  GpuGone,
  /// Commands could not be appended.
  CommandBuffer(CommandBufferError),
}

impl fmt::Display for BackendError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      BackendError::OutOfVram { requested, available } => write!(
        f,
        "out of VRAM ({} bytes requested, {} available)",
        requested, available
      ),

      BackendError::InvalidVramRange { addr, len } => {
        write!(f, "invalid VRAM range {:#010x}+{}", addr, len)
      }

      BackendError::InvalidShaderBinary(ref reason) => write!(f, "invalid shader binary: {}", reason),

      BackendError::InvalidImage { width, height } => write!(f, "cannot tile a {}x{} image", width, height),

      BackendError::UnknownProgram(handle) => write!(f, "unknown program {}", handle.0),

      BackendError::GpuGone => f.write_str("GPU is gone"),

      BackendError::CommandBuffer(ref e) => write!(f, "{}", e),
    }
  }
}

impl error::Error for BackendError {
  fn source(&self) -> Option<&(dyn error::Error + 'static)> {
    match self {
      BackendError::CommandBuffer(e) => Some(e),
      _ => None,
    }
  }
}

impl From<CommandBufferError> for BackendError {
  fn from(e: CommandBufferError) -> Self {
    BackendError::CommandBuffer(e)
  }
}

impl From<BackendError> for GlError {
  fn from(e: BackendError) -> Self {
    log::warn!("backend error: {}", e);

    match e {
      BackendError::OutOfVram { .. } | BackendError::CommandBuffer(_) => GlError::OutOfMemory,
      BackendError::InvalidShaderBinary(_) | BackendError::InvalidImage { .. } => GlError::InvalidValue,
      _ => GlError::InvalidOperation,
    }
  }
}
