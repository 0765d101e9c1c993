//! Shader binary loader.

use crate::backend::BackendError;
use crate::command::CommandBuffer;

/// Opaque program handle.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ProgramHandle(pub u32);

/// Format tag of a shader binary.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum BinaryFormat {
  VertexShaderBinary,
  GeometryShaderBinary,
}

impl BinaryFormat {
  pub fn from_gl(format: u32) -> Option<Self> {
    match format {
      0x01 => Some(BinaryFormat::VertexShaderBinary),
      0x02 => Some(BinaryFormat::GeometryShaderBinary),
      _ => None,
    }
  }
}

/// Precompiled shader programs.
pub trait ShaderBackend {
  fn create_program(&mut self) -> Result<ProgramHandle, BackendError>;

  /// Load a binary into a program.
  fn program_binary(
    &mut self,
    program: ProgramHandle,
    format: BinaryFormat,
    binary: &[u8],
  ) -> Result<(), BackendError>;

  fn delete_program(&mut self, program: ProgramHandle);

  /// Float uniform register of a uniform, looked up by name.
  fn uniform_location(&self, program: ProgramHandle, name: &str) -> Option<i32>;

  /// Append the commands making `program` active.
  fn use_program(&mut self, program: ProgramHandle, cmd: &mut CommandBuffer) -> Result<(), BackendError>;
}
