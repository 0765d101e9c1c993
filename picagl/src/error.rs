//! Error codes latched on contexts.

use std::error;
use std::fmt;

/// Error code recorded on a context when an operation is rejected.
///
/// Operations validate their arguments before mutating anything: when one of these is returned,
/// the state is exactly what it was before the call.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum GlError {
  /// Unrecognized mode, target or parameter name.
  InvalidEnum,
  /// Numeric argument out of range.
  InvalidValue,
  /// Operation illegal in the current state.
  InvalidOperation,
  /// Pushing onto a full matrix stack.
  StackOverflow,
  /// Popping the last matrix of a stack.
  StackUnderflow,
  /// Allocation failure.
  OutOfMemory,
}

impl GlError {
  /// The GL error code for this error.
  pub fn code(self) -> u32 {
    match self {
      GlError::InvalidEnum => 0x0500,
      GlError::InvalidValue => 0x0501,
      GlError::InvalidOperation => 0x0502,
      GlError::StackOverflow => 0x0503,
      GlError::StackUnderflow => 0x0504,
      GlError::OutOfMemory => 0x0505,
    }
  }
}

impl fmt::Display for GlError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      GlError::InvalidEnum => f.write_str("invalid enum"),
      GlError::InvalidValue => f.write_str("invalid value"),
      GlError::InvalidOperation => f.write_str("invalid operation"),
      GlError::StackOverflow => f.write_str("stack overflow"),
      GlError::StackUnderflow => f.write_str("stack underflow"),
      GlError::OutOfMemory => f.write_str("out of memory"),
    }
  }
}

impl error::Error for GlError {}

/// Shorthand used by every entry point.
pub type GlResult<T> = Result<T, GlError>;

/// Reject a call with a logged reason.
///
/// The reason is only logged; what is latched on the context is the bare code.
macro_rules! gl_err {
  ($err:expr, $($arg:tt)*) => {{
    log::debug!($($arg)*);
    Err($err)
  }};
}

pub(crate) use gl_err;
