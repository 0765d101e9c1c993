//! Dirty-state tracking.

use bitflags::bitflags;

bitflags! {
  /// Categories of state changed since the last resolution.
  ///
  /// Mutators only ever OR bits in; the aggregator clears the whole set once it has resolved it.
  #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
  pub struct NewState: u32 {
    const MODELVIEW = 1 << 0;
    const PROJECTION = 1 << 1;
    const TEXTURE_MATRIX = 1 << 2;
    const COLOR = 1 << 3;
    const DEPTH = 1 << 4;
    const POLYGON = 1 << 5;
    const SCISSOR = 1 << 6;
    const STENCIL = 1 << 7;
    const TEXTURE = 1 << 8;
    const VIEWPORT = 1 << 9;
    const BUFFERS = 1 << 10;
    const PROGRAM = 1 << 11;
    const BUFFER_OBJECT = 1 << 12;
    const ARRAY = 1 << 13;
    /// Current vertex attributes; never triggers a resolution on its own.
    const CURRENT_ATTRIB = 1 << 14;

    const TRANSFORM = Self::MODELVIEW.bits() | Self::PROJECTION.bits() | Self::TEXTURE_MATRIX.bits();
    const RASTER = Self::COLOR.bits() | Self::DEPTH.bits() | Self::POLYGON.bits() | Self::STENCIL.bits();
    const FRAMEBUFFER = Self::VIEWPORT.bits() | Self::SCISSOR.bits() | Self::BUFFERS.bits();
  }
}

/// Cached value.
///
/// A cached value is used to prevent issuing GPU commands if we know the target value is already
/// set to what the command tries to set. An empty cache is invalid whatever the compared value,
/// which is how a write gets forced after the GPU lost its registers.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Cached<T>(Option<T>)
where
  T: PartialEq;

impl<T> Cached<T>
where
  T: PartialEq,
{
  pub(crate) fn empty() -> Self {
    Cached(None)
  }

  /// Explicitly invalidate a value.
  pub(crate) fn invalidate(&mut self) {
    self.0 = None;
  }

  pub(crate) fn set(&mut self, value: T) {
    self.0 = Some(value);
  }

  /// Check if the cached value is invalid regarding a value.
  pub(crate) fn is_invalid(&self, new_val: &T) -> bool {
    match &self.0 {
      Some(ref t) => t != new_val,
      _ => true,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cached_starts_invalid() {
    let mut c = Cached::empty();
    assert!(c.is_invalid(&3));

    c.set(3);
    assert!(!c.is_invalid(&3));
    assert!(c.is_invalid(&4));

    c.invalidate();
    assert!(c.is_invalid(&3));
  }

  #[test]
  fn groups() {
    assert!(NewState::TRANSFORM.contains(NewState::PROJECTION));
    assert!(!NewState::RASTER.intersects(NewState::FRAMEBUFFER));
  }
}
