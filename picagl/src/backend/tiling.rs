//! Texture tiling helper.

use crate::backend::BackendError;

/// Converts linear images to the GPU tiled layout.
pub trait Tiler {
  /// Tile a linear RGBA8 image into VRAM, returning its address.
  ///
  /// `previous` is where the image was last tiled; it may be reused.
  fn tile(&mut self, pixels: &[u8], width: u16, height: u16, previous: Option<u32>) -> Result<u32, BackendError>;
}
