//! Morton tiling of RGBA8 images.
//!
//! The GPU samples textures from 8×8 tiles laid out left to right, starting from the bottom of
//! the image; inside a tile, pixels follow a Z-order (Morton) curve. Texels are stored with their
//! components reversed (ABGR in memory).

const TILE: usize = 8;
const BYTES_PER_PIXEL: usize = 4;

/// Whether an image of that size can be tiled.
pub fn can_tile(pixels: &[u8], width: u16, height: u16) -> bool {
  let (w, h) = (width as usize, height as usize);
  w >= TILE && h >= TILE && w % TILE == 0 && h % TILE == 0 && pixels.len() == w * h * BYTES_PER_PIXEL
}

/// Interleave the three low bits of `x` and `y`, `x` taking the even bits.
fn morton(x: usize, y: usize) -> usize {
  let mut i = 0;

  for bit in 0..3 {
    i |= ((x >> bit) & 1) << (2 * bit);
    i |= ((y >> bit) & 1) << (2 * bit + 1);
  }

  i
}

/// Byte offset in the tiled image of the pixel at (`x`, `y`), `y` going down from the top row.
fn tiled_offset(x: usize, y: usize, width: usize, height: usize) -> usize {
  let y = height - 1 - y;
  let tile = (y / TILE) * (width / TILE) + x / TILE;
  (tile * TILE * TILE + morton(x % TILE, y % TILE)) * BYTES_PER_PIXEL
}

/// Tile a linear, top-down RGBA8 image.
///
/// Returns [`None`] if the image cannot be tiled (see [`can_tile`]).
pub fn tile_rgba8(pixels: &[u8], width: u16, height: u16) -> Option<Vec<u8>> {
  if !can_tile(pixels, width, height) {
    return None;
  }

  let (w, h) = (width as usize, height as usize);
  let mut tiled = vec![0; pixels.len()];

  for (i, texel) in pixels.chunks_exact(BYTES_PER_PIXEL).enumerate() {
    let dst = tiled_offset(i % w, i / w, w, h);
    tiled[dst..dst + BYTES_PER_PIXEL].copy_from_slice(&[texel[3], texel[2], texel[1], texel[0]]);
  }

  Some(tiled)
}

/// Inverse of [`tile_rgba8`].
pub fn untile_rgba8(tiled: &[u8], width: u16, height: u16) -> Option<Vec<u8>> {
  if !can_tile(tiled, width, height) {
    return None;
  }

  let (w, h) = (width as usize, height as usize);
  let mut pixels = vec![0; tiled.len()];

  for (i, texel) in pixels.chunks_exact_mut(BYTES_PER_PIXEL).enumerate() {
    let src = tiled_offset(i % w, i / w, w, h);
    let t = &tiled[src..src + BYTES_PER_PIXEL];
    texel.copy_from_slice(&[t[3], t[2], t[1], t[0]]);
  }

  Some(pixels)
}
