//! Types and functions implementing the PICA200 device layout.
//!
//! The GPU consumes uniforms as 4-component float vectors whose components travel in reverse
//! order (`w`, `z`, `y`, `x`). Matrices are uploaded one row per vector register, so a host
//! column-major matrix must be transposed and each of its rows reversed before it can be written
//! to the float uniform registers. Fixed-function registers use two reduced float formats,
//! _f24_ and _f31_, which are provided here as well.
//!
//! Everything in this crate is pure: no state, no allocation.

/// 4×4 column-major matrix, as stored on the host.
pub type M44 = [[f32; 4]; 4];

/// Types that have a device representation.
///
/// This trait allows to encode types into their device representation but also decode such
/// representation into the proper type.
pub trait DeviceLayout: Copy {
  type Encoded: Copy;

  /// Encode the value into its device representation.
  fn device_encode(self) -> Self::Encoded;

  /// Decode a value from its device representation.
  fn device_decode(encoded: Self::Encoded) -> Self;
}

impl DeviceLayout for [f32; 4] {
  type Encoded = [f32; 4];

  fn device_encode(self) -> Self::Encoded {
    let [x, y, z, w] = self;
    [w, z, y, x]
  }

  fn device_decode(encoded: Self::Encoded) -> Self {
    // the reversal is an involution
    encoded.device_encode()
  }
}

impl DeviceLayout for M44 {
  type Encoded = [[f32; 4]; 4];

  fn device_encode(self) -> Self::Encoded {
    let mut rows = [[0.; 4]; 4];

    for (r, row) in rows.iter_mut().enumerate() {
      *row = [self[0][r], self[1][r], self[2][r], self[3][r]].device_encode();
    }

    rows
  }

  fn device_decode(encoded: Self::Encoded) -> Self {
    let mut m = [[0.; 4]; 4];

    for (r, row) in encoded.iter().enumerate() {
      let host_row = <[f32; 4]>::device_decode(*row);

      for (c, col) in m.iter_mut().enumerate() {
        col[r] = host_row[c];
      }
    }

    m
  }
}

/// Serialize a host matrix into the 64 bytes the GPU expects for four consecutive float uniform
/// registers.
///
/// Floats are little-endian.
pub fn to_device_layout(m: &M44) -> [u8; 64] {
  let mut bytes = [0; 64];

  for (i, x) in m.device_encode().iter().flatten().enumerate() {
    bytes[i * 4..i * 4 + 4].copy_from_slice(&x.to_le_bytes());
  }

  bytes
}

/// Inverse of [`to_device_layout`].
pub fn from_device_layout(bytes: &[u8; 64]) -> M44 {
  let mut rows = [[0.; 4]; 4];

  for (i, chunk) in bytes.chunks_exact(4).enumerate() {
    rows[i / 4][i % 4] = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
  }

  M44::device_decode(rows)
}

/// Words of a vector uniform, in upload order.
pub fn vec4_words(v: [f32; 4]) -> [u32; 4] {
  let [a, b, c, d] = v.device_encode();
  [a.to_bits(), b.to_bits(), c.to_bits(), d.to_bits()]
}

/// Convert a `f32` into the 24-bit float format (1 sign bit, 7 exponent bits, 16 mantissa bits).
pub fn f32_to_f24(f: f32) -> u32 {
  reduce(f, 16)
}

/// Convert a `f32` into the 31-bit float format (1 sign bit, 7 exponent bits, 23 mantissa bits).
pub fn f32_to_f31(f: f32) -> u32 {
  reduce(f, 23)
}

/// Convert a 24-bit float back to `f32`.
pub fn f24_to_f32(f: u32) -> f32 {
  expand(f, 16)
}

/// Convert a 31-bit float back to `f32`.
pub fn f31_to_f32(f: u32) -> f32 {
  expand(f, 23)
}

// Both reduced formats share a 7-bit exponent with a bias of 63.
fn reduce(f: f32, mantissa_bits: u32) -> u32 {
  if f == 0. {
    return 0;
  }

  let bits = f.to_bits();
  let sign = bits >> 31;
  let exponent = ((bits >> 23) & 0xFF) as i32 - 0x40;
  let mantissa = (bits & 0x7F_FFFF) >> (23 - mantissa_bits);
  let sign_bit = sign << (mantissa_bits + 7);

  if exponent < 0 {
    sign_bit
  } else if exponent > 0x7F {
    sign_bit | (0x7F << mantissa_bits) | ((1 << mantissa_bits) - 1)
  } else {
    sign_bit | ((exponent as u32) << mantissa_bits) | mantissa
  }
}

fn expand(f: u32, mantissa_bits: u32) -> f32 {
  let mantissa = f & ((1 << mantissa_bits) - 1);
  let exponent = (f >> mantissa_bits) & 0x7F;
  let sign = (f >> (mantissa_bits + 7)) & 1;

  if exponent == 0 && mantissa == 0 {
    return if sign == 1 { -0. } else { 0. };
  }

  f32::from_bits((sign << 31) | ((exponent + 0x40) << 23) | (mantissa << (23 - mantissa_bits)))
}

/// Pack a normalized RGBA color into the `0xAABBGGRR` word color registers expect.
pub fn pack_rgba8(color: [f32; 4]) -> u32 {
  color
    .iter()
    .enumerate()
    .fold(0, |word, (i, c)| word | (unorm8(*c) << (i * 8)))
}

fn unorm8(c: f32) -> u32 {
  (c.max(0.).min(1.) * 255. + 0.5) as u32
}

#[cfg(test)]
mod tests {
  use super::*;

  const IDENTITY: M44 = [
    [1., 0., 0., 0.],
    [0., 1., 0., 0.],
    [0., 0., 1., 0.],
    [0., 0., 0., 1.],
  ];

  #[test]
  fn vec4_is_reversed() {
    assert_eq!([1., 2., 3., 4.].device_encode(), [4., 3., 2., 1.]);
    assert_eq!(<[f32; 4]>::device_decode([4., 3., 2., 1.]), [1., 2., 3., 4.]);
  }

  #[test]
  fn identity_rows() {
    assert_eq!(
      IDENTITY.device_encode(),
      [
        [0., 0., 0., 1.],
        [0., 0., 1., 0.],
        [0., 1., 0., 0.],
        [1., 0., 0., 0.],
      ]
    );
  }

  #[test]
  fn translation_lands_in_first_component_of_each_row() {
    let mut m = IDENTITY;
    m[3] = [5., 6., 7., 1.];

    let rows = m.device_encode();

    assert_eq!(rows[0], [5., 0., 0., 1.]);
    assert_eq!(rows[1], [6., 0., 1., 0.]);
    assert_eq!(rows[2], [7., 1., 0., 0.]);
    assert_eq!(rows[3], [1., 0., 0., 0.]);
  }

  #[test]
  fn device_bytes() {
    let mut m = IDENTITY;
    m[3][0] = 2.5;

    let bytes = to_device_layout(&m);

    assert_eq!(&bytes[0..4], &2.5f32.to_le_bytes());
    assert_eq!(&bytes[12..16], &1f32.to_le_bytes());
    assert_eq!(from_device_layout(&bytes), m);
  }

  #[test]
  fn vec4_upload_order() {
    assert_eq!(
      vec4_words([0., 0., 0., 1.]),
      [1f32.to_bits(), 0, 0, 0]
    );
  }

  #[test]
  fn f24() {
    assert_eq!(f32_to_f24(0.), 0);
    assert_eq!(f32_to_f24(1.), 0x3F_0000);
    assert_eq!(f32_to_f24(-2.), 0xC0_0000);
    assert_eq!(f24_to_f32(0x3F_0000), 1.);
    assert_eq!(f24_to_f32(f32_to_f24(200.)), 200.);
  }

  #[test]
  fn f31() {
    assert_eq!(f32_to_f31(1.), 0x1F80_0000);
    assert_eq!(f31_to_f32(f32_to_f31(0.0125)), 0.0125);
  }

  #[test]
  fn tiny_values_flush_to_signed_zero() {
    assert_eq!(f32_to_f24(1e-30), 0);
    assert_eq!(f32_to_f24(-1e-30), 0x80_0000);
  }

  #[test]
  fn rgba8() {
    assert_eq!(pack_rgba8([1., 0., 0., 1.]), 0xFF00_00FF);
    assert_eq!(pack_rgba8([0., 0., 1., 0.]), 0x00FF_0000);
    assert_eq!(pack_rgba8([2., -1., 0.5, 1.]), 0xFF80_00FF);
  }
}
