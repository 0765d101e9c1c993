//! Linear algebra types and the matrix operations of the fixed-function transform pipeline.
//!
//! Matrices are column-major: `m[col][row]`.

pub use picagl_layout::M44;

/// 4-component vector.
pub type V4 = [f32; 4];

pub const IDENTITY: M44 = [
  [1., 0., 0., 0.],
  [0., 1., 0., 0.],
  [0., 0., 1., 0.],
  [0., 0., 0., 1.],
];

/// `a × b`.
pub fn mul(a: &M44, b: &M44) -> M44 {
  let mut r = [[0.; 4]; 4];

  for (c, col) in r.iter_mut().enumerate() {
    for (row, x) in col.iter_mut().enumerate() {
      *x = (0..4).map(|k| a[k][row] * b[c][k]).sum();
    }
  }

  r
}

pub fn transpose(m: &M44) -> M44 {
  let mut r = [[0.; 4]; 4];

  for (c, col) in r.iter_mut().enumerate() {
    for (row, x) in col.iter_mut().enumerate() {
      *x = m[row][c];
    }
  }

  r
}

pub fn translation(x: f32, y: f32, z: f32) -> M44 {
  let mut m = IDENTITY;
  m[3] = [x, y, z, 1.];
  m
}

pub fn scaling(x: f32, y: f32, z: f32) -> M44 {
  let mut m = IDENTITY;
  m[0][0] = x;
  m[1][1] = y;
  m[2][2] = z;
  m
}

/// Rotation of `angle` degrees around `(x, y, z)`.
///
/// A null axis yields the identity.
pub fn rotation(angle: f32, x: f32, y: f32, z: f32) -> M44 {
  let len = (x * x + y * y + z * z).sqrt();

  if len == 0. {
    return IDENTITY;
  }

  let (x, y, z) = (x / len, y / len, z / len);
  let (s, c) = angle.to_radians().sin_cos();
  let t = 1. - c;

  [
    [t * x * x + c, t * x * y + s * z, t * x * z - s * y, 0.],
    [t * x * y - s * z, t * y * y + c, t * y * z + s * x, 0.],
    [t * x * z + s * y, t * y * z - s * x, t * z * z + c, 0.],
    [0., 0., 0., 1.],
  ]
}

/// Perspective frustum. Parameters are assumed validated.
pub fn frustum(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> M44 {
  let w = right - left;
  let h = top - bottom;
  let d = far - near;

  [
    [2. * near / w, 0., 0., 0.],
    [0., 2. * near / h, 0., 0.],
    [(right + left) / w, (top + bottom) / h, -(far + near) / d, -1.],
    [0., 0., -2. * far * near / d, 0.],
  ]
}

/// Orthographic projection. Parameters are assumed validated.
pub fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> M44 {
  let w = right - left;
  let h = top - bottom;
  let d = far - near;

  [
    [2. / w, 0., 0., 0.],
    [0., 2. / h, 0., 0.],
    [0., 0., -2. / d, 0.],
    [-(right + left) / w, -(top + bottom) / h, -(far + near) / d, 1.],
  ]
}

/// Quarter turn compensating for the panels being mounted sideways.
pub const SCREEN_ROTATION: M44 = [
  [0., -1., 0., 0.],
  [1., 0., 0., 0.],
  [0., 0., 1., 0.],
  [0., 0., 0., 1.],
];
