use crate::backend::Backend;
use crate::context::Gl;
use crate::error::GlResult;
use crate::linear::M44;
use crate::matrix::MatrixStacks;
use crate::state::NewState;

impl<'a, B> Gl<'a, B>
where
  B: ?Sized + Backend,
{
  fn matrix_op<F>(&mut self, f: F) -> GlResult<()>
  where
    F: FnOnce(&mut MatrixStacks) -> GlResult<NewState>,
  {
    let r = f(&mut self.ctx.matrices).map(|dirty| self.ctx.new_state |= dirty);
    self.latch(r)
  }

  pub fn matrix_mode(&mut self, mode: u32) -> GlResult<()> {
    let r = self.ctx.matrices.select_mode(mode).map(|_| ());
    self.latch(r)
  }

  pub fn push_matrix(&mut self) -> GlResult<()> {
    self.matrix_op(|m| m.push())
  }

  pub fn pop_matrix(&mut self) -> GlResult<()> {
    self.matrix_op(|m| m.pop())
  }

  pub fn load_identity(&mut self) -> GlResult<()> {
    self.matrix_op(|m| Ok(m.load_identity()))
  }

  /// Replace the top of the current stack with a column-major matrix.
  pub fn load_matrix(&mut self, matrix: &M44) -> GlResult<()> {
    self.matrix_op(|m| Ok(m.load(matrix)))
  }

  pub fn mult_matrix(&mut self, matrix: &M44) -> GlResult<()> {
    self.matrix_op(|m| Ok(m.mult(matrix)))
  }

  pub fn translate(&mut self, x: f32, y: f32, z: f32) -> GlResult<()> {
    self.matrix_op(|m| Ok(m.translate(x, y, z)))
  }

  pub fn scale(&mut self, x: f32, y: f32, z: f32) -> GlResult<()> {
    self.matrix_op(|m| Ok(m.scale(x, y, z)))
  }

  /// Rotate by `angle` degrees around `(x, y, z)`.
  pub fn rotate(&mut self, angle: f32, x: f32, y: f32, z: f32) -> GlResult<()> {
    self.matrix_op(|m| Ok(m.rotate(angle, x, y, z)))
  }

  pub fn frustum(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> GlResult<()> {
    self.matrix_op(|m| m.frustum(left, right, bottom, top, near, far))
  }

  pub fn ortho(&mut self, left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> GlResult<()> {
    self.matrix_op(|m| m.ortho(left, right, bottom, top, near, far))
  }

  /// Top of the current stack.
  pub fn get_matrix(&self) -> M44 {
    *self.ctx.matrices.current().top()
  }
}
