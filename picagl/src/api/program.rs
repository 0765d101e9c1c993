use crate::backend::Backend;
use crate::context::Gl;
use crate::error::GlResult;
use crate::linear::M44;
use crate::state::NewState;

impl<'a, B> Gl<'a, B>
where
  B: ?Sized + Backend,
{
  pub fn create_program(&mut self) -> GlResult<u32> {
    let r = self.ctx.shared.borrow_mut().programs.create(&mut *self.backend);
    self.latch(r)
  }

  pub fn is_program(&self, name: u32) -> bool {
    self.ctx.shared.borrow().programs.is_program(name)
  }

  /// Load a shader binary into a program.
  ///
  /// `format` is `1` for a vertex shader binary, `2` for a vertex + geometry shader binary.
  pub fn program_binary(&mut self, name: u32, format: u32, binary: &[u8]) -> GlResult<()> {
    let r = self
      .ctx
      .shared
      .borrow_mut()
      .programs
      .binary(name, format, binary, &mut *self.backend);
    self.latch(r)
  }

  pub fn delete_program(&mut self, name: u32) -> GlResult<()> {
    let r = self
      .ctx
      .shared
      .borrow_mut()
      .programs
      .delete(name, &mut *self.backend);
    self.latch(r)
  }

  /// Make a program current; `0` and the current program are ignored.
  pub fn use_program(&mut self, name: u32) -> GlResult<()> {
    let r = self.ctx.shared.borrow().programs.check_use(name);

    match self.latch(r)? {
      true => {
        self.flush_vertices(NewState::PROGRAM);
        self
          .ctx
          .shared
          .borrow_mut()
          .programs
          .make_current(name, &mut *self.backend);
        Ok(())
      }

      false => Ok(()),
    }
  }

  pub fn get_current_program(&self) -> u32 {
    self.ctx.shared.borrow().programs.current().unwrap_or(0)
  }

  pub fn get_uniform_location(&mut self, program: u32, uniform: &str) -> GlResult<i32> {
    let r = self
      .ctx
      .shared
      .borrow()
      .programs
      .uniform_location(program, uniform, &*self.backend);
    self.latch(r)
  }

  pub fn uniform4fv(&mut self, location: i32, values: &[[f32; 4]]) -> GlResult<()> {
    let r = self.ctx.shared.borrow_mut().programs.set_vectors(location, values);
    self.latch(r)
  }

  pub fn uniform1f(&mut self, location: i32, x: f32) -> GlResult<()> {
    self.uniform4fv(location, &[[x, 0., 0., 0.]])
  }

  pub fn uniform2f(&mut self, location: i32, x: f32, y: f32) -> GlResult<()> {
    self.uniform4fv(location, &[[x, y, 0., 0.]])
  }

  pub fn uniform3f(&mut self, location: i32, x: f32, y: f32, z: f32) -> GlResult<()> {
    self.uniform4fv(location, &[[x, y, z, 0.]])
  }

  pub fn uniform4f(&mut self, location: i32, x: f32, y: f32, z: f32, w: f32) -> GlResult<()> {
    self.uniform4fv(location, &[[x, y, z, w]])
  }

  /// Upload column-major matrices, or row-major ones if `transpose` is set.
  pub fn uniform_matrix4fv(&mut self, location: i32, transpose: bool, matrices: &[M44]) -> GlResult<()> {
    let r = self
      .ctx
      .shared
      .borrow_mut()
      .programs
      .set_matrices(location, transpose, matrices);
    self.latch(r)
  }
}
