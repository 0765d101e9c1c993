//! Matrix stacks.
//!
//! Every matrix mode owns a fixed-capacity stack; only the top matrix is ever read by the state
//! resolution. Each stack knows which [`NewState`] bit it dirties, so the mutators only report
//! that bit back and the caller ORs it into the context.

use crate::config::Limits;
use crate::error::{gl_err, GlError, GlResult};
use crate::linear::{self, M44};
use crate::state::NewState;

/// Matrix mode selecting which stack matrix operations apply to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MatrixMode {
  ModelView,
  Projection,
  /// Texture matrix of the active texture unit.
  Texture,
}

impl MatrixMode {
  pub fn from_gl(mode: u32) -> Option<Self> {
    match mode {
      0x1700 => Some(MatrixMode::ModelView),
      0x1701 => Some(MatrixMode::Projection),
      0x1702 => Some(MatrixMode::Texture),
      _ => None,
    }
  }
}

/// Fixed-capacity stack of matrices.
#[derive(Clone, Debug)]
pub struct MatrixStack {
  // never empty; the last element is the top
  stack: Vec<M44>,
  max_depth: usize,
  dirty_flag: NewState,
}

impl MatrixStack {
  pub fn new(max_depth: usize, dirty_flag: NewState) -> Self {
    let mut stack = Vec::with_capacity(max_depth);
    stack.push(linear::IDENTITY);

    MatrixStack {
      stack,
      max_depth,
      dirty_flag,
    }
  }

  pub fn top(&self) -> &M44 {
    // the stack always holds at least one matrix
    &self.stack[self.stack.len() - 1]
  }

  fn top_mut(&mut self) -> &mut M44 {
    let i = self.stack.len() - 1;
    &mut self.stack[i]
  }

  /// Depth of the stack; `0` when only the base matrix is present.
  pub fn depth(&self) -> usize {
    self.stack.len() - 1
  }

  pub fn max_depth(&self) -> usize {
    self.max_depth
  }

  pub fn dirty_flag(&self) -> NewState {
    self.dirty_flag
  }

  /// Duplicate the top matrix.
  pub fn push(&mut self) -> GlResult<NewState> {
    if self.depth() + 1 >= self.max_depth {
      return gl_err!(
        GlError::StackOverflow,
        "push_matrix: depth {} reached the limit",
        self.depth()
      );
    }

    let top = *self.top();
    self.stack.push(top);
    Ok(self.dirty_flag)
  }

  pub fn pop(&mut self) -> GlResult<NewState> {
    if self.depth() == 0 {
      return gl_err!(GlError::StackUnderflow, "pop_matrix: empty stack");
    }

    self.stack.pop();
    Ok(self.dirty_flag)
  }

  pub fn load(&mut self, m: &M44) -> NewState {
    *self.top_mut() = *m;
    self.dirty_flag
  }

  /// Post-multiply the top matrix.
  pub fn mult(&mut self, m: &M44) -> NewState {
    let top = self.top_mut();
    *top = linear::mul(top, m);
    self.dirty_flag
  }
}

/// Every matrix stack of a context, along with the mode selecting among them.
#[derive(Debug)]
pub struct MatrixStacks {
  mode: MatrixMode,
  modelview: MatrixStack,
  projection: MatrixStack,
  texture: Vec<MatrixStack>,
  texture_unit: usize,
  // modelview × projection, invalid whenever either operand changed
  model_project: Option<M44>,
}

impl MatrixStacks {
  pub fn new(limits: &Limits) -> Self {
    MatrixStacks {
      mode: MatrixMode::ModelView,
      modelview: MatrixStack::new(limits.max_modelview_stack_depth, NewState::MODELVIEW),
      projection: MatrixStack::new(limits.max_projection_stack_depth, NewState::PROJECTION),
      texture: (0..limits.texture_units)
        .map(|_| MatrixStack::new(limits.max_texture_stack_depth, NewState::TEXTURE_MATRIX))
        .collect(),
      texture_unit: 0,
      model_project: None,
    }
  }

  pub fn mode(&self) -> MatrixMode {
    self.mode
  }

  /// Select the stack matrix operations apply to.
  ///
  /// Returns `false` when the mode was already selected. The texture mode is always re-selected
  /// since the stack it designates depends on the active texture unit.
  pub fn select_mode(&mut self, mode: u32) -> GlResult<bool> {
    let mode = match MatrixMode::from_gl(mode) {
      Some(mode) => mode,
      None => return gl_err!(GlError::InvalidEnum, "matrix_mode: {:#x}", mode),
    };

    if mode == self.mode && mode != MatrixMode::Texture {
      return Ok(false);
    }

    self.mode = mode;
    Ok(true)
  }

  /// Track the active texture unit; it designates the texture stack.
  pub(crate) fn set_texture_unit(&mut self, unit: usize) {
    self.texture_unit = unit.min(self.texture.len().saturating_sub(1));
  }

  pub fn modelview(&self) -> &MatrixStack {
    &self.modelview
  }

  pub fn projection(&self) -> &MatrixStack {
    &self.projection
  }

  pub fn texture(&self, unit: usize) -> Option<&MatrixStack> {
    self.texture.get(unit)
  }

  /// Stack designated by the current mode.
  pub fn current(&self) -> &MatrixStack {
    match self.mode {
      MatrixMode::ModelView => &self.modelview,
      MatrixMode::Projection => &self.projection,
      MatrixMode::Texture => &self.texture[self.texture_unit],
    }
  }

  fn current_mut(&mut self) -> &mut MatrixStack {
    match self.mode {
      MatrixMode::ModelView => &mut self.modelview,
      MatrixMode::Projection => &mut self.projection,
      MatrixMode::Texture => &mut self.texture[self.texture_unit],
    }
  }

  // every mutation goes through here so the product is invalidated whenever an operand changes
  fn touched(&mut self, dirty: NewState) -> NewState {
    if dirty.intersects(NewState::MODELVIEW | NewState::PROJECTION) {
      self.model_project = None;
    }

    dirty
  }

  pub fn push(&mut self) -> GlResult<NewState> {
    self.current_mut().push().map(|dirty| self.touched(dirty))
  }

  pub fn pop(&mut self) -> GlResult<NewState> {
    self.current_mut().pop().map(|dirty| self.touched(dirty))
  }

  pub fn load_identity(&mut self) -> NewState {
    self.load(&linear::IDENTITY)
  }

  pub fn load(&mut self, m: &M44) -> NewState {
    let dirty = self.current_mut().load(m);
    self.touched(dirty)
  }

  pub fn mult(&mut self, m: &M44) -> NewState {
    let dirty = self.current_mut().mult(m);
    self.touched(dirty)
  }

  pub fn translate(&mut self, x: f32, y: f32, z: f32) -> NewState {
    self.mult(&linear::translation(x, y, z))
  }

  pub fn scale(&mut self, x: f32, y: f32, z: f32) -> NewState {
    self.mult(&linear::scaling(x, y, z))
  }

  pub fn rotate(&mut self, angle: f32, x: f32, y: f32, z: f32) -> NewState {
    if angle == 0. {
      return NewState::empty();
    }

    self.mult(&linear::rotation(angle, x, y, z))
  }

  pub fn frustum(
    &mut self,
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    near: f32,
    far: f32,
  ) -> GlResult<NewState> {
    if near <= 0. || far <= 0. || near == far || left == right || top == bottom {
      return gl_err!(GlError::InvalidValue, "frustum: degenerate clip volume");
    }

    Ok(self.mult(&linear::frustum(left, right, bottom, top, near, far)))
  }

  pub fn ortho(
    &mut self,
    left: f32,
    right: f32,
    bottom: f32,
    top: f32,
    near: f32,
    far: f32,
  ) -> GlResult<NewState> {
    if left == right || bottom == top || near == far {
      return gl_err!(GlError::InvalidValue, "ortho: degenerate clip volume");
    }

    Ok(self.mult(&linear::ortho(left, right, bottom, top, near, far)))
  }

  /// Combined projection × modelview matrix, recomputed only if either operand changed.
  pub fn model_project(&mut self) -> &M44 {
    let (projection, modelview) = (self.projection.top(), self.modelview.top());
    self
      .model_project
      .get_or_insert_with(|| linear::mul(projection, modelview))
  }

  pub(crate) fn model_project_is_valid(&self) -> bool {
    self.model_project.is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  const GL_MODELVIEW: u32 = 0x1700;
  const GL_PROJECTION: u32 = 0x1701;
  const GL_TEXTURE: u32 = 0x1702;

  fn stacks() -> MatrixStacks {
    MatrixStacks::new(&Limits::default())
  }

  #[test]
  fn push_copies_top() {
    let mut s = stacks();
    s.translate(1., 2., 3.);
    assert_eq!(s.push(), Ok(NewState::MODELVIEW));
    assert_eq!(s.current().depth(), 1);
    assert_eq!(s.current().top(), &linear::translation(1., 2., 3.));

    s.load_identity();
    assert_eq!(s.pop(), Ok(NewState::MODELVIEW));
    assert_eq!(s.current().top(), &linear::translation(1., 2., 3.));
  }

  #[test]
  fn mode_selection() {
    let mut s = stacks();
    assert_eq!(s.select_mode(GL_MODELVIEW), Ok(false));
    assert_eq!(s.select_mode(GL_PROJECTION), Ok(true));
    assert_eq!(s.select_mode(GL_PROJECTION), Ok(false));
    assert_eq!(s.select_mode(GL_TEXTURE), Ok(true));
    assert_eq!(s.select_mode(GL_TEXTURE), Ok(true));
    assert_eq!(s.select_mode(0x1234), Err(GlError::InvalidEnum));
    assert_eq!(s.mode(), MatrixMode::Texture);
  }

  #[test]
  fn texture_mode_follows_active_unit() {
    let mut s = stacks();
    s.select_mode(GL_TEXTURE).unwrap();
    s.set_texture_unit(1);
    assert_eq!(s.scale(2., 2., 2.), NewState::TEXTURE_MATRIX);

    assert_eq!(s.texture(0).unwrap().top(), &linear::IDENTITY);
    assert_eq!(s.texture(1).unwrap().top(), &linear::scaling(2., 2., 2.));
  }

  #[test]
  fn degenerate_projections_leave_state_untouched() {
    let mut s = stacks();
    s.select_mode(GL_PROJECTION).unwrap();

    assert_eq!(s.frustum(-1., 1., -1., 1., 0., 10.), Err(GlError::InvalidValue));
    assert_eq!(s.frustum(-1., 1., -1., 1., 1., 1.), Err(GlError::InvalidValue));
    assert_eq!(s.frustum(1., 1., -1., 1., 1., 10.), Err(GlError::InvalidValue));
    assert_eq!(s.ortho(0., 0., 0., 1., 0., 1.), Err(GlError::InvalidValue));
    assert_eq!(s.ortho(0., 1., 0., 1., 2., 2.), Err(GlError::InvalidValue));
    assert_eq!(s.projection().top(), &linear::IDENTITY);

    assert_eq!(s.ortho(0., 400., 0., 240., -1., 1.), Ok(NewState::PROJECTION));
  }

  #[test]
  fn model_project_is_lazy() {
    let mut s = stacks();
    let _ = s.model_project();
    assert!(s.model_project_is_valid());

    s.select_mode(GL_TEXTURE).unwrap();
    s.translate(1., 0., 0.);
    assert!(s.model_project_is_valid());

    s.select_mode(GL_PROJECTION).unwrap();
    s.scale(2., 1., 1.);
    assert!(!s.model_project_is_valid());

    s.select_mode(GL_MODELVIEW).unwrap();
    s.translate(0., 3., 0.);
    let expected = linear::mul(&linear::scaling(2., 1., 1.), &linear::translation(0., 3., 0.));
    assert_eq!(s.model_project(), &expected);
  }

  proptest! {
    #[test]
    fn push_stops_at_max_depth(max_depth in 2usize..40) {
      let mut stack = MatrixStack::new(max_depth, NewState::MODELVIEW);

      for _ in 0..max_depth - 1 {
        prop_assert!(stack.push().is_ok());
      }

      prop_assert_eq!(stack.push(), Err(GlError::StackOverflow));
      prop_assert_eq!(stack.depth(), max_depth - 1);
    }

    #[test]
    fn pop_on_empty_fails(pushes in 0usize..8) {
      let mut stack = MatrixStack::new(16, NewState::PROJECTION);

      for _ in 0..pushes {
        stack.push().unwrap();
      }

      for _ in 0..pushes {
        stack.pop().unwrap();
      }

      prop_assert_eq!(stack.pop(), Err(GlError::StackUnderflow));
      prop_assert_eq!(stack.depth(), 0);
    }
  }
}
