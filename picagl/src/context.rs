//! Rendering contexts.
//!
//! A [`Context`] holds the whole mutable GL state of one rendering context: matrix stacks, buffer
//! and texture bindings, rasterization state, the dirty-state bitmask and the command buffer
//! state resolution writes to. Objects that can be shared between contexts live in a
//! [`SharedState`] block, reference-counted by every context of a share group.
//!
//! Contexts are driven through [`Gl`], which borrows a context along with the backend. They are
//! obtained from a [`ContextRegistry`](crate::registry::ContextRegistry), which keeps track of
//! the current context.
//!
//! # On context and threads
//!
//! Contexts are `!Send` and `!Sync`: only one thread ever touches context state. The GPU is the
//! only other party; it receives finalized runs and answers with [`Fence`]s.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use log::{debug, warn};

use crate::backend::{Backend, Fence, Surface};
use crate::buffer::{BufferBindings, BufferStore};
use crate::command::{CommandBuffer, RegisterShadow};
use crate::config::ContextConfig;
use crate::error::{GlError, GlResult};
use crate::matrix::MatrixStacks;
use crate::program::ProgramStore;
use crate::raster::RasterState;
use crate::sampler::SamplerStore;
use crate::state::NewState;
use crate::texture::{TextureStore, TextureUnit};

/// Identifier of a context in its registry.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ContextId(pub(crate) u32);

impl fmt::Display for ContextId {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "context #{}", self.0)
  }
}

/// State shared by the contexts of a share group.
#[derive(Debug, Default)]
pub struct SharedState {
  pub buffers: BufferStore,
  pub samplers: SamplerStore,
  pub textures: TextureStore,
  pub programs: ProgramStore,
}

impl SharedState {
  pub fn new() -> Self {
    Self::default()
  }
}

/// Color and depth/stencil surfaces a context renders to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Framebuffer {
  /// RGBA8 color buffer.
  pub color: Surface,
  /// D24S8 depth/stencil buffer.
  pub depth: Surface,
}

/// A rendering context.
#[derive(Debug)]
pub struct Context {
  // !Send and !Sync
  _a: PhantomData<*const ()>,
  id: ContextId,
  config: ContextConfig,
  pub(crate) shared: Rc<RefCell<SharedState>>,
  pub(crate) new_state: NewState,
  error: Option<GlError>,
  pub(crate) matrices: MatrixStacks,
  pub(crate) buffers: BufferBindings,
  pub(crate) units: Vec<TextureUnit>,
  pub(crate) active_unit: usize,
  pub(crate) raster: RasterState,
  pub(crate) framebuffer: Framebuffer,
  pub(crate) cmd: CommandBuffer,
  pub(crate) shadow: RegisterShadow,
  /// Last dispatched run, not waited on yet.
  pub(crate) in_flight: Option<Fence>,
  /// Cursor captured when the context stopped being current.
  pub(crate) parked: Option<usize>,
}

impl Context {
  pub(crate) fn new(
    id: ContextId,
    config: ContextConfig,
    shared: Rc<RefCell<SharedState>>,
    framebuffer: Framebuffer,
  ) -> Self {
    let limits = config.limits;
    let [width, height] = config.screen.size();

    let (buffers, units) = {
      let mut shared = shared.borrow_mut();
      let buffers = shared.buffers.new_bindings(limits.vertex_attribs);
      let units = shared.textures.new_units(limits.texture_units);
      (buffers, units)
    };

    Context {
      _a: PhantomData,
      id,
      cmd: CommandBuffer::new(config.command_buffer_words),
      config,
      shared,
      new_state: NewState::all(),
      error: None,
      matrices: MatrixStacks::new(&limits),
      buffers,
      units,
      active_unit: 0,
      raster: RasterState::new(width as u32, height as u32),
      framebuffer,
      shadow: RegisterShadow::new(),
      in_flight: None,
      parked: None,
    }
  }

  pub fn id(&self) -> ContextId {
    self.id
  }

  pub fn config(&self) -> &ContextConfig {
    &self.config
  }

  /// Shared state of the context share group.
  pub fn shared(&self) -> &Rc<RefCell<SharedState>> {
    &self.shared
  }

  /// Categories changed since the last state resolution.
  pub fn new_state(&self) -> NewState {
    self.new_state
  }

  pub fn matrices(&self) -> &MatrixStacks {
    &self.matrices
  }

  pub fn buffer_bindings(&self) -> &BufferBindings {
    &self.buffers
  }

  pub fn texture_units(&self) -> &[TextureUnit] {
    &self.units
  }

  pub fn active_texture_unit(&self) -> usize {
    self.active_unit
  }

  pub fn raster(&self) -> &RasterState {
    &self.raster
  }

  pub fn framebuffer(&self) -> &Framebuffer {
    &self.framebuffer
  }

  /// Command buffer of the context.
  pub fn command_buffer(&self) -> &CommandBuffer {
    &self.cmd
  }

  /// Cursor captured when the context was switched away or suspended.
  pub fn parked_cursor(&self) -> Option<usize> {
    self.parked
  }

  /// Latch an error; only the first one is kept until polled.
  pub(crate) fn latch<T>(&mut self, result: GlResult<T>) -> GlResult<T> {
    if let Err(e) = result {
      warn!("{}: {} latched", self.id, e);

      if self.error.is_none() {
        self.error = Some(e);
      }
    }

    result
  }

  /// Finalize pending commands and hand them to the GPU, without waiting.
  ///
  /// The previous run is waited on first.
  pub(crate) fn dispatch<B>(&mut self, backend: &mut B) -> GlResult<()>
  where
    B: ?Sized + Backend,
  {
    if let Some(fence) = self.in_flight.take() {
      fence.wait()?;
    }

    if self.cmd.is_empty() {
      return Ok(());
    }

    self.cmd.finalize()?;
    let run = self.cmd.take_run();
    log::debug!("{}: dispatching {} words", self.id, run.len());
    self.in_flight = Some(backend.dispatch(run)?);

    Ok(())
  }

  /// Append the records of `emit` as a whole.
  ///
  /// On failure, whatever `emit` appended is dropped and every state category will be emitted
  /// again. When the records did not fit, the pending commands are dispatched first and `emit`
  /// gets a second chance on the emptied buffer.
  pub(crate) fn emit_all<B, F>(&mut self, backend: &mut B, mut emit: F) -> GlResult<()>
  where
    B: ?Sized + Backend,
    F: FnMut(&mut Context, &mut B) -> GlResult<()>,
  {
    let start = self.cmd.cursor();

    let e = match emit(&mut *self, &mut *backend) {
      Ok(()) => return Ok(()),
      Err(e) => e,
    };

    self.rollback(start);

    if e != GlError::OutOfMemory || start == 0 {
      return Err(e);
    }

    debug!("{}: command buffer full, dispatching {} words early", self.id, start);
    self.dispatch(&mut *backend)?;

    match emit(&mut *self, &mut *backend) {
      Ok(()) => Ok(()),
      Err(e) => {
        self.rollback(0);
        Err(e)
      }
    }
  }

  fn rollback(&mut self, cursor: usize) {
    self.cmd.truncate(cursor);
    self.invalidate_gpu_state();
  }

  /// Forget everything known about the GPU registers.
  ///
  /// Every state category is re-emitted at the next resolution, uniforms included.
  pub(crate) fn invalidate_gpu_state(&mut self) {
    self.shadow.invalidate();
    self.new_state = NewState::all();
    self.shared.borrow_mut().programs.uniforms.mark_all_changed();
  }

  /// Wait for the last dispatched run.
  pub(crate) fn wait_idle(&mut self) -> GlResult<()> {
    match self.in_flight.take() {
      Some(fence) => Ok(fence.wait()?),
      None => Ok(()),
    }
  }
}

impl Drop for Context {
  fn drop(&mut self) {
    if let Ok(mut shared) = self.shared.try_borrow_mut() {
      let shared = &mut *shared;
      shared.buffers.release_bindings(&mut self.buffers);
      shared.textures.release_units(&mut self.units);

      for unit in &mut self.units {
        shared.samplers.bind_slot(&mut unit.sampler, None);
      }
    }
  }
}

/// GL entry points of a context.
///
/// Every operation validates its arguments before mutating anything. A rejected operation leaves
/// the state untouched, latches its error on the context (see [`Gl::get_error`]) and returns it.
pub struct Gl<'a, B>
where
  B: ?Sized,
{
  pub(crate) ctx: &'a mut Context,
  pub(crate) backend: &'a mut B,
}

impl<'a, B> Gl<'a, B>
where
  B: ?Sized + Backend,
{
  pub(crate) fn new(ctx: &'a mut Context, backend: &'a mut B) -> Self {
    Gl { ctx, backend }
  }

  pub fn context(&self) -> &Context {
    &*self.ctx
  }

  pub fn backend(&mut self) -> &mut B {
    &mut *self.backend
  }

  /// Poll and clear the latched error.
  pub fn get_error(&mut self) -> Option<GlError> {
    self.ctx.error.take()
  }

  pub(crate) fn latch<T>(&mut self, result: GlResult<T>) -> GlResult<T> {
    self.ctx.latch(result)
  }

  /// Flush batched geometry before a state change, then mark `dirty`.
  pub(crate) fn flush_vertices(&mut self, dirty: NewState) {
    self.backend.flush_vertices();
    self.ctx.new_state |= dirty;
  }

  /// Mark state as changed without flushing.
  pub(crate) fn touch(&mut self, dirty: NewState) {
    self.ctx.new_state |= dirty;
  }

  /// Dispatch pending commands without waiting for them (`glFlush`).
  pub fn flush(&mut self) -> GlResult<()> {
    let r = self.ctx.dispatch(&mut *self.backend);
    self.latch(r)
  }

  /// Dispatch pending commands and wait for the GPU to run them (`glFinish`).
  pub fn finish(&mut self) -> GlResult<()> {
    let r = self.ctx.dispatch(&mut *self.backend).and_then(|_| self.ctx.wait_idle());
    self.latch(r)
  }
}
