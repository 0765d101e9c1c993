//! Context registry and lifecycle coordination.
//!
//! A [`ContextRegistry`] owns the backend and every context created on it. It tracks which
//! context is current to the GPU, parks the command buffer of a context when another one takes
//! over, and coordinates with the OS when the process gets suspended and resumed.
//!
//! The lifecycle is a small state machine:
//!
//! ```text
//!              make_current(a)                suspend
//! NoContext ------------------> Current(a) -----------> Suspended(a)
//!     ^                          |     ^                    |
//!     | delete_context(a)        |     +--------------------+
//!     +--------------------------+            resume
//! ```
//!
//! While suspended, the GPU belongs to the OS; on resume, all GPU registers are considered lost
//! and the current context is fully re-emitted before control is given back.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error;
use std::fmt;
use std::rc::Rc;

use log::{debug, info};

use crate::backend::{Backend, BackendError, LifecycleEvent, Surface};
use crate::command::CommandBufferError;
use crate::config::ContextConfig;
use crate::context::{Context, ContextId, Framebuffer, Gl, SharedState};
use crate::error::GlError;
use crate::regs;
use crate::resolve;

/// Bytes per pixel of both the RGBA8 color buffers and the D24S8 depth buffers.
const FRAMEBUFFER_BPP: u8 = 4;

/// Which context the GPU works for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Lifecycle {
  NoContext,
  Current(ContextId),
  /// The OS took the GPU away from this context.
  Suspended(ContextId),
}

/// Errors of context management.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContextError {
  UnknownContext(ContextId),
  NoCurrentContext,
  /// The operation needs the context to be current.
  NotCurrent(ContextId),
  /// The process is suspended; the GPU cannot be used until resumed.
  Suspended,
  Backend(BackendError),
  /// A GL operation run on behalf of the registry failed.
  Gl(GlError),
}

impl fmt::Display for ContextError {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match *self {
      ContextError::UnknownContext(id) => write!(f, "unknown {}", id),
      ContextError::NoCurrentContext => f.write_str("no current context"),
      ContextError::NotCurrent(id) => write!(f, "{} is not current", id),
      ContextError::Suspended => f.write_str("suspended"),
      ContextError::Backend(ref e) => write!(f, "backend error: {}", e),
      ContextError::Gl(ref e) => write!(f, "GL error: {}", e),
    }
  }
}

impl error::Error for ContextError {
  fn source(&self) -> Option<&(dyn error::Error + 'static)> {
    match self {
      ContextError::Backend(e) => Some(e),
      ContextError::Gl(e) => Some(e),
      _ => None,
    }
  }
}

impl From<BackendError> for ContextError {
  fn from(e: BackendError) -> Self {
    ContextError::Backend(e)
  }
}

impl From<GlError> for ContextError {
  fn from(e: GlError) -> Self {
    ContextError::Gl(e)
  }
}

impl From<CommandBufferError> for ContextError {
  fn from(e: CommandBufferError) -> Self {
    ContextError::Backend(e.into())
  }
}

/// Owner of the backend and of every context.
#[derive(Debug)]
pub struct ContextRegistry<B> {
  backend: B,
  contexts: BTreeMap<ContextId, Context>,
  next_id: u32,
  lifecycle: Lifecycle,
  /// Global GPU initialization happens once per process.
  gpu_initialized: bool,
  /// Whether the OS lifecycle signals are subscribed to.
  hooked: bool,
  /// Context whose state the GPU registers hold.
  last_root: Option<ContextId>,
}

impl<B> ContextRegistry<B>
where
  B: Backend,
{
  pub fn new(backend: B) -> Self {
    ContextRegistry {
      backend,
      contexts: BTreeMap::new(),
      next_id: 1,
      lifecycle: Lifecycle::NoContext,
      gpu_initialized: false,
      hooked: false,
      last_root: None,
    }
  }

  pub fn backend(&self) -> &B {
    &self.backend
  }

  pub fn backend_mut(&mut self) -> &mut B {
    &mut self.backend
  }

  pub fn lifecycle(&self) -> Lifecycle {
    self.lifecycle
  }

  pub fn context(&self, id: ContextId) -> Option<&Context> {
    self.contexts.get(&id)
  }

  fn context_mut(&mut self, id: ContextId) -> Result<&mut Context, ContextError> {
    self.contexts.get_mut(&id).ok_or(ContextError::UnknownContext(id))
  }

  fn alloc_surface(&mut self, width: u16, height: u16) -> Result<Surface, BackendError> {
    let mut surface = Surface {
      addr: 0,
      width,
      height,
      bytes_per_pixel: FRAMEBUFFER_BPP,
    };

    surface.addr = self.backend.alloc_vram(surface.len())?;
    Ok(surface)
  }

  /// Create a context, sharing objects with `share` if given.
  pub fn create_context(
    &mut self,
    config: ContextConfig,
    share: Option<ContextId>,
  ) -> Result<ContextId, ContextError> {
    let shared = match share {
      Some(share) => Rc::clone(
        self
          .contexts
          .get(&share)
          .ok_or(ContextError::UnknownContext(share))?
          .shared(),
      ),

      None => Rc::new(RefCell::new(SharedState::new())),
    };

    let [width, height] = config.screen.framebuffer_size();
    let color = self.alloc_surface(width, height)?;
    let depth = match self.alloc_surface(width, height) {
      Ok(depth) => depth,
      Err(e) => {
        self.backend.free_vram(color.addr);
        return Err(e.into());
      }
    };

    let id = ContextId(self.next_id);
    self.next_id += 1;

    debug!("{}: created for the {:?} screen", id, config.screen);
    let ctx = Context::new(id, config, shared, Framebuffer { color, depth });
    self.contexts.insert(id, ctx);

    Ok(id)
  }

  /// Make a context current to the GPU.
  ///
  /// The command buffer of the previously current context is parked as is: its pending records
  /// are kept and emission resumes after them once it is made current again.
  pub fn make_current(&mut self, id: ContextId) -> Result<(), ContextError> {
    if !self.contexts.contains_key(&id) {
      return Err(ContextError::UnknownContext(id));
    }

    match self.lifecycle {
      Lifecycle::Suspended(_) => return Err(ContextError::Suspended),
      Lifecycle::Current(current) if current == id => return Ok(()),

      Lifecycle::Current(other) => {
        if let Some(ctx) = self.contexts.get_mut(&other) {
          ctx.parked = Some(ctx.cmd.cursor());
          debug!("{}: parked at word {}", other, ctx.cmd.cursor());
        }
      }

      Lifecycle::NoContext => (),
    }

    if !self.hooked {
      self.backend.hook()?;
      self.hooked = true;
    }

    let ctx = self.contexts.get_mut(&id).ok_or(ContextError::UnknownContext(id))?;

    if self.gpu_initialized {
      self.backend.set_command_buffer(&ctx.cmd)?;
    } else {
      info!("initializing the GPU");
      self.backend.init()?;
      self.backend.reset(&ctx.cmd)?;
      self.gpu_initialized = true;
    }

    if self.last_root != Some(id) {
      ctx.invalidate_gpu_state();
      self.last_root = Some(id);
    }

    ctx.parked = None;
    self.lifecycle = Lifecycle::Current(id);
    debug!("{}: made current", id);

    Ok(())
  }

  /// GL entry points of the current context.
  pub fn current(&mut self) -> Result<Gl<'_, B>, ContextError> {
    let id = match self.lifecycle {
      Lifecycle::Current(id) => id,
      Lifecycle::Suspended(_) => return Err(ContextError::Suspended),
      Lifecycle::NoContext => return Err(ContextError::NoCurrentContext),
    };

    let ctx = self.contexts.get_mut(&id).ok_or(ContextError::UnknownContext(id))?;
    Ok(Gl::new(ctx, &mut self.backend))
  }

  /// Delete a context.
  ///
  /// Deleting the current context leaves no context current and unsubscribes from the OS
  /// lifecycle signals. Shared objects die with the last context of their share group.
  pub fn delete_context(&mut self, id: ContextId) -> Result<(), ContextError> {
    let mut ctx = self.contexts.remove(&id).ok_or(ContextError::UnknownContext(id))?;

    match self.lifecycle {
      Lifecycle::Current(current) | Lifecycle::Suspended(current) if current == id => {
        self.lifecycle = Lifecycle::NoContext;

        if self.hooked {
          self.backend.unhook();
          self.hooked = false;
        }
      }

      _ => (),
    }

    if self.last_root == Some(id) {
      self.last_root = None;
    }

    let waited = ctx.wait_idle();

    let framebuffer = ctx.framebuffer;
    self.backend.free_vram(framebuffer.color.addr);
    self.backend.free_vram(framebuffer.depth.addr);

    let shared = Rc::clone(ctx.shared());
    drop(ctx);

    let last = Rc::strong_count(&shared) == 1;
    let mut shared = shared.borrow_mut();
    let mut vram = shared.textures.take_orphaned_vram();

    if last {
      debug!("{}: last context of its share group", id);
      vram.extend(shared.textures.resident_vram());

      for handle in shared.programs.handles() {
        self.backend.delete_program(handle);
      }
    }

    for addr in vram {
      self.backend.free_vram(addr);
    }

    debug!("{}: deleted", id);
    Ok(waited?)
  }

  /// Finish the frame of the current context and transfer it to its screen.
  ///
  /// Pending records are finalized and run, then the color buffer is copied to the screen. Both
  /// steps are waited on. Only the current context owns the GPU command buffer, so flushing any
  /// other context fails with [`ContextError::NotCurrent`].
  pub fn flush_context(&mut self, id: ContextId) -> Result<(), ContextError> {
    self.ensure_running()?;

    if !self.contexts.contains_key(&id) {
      return Err(ContextError::UnknownContext(id));
    }

    if self.lifecycle != Lifecycle::Current(id) {
      return Err(ContextError::NotCurrent(id));
    }

    let ctx = self.contexts.get_mut(&id).ok_or(ContextError::UnknownContext(id))?;

    ctx.emit_all(&mut self.backend, |ctx, _| {
      ctx.cmd.write(regs::FRAMEBUFFER_FLUSH, 1)?;
      ctx.cmd.write(regs::FRAMEBUFFER_INVALIDATE, 1)?;
      ctx.cmd.write(regs::EARLYDEPTH_CLEAR, 1)?;
      Ok(())
    })?;
    ctx.dispatch(&mut self.backend)?;
    ctx.wait_idle()?;

    let screen = ctx.config().screen;
    let color = ctx.framebuffer.color;
    self.backend.display_transfer(color, screen)?.wait()?;

    Ok(())
  }

  /// Present the last transferred image of a context, waiting for vertical blank.
  pub fn swap_buffers(&mut self, id: ContextId) -> Result<(), ContextError> {
    self.ensure_running()?;
    let screen = self.context_mut(id)?.config().screen;
    self.backend.present(screen)?.wait()?;

    Ok(())
  }

  fn ensure_running(&self) -> Result<(), ContextError> {
    match self.lifecycle {
      Lifecycle::Suspended(_) => Err(ContextError::Suspended),
      _ => Ok(()),
    }
  }

  /// Give the GPU up to the OS.
  ///
  /// Pending records are neither finalized nor dispatched; they stay in the command buffer and
  /// run after resumption.
  pub fn suspend(&mut self) -> Result<(), ContextError> {
    let id = match self.lifecycle {
      Lifecycle::Current(id) => id,
      Lifecycle::Suspended(_) => return Ok(()),
      Lifecycle::NoContext => return Err(ContextError::NoCurrentContext),
    };

    let ctx = self.context_mut(id)?;
    let cursor = ctx.cmd.cursor();
    ctx.parked = Some(cursor);
    self.lifecycle = Lifecycle::Suspended(id);
    info!("{}: suspended at word {}", id, cursor);

    Ok(())
  }

  /// Get the GPU back from the OS.
  ///
  /// The GPU is reset and every piece of state of the suspended context, shaders included, is
  /// emitted again after its parked records. That recovery run is waited on.
  pub fn resume(&mut self) -> Result<(), ContextError> {
    let id = match self.lifecycle {
      Lifecycle::Suspended(id) => id,
      Lifecycle::Current(_) => return Ok(()),
      Lifecycle::NoContext => return Err(ContextError::NoCurrentContext),
    };

    let ctx = self.contexts.get_mut(&id).ok_or(ContextError::UnknownContext(id))?;
    ctx.wait_idle()?;
    self.backend.reset(&ctx.cmd)?;

    ctx.invalidate_gpu_state();
    ctx.emit_all(&mut self.backend, resolve::resolve)?;
    ctx.dispatch(&mut self.backend)?;
    ctx.wait_idle()?;

    ctx.parked = None;
    self.lifecycle = Lifecycle::Current(id);
    self.last_root = Some(id);
    info!("{}: resumed", id);

    Ok(())
  }

  /// Handle the pending OS lifecycle signals.
  pub fn pump_lifecycle(&mut self) -> Result<(), ContextError> {
    while let Some(event) = self.backend.poll_lifecycle() {
      match event {
        LifecycleEvent::Suspend => self.suspend()?,
        LifecycleEvent::Resume => self.resume()?,
      }
    }

    Ok(())
  }
}
