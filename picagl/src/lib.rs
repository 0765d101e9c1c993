//! # GL-like state tracking for the PICA200
//!
//! picagl keeps the state of a fixed-function, GL-flavoured API on the CPU side and turns it
//! into register writes for the PICA200, the GPU found in the Nintendo 3DS family. Applications
//! call GL entry points that only record state; when a draw needs it, the recorded changes are
//! resolved into the command buffer of the context, which is eventually handed over to the GPU.
//!
//! # Overview
//!
//! - [`registry::ContextRegistry`] owns the backend and every context. It knows which context is
//!   current, parks the command buffer of a context another one replaces, and runs the
//!   suspend/resume protocol with the OS.
//! - [`context::Gl`] exposes the GL entry points of the current context. Failing entry points
//!   return their [`error::GlError`] and latch it on the context, where
//!   [`Gl::get_error`](context::Gl::get_error) picks it up.
//! - Objects shareable between contexts (buffers, samplers, textures, programs and uniform
//!   values) live in a [`context::SharedState`] referenced by every context of a share group.
//! - Every mutator marks categories of a [`state::NewState`] bitmask. State resolution walks that
//!   bitmask in a fixed order (program, transform, texturing, rasterization, framebuffer) and only
//!   re-emits what changed. Register writes that would not change a register are skipped.
//!
//! # Backends
//!
//! Everything that touches hardware is behind the [`backend::Backend`] traits: command runs and
//! memory fills, VRAM allocation, shader binaries, texture tiling and the OS lifecycle signals.
//! The `picagl-pica` crate implements them with a simulated PICA200.
//!
//! # Feature flags
//!
//! None so far.

mod api;
pub mod arena;
pub mod backend;
pub mod buffer;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod linear;
pub mod matrix;
pub mod name_table;
pub mod program;
pub mod raster;
pub mod registry;
pub mod regs;
mod resolve;
pub mod sampler;
pub mod state;
pub mod texture;

pub use crate::context::{ContextId, Gl};
pub use crate::error::{GlError, GlResult};
pub use crate::registry::{ContextError, ContextRegistry, Lifecycle};
