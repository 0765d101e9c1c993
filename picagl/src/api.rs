//! GL entry points.
//!
//! Every entry point is a method of [`Gl`](crate::context::Gl), grouped by the state it touches.
//! Entry points validate, flush batched geometry if they are about to change state that already
//! batched draws depend on, mutate, and mark the matching dirty categories. Resolution of those
//! categories into GPU registers happens lazily, at the next draw or explicit
//! [`Gl::resolve_state`](crate::context::Gl::resolve_state).

mod buffer;
mod draw;
mod matrix;
mod program;
mod raster;
mod sampler;
mod texture;
