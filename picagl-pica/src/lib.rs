//! PICA200 backend for [picagl](https://crates.io/crates/picagl).
//!
//! This crate provides:
//!
//! - [`dvlb`], a loader for the DVLB shader binaries produced by the PICA200 shader assemblers.
//! - [`tiling`], the conversion of linear images into the 8×8 Morton-tiled layout textures are
//!   sampled from.
//! - With the `sim` feature (enabled by default), [`Pica200`], a backend type implementing every
//!   picagl backend trait on top of a simulated GPU. The simulation runs on its own thread and
//!   executes command runs, memory fills and display transfers asynchronously, the way the
//!   hardware does, which makes it suitable to test applications without a console.

pub mod dvlb;
#[cfg(feature = "sim")]
pub mod sim;
pub mod tiling;

#[cfg(feature = "sim")]
pub use sim::Pica200;
