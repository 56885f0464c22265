//! Shared data structures for the referee
//!
//! - [`Mode`]: the closed set of game phases, parsed and validated at the boundary
//! - [`Frame`] / [`GrayFrame`]: owned rasters flowing from the frame source to
//!   the motion classifier and the renderer

mod frame;
mod mode;

pub use frame::*;
pub use mode::*;
