//! Motion Classification
//!
//! ## Pipeline
//!
//! ```text
//! previous gray ─┐
//!                ├─ Gaussian smooth (21×21) ─ |a - b| ─ > cutoff ─ dilate ×2 ─ components ─ area > T ?
//! current gray  ─┘
//! ```
//!
//! [`MotionClassifier`] is a pure function of the two frames and the
//! threshold. [`MotionDetector`] wraps it with the baseline bookkeeping the
//! analysis loop needs (first-frame rule, reset on leaving RED).

pub mod blur;
mod classifier;
pub mod components;
pub mod morphology;

pub use classifier::{
    MotionClassifier, MotionDetector, MotionError, MotionParams, MotionVerdict, Observation,
};
pub use components::Region;
