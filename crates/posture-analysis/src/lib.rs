//! # Posture-Analysis
//!
//! Real-time posture analysis over streamed body landmarks.
//!
//! ## Pipeline
//!
//! 1. **Calibration** - collect a short "sit normally" capture, score each
//!    frame's quality and derive a personalized baseline from the medians of
//!    the best frames
//! 2. **Metrics** - per-frame deviations from that baseline (head drop,
//!    shoulder asymmetry, slouch, neck tilt, screen distance)
//! 3. **Scoring** - dead zone, then a graduated penalty curve per dimension,
//!    combined as a weighted average on a 1-10 scale
//! 4. **Smoothing** - exponential moving average over recent raw scores
//! 5. **Feedback** - hysteresis-stabilized status and a sustained-bad-posture
//!    alert timer with a recovery gap
//!
//! Everything here is synchronous and owned by a single connection; frames
//! must be fed in arrival order.

pub mod alert;
pub mod analyzer;
pub mod calibration;
pub mod config;
pub mod features;
pub mod hysteresis;
pub mod scoring;
pub mod smoothing;

pub use alert::*;
pub use analyzer::*;
pub use calibration::*;
pub use config::*;
pub use features::*;
pub use hysteresis::*;
pub use scoring::*;
pub use smoothing::*;
