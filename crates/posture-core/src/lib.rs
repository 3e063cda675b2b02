//! # Posture-Core
//!
//! Core types and utilities for the real-time posture coaching pipeline:
//! landmark frames, calibration profiles, per-frame posture metrics and
//! the shared geometry used by calibration and analysis.

pub mod error;
pub mod geometry;
pub mod resolver;
pub mod types;

pub use error::{Error, Result};
pub use geometry::*;
pub use resolver::*;
pub use types::*;
