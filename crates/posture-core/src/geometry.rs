//! Geometric utilities shared by calibration and analysis.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Guards the angle denominator when two of the three points coincide
pub const ANGLE_EPSILON: f64 = 1e-6;

/// Offset used to build a point directly above a joint (image y grows downward)
pub const VERTICAL_REFERENCE_OFFSET: f64 = 0.1;

/// 2D point in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_nalgebra(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn from_nalgebra(p: Point2<f64>) -> Self {
        Self::new(p.x, p.y)
    }

    pub fn midpoint(&self, other: &Self) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Point `VERTICAL_REFERENCE_OFFSET` straight above this one
    pub fn above(&self) -> Self {
        Self::new(self.x, self.y - VERTICAL_REFERENCE_OFFSET)
    }
}

/// Angle at `b` formed by the segments b→a and b→c, in degrees [0, 180]
pub fn angle_at(a: Point2D, b: Point2D, c: Point2D) -> f64 {
    let ba: Vector2<f64> = a.to_nalgebra() - b.to_nalgebra();
    let bc: Vector2<f64> = c.to_nalgebra() - b.to_nalgebra();
    let cosine = ba.dot(&bc) / (ba.norm() * bc.norm() + ANGLE_EPSILON);
    cosine.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Median of a sample; the mean of the two middle values for even lengths
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Round half away from zero to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
