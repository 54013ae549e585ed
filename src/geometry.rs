//! Box geometry shared by the classifier and the live element tree.
//!
//! The classifier reports boxes in screenshot pixels while the browser reports
//! element rectangles in logical (CSS) pixels. [`DensityMultiplier`] converts
//! between the two; the scoring helpers assume both boxes already live in the
//! same space.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Axis-aligned rectangle with its origin in the upper left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Center point of the box.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Whether `(x, y)` lies strictly inside the box; points on an edge are outside.
    pub fn contains_strict(&self, x: f64, y: f64) -> bool {
        x > self.x && x < self.x + self.width && y > self.y && y < self.y + self.height
    }

    /// Convert a classifier-space box into logical space.
    pub fn normalize(&self, multiplier: DensityMultiplier) -> BoundingBox {
        normalize(*self, multiplier)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("density multiplier must be a finite positive number, got {0}")]
    InvalidMultiplier(f64),
    #[error("viewport width must be positive, got {0}")]
    InvalidViewport(f64),
    #[error("screenshot is not a PNG image")]
    NotPng,
}

/// Ratio of screenshot pixels to logical viewport pixels.
///
/// Always finite and strictly positive; construction is the only place that
/// can fail, so per-call normalisation is infallible.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DensityMultiplier(f64);

impl DensityMultiplier {
    pub fn new(value: f64) -> Result<Self, GeometryError> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(GeometryError::InvalidMultiplier(value))
        }
    }

    /// Derive the multiplier from a screenshot width and the logical viewport width.
    pub fn from_widths(screenshot_width: u32, viewport_width: f64) -> Result<Self, GeometryError> {
        if !(viewport_width.is_finite() && viewport_width > 0.0) {
            return Err(GeometryError::InvalidViewport(viewport_width));
        }
        Self::new(f64::from(screenshot_width) / viewport_width)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for DensityMultiplier {
    fn default() -> Self {
        Self(1.0)
    }
}

/// Divide every component of `bbox` by the multiplier.
pub fn normalize(bbox: BoundingBox, multiplier: DensityMultiplier) -> BoundingBox {
    let m = multiplier.value();
    BoundingBox {
        x: bbox.x / m,
        y: bbox.y / m,
        width: bbox.width / m,
        height: bbox.height / m,
    }
}

/// Area of the intersection rectangle, `0` when the boxes do not touch.
pub fn overlap_area(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let dx = (a.x + a.width).min(b.x + b.width) - a.x.max(b.x);
    let dy = (a.y + a.height).min(b.y + b.height) - a.y.max(b.y);
    if dx >= 0.0 && dy >= 0.0 { dx * dy } else { 0.0 }
}

/// Intersection over union. Degenerate pairs (zero union) score `0`.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let overlap = overlap_area(a, b);
    if overlap <= 0.0 {
        return 0.0;
    }
    let union = a.area() + b.area() - overlap;
    if union <= 0.0 { 0.0 } else { overlap / union }
}

/// True iff the center of `target` falls strictly inside `candidate`.
pub fn center_contained(target: &BoundingBox, candidate: &BoundingBox) -> bool {
    let (cx, cy) = target.center();
    candidate.contains_strict(cx, cy)
}

/// Read the pixel width out of a PNG's IHDR chunk.
pub fn png_width(bytes: &[u8]) -> Result<u32, GeometryError> {
    const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    if bytes.len() < 24 || bytes[..8] != SIGNATURE || &bytes[12..16] != b"IHDR" {
        return Err(GeometryError::NotPng);
    }
    Ok(u32::from_be_bytes([bytes[16], bytes[17], bytes[18], bytes[19]]))
}
