//! Shared types for appearance descriptors

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::embedding::Embedding;
use crate::histogram::Histogram;

/// Object class tag attached to detected regions
///
/// Plain numeric class id as produced by a detector; the tracker treats it
/// as an opaque tag and only compares ids for equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectType(pub u32);

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class_{}", self.0)
    }
}

/// A pixel-space crop, already clamped to the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Clamp a possibly out-of-bounds rectangle `[x0, y0, x1, y1]` to a
    /// `frame_width` x `frame_height` frame
    ///
    /// Returns `None` when the clamped rectangle is degenerate (zero area),
    /// which callers treat as "no crop, no descriptor".
    pub fn clamped(x0: f32, y0: f32, x1: f32, y1: f32, frame_width: u32, frame_height: u32) -> Option<Self> {
        let x0 = x0.max(0.0).min(frame_width as f32);
        let y0 = y0.max(0.0).min(frame_height as f32);
        let x1 = x1.max(0.0).min(frame_width as f32);
        let y1 = y1.max(0.0).min(frame_height as f32);

        let width = (x1 - x0) as u32;
        let height = (y1 - y0) as u32;
        if width == 0 || height == 0 {
            return None;
        }

        Some(Self {
            x: x0 as u32,
            y: y0 as u32,
            width,
            height,
        })
    }
}

/// Appearance descriptors for one detected region in one frame
///
/// Constructed once per frame by the extractors and consumed by the cost
/// fusion; the descriptors of the region that wins an association are merged
/// into the owning track. Either part may be absent: the histogram when the
/// histogram term is disabled or the crop is degenerate, the embedding when
/// no backend is registered for the region's class.
#[derive(Debug, Clone, Default)]
pub struct RegionEmbedding {
    pub hist: Option<Histogram>,
    pub embedding: Option<Embedding>,
}

impl RegionEmbedding {
    pub fn empty() -> Self {
        Self::default()
    }
}
