//! Detected regions and the rectangle geometry they carry

use appearance::{CropRect, ObjectType};
use std::fmt;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox<T = f32> {
    pub xmin: T,
    pub ymin: T,
    pub xmax: T,
    pub ymax: T,
}

impl Bbox<f32> {
    pub fn new(xmin: f32, ymin: f32, xmax: f32, ymax: f32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Build from top-left corner plus size
    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> f32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f32 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center_x(&self) -> f32 {
        (self.xmin + self.xmax) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.ymin + self.ymax) / 2.0
    }

    /// True when the box lies entirely outside a `frame_width` x
    /// `frame_height` frame
    pub fn is_outside_frame(&self, frame_width: f32, frame_height: f32) -> bool {
        self.xmax < 0.0 || self.ymax < 0.0 || self.xmin > frame_width || self.ymin > frame_height
    }

    /// Clamp into pixel space for appearance extraction
    pub fn to_crop(&self, frame_width: u32, frame_height: u32) -> Option<CropRect> {
        CropRect::clamped(self.xmin, self.ymin, self.xmax, self.ymax, frame_width, frame_height)
    }
}

impl<T: fmt::Display> fmt::Display for Bbox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bbox({}, {}, {}, {})",
            self.xmin, self.ymin, self.xmax, self.ymax
        )
    }
}

/// Calculate IoU between two bounding boxes
pub fn calculate_iou(bbox1: &Bbox<f32>, bbox2: &Bbox<f32>) -> f32 {
    let x1 = bbox1.xmin.max(bbox2.xmin);
    let y1 = bbox1.ymin.max(bbox2.ymin);
    let x2 = bbox1.xmax.min(bbox2.xmax);
    let y2 = bbox1.ymax.min(bbox2.ymax);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let intersection = (x2 - x1) * (y2 - y1);
    let union = bbox1.area() + bbox2.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Oriented rectangle: center, full size, rotation in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    pub cx: f32,
    pub cy: f32,
    pub width: f32,
    pub height: f32,
    pub angle_deg: f32,
}

impl RotatedRect {
    pub fn new(cx: f32, cy: f32, width: f32, height: f32, angle_deg: f32) -> Self {
        Self {
            cx,
            cy,
            width,
            height,
            angle_deg,
        }
    }

    /// Axis-aligned rectangle as a zero-angle rotated one
    pub fn from_bbox(bbox: &Bbox<f32>) -> Self {
        Self::new(bbox.center_x(), bbox.center_y(), bbox.width(), bbox.height(), 0.0)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.cx, self.cy)
    }
}

/// One detection in one frame
///
/// Immutable once constructed. `brect` is the axis-aligned footprint used
/// for IoU and cropping, `rrect` the oriented shape used for center
/// distances and gating.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub brect: Bbox<f32>,
    pub rrect: RotatedRect,
    pub object_type: ObjectType,
    pub confidence: f32,
}

impl Region {
    /// Region from an axis-aligned detection; the oriented rect is derived
    pub fn new(brect: Bbox<f32>, object_type: ObjectType, confidence: f32) -> Self {
        Self {
            rrect: RotatedRect::from_bbox(&brect),
            brect,
            object_type,
            confidence,
        }
    }

    /// Region carrying a detector-supplied oriented rectangle
    pub fn with_rrect(brect: Bbox<f32>, rrect: RotatedRect, object_type: ObjectType, confidence: f32) -> Self {
        Self {
            brect,
            rrect,
            object_type,
            confidence,
        }
    }
}
