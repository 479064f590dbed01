//! Normalized box geometry and pixel conversions.
//!
//! Every stored box lives on a resolution-independent 0-1000 scale on both
//! axes. Pixel coordinates only exist at the edges, where pointer events come
//! in and overlays go out, and are always relative to the displayed image.

use serde::{Deserialize, Serialize};

/// Upper bound of the normalized coordinate scale.
pub const NORMALIZED_SCALE: f32 = 1000.0;

/// Default minimum box extent (1% of the scale).
pub const DEFAULT_MIN_BOX_SIZE: f32 = 10.0;

/// A point in pixel space, relative to the top-left of the displayed image.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Size of the displayed image surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
        }
    }

    /// Clamp a pixel point into `[0, width] x [0, height]`.
    pub fn clamp_point(self, point: Point) -> Point {
        Point {
            x: clamp_offset(point.x, self.width),
            y: clamp_offset(point.y, self.height),
        }
    }
}

/// A point on the normalized 0-1000 scale.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NormalizedPoint {
    pub x: f32,
    pub y: f32,
}

impl NormalizedPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in pixel space, used to position overlays.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Bounding box on the 0-1000 scale.
///
/// Serialized as `[ymin, xmin, ymax, xmax]`, the layout shared with the
/// detector and downstream exporters. Deserialization goes through
/// [`NormalizedBox::from_corners`], so stored boxes are always ordered and
/// in range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct NormalizedBox {
    pub y_min: f32,
    pub x_min: f32,
    pub y_max: f32,
    pub x_max: f32,
}

impl NormalizedBox {
    /// Build a box from raw edges, clamping each into range and ordering them.
    pub fn from_corners(y_min: f32, x_min: f32, y_max: f32, x_max: f32) -> Self {
        box_from_points(
            NormalizedPoint::new(x_min, y_min),
            NormalizedPoint::new(x_max, y_max),
        )
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center(&self) -> NormalizedPoint {
        NormalizedPoint {
            x: self.x_min + self.width() / 2.0,
            y: self.y_min + self.height() / 2.0,
        }
    }

    /// True when either side is shorter than `min_size` normalized units.
    pub fn is_degenerate(&self, min_size: f32) -> bool {
        self.width() < min_size || self.height() < min_size
    }

    /// Edges inside the 0-1000 scale, ordered, and enclosing a non-zero area.
    pub fn is_well_formed(&self) -> bool {
        [self.y_min, self.x_min, self.y_max, self.x_max]
            .iter()
            .all(|v| (0.0..=NORMALIZED_SCALE).contains(v))
            && self.y_min < self.y_max
            && self.x_min < self.x_max
    }
}

impl From<[f32; 4]> for NormalizedBox {
    fn from([y_min, x_min, y_max, x_max]: [f32; 4]) -> Self {
        Self::from_corners(y_min, x_min, y_max, x_max)
    }
}

impl From<NormalizedBox> for [f32; 4] {
    fn from(b: NormalizedBox) -> Self {
        [b.y_min, b.x_min, b.y_max, b.x_max]
    }
}

fn clamp_offset(offset: f32, extent: f32) -> f32 {
    if !offset.is_finite() || extent <= 0.0 {
        return 0.0;
    }
    offset.clamp(0.0, extent)
}

fn clamp_normalized(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, NORMALIZED_SCALE)
}

/// Map a pixel point on the displayed image onto the 0-1000 scale.
///
/// The point is clamped to the image first, so pointer positions outside the
/// image never produce out-of-range coordinates. A collapsed axis maps to 0.
pub fn pixel_to_normalized(point: Point, displayed: Size) -> NormalizedPoint {
    let clamped = displayed.clamp_point(point);
    NormalizedPoint {
        x: scale_to_normalized(clamped.x, displayed.width),
        y: scale_to_normalized(clamped.y, displayed.height),
    }
}

fn scale_to_normalized(offset: f32, extent: f32) -> f32 {
    if extent <= 0.0 {
        return 0.0;
    }
    offset / extent * NORMALIZED_SCALE
}

/// Inverse of [`pixel_to_normalized`] for a single point.
pub fn normalized_point_to_pixel(point: NormalizedPoint, displayed: Size) -> Point {
    Point {
        x: point.x / NORMALIZED_SCALE * displayed.width,
        y: point.y / NORMALIZED_SCALE * displayed.height,
    }
}

/// Pixel rectangle covering `bbox` on an image displayed at `displayed`.
pub fn normalized_to_pixel(bbox: &NormalizedBox, displayed: Size) -> PixelRect {
    let top_left = normalized_point_to_pixel(NormalizedPoint::new(bbox.x_min, bbox.y_min), displayed);
    let bottom_right = normalized_point_to_pixel(NormalizedPoint::new(bbox.x_max, bbox.y_max), displayed);
    PixelRect {
        x: top_left.x,
        y: top_left.y,
        width: bottom_right.x - top_left.x,
        height: bottom_right.y - top_left.y,
    }
}

/// Box spanned by two corner points, ordered regardless of drag direction.
pub fn box_from_points(p1: NormalizedPoint, p2: NormalizedPoint) -> NormalizedBox {
    let (x1, y1) = (clamp_normalized(p1.x), clamp_normalized(p1.y));
    let (x2, y2) = (clamp_normalized(p2.x), clamp_normalized(p2.y));
    NormalizedBox {
        y_min: y1.min(y2),
        x_min: x1.min(x2),
        y_max: y1.max(y2),
        x_max: x1.max(x2),
    }
}

/// Intersection over union of two boxes; 0 when disjoint or both empty.
pub fn iou(a: &NormalizedBox, b: &NormalizedBox) -> f32 {
    let top = a.y_min.max(b.y_min);
    let left = a.x_min.max(b.x_min);
    let bottom = a.y_max.min(b.y_max);
    let right = a.x_max.min(b.x_max);

    if right < left || bottom < top {
        return 0.0;
    }

    let intersection = (right - left) * (bottom - top);
    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}
