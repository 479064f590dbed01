//! Thumbnail crop math for a single annotation.

use crate::geometry::{NORMALIZED_SCALE, NormalizedBox, PixelRect, Size};

/// Default context ratio: the crop is 1.5x the box, i.e. a 50% margin.
pub const DEFAULT_CONTEXT_RATIO: f32 = 1.5;

/// Smallest extent used when deriving scale factors, in normalized units.
const MIN_CROP_EXTENT: f32 = 1.0;

/// Source rectangle of a thumbnail, on the normalized scale.
///
/// The window may extend past the page edges for boxes near a border; the
/// renderer shows blank margin there. Each axis is scaled independently, so
/// the thumbnail keeps the box's aspect ratio rather than letterboxing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropWindow {
    pub x_min: f32,
    pub y_min: f32,
    pub width: f32,
    pub height: f32,
    /// Magnification that makes the window fill the thumbnail horizontally.
    pub scale_x: f32,
    pub scale_y: f32,
}

impl CropWindow {
    pub fn center_x(&self) -> f32 {
        self.x_min + self.width / 2.0
    }

    pub fn center_y(&self) -> f32 {
        self.y_min + self.height / 2.0
    }

    /// Magnification that fits the whole window in both directions.
    pub fn uniform_scale(&self) -> f32 {
        self.scale_x.min(self.scale_y)
    }

    /// The window in pixel coordinates of an image of size `image`.
    pub fn source_rect(&self, image: Size) -> PixelRect {
        PixelRect {
            x: self.x_min / NORMALIZED_SCALE * image.width,
            y: self.y_min / NORMALIZED_SCALE * image.height,
            width: self.width / NORMALIZED_SCALE * image.width,
            height: self.height / NORMALIZED_SCALE * image.height,
        }
    }
}

/// Crop window centered on `bbox`, `ratio` times its size on each axis.
///
/// Non-finite or non-positive ratios fall back to [`DEFAULT_CONTEXT_RATIO`].
pub fn crop_window(bbox: &NormalizedBox, ratio: f32) -> CropWindow {
    let ratio = if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        DEFAULT_CONTEXT_RATIO
    };

    let center = bbox.center();
    let width = bbox.width() * ratio;
    let height = bbox.height() * ratio;

    CropWindow {
        x_min: center.x - width / 2.0,
        y_min: center.y - height / 2.0,
        width,
        height,
        scale_x: NORMALIZED_SCALE / width.max(MIN_CROP_EXTENT),
        scale_y: NORMALIZED_SCALE / height.max(MIN_CROP_EXTENT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    #[test]
    fn window_is_centered_with_margin() {
        let bbox = NormalizedBox::from_corners(100.0, 200.0, 300.0, 400.0);
        let w = crop_window(&bbox, DEFAULT_CONTEXT_RATIO);
        assert!((w.width - 300.0).abs() < EPS);
        assert!((w.height - 300.0).abs() < EPS);
        assert!((w.center_x() - 300.0).abs() < EPS);
        assert!((w.center_y() - 200.0).abs() < EPS);
        assert!((w.x_min - 150.0).abs() < EPS);
        assert!((w.y_min - 50.0).abs() < EPS);
    }

    #[test]
    fn axes_scale_independently() {
        let bbox = NormalizedBox::from_corners(0.0, 0.0, 50.0, 200.0);
        let w = crop_window(&bbox, 2.0);
        assert!((w.scale_x - 2.5).abs() < EPS);
        assert!((w.scale_y - 10.0).abs() < EPS);
        assert!((w.uniform_scale() - 2.5).abs() < EPS);
    }

    #[test]
    fn zero_extent_never_divides_by_zero() {
        let line = NormalizedBox::from_corners(500.0, 100.0, 500.0, 300.0);
        let w = crop_window(&line, DEFAULT_CONTEXT_RATIO);
        assert!(w.scale_y.is_finite());
        assert_eq!(w.scale_y, NORMALIZED_SCALE / MIN_CROP_EXTENT);
    }

    #[test]
    fn invalid_ratio_uses_default() {
        let bbox = NormalizedBox::from_corners(0.0, 0.0, 100.0, 100.0);
        assert_eq!(crop_window(&bbox, f32::NAN), crop_window(&bbox, DEFAULT_CONTEXT_RATIO));
        assert_eq!(crop_window(&bbox, -2.0), crop_window(&bbox, DEFAULT_CONTEXT_RATIO));
    }

    #[test]
    fn source_rect_maps_to_image_pixels() {
        let bbox = NormalizedBox::from_corners(400.0, 400.0, 600.0, 600.0);
        let rect = crop_window(&bbox, 1.0).source_rect(Size::new(2000.0, 1000.0));
        assert!((rect.x - 800.0).abs() < EPS);
        assert!((rect.y - 400.0).abs() < EPS);
        assert!((rect.width - 400.0).abs() < EPS);
        assert!((rect.height - 200.0).abs() < EPS);
    }
}
