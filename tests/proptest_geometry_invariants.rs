//! Property-based invariant tests for geometry and viewport math.
//!
//! 1. Pixel -> normalized -> pixel round-trips inside the image
//! 2. Pixel drag rectangle -> normalized box -> pixel rectangle round-trips
//! 3. Normalized coordinates never leave [0, 1000], even off-image
//! 4. box_from_points is ordered for any drag direction
//! 5. Zoom never leaves [0.5, 3.0] under any button sequence
//! 6. Crop windows are centered on the box with finite scale

use plan_review::crop::crop_window;
use plan_review::geometry::{
    NormalizedPoint, Point, Size, box_from_points, normalized_point_to_pixel, normalized_to_pixel,
    pixel_to_normalized,
};
use plan_review::viewport::Viewport;
use proptest::prelude::*;

// ── Strategies ──────────────────────────────────────────────────────────

fn size_strategy() -> impl Strategy<Value = Size> {
    (1.0f32..5000.0, 1.0f32..5000.0).prop_map(|(w, h)| Size::new(w, h))
}

fn point_within(size: Size) -> impl Strategy<Value = Point> {
    (0.0f32..=size.width, 0.0f32..=size.height).prop_map(|(x, y)| Point::new(x, y))
}

/// A size together with a point inside it.
fn point_in_size() -> impl Strategy<Value = (Size, Point)> {
    size_strategy().prop_flat_map(|size| (Just(size), point_within(size)))
}

/// A size together with two drag corners inside it.
fn drag_in_size() -> impl Strategy<Value = (Size, Point, Point)> {
    size_strategy().prop_flat_map(|size| (Just(size), point_within(size), point_within(size)))
}

fn normalized_point() -> impl Strategy<Value = NormalizedPoint> {
    (0.0f32..=1000.0, 0.0f32..=1000.0).prop_map(|(x, y)| NormalizedPoint::new(x, y))
}

#[derive(Debug, Clone, Copy)]
enum ZoomOp {
    In,
    Out,
    Reset,
}

fn zoom_op() -> impl Strategy<Value = ZoomOp> {
    prop_oneof![Just(ZoomOp::In), Just(ZoomOp::Out), Just(ZoomOp::Reset)]
}

proptest! {
    #[test]
    fn pixel_round_trip_within_tolerance((size, p) in point_in_size()) {
        let back = normalized_point_to_pixel(pixel_to_normalized(p, size), size);
        let tol_x = size.width * 1e-5 + 1e-3;
        let tol_y = size.height * 1e-5 + 1e-3;
        prop_assert!((back.x - p.x).abs() <= tol_x, "x: {} vs {}", back.x, p.x);
        prop_assert!((back.y - p.y).abs() <= tol_y, "y: {} vs {}", back.y, p.y);
    }

    #[test]
    fn drag_rectangle_round_trips_through_normalized_box((size, a, b) in drag_in_size()) {
        let bbox = box_from_points(pixel_to_normalized(a, size), pixel_to_normalized(b, size));
        let rect = normalized_to_pixel(&bbox, size);
        let tol_x = size.width * 2e-5 + 1e-3;
        let tol_y = size.height * 2e-5 + 1e-3;
        prop_assert!((rect.x - a.x.min(b.x)).abs() <= tol_x, "x: {} vs {}", rect.x, a.x.min(b.x));
        prop_assert!((rect.y - a.y.min(b.y)).abs() <= tol_y, "y: {} vs {}", rect.y, a.y.min(b.y));
        prop_assert!((rect.width - (a.x - b.x).abs()).abs() <= tol_x, "width: {}", rect.width);
        prop_assert!((rect.height - (a.y - b.y).abs()).abs() <= tol_y, "height: {}", rect.height);
    }

    #[test]
    fn off_image_points_stay_in_range(size in size_strategy(), x in -1.0e5f32..1.0e5, y in -1.0e5f32..1.0e5) {
        let n = pixel_to_normalized(Point::new(x, y), size);
        prop_assert!((0.0..=1000.0).contains(&n.x));
        prop_assert!((0.0..=1000.0).contains(&n.y));
    }

    #[test]
    fn box_from_points_is_always_ordered(a in normalized_point(), b in normalized_point()) {
        let forward = box_from_points(a, b);
        let backward = box_from_points(b, a);
        prop_assert!(forward.y_min <= forward.y_max);
        prop_assert!(forward.x_min <= forward.x_max);
        prop_assert_eq!(forward, backward);
    }

    #[test]
    fn zoom_stays_clamped(ops in prop::collection::vec(zoom_op(), 0..64)) {
        let mut vp = Viewport::new(1);
        for op in ops {
            match op {
                ZoomOp::In => { vp.zoom_in(); }
                ZoomOp::Out => { vp.zoom_out(); }
                ZoomOp::Reset => vp.reset_zoom(),
            }
            prop_assert!((0.5..=3.0).contains(&vp.zoom()));
        }
    }

    #[test]
    fn crop_is_centered_and_finite(a in normalized_point(), b in normalized_point(), ratio in 0.1f32..5.0) {
        let bbox = box_from_points(a, b);
        let window = crop_window(&bbox, ratio);
        let center = bbox.center();
        prop_assert!((window.center_x() - center.x).abs() < 1e-2);
        prop_assert!((window.center_y() - center.y).abs() < 1e-2);
        prop_assert!(window.scale_x.is_finite() && window.scale_x > 0.0);
        prop_assert!(window.scale_y.is_finite() && window.scale_y > 0.0);
    }
}

#[test]
fn twenty_zoom_steps_hit_the_bounds_exactly() {
    let mut vp = Viewport::new(1);
    for _ in 0..20 {
        vp.zoom_in();
    }
    assert_eq!(vp.zoom(), 3.0);

    let mut vp = Viewport::new(1);
    for _ in 0..20 {
        vp.zoom_out();
    }
    assert_eq!(vp.zoom(), 0.5);
}
