//! Integration tests: viewport transform properties.

use ea_core::viewport::{MAX_SCALE, MIN_SCALE, on_wheel_with};
use ea_core::{
    CanvasConfig, HitTarget, ObjectId, Point, StageRef, Viewport, ZoomLimits, on_pan_end, on_wheel,
};

fn close(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < 1e-2 && (a.y - b.y).abs() < 1e-2
}

#[test]
fn world_point_under_pointer_is_fixed_across_zoom_sequences() {
    let pointers = [
        Point::new(0.0, 0.0),
        Point::new(412.0, 237.5),
        Point::new(-30.0, 900.0),
    ];
    let start = Viewport {
        scale: 0.75,
        x: 40.0,
        y: -12.0,
    };
    for pointer in pointers {
        let mut vp = start;
        for delta in [-120.0, -120.0, 53.0, -1.0, 240.0] {
            let world = vp.screen_to_world(pointer);
            vp = on_wheel(delta, Some(pointer), vp);
            assert!(
                close(vp.world_to_screen(world), pointer),
                "pointer {pointer:?} drifted at scale {}",
                vp.scale
            );
        }
    }
}

#[test]
fn scale_stays_inside_hard_bounds() {
    let pointer = Some(Point::new(100.0, 100.0));
    let mut vp = Viewport::IDENTITY;
    for _ in 0..200 {
        vp = on_wheel(-1.0, pointer, vp);
    }
    assert_eq!(vp.scale, MAX_SCALE);
    for _ in 0..400 {
        vp = on_wheel(1.0, pointer, vp);
    }
    assert_eq!(vp.scale, MIN_SCALE);
}

#[test]
fn configured_limits_narrow_the_range() {
    let cfg = CanvasConfig::from_json(r#"{ "minScale": 0.5, "maxScale": 2, "zoomStep": 1.5 }"#).unwrap();
    let limits = cfg.zoom_limits();
    let pointer = Some(Point::ORIGIN);
    let mut vp = Viewport::IDENTITY;
    vp = on_wheel_with(-1.0, pointer, vp, &limits);
    assert!((vp.scale - 1.5).abs() < 1e-6);
    vp = on_wheel_with(-1.0, pointer, vp, &limits);
    assert_eq!(vp.scale, 2.0);
}

#[test]
fn wheel_without_pointer_changes_nothing() {
    let vp = Viewport {
        scale: 3.0,
        x: 1.0,
        y: 2.0,
    };
    assert_eq!(on_wheel(-120.0, None, vp), vp);
    assert_eq!(on_wheel(0.0, Some(Point::ORIGIN), vp), vp);
}

#[test]
fn degenerate_stored_scale_is_clamped_before_zooming() {
    let stored: Viewport = serde_json::from_str(r#"{ "scale": 0, "x": 10, "y": 20 }"#).unwrap();
    let pointer = Point::new(100.0, 100.0);

    let next = on_wheel(-120.0, Some(pointer), stored);
    assert!(next.x.is_finite() && next.y.is_finite());
    assert!((next.scale - MIN_SCALE * 1.1).abs() < 1e-6);

    let zoomed = stored.zoom_to(2.0, pointer, &ZoomLimits::default());
    assert_eq!(zoomed.scale, 2.0);
    assert!(zoomed.x.is_finite() && zoomed.y.is_finite());
}

#[test]
fn pan_commits_only_for_current_stage() {
    let current = Viewport {
        scale: 2.0,
        x: 0.0,
        y: 0.0,
    };
    let stage = StageRef::mint();
    let stale = StageRef::mint();
    let moved = Point::new(-80.0, 25.0);

    let committed = on_pan_end(moved, HitTarget::Stage(stage), Some(stage), current).unwrap();
    assert_eq!(committed.translation(), moved);
    assert_eq!(committed.scale, 2.0);

    let node = HitTarget::Object(ObjectId::intern("vp_node"));
    assert_eq!(on_pan_end(moved, node, Some(stage), current), None);
    assert_eq!(on_pan_end(moved, HitTarget::Stage(stale), Some(stage), current), None);
    assert_eq!(on_pan_end(moved, HitTarget::Stage(stage), None, current), None);
}
