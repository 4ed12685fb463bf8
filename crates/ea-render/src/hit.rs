//! Hit testing: world point → object lookup.
//!
//! Reverse-walks the primitives (front-to-back) so the last-painted shape
//! under the pointer wins. Nodes are painted above connectors, so a click
//! on a node never selects a line passing underneath it.

use crate::shapes::{Shape, ShapeView, ViewState, build_shapes};
use ea_core::{ObjectId, Point, Scene};

/// Topmost primitive containing `p`, or `None` for the stage.
pub fn hit_test(shapes: &[ShapeView], p: Point) -> Option<ObjectId> {
    shapes.iter().rev().find(|s| s.contains(p)).map(Shape::id)
}

/// Build primitives for `scene` and hit-test them.
pub fn hit_test_scene(scene: &Scene, p: Point, connector_tolerance: f32) -> Option<ObjectId> {
    let view = ViewState {
        connector_tolerance,
        ..Default::default()
    };
    hit_test(&build_shapes(scene, &view), p)
}
