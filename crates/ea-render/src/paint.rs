//! Shape primitives → Vello drawing commands.
//!
//! Geometry stays in world units; the viewport is applied once as the
//! scene transform so pan and zoom never touch object coordinates.

use crate::shapes::{Block, Connector, Cylinder, Shape, ShapeView, ViewState, build_shapes};
use ea_core::{Color as ObjectColor, Viewport};
use kurbo::{Affine, BezPath, Cap, Ellipse, Join, Line, Point, Rect, RoundedRect, Stroke as KurboStroke, Vec2};
use peniko::{Color, Fill};
use vello::Scene;

const OUTLINE: Color = Color::from_rgba8(30, 41, 59, 255);
const SELECTION: Color = Color::from_rgba8(59, 130, 246, 255);
const OUTLINE_WIDTH: f64 = 1.0;
const SELECTION_WIDTH: f64 = 2.0;
const ARROW_LENGTH: f64 = 10.0;

/// Affine for a viewport: world → screen.
pub fn viewport_transform(viewport: &Viewport) -> Affine {
    Affine::translate((viewport.x as f64, viewport.y as f64)) * Affine::scale(viewport.scale as f64)
}

/// Build primitives for a model scene and paint them.
pub fn paint_scene(scene: &mut Scene, model: &ea_core::Scene, viewport: &Viewport, view: &ViewState) {
    let shapes = build_shapes(model, view);
    paint_shapes(scene, &shapes, viewport);
}

/// Paint primitives in order. Call once per frame with a cleared `Scene`.
pub fn paint_shapes(scene: &mut Scene, shapes: &[ShapeView], viewport: &Viewport) {
    let transform = viewport_transform(viewport);
    // Strokes are specified in screen pixels.
    let px = 1.0 / viewport.scale.max(f32::EPSILON) as f64;

    for shape in shapes {
        match shape {
            ShapeView::Block(b) => paint_block(scene, transform, px, b),
            ShapeView::Cylinder(c) => paint_cylinder(scene, transform, px, c),
            ShapeView::Connector(c) => paint_connector(scene, transform, px, c),
        }
        log::trace!(
            "LABEL @{} {:?} at ({}, {})",
            shape.id(),
            shape.label(),
            shape.bounds().center().x,
            shape.bounds().center().y
        );
    }
}

// ─── Shape painters ──────────────────────────────────────────────────────

fn paint_block(scene: &mut Scene, transform: Affine, px: f64, block: &Block) {
    let shape: RoundedRect = rect(block.bounds).to_rounded_rect(block.corner_radius() as f64);
    scene.fill(Fill::NonZero, transform, to_color(block.color), None, &shape);
    outline(scene, transform, px, block.selected, &shape);
}

fn paint_cylinder(scene: &mut Scene, transform: Affine, px: f64, cyl: &Cylinder) {
    let b = cyl.bounds;
    let cap = cyl.cap_height() as f64;
    let rx = b.width as f64 / 2.0;
    let cx = b.x as f64 + rx;
    let top = b.y as f64 + cap;
    let bottom = (b.y + b.height) as f64 - cap;

    let mut body = BezPath::new();
    body.move_to((b.x as f64, top));
    body.line_to((b.x as f64, bottom));
    // Lower half of the bottom cap, left to right.
    body.quad_to((cx - rx, bottom + cap * 1.33), (cx, bottom + cap));
    body.quad_to((cx + rx, bottom + cap * 1.33), (cx + rx, bottom));
    body.line_to((cx + rx, top));
    body.close_path();

    let lid = Ellipse::new(Point::new(cx, top), (rx, cap), 0.0);
    let fill = to_color(cyl.color);

    scene.fill(Fill::NonZero, transform, fill, None, &body);
    scene.fill(Fill::NonZero, transform, fill, None, &lid);
    outline(scene, transform, px, false, &body);
    outline(scene, transform, px, false, &lid);
    if cyl.selected {
        outline(scene, transform, px, true, &rect(b));
    }
}

fn paint_connector(scene: &mut Scene, transform: Affine, px: f64, conn: &Connector) {
    let from = Point::new(conn.from.x as f64, conn.from.y as f64);
    let to = Point::new(conn.to.x as f64, conn.to.y as f64);
    let color = if conn.selected { SELECTION } else { to_color(conn.color) };
    let width = if conn.selected { SELECTION_WIDTH } else { OUTLINE_WIDTH } * px;
    let stroke = KurboStroke {
        width,
        join: Join::Round,
        start_cap: Cap::Round,
        end_cap: Cap::Round,
        ..Default::default()
    };
    scene.stroke(&stroke, transform, color, None, &Line::new(from, to));

    if let Some(head) = arrow_head(from, to, ARROW_LENGTH * px) {
        scene.fill(Fill::NonZero, transform, color, None, &head);
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn outline<S: kurbo::Shape>(scene: &mut Scene, transform: Affine, px: f64, selected: bool, shape: &S) {
    let (color, width) = if selected {
        (SELECTION, SELECTION_WIDTH)
    } else {
        (OUTLINE, OUTLINE_WIDTH)
    };
    let stroke = KurboStroke {
        width: width * px,
        ..Default::default()
    };
    scene.stroke(&stroke, transform, color, None, shape);
}

fn arrow_head(from: Point, to: Point, length: f64) -> Option<BezPath> {
    let dir: Vec2 = to - from;
    if dir.hypot() < f64::EPSILON {
        return None;
    }
    let unit = dir.normalize();
    let normal = Vec2::new(-unit.y, unit.x);
    let base = to - unit * length;
    let mut path = BezPath::new();
    path.move_to(to);
    path.line_to(base + normal * (length / 2.0));
    path.line_to(base - normal * (length / 2.0));
    path.close_path();
    Some(path)
}

fn rect(b: ea_core::Bounds) -> Rect {
    Rect::new(
        b.x as f64,
        b.y as f64,
        (b.x + b.width) as f64,
        (b.y + b.height) as f64,
    )
}

fn to_color(c: ObjectColor) -> Color {
    let [r, g, b, a] = c.to_rgba8();
    Color::from_rgba8(r, g, b, a)
}
