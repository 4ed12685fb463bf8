//! Shape primitives: the view of an `ArchitecturalObject` on the canvas.
//!
//! Every primitive is positionable, selectable, draggable (connectors
//! excepted) and labeled. Primitives are plain values rebuilt from the
//! scene each frame; they know how to hit-test themselves but never talk to
//! the object store. Gestures on them are reported upward as select/change
//! intents by the editor's interaction state machine.

use ea_core::geometry::distance_to_segment;
use ea_core::{ArchitecturalObject, Bounds, Color, ObjectId, ObjectKind, Point, Scene};
use std::collections::HashMap;

/// Capability set shared by all primitives.
pub trait Shape {
    fn id(&self) -> ObjectId;

    /// World-space bounding box.
    fn bounds(&self) -> Bounds;

    fn label(&self) -> &str;

    fn is_selected(&self) -> bool;

    fn is_draggable(&self) -> bool {
        true
    }

    /// Top-left corner in world space.
    fn position(&self) -> Point {
        let b = self.bounds();
        Point::new(b.x, b.y)
    }

    /// Copy of the shape with its top-left corner at `position`.
    fn moved_to(&self, position: Point) -> Self
    where
        Self: Sized;

    /// Whether a world-space point lands on the shape.
    fn contains(&self, p: Point) -> bool {
        self.bounds().contains(p)
    }
}

// ─── Variants ────────────────────────────────────────────────────────────

/// Rectangle-based node (`service`, generic `shape`).
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub bounds: Bounds,
    pub color: Color,
    pub label: String,
    pub selected: bool,
}

impl Block {
    /// Services get rounded corners; generic shapes are square.
    pub fn corner_radius(&self) -> f32 {
        match self.kind {
            ObjectKind::Service => 8.0_f32.min(self.bounds.height / 4.0),
            _ => 0.0,
        }
    }
}

/// Cylindrical storage node (`database`).
#[derive(Debug, Clone, PartialEq)]
pub struct Cylinder {
    pub id: ObjectId,
    pub bounds: Bounds,
    pub color: Color,
    pub label: String,
    pub selected: bool,
}

impl Cylinder {
    /// Vertical radius of the elliptic caps.
    pub fn cap_height(&self) -> f32 {
        (self.bounds.height * 0.15).min(16.0)
    }
}

/// Straight line between the centers of two objects.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub id: ObjectId,
    pub from: Point,
    pub to: Point,
    pub color: Color,
    pub label: String,
    pub selected: bool,
    /// World-space half-width of the clickable band.
    pub tolerance: f32,
}

impl Shape for Block {
    fn id(&self) -> ObjectId {
        self.id
    }
    fn bounds(&self) -> Bounds {
        self.bounds
    }
    fn label(&self) -> &str {
        &self.label
    }
    fn is_selected(&self) -> bool {
        self.selected
    }
    fn moved_to(&self, position: Point) -> Self {
        Self {
            bounds: Bounds { x: position.x, y: position.y, ..self.bounds },
            ..self.clone()
        }
    }
}

impl Shape for Cylinder {
    fn id(&self) -> ObjectId {
        self.id
    }
    fn bounds(&self) -> Bounds {
        self.bounds
    }
    fn label(&self) -> &str {
        &self.label
    }
    fn is_selected(&self) -> bool {
        self.selected
    }
    fn moved_to(&self, position: Point) -> Self {
        Self {
            bounds: Bounds { x: position.x, y: position.y, ..self.bounds },
            ..self.clone()
        }
    }
}

impl Shape for Connector {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn bounds(&self) -> Bounds {
        let x = self.from.x.min(self.to.x);
        let y = self.from.y.min(self.to.y);
        Bounds {
            x,
            y,
            width: (self.from.x - self.to.x).abs(),
            height: (self.from.y - self.to.y).abs(),
        }
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn is_selected(&self) -> bool {
        self.selected
    }

    /// Connectors follow their endpoints and are never dragged directly.
    fn is_draggable(&self) -> bool {
        false
    }

    fn moved_to(&self, _position: Point) -> Self {
        self.clone()
    }

    fn contains(&self, p: Point) -> bool {
        distance_to_segment(p, self.from, self.to) <= self.tolerance
    }
}

/// Any primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeView {
    Block(Block),
    Cylinder(Cylinder),
    Connector(Connector),
}

impl ShapeView {
    fn inner(&self) -> &dyn Shape {
        match self {
            Self::Block(s) => s,
            Self::Cylinder(s) => s,
            Self::Connector(s) => s,
        }
    }
}

impl Shape for ShapeView {
    fn id(&self) -> ObjectId {
        self.inner().id()
    }
    fn bounds(&self) -> Bounds {
        self.inner().bounds()
    }
    fn label(&self) -> &str {
        self.inner().label()
    }
    fn is_selected(&self) -> bool {
        self.inner().is_selected()
    }
    fn is_draggable(&self) -> bool {
        self.inner().is_draggable()
    }
    fn contains(&self, p: Point) -> bool {
        self.inner().contains(p)
    }
    fn moved_to(&self, position: Point) -> Self {
        match self {
            Self::Block(s) => Self::Block(s.moved_to(position)),
            Self::Cylinder(s) => Self::Cylinder(s.moved_to(position)),
            Self::Connector(s) => Self::Connector(s.moved_to(position)),
        }
    }
}

// ─── Building from a scene ───────────────────────────────────────────────

/// Per-frame inputs that are not part of the scene itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewState {
    pub selected: Option<ObjectId>,
    /// Local drag preview: object id and its in-flight top-left position.
    pub preview: Option<(ObjectId, Point)>,
    pub connector_tolerance: f32,
}

/// Build primitives for every object, in paint order: connectors first so
/// they sit underneath the nodes they join, then nodes back to front.
/// Connectors with a missing endpoint are skipped.
pub fn build_shapes(scene: &Scene, view: &ViewState) -> Vec<ShapeView> {
    let mut nodes = Vec::with_capacity(scene.len());
    let mut centers: HashMap<ObjectId, Point> = HashMap::new();

    for obj in scene.objects().filter(|o| o.kind != ObjectKind::Connector) {
        let bounds = preview_bounds(obj, view);
        centers.insert(obj.id, bounds.center());
        let selected = view.selected == Some(obj.id);
        let shape = match obj.kind {
            ObjectKind::Database => ShapeView::Cylinder(Cylinder {
                id: obj.id,
                bounds,
                color: obj.visual.color,
                label: obj.visual.label.clone(),
                selected,
            }),
            kind => ShapeView::Block(Block {
                id: obj.id,
                kind,
                bounds,
                color: obj.visual.color,
                label: obj.visual.label.clone(),
                selected,
            }),
        };
        nodes.push(shape);
    }

    let mut shapes: Vec<ShapeView> = scene
        .objects()
        .filter(|o| o.kind == ObjectKind::Connector)
        .filter_map(|c| {
            let (source, target) = c.endpoints()?;
            let from = *centers.get(&source)?;
            let to = *centers.get(&target)?;
            Some(ShapeView::Connector(Connector {
                id: c.id,
                from,
                to,
                color: c.visual.color,
                label: c.visual.label.clone(),
                selected: view.selected == Some(c.id),
                tolerance: view.connector_tolerance,
            }))
        })
        .collect();

    shapes.extend(nodes);
    shapes
}

fn preview_bounds(obj: &ArchitecturalObject, view: &ViewState) -> Bounds {
    match view.preview {
        Some((id, position)) if id == obj.id => Bounds::from_origin_size(position, obj.visual.size),
        _ => obj.bounds(),
    }
}
