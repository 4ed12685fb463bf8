//! Selection & drag interaction state machine.
//!
//! Translates normalized input into intents. The machine never touches the
//! scene, the viewport, or the store: it only decides what a gesture means.
//!
//! | from          | gesture               | to                | intents              |
//! |---------------|-----------------------|-------------------|----------------------|
//! | Idle          | click node            | Selected(id)      | Select               |
//! | Selected(a)   | click stage           | Idle              | Deselect             |
//! | Selected(a)   | click node b          | Selected(b)       | Select               |
//! | Selected(a)   | click node a          | Selected(a)       | none                 |
//! | any           | drag node             | Dragging → Selected | (Select), Preview*, Change |
//! | any           | drag stage            | Panning → previous | Pan*, PanEnd        |
//! | Dragging      | Escape                | Selected(id)      | CancelDrag           |
//! | Selected(a)   | Delete / Backspace    | Idle              | Delete               |

use crate::input::{InputEvent, Key};
use ea_core::{HitTarget, ObjectId, Point, Viewport};

/// What the pointer landed on at press time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub target: HitTarget,
    /// World-space top-left of the object; unused for the stage.
    pub position: Point,
    pub draggable: bool,
}

impl Hit {
    pub fn stage(stage: ea_core::StageRef) -> Self {
        Self {
            target: HitTarget::Stage(stage),
            position: Point::ORIGIN,
            draggable: false,
        }
    }

    pub fn object(id: ObjectId, position: Point, draggable: bool) -> Self {
        Self {
            target: HitTarget::Object(id),
            position,
            draggable,
        }
    }

    fn object_id(&self) -> Option<ObjectId> {
        match self.target {
            HitTarget::Object(id) => Some(id),
            HitTarget::Stage(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionState {
    Idle,
    Selected(ObjectId),
    Dragging {
        id: ObjectId,
        /// Position at drag start (world).
        origin: Point,
        /// Latest preview position (world).
        current: Point,
    },
    Panning {
        /// Translation at pan start.
        origin: Point,
        current: Point,
        /// Selection to restore when the pan ends.
        resume: Option<ObjectId>,
    },
}

/// Outcome of a gesture, consumed by the canvas owner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    Select(ObjectId),
    Deselect,
    /// In-flight drag position; local preview only.
    Preview { id: ObjectId, position: Point },
    /// Final drag position; the one and only change per drag.
    Change { id: ObjectId, position: Point },
    CancelDrag(ObjectId),
    /// In-flight stage translation.
    Pan { translation: Point },
    /// Stage drag released; commit through `on_pan_end` with `target`.
    PanEnd { translation: Point, target: HitTarget },
    Delete(ObjectId),
}

/// Owner of a set of shapes. Shapes report gestures here and never talk to
/// remote state themselves.
pub trait ShapeEvents {
    fn on_select(&mut self, id: ObjectId);
    fn on_change(&mut self, id: ObjectId, position: Point);
}

/// Forward select/change intents to `owner`; returns the rest untouched.
pub fn dispatch<E: ShapeEvents + ?Sized>(intents: Vec<Intent>, owner: &mut E) -> Vec<Intent> {
    let mut rest = Vec::new();
    for intent in intents {
        match intent {
            Intent::Select(id) => owner.on_select(id),
            Intent::Change { id, position } => owner.on_change(id, position),
            other => rest.push(other),
        }
    }
    rest
}

#[derive(Debug, Clone, Copy)]
struct Press {
    at: Point,
    hit: Hit,
}

pub struct InteractionMachine {
    state: InteractionState,
    press: Option<Press>,
    /// Screen-pixel movement below which a press-release is a click.
    drag_slop: f32,
}

impl Default for InteractionMachine {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl InteractionMachine {
    pub fn new(drag_slop: f32) -> Self {
        Self {
            state: InteractionState::Idle,
            press: None,
            drag_slop,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    /// Selected object, including the one being dragged.
    pub fn selected(&self) -> Option<ObjectId> {
        match self.state {
            InteractionState::Selected(id) | InteractionState::Dragging { id, .. } => Some(id),
            InteractionState::Panning { resume, .. } => resume,
            InteractionState::Idle => None,
        }
    }

    /// Drop the selection, e.g. after the selected object vanished.
    pub fn clear(&mut self) {
        self.state = InteractionState::Idle;
        self.press = None;
    }

    /// Handle one event. `hit` is consulted only on `PointerDown`.
    pub fn handle(&mut self, event: &InputEvent, hit: Option<Hit>, viewport: &Viewport) -> Vec<Intent> {
        match event {
            InputEvent::PointerDown { x, y } => {
                self.press = hit.map(|hit| Press {
                    at: Point::new(*x, *y),
                    hit,
                });
                if self.press.is_none() {
                    log::trace!("pointer down without target ignored");
                }
                vec![]
            }
            InputEvent::PointerMove { x, y } => self.pointer_move(Point::new(*x, *y), viewport),
            InputEvent::PointerUp { x, y } => self.pointer_up(Point::new(*x, *y), viewport),
            InputEvent::Key { key } => self.key(key),
            InputEvent::Wheel { .. } => vec![],
        }
    }

    fn pointer_move(&mut self, p: Point, viewport: &Viewport) -> Vec<Intent> {
        let Some(press) = self.press else {
            return vec![];
        };
        let mut intents = self.begin_gesture(press, p, viewport);

        match &mut self.state {
            InteractionState::Dragging { id, origin, current } => {
                *current = *origin + viewport.screen_delta_to_world(p - press.at);
                intents.push(Intent::Preview {
                    id: *id,
                    position: *current,
                });
            }
            InteractionState::Panning { origin, current, .. } => {
                *current = *origin + (p - press.at);
                intents.push(Intent::Pan {
                    translation: *current,
                });
            }
            _ => {}
        }
        intents
    }

    /// Enter `Dragging` or `Panning` once the pointer leaves the slop
    /// radius of `press`. No-op in any other state.
    fn begin_gesture(&mut self, press: Press, p: Point, viewport: &Viewport) -> Vec<Intent> {
        let mut intents = Vec::new();
        if !matches!(self.state, InteractionState::Idle | InteractionState::Selected(_))
            || press.at.distance(p) <= self.drag_slop
        {
            return intents;
        }
        match press.hit.target {
            HitTarget::Object(id) if press.hit.draggable => {
                if self.selected() != Some(id) {
                    intents.push(Intent::Select(id));
                }
                log::debug!("drag start {id}");
                self.state = InteractionState::Dragging {
                    id,
                    origin: press.hit.position,
                    current: press.hit.position,
                };
            }
            HitTarget::Object(_) => {}
            HitTarget::Stage(_) => {
                log::debug!("pan start");
                let origin = viewport.translation();
                self.state = InteractionState::Panning {
                    origin,
                    current: origin,
                    resume: self.selected(),
                };
            }
        }
        intents
    }

    fn pointer_up(&mut self, p: Point, viewport: &Viewport) -> Vec<Intent> {
        // A release after Escape or without a press is stray.
        let Some(press) = self.press.take() else {
            return vec![];
        };
        // Hosts may coalesce moves, so the release alone can start a gesture.
        let mut intents = self.begin_gesture(press, p, viewport);

        match self.state {
            InteractionState::Dragging { id, origin, .. } => {
                let position = origin + viewport.screen_delta_to_world(p - press.at);
                log::debug!("drag end {id} at ({}, {})", position.x, position.y);
                self.state = InteractionState::Selected(id);
                intents.push(Intent::Change { id, position });
            }
            InteractionState::Panning { origin, resume, .. } => {
                let translation = origin + (p - press.at);
                self.state = resume.map_or(InteractionState::Idle, InteractionState::Selected);
                intents.push(Intent::PanEnd {
                    translation,
                    target: press.hit.target,
                });
            }
            InteractionState::Idle | InteractionState::Selected(_) => {
                // Beyond the slop radius only a non-draggable target lands here.
                if press.at.distance(p) <= self.drag_slop {
                    intents = self.click(press.hit);
                }
            }
        }
        intents
    }

    fn click(&mut self, hit: Hit) -> Vec<Intent> {
        match (hit.object_id(), self.state) {
            (Some(id), InteractionState::Selected(current)) if current == id => vec![],
            (Some(id), _) => {
                self.state = InteractionState::Selected(id);
                vec![Intent::Select(id)]
            }
            (None, InteractionState::Selected(_)) => {
                self.state = InteractionState::Idle;
                vec![Intent::Deselect]
            }
            (None, _) => vec![],
        }
    }

    fn key(&mut self, key: &Key) -> Vec<Intent> {
        match (key, self.state) {
            (Key::Escape, InteractionState::Dragging { id, .. }) => {
                log::debug!("drag cancelled {id}");
                self.press = None;
                self.state = InteractionState::Selected(id);
                vec![Intent::CancelDrag(id)]
            }
            (Key::Escape, InteractionState::Panning { origin, resume, .. }) => {
                self.press = None;
                self.state = resume.map_or(InteractionState::Idle, InteractionState::Selected);
                vec![Intent::Pan { translation: origin }]
            }
            (k, InteractionState::Selected(id)) if k.is_delete() => {
                self.state = InteractionState::Idle;
                vec![Intent::Delete(id)]
            }
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ea_core::StageRef;

    fn id(s: &str) -> ObjectId {
        ObjectId::intern(s)
    }

    fn node(name: &str) -> Option<Hit> {
        Some(Hit::object(id(name), Point::new(100.0, 100.0), true))
    }

    fn click(m: &mut InteractionMachine, hit: Option<Hit>) -> Vec<Intent> {
        let vp = Viewport::IDENTITY;
        m.handle(&InputEvent::pointer_down(10.0, 10.0), hit, &vp);
        m.handle(&InputEvent::pointer_up(10.0, 10.0), None, &vp)
    }

    #[test]
    fn click_selects_then_stage_clears() {
        let stage = StageRef::mint();
        let mut m = InteractionMachine::default();
        assert_eq!(click(&mut m, node("im_a")), vec![Intent::Select(id("im_a"))]);
        assert_eq!(m.state(), InteractionState::Selected(id("im_a")));
        assert_eq!(click(&mut m, Some(Hit::stage(stage))), vec![Intent::Deselect]);
        assert_eq!(m.state(), InteractionState::Idle);
    }

    #[test]
    fn reclick_is_idempotent_and_other_switches() {
        let mut m = InteractionMachine::default();
        click(&mut m, node("im_b"));
        assert_eq!(click(&mut m, node("im_b")), vec![]);
        assert_eq!(click(&mut m, node("im_c")), vec![Intent::Select(id("im_c"))]);
    }

    #[test]
    fn small_jitter_is_still_a_click() {
        let vp = Viewport::IDENTITY;
        let mut m = InteractionMachine::new(2.0);
        m.handle(&InputEvent::pointer_down(0.0, 0.0), node("im_j"), &vp);
        assert_eq!(m.handle(&InputEvent::pointer_move(1.0, 1.0), None, &vp), vec![]);
        let out = m.handle(&InputEvent::pointer_up(1.0, 1.0), None, &vp);
        assert_eq!(out, vec![Intent::Select(id("im_j"))]);
    }

    #[test]
    fn drag_emits_exactly_one_change_in_world_units() {
        let vp = Viewport {
            scale: 2.0,
            x: 0.0,
            y: 0.0,
        };
        let mut m = InteractionMachine::default();
        m.handle(&InputEvent::pointer_down(0.0, 0.0), node("im_d"), &vp);
        let first = m.handle(&InputEvent::pointer_move(10.0, 0.0), None, &vp);
        // Dragging an unselected node selects it first.
        assert_eq!(first[0], Intent::Select(id("im_d")));
        m.handle(&InputEvent::pointer_move(20.0, 0.0), None, &vp);
        let out = m.handle(&InputEvent::pointer_up(40.0, 20.0), None, &vp);
        assert_eq!(
            out,
            vec![Intent::Change {
                id: id("im_d"),
                position: Point::new(120.0, 110.0)
            }]
        );
        assert_eq!(m.state(), InteractionState::Selected(id("im_d")));
    }

    #[test]
    fn release_without_moves_still_drags() {
        let vp = Viewport::IDENTITY;
        let mut m = InteractionMachine::default();
        m.handle(&InputEvent::pointer_down(0.0, 0.0), node("im_q"), &vp);
        let out = m.handle(&InputEvent::pointer_up(50.0, 0.0), None, &vp);
        assert_eq!(
            out,
            vec![
                Intent::Select(id("im_q")),
                Intent::Change {
                    id: id("im_q"),
                    position: Point::new(150.0, 100.0)
                },
            ]
        );
        assert_eq!(m.state(), InteractionState::Selected(id("im_q")));
    }

    #[test]
    fn release_without_moves_still_pans() {
        let vp = Viewport::IDENTITY;
        let stage = StageRef::mint();
        let mut m = InteractionMachine::default();
        m.handle(&InputEvent::pointer_down(0.0, 0.0), Some(Hit::stage(stage)), &vp);
        let out = m.handle(&InputEvent::pointer_up(30.0, -10.0), None, &vp);
        assert_eq!(
            out,
            vec![Intent::PanEnd {
                translation: Point::new(30.0, -10.0),
                target: HitTarget::Stage(stage)
            }]
        );
        assert_eq!(m.state(), InteractionState::Idle);
    }

    #[test]
    fn escape_cancels_drag_without_change() {
        let vp = Viewport::IDENTITY;
        let mut m = InteractionMachine::default();
        click(&mut m, node("im_e"));
        m.handle(&InputEvent::pointer_down(0.0, 0.0), node("im_e"), &vp);
        m.handle(&InputEvent::pointer_move(50.0, 0.0), None, &vp);
        assert_eq!(
            m.handle(&InputEvent::key("Escape"), None, &vp),
            vec![Intent::CancelDrag(id("im_e"))]
        );
        assert_eq!(m.handle(&InputEvent::pointer_up(60.0, 0.0), None, &vp), vec![]);
        assert_eq!(m.state(), InteractionState::Selected(id("im_e")));
    }

    #[test]
    fn stage_drag_pans_and_keeps_selection() {
        let vp = Viewport::IDENTITY;
        let stage = StageRef::mint();
        let mut m = InteractionMachine::default();
        click(&mut m, node("im_p"));
        m.handle(&InputEvent::pointer_down(0.0, 0.0), Some(Hit::stage(stage)), &vp);
        let mid = m.handle(&InputEvent::pointer_move(30.0, 5.0), None, &vp);
        assert_eq!(mid, vec![Intent::Pan { translation: Point::new(30.0, 5.0) }]);
        let end = m.handle(&InputEvent::pointer_up(40.0, 10.0), None, &vp);
        assert_eq!(
            end,
            vec![Intent::PanEnd {
                translation: Point::new(40.0, 10.0),
                target: HitTarget::Stage(stage)
            }]
        );
        assert_eq!(m.state(), InteractionState::Selected(id("im_p")));
    }

    #[test]
    fn connectors_click_but_do_not_drag() {
        let vp = Viewport::IDENTITY;
        let link = Some(Hit::object(id("im_link"), Point::ORIGIN, false));
        let mut m = InteractionMachine::default();
        m.handle(&InputEvent::pointer_down(0.0, 0.0), link, &vp);
        assert_eq!(m.handle(&InputEvent::pointer_move(30.0, 0.0), None, &vp), vec![]);
        assert_eq!(m.handle(&InputEvent::pointer_up(30.0, 0.0), None, &vp), vec![]);
        assert_eq!(click(&mut m, link), vec![Intent::Select(id("im_link"))]);
    }

    #[test]
    fn delete_key_on_selection() {
        let vp = Viewport::IDENTITY;
        let mut m = InteractionMachine::default();
        assert_eq!(m.handle(&InputEvent::key("Delete"), None, &vp), vec![]);
        click(&mut m, node("im_x"));
        assert_eq!(
            m.handle(&InputEvent::key("Backspace"), None, &vp),
            vec![Intent::Delete(id("im_x"))]
        );
        assert_eq!(m.state(), InteractionState::Idle);
    }

    struct Recorder(Vec<String>);

    impl ShapeEvents for Recorder {
        fn on_select(&mut self, id: ObjectId) {
            self.0.push(format!("select {id}"));
        }
        fn on_change(&mut self, id: ObjectId, position: Point) {
            self.0.push(format!("change {id} {} {}", position.x, position.y));
        }
    }

    #[test]
    fn dispatch_routes_shape_events() {
        let mut rec = Recorder(vec![]);
        let rest = dispatch(
            vec![
                Intent::Select(id("im_r")),
                Intent::Deselect,
                Intent::Change {
                    id: id("im_r"),
                    position: Point::new(1.0, 2.0),
                },
            ],
            &mut rec,
        );
        assert_eq!(rest, vec![Intent::Deselect]);
        assert_eq!(rec.0, vec!["select im_r", "change im_r 1 2"]);
    }
}
