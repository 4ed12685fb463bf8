//! Canvas session: one mounted canvas over one model.
//!
//! Owns the client-local state (scene, viewport, selection machine, drag
//! and pan previews) and is the `ShapeEvents` owner for every primitive.
//! Input handling is synchronous; the only `async` paths are loading and
//! flushing edits through the `SceneClient`.
//!
//! Moves are optimistic: `on_change` updates the local scene immediately
//! and queues a visual patch. `flush` sends the queue and reloads the
//! canonical list, so a rejected move snaps back.

use crate::input::InputEvent;
use crate::interaction::{Hit, Intent, InteractionMachine, InteractionState, ShapeEvents, dispatch};
use crate::protocol::SceneClient;
use crate::store::ObjectStore;
use ea_core::viewport::on_wheel_with;
use ea_core::{
    ApiResult, CanvasConfig, HitTarget, ModelId, ObjectId, Point, Scene, Size, StageRef, Viewport,
    on_pan_end,
};
use ea_render::{Shape, ShapeView, ViewState, build_shapes, hit_test};
use std::sync::Arc;

/// What a `flush` accomplished.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlushReport {
    pub moved: Vec<ObjectId>,
    pub deleted: Vec<ObjectId>,
    /// Edits the store rejected; details are in the client's notices.
    pub failed: Vec<ObjectId>,
    /// Connectors left pointing at deleted objects.
    pub dangling: Vec<ObjectId>,
}

pub struct CanvasSession<S> {
    client: Arc<SceneClient<S>>,
    scene: Scene,
    viewport: Viewport,
    machine: InteractionMachine,
    stage: Option<StageRef>,
    config: CanvasConfig,
    drag_preview: Option<(ObjectId, Point)>,
    pan_preview: Option<Point>,
    pending_moves: Vec<(ObjectId, Point)>,
    pending_deletes: Vec<ObjectId>,
}

impl<S: ObjectStore> CanvasSession<S> {
    /// Load `model` and mount a fresh stage.
    pub async fn open(client: Arc<SceneClient<S>>, model: ModelId, config: CanvasConfig) -> ApiResult<Self> {
        let config = config.sanitized();
        let objects = client.objects(model).await?;
        log::debug!("opened canvas for {model} with {} object(s)", objects.len());
        Ok(Self {
            client,
            scene: Scene::from_objects(model, objects),
            viewport: Viewport::IDENTITY,
            machine: InteractionMachine::new(config.drag_slop),
            stage: Some(StageRef::mint()),
            config,
            drag_preview: None,
            pan_preview: None,
            pending_moves: Vec::new(),
            pending_deletes: Vec::new(),
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn client(&self) -> &Arc<SceneClient<S>> {
        &self.client
    }

    /// Committed viewport, ignoring any pan in flight.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Viewport to paint with: the committed one, or the pan preview.
    pub fn display_viewport(&self) -> Viewport {
        match self.pan_preview {
            Some(t) => Viewport {
                x: t.x,
                y: t.y,
                ..self.viewport
            },
            None => self.viewport,
        }
    }

    pub fn selected(&self) -> Option<ObjectId> {
        self.machine.selected()
    }

    pub fn state(&self) -> InteractionState {
        self.machine.state()
    }

    pub fn stage(&self) -> Option<StageRef> {
        self.stage
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_moves.is_empty() || !self.pending_deletes.is_empty()
    }

    /// Tear down the stage. Late events become no-ops.
    pub fn unmount(&mut self) {
        self.stage = None;
        self.machine.clear();
        self.drag_preview = None;
        self.pan_preview = None;
    }

    /// Mount a new stage; handles from the previous mount no longer match.
    pub fn mount(&mut self) -> StageRef {
        let stage = StageRef::mint();
        self.stage = Some(stage);
        stage
    }

    pub fn view_state(&self) -> ViewState {
        ViewState {
            selected: self.machine.selected(),
            preview: self.drag_preview,
            connector_tolerance: self.config.connector_hit_tolerance,
        }
    }

    /// Primitives in paint order for the current frame.
    pub fn shapes(&self) -> Vec<ShapeView> {
        build_shapes(&self.scene, &self.view_state())
    }

    // ─── Viewport commands ───────────────────────────────────────────────

    pub fn zoom_to(&mut self, scale: f32, anchor: Point) {
        self.viewport = self.viewport.zoom_to(scale, anchor, &self.config.zoom_limits());
    }

    /// Frame all content inside a `screen`-sized canvas.
    pub fn fit_to_content(&mut self, screen: Size) {
        if let Some(content) = self.scene.content_bounds() {
            self.viewport =
                Viewport::fit_bounds(content, screen, self.config.fit_padding, &self.config.zoom_limits());
        }
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Feed one input event. Select and change intents are applied here;
    /// the remaining intents are returned for the host (e.g. to confirm a
    /// delete or repaint).
    pub fn handle_input(&mut self, event: &InputEvent) -> Vec<Intent> {
        if let InputEvent::Wheel { delta_y, pointer } = event {
            if self.stage.is_none() {
                log::trace!("wheel on unmounted canvas ignored");
                return vec![];
            }
            self.viewport = on_wheel_with(*delta_y, *pointer, self.viewport, &self.config.zoom_limits());
            return vec![];
        }

        let hit = match event {
            InputEvent::PointerDown { x, y } => self.hit_at(Point::new(*x, *y)),
            _ => None,
        };
        let viewport = self.viewport;
        let intents = self.machine.handle(event, hit, &viewport);
        let rest = dispatch(intents, self);

        for intent in &rest {
            match *intent {
                Intent::Deselect => log::debug!("selection cleared"),
                Intent::Preview { id, position } => self.drag_preview = Some((id, position)),
                Intent::CancelDrag(_) => self.drag_preview = None,
                Intent::Pan { translation } => {
                    self.pan_preview = (translation != viewport.translation()).then_some(translation);
                }
                Intent::PanEnd { translation, target } => self.commit_pan(translation, target),
                Intent::Delete(id) => self.remove_local(id),
                Intent::Select(_) | Intent::Change { .. } => {}
            }
        }
        rest
    }

    fn hit_at(&self, screen: Point) -> Option<Hit> {
        let Some(stage) = self.stage else {
            log::trace!("input on unmounted canvas ignored");
            return None;
        };
        let world = self.viewport.screen_to_world(screen);
        let shapes = self.shapes();
        let hit = match hit_test(&shapes, world) {
            Some(id) => {
                let shape = shapes.iter().find(|s| s.id() == id)?;
                Hit::object(id, shape.position(), shape.is_draggable())
            }
            None => Hit::stage(stage),
        };
        Some(hit)
    }

    fn commit_pan(&mut self, translation: Point, target: HitTarget) {
        self.pan_preview = None;
        if let Some(next) = on_pan_end(translation, target, self.stage, self.viewport) {
            self.viewport = next;
        } else {
            log::trace!("pan end on {target:?} not committed");
        }
    }

    fn remove_local(&mut self, id: ObjectId) {
        if self.scene.remove(id).is_some() {
            self.pending_moves.retain(|(m, _)| *m != id);
            self.pending_deletes.push(id);
        }
    }

    // ─── Sync ────────────────────────────────────────────────────────────

    /// Send queued edits, then reload the canonical object list.
    pub async fn flush(&mut self) -> ApiResult<FlushReport> {
        let mut report = FlushReport::default();

        for (id, position) in std::mem::take(&mut self.pending_moves) {
            let Some(obj) = self.scene.get(id) else {
                continue;
            };
            let mut visual = obj.visual.clone();
            visual.position = position;
            match self.client.update_object_visuals(id, visual).await {
                Ok(_) => report.moved.push(id),
                Err(_) => report.failed.push(id),
            }
        }

        for id in std::mem::take(&mut self.pending_deletes) {
            match self.client.delete_object(id).await {
                Ok(outcome) => {
                    report.deleted.push(id);
                    report.dangling.extend(outcome.dangling);
                }
                Err(_) => report.failed.push(id),
            }
        }

        self.reload().await?;
        Ok(report)
    }

    /// Replace the scene with the canonical list. The selection survives if
    /// its object still exists.
    pub async fn reload(&mut self) -> ApiResult<()> {
        let objects = self.client.objects(self.scene.model_id).await?;
        self.scene = Scene::from_objects(self.scene.model_id, objects);
        if let Some(id) = self.machine.selected()
            && !self.scene.contains(id)
        {
            self.machine.clear();
        }
        Ok(())
    }
}

impl<S: ObjectStore> ShapeEvents for CanvasSession<S> {
    fn on_select(&mut self, id: ObjectId) {
        log::debug!("selected {id}");
    }

    fn on_change(&mut self, id: ObjectId, position: Point) {
        self.drag_preview = None;
        if !self.scene.set_position(id, position) {
            log::warn!("change for unknown object {id} dropped");
            return;
        }
        self.pending_moves.retain(|(m, _)| *m != id);
        self.pending_moves.push((id, position));
    }
}
