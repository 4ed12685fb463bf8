//! Client-side scene: the objects of one model, in paint order.
//!
//! Objects are graph nodes; every connector object with both endpoints
//! present also becomes an edge `source → target` weighted by the
//! connector's id, so "which connectors touch this object" is a neighbor
//! walk rather than a scan.

use crate::geometry::{Bounds, Point};
use crate::id::{ModelId, ObjectId};
use crate::model::{ArchitecturalObject, ObjectKind, Visual};
use petgraph::Direction;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Scene {
    pub model_id: ModelId,
    graph: StableDiGraph<ArchitecturalObject, ObjectId>,
    id_index: HashMap<ObjectId, NodeIndex>,
    /// Paint order, back to front.
    order: Vec<ObjectId>,
}

impl Scene {
    #[must_use]
    pub fn new(model_id: ModelId) -> Self {
        Self {
            model_id,
            graph: StableDiGraph::new(),
            id_index: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Build from the canonical object list of a model. Objects owned by a
    /// different model are dropped.
    pub fn from_objects(model_id: ModelId, objects: impl IntoIterator<Item = ArchitecturalObject>) -> Self {
        let mut scene = Self::new(model_id);
        for obj in objects {
            scene.insert_unlinked(obj);
        }
        scene.relink();
        scene
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.id_index.contains_key(&id)
    }

    pub fn get(&self, id: ObjectId) -> Option<&ArchitecturalObject> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    /// Objects back to front.
    pub fn objects(&self) -> impl DoubleEndedIterator<Item = &ArchitecturalObject> + '_ {
        self.order.iter().filter_map(|id| self.get(*id))
    }

    /// Insert or replace an object, keeping its paint slot when replacing.
    pub fn upsert(&mut self, obj: ArchitecturalObject) {
        let relink = obj.kind == ObjectKind::Connector
            || self.get(obj.id).is_some_and(|old| old.kind == ObjectKind::Connector);
        self.insert_unlinked(obj);
        if relink {
            self.relink();
        }
    }

    /// Replace only the visual of an existing object. Returns `false` when
    /// the object is not in the scene.
    pub fn set_visual(&mut self, id: ObjectId, visual: Visual) -> bool {
        match self.id_index.get(&id) {
            Some(idx) => {
                self.graph[*idx].visual = visual;
                true
            }
            None => false,
        }
    }

    pub fn set_position(&mut self, id: ObjectId, position: Point) -> bool {
        match self.id_index.get(&id) {
            Some(idx) => {
                self.graph[*idx].visual.position = position;
                true
            }
            None => false,
        }
    }

    /// Remove an object. Connectors that pointed at it stay in the scene
    /// but lose their edge; their ids are returned so the caller can decide
    /// what to do with them. Removing a connector drops its own edge.
    pub fn remove(&mut self, id: ObjectId) -> Option<(ArchitecturalObject, Vec<ObjectId>)> {
        let idx = self.id_index.remove(&id)?;
        let dangling = self.connectors_at(idx);
        let removed = self.graph.remove_node(idx)?;
        self.order.retain(|o| *o != id);
        if removed.kind == ObjectKind::Connector {
            self.graph.retain_edges(|g, e| g[e] != id);
        }
        Some((removed, dangling))
    }

    /// Connector ids attached to `id` (either end).
    pub fn connectors_of(&self, id: ObjectId) -> Vec<ObjectId> {
        self.id_index
            .get(&id)
            .map(|idx| self.connectors_at(*idx))
            .unwrap_or_default()
    }

    /// Center points of a connector's two endpoints, if both are present.
    pub fn connector_endpoints(&self, connector: &ArchitecturalObject) -> Option<(Point, Point)> {
        let (source, target) = connector.endpoints()?;
        let a = self.get(source)?.bounds().center();
        let b = self.get(target)?.bounds().center();
        Some((a, b))
    }

    /// Union of all non-connector object bounds.
    pub fn content_bounds(&self) -> Option<Bounds> {
        self.objects()
            .filter(|o| o.kind != ObjectKind::Connector)
            .map(ArchitecturalObject::bounds)
            .reduce(|acc, b| acc.union(&b))
    }

    // ─── internals ───────────────────────────────────────────────────────

    fn insert_unlinked(&mut self, obj: ArchitecturalObject) {
        if obj.model_id != self.model_id {
            log::warn!(
                "object {} belongs to model {}, not {}; skipped",
                obj.id,
                obj.model_id,
                self.model_id
            );
            return;
        }
        let id = obj.id;
        match self.id_index.get(&id) {
            Some(idx) => self.graph[*idx] = obj,
            None => {
                let idx = self.graph.add_node(obj);
                self.id_index.insert(id, idx);
                self.order.push(id);
            }
        }
    }

    fn connectors_at(&self, idx: NodeIndex) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = Vec::new();
        let edges = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming));
        for edge in edges {
            let id = *EdgeRef::weight(&edge);
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Rebuild connector edges from the connector objects.
    fn relink(&mut self) {
        self.graph.clear_edges();
        let links: Vec<(NodeIndex, NodeIndex, ObjectId)> = self
            .graph
            .node_indices()
            .map(|idx| &self.graph[idx])
            .filter_map(|o| {
                let (s, t) = o.endpoints()?;
                Some((*self.id_index.get(&s)?, *self.id_index.get(&t)?, o.id))
            })
            .collect();
        for (s, t, id) in links {
            self.graph.add_edge(s, t, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use chrono::Utc;

    fn object(model: &str, id: &str, kind: ObjectKind, x: f32) -> ArchitecturalObject {
        let now = Utc::now();
        ArchitecturalObject {
            id: ObjectId::intern(id),
            model_id: ModelId::intern(model),
            kind,
            visual: Visual::at(Point::new(x, 0.0), Size::new(100.0, 50.0)),
            description: None,
            source: None,
            target: None,
            properties: Default::default(),
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn connector(model: &str, id: &str, from: &str, to: &str) -> ArchitecturalObject {
        let mut c = object(model, id, ObjectKind::Connector, 0.0);
        c.source = Some(ObjectId::intern(from));
        c.target = Some(ObjectId::intern(to));
        c
    }

    #[test]
    fn paint_order_follows_list_order() {
        let scene = Scene::from_objects(
            ModelId::intern("scene_m"),
            vec![
                object("scene_m", "a", ObjectKind::Service, 0.0),
                object("scene_m", "b", ObjectKind::Database, 200.0),
            ],
        );
        let ids: Vec<&str> = scene.objects().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn foreign_objects_are_skipped() {
        let scene = Scene::from_objects(
            ModelId::intern("scene_own"),
            vec![object("scene_other", "x", ObjectKind::Shape, 0.0)],
        );
        assert!(scene.is_empty());
    }

    #[test]
    fn connectors_link_in_any_list_order() {
        let model = "scene_links";
        let scene = Scene::from_objects(
            ModelId::intern(model),
            vec![
                connector(model, "c1", "api", "db"),
                object(model, "api", ObjectKind::Service, 0.0),
                object(model, "db", ObjectKind::Database, 300.0),
            ],
        );
        assert_eq!(scene.connectors_of(ObjectId::intern("db")), vec![ObjectId::intern("c1")]);
        let c1 = scene.get(ObjectId::intern("c1")).unwrap();
        let (a, b) = scene.connector_endpoints(c1).unwrap();
        assert_eq!(a, Point::new(50.0, 25.0));
        assert_eq!(b, Point::new(350.0, 25.0));
    }

    #[test]
    fn remove_reports_dangling_connectors() {
        let model = "scene_remove";
        let mut scene = Scene::from_objects(
            ModelId::intern(model),
            vec![
                object(model, "r_api", ObjectKind::Service, 0.0),
                object(model, "r_db", ObjectKind::Database, 300.0),
                connector(model, "r_c", "r_api", "r_db"),
            ],
        );
        let (removed, dangling) = scene.remove(ObjectId::intern("r_api")).unwrap();
        assert_eq!(removed.id, ObjectId::intern("r_api"));
        assert_eq!(dangling, vec![ObjectId::intern("r_c")]);
        assert_eq!(scene.len(), 2);
        assert!(scene.remove(ObjectId::intern("r_api")).is_none());
    }

    #[test]
    fn removed_connector_no_longer_touches_its_endpoints() {
        let model = "scene_remove_link";
        let mut scene = Scene::from_objects(
            ModelId::intern(model),
            vec![
                object(model, "rl_a", ObjectKind::Service, 0.0),
                object(model, "rl_b", ObjectKind::Database, 300.0),
                connector(model, "rl_c", "rl_a", "rl_b"),
            ],
        );
        let (_, dangling) = scene.remove(ObjectId::intern("rl_c")).unwrap();
        assert!(dangling.is_empty());
        assert!(scene.connectors_of(ObjectId::intern("rl_a")).is_empty());
        assert!(scene.connectors_of(ObjectId::intern("rl_b")).is_empty());

        let (_, dangling) = scene.remove(ObjectId::intern("rl_a")).unwrap();
        assert!(dangling.is_empty());
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn upsert_replaces_in_place() {
        let model = "scene_upsert";
        let mut scene = Scene::from_objects(
            ModelId::intern(model),
            vec![
                object(model, "u1", ObjectKind::Shape, 0.0),
                object(model, "u2", ObjectKind::Shape, 10.0),
            ],
        );
        scene.upsert(object(model, "u1", ObjectKind::Service, 99.0));
        let first = scene.objects().next().unwrap();
        assert_eq!(first.id, ObjectId::intern("u1"));
        assert_eq!(first.kind, ObjectKind::Service);
        assert_eq!(scene.len(), 2);
    }

    #[test]
    fn content_bounds_ignore_connectors() {
        let model = "scene_bounds";
        let scene = Scene::from_objects(
            ModelId::intern(model),
            vec![
                object(model, "bx1", ObjectKind::Shape, 0.0),
                object(model, "bx2", ObjectKind::Shape, 200.0),
            ],
        );
        let b = scene.content_bounds().unwrap();
        assert_eq!((b.x, b.width, b.height), (0.0, 300.0, 50.0));
    }
}
