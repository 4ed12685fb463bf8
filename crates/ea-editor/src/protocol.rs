//! Scene mutation protocol.
//!
//! `SceneClient` is the only path from the canvas to the store. Reads go
//! through the query cache; mutations go straight to the store and, on
//! success, invalidate the tags they affect instead of patching cached
//! lists by hand. The next read refetches the canonical list.
//!
//! Failures are never retried. They are logged, queued as user-visible
//! notices, and returned to the caller.

use crate::cache::{CachedValue, QueryCache, QueryKey, Tag};
use crate::store::ObjectStore;
use chrono::{DateTime, Utc};
use ea_core::steps::DefectStep;
use ea_core::{
    ApiError, ApiResult, ArchitecturalModel, ArchitecturalObject, DefectId, MigrationOutcome,
    MigrationPreview, MigrationRequest, ModelId, NewObject, ObjectId, ObjectKind, ObjectPatch,
    Visual,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A failure surfaced to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub operation: &'static str,
    pub error: ApiError,
    pub at: DateTime<Utc>,
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.operation, self.error)
    }
}

/// Result of a successful delete.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteOutcome {
    pub removed: ArchitecturalObject,
    /// Connectors of the same model still pointing at the removed object.
    pub dangling: Vec<ObjectId>,
}

pub struct SceneClient<S> {
    store: Arc<S>,
    cache: Mutex<QueryCache>,
    notices: Mutex<VecDeque<Notice>>,
    /// Owning model of every object this client has seen.
    parents: Mutex<HashMap<ObjectId, ModelId>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: ObjectStore> SceneClient<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            cache: Mutex::new(QueryCache::new()),
            notices: Mutex::new(VecDeque::new()),
            parents: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Take every queued notice, oldest first.
    pub fn drain_notices(&self) -> Vec<Notice> {
        lock(&self.notices).drain(..).collect()
    }

    pub fn is_stale(&self, key: QueryKey) -> bool {
        lock(&self.cache).is_stale(&key)
    }

    // ─── Cached reads ────────────────────────────────────────────────────

    pub async fn models(&self) -> ApiResult<Vec<ArchitecturalModel>> {
        let cached = lock(&self.cache).fresh(&QueryKey::Models).cloned();
        if let Some(CachedValue::Models(models)) = cached {
            return Ok(models);
        }
        let result = self.store.list_models().await;
        let models = self.surface("list models", result)?;
        lock(&self.cache).insert(QueryKey::Models, CachedValue::Models(models.clone()));
        Ok(models)
    }

    pub async fn model(&self, id: ModelId) -> ApiResult<ArchitecturalModel> {
        let key = QueryKey::Model(id);
        let cached = lock(&self.cache).fresh(&key).cloned();
        if let Some(CachedValue::Model(model)) = cached {
            return Ok(model);
        }
        let result = self.store.get_model(id).await;
        let model = self.surface("load model", result)?;
        lock(&self.cache).insert(key, CachedValue::Model(model.clone()));
        Ok(model)
    }

    /// Canonical object list of `model`, in paint order.
    pub async fn objects(&self, model: ModelId) -> ApiResult<Vec<ArchitecturalObject>> {
        let key = QueryKey::Objects(model);
        let cached = lock(&self.cache).fresh(&key).cloned();
        if let Some(CachedValue::Objects(objects)) = cached {
            return Ok(objects);
        }
        log::trace!("fetching objects of {model}");
        let result = self.store.list_objects(model).await;
        let objects = self.surface("load objects", result)?;
        {
            let mut parents = lock(&self.parents);
            parents.retain(|_, m| *m != model);
            parents.extend(objects.iter().map(|o| (o.id, model)));
        }
        lock(&self.cache).insert(key, CachedValue::Objects(objects.clone()));
        Ok(objects)
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    /// Create an object. `modelId` and `type` are checked before any
    /// request is made.
    pub async fn create_object(&self, new: NewObject) -> ApiResult<ArchitecturalObject> {
        let checked = new.required().map(|(model, _)| model);
        let model = self.surface("create object", checked)?;
        let result = self.store.create_object(new).await;
        let created = self.surface("create object", result)?;
        lock(&self.parents).insert(created.id, model);
        self.invalidate(Tag::ModelObjects(model));
        Ok(created)
    }

    /// Narrowed patch used by drag: only `visual` changes.
    pub async fn update_object_visuals(&self, id: ObjectId, visual: Visual) -> ApiResult<ArchitecturalObject> {
        self.update_object(id, ObjectPatch::visual(visual)).await
    }

    pub async fn update_object(&self, id: ObjectId, patch: ObjectPatch) -> ApiResult<ArchitecturalObject> {
        if let Some(visual) = &patch.visual {
            self.surface("update object", visual.validate())?;
        }
        let result = self.store.patch_object(id, patch).await;
        let updated = self.surface("update object", result)?;
        lock(&self.parents).insert(id, updated.model_id);
        self.invalidate(Tag::ModelObjects(updated.model_id));
        Ok(updated)
    }

    /// Delete an object. When its parent model is unknown to this client,
    /// every model-object list is invalidated.
    pub async fn delete_object(&self, id: ObjectId) -> ApiResult<DeleteOutcome> {
        let result = self.store.delete_object(id).await;
        let removed = self.surface("delete object", result)?;
        let known_parent = lock(&self.parents).remove(&id);
        let dangling = self.dangling_connectors(removed.model_id, id);
        match known_parent {
            Some(model) => self.invalidate(Tag::ModelObjects(model)),
            None => {
                log::debug!("parent of {id} unknown; invalidating all object lists");
                self.invalidate(Tag::AllModelObjects);
            }
        }
        if !dangling.is_empty() {
            log::warn!("deleting {id} left {} dangling connector(s)", dangling.len());
        }
        Ok(DeleteOutcome { removed, dangling })
    }

    // ─── Step migration ──────────────────────────────────────────────────

    pub async fn preview_step_migration(&self, defect: DefectId, text: &str) -> ApiResult<MigrationPreview> {
        let result = self.store.preview_step_migration(defect, text.to_string()).await;
        self.surface("preview step migration", result)
    }

    pub async fn execute_step_migration(
        &self,
        defect: DefectId,
        request: MigrationRequest,
    ) -> ApiResult<MigrationOutcome> {
        let result = self.store.execute_step_migration(defect, request).await;
        self.surface("execute step migration", result)
    }

    pub async fn defect_steps(&self, defect: DefectId) -> ApiResult<Vec<DefectStep>> {
        let result = self.store.list_defect_steps(defect).await;
        self.surface("load defect steps", result)
    }

    // ─── internals ───────────────────────────────────────────────────────

    fn invalidate(&self, tag: Tag) {
        lock(&self.cache).invalidate(tag);
    }

    /// Connectors in the last cached list of `model` that reference `id`.
    fn dangling_connectors(&self, model: ModelId, id: ObjectId) -> Vec<ObjectId> {
        let cache = lock(&self.cache);
        let Some(CachedValue::Objects(objects)) = cache.peek(&QueryKey::Objects(model)) else {
            return Vec::new();
        };
        objects
            .iter()
            .filter(|o| o.kind == ObjectKind::Connector && o.id != id)
            .filter(|o| o.source == Some(id) || o.target == Some(id))
            .map(|o| o.id)
            .collect()
    }

    fn surface<T>(&self, operation: &'static str, result: ApiResult<T>) -> ApiResult<T> {
        if let Err(error) = &result {
            log::warn!("{operation} failed: {error}");
            lock(&self.notices).push_back(Notice {
                operation,
                error: error.clone(),
                at: Utc::now(),
            });
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use ea_core::{Point, Size};
    use pretty_assertions::assert_eq;

    fn client(model: &str) -> (SceneClient<InMemoryStore>, ModelId) {
        let id = ModelId::intern(model);
        let store = InMemoryStore::new(Some("alice")).with_model(ArchitecturalModel::new(id, "Model"));
        (SceneClient::new(Arc::new(store)), id)
    }

    fn block(model: ModelId, x: f32) -> NewObject {
        NewObject::new(model, ObjectKind::Shape, Visual::at(Point::new(x, 0.0), Size::default()))
    }

    #[tokio::test]
    async fn missing_type_fails_before_request() {
        let (c, m) = client("pc_missing");
        let mut new = block(m, 0.0);
        new.kind = None;
        let err = c.create_object(new).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(c.drain_notices().len(), 1);
        assert!(c.drain_notices().is_empty());
        assert!(c.objects(m).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_invalidates_only_its_model() {
        let (c, m) = client("pc_create");
        c.objects(m).await.unwrap();
        c.models().await.unwrap();
        c.create_object(block(m, 0.0)).await.unwrap();
        assert!(c.is_stale(QueryKey::Objects(m)));
        assert!(!c.is_stale(QueryKey::Models));
        assert_eq!(c.objects(m).await.unwrap().len(), 1);
        assert!(!c.is_stale(QueryKey::Objects(m)));
    }

    #[tokio::test]
    async fn invalid_visual_is_rejected_client_side() {
        let (c, m) = client("pc_visual");
        let obj = c.create_object(block(m, 0.0)).await.unwrap();
        let bad = Visual::at(Point::new(f32::NAN, 0.0), Size::default());
        let err = c.update_object_visuals(obj.id, bad).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert_eq!(c.drain_notices()[0].operation, "update object");
    }

    #[tokio::test]
    async fn unknown_parent_invalidates_every_list() {
        let a = ModelId::intern("pc_parent_a");
        let b = ModelId::intern("pc_parent_b");
        let store = Arc::new(
            InMemoryStore::new(Some("alice"))
                .with_model(ArchitecturalModel::new(a, "A"))
                .with_model(ArchitecturalModel::new(b, "B")),
        );
        // Object created through a different client, so this one never saw it.
        let other = SceneClient::new(store.clone());
        let obj = other.create_object(block(a, 0.0)).await.unwrap();

        let c = SceneClient::new(store);
        c.objects(b).await.unwrap();
        c.delete_object(obj.id).await.unwrap();
        assert!(c.is_stale(QueryKey::Objects(b)));
    }
}
