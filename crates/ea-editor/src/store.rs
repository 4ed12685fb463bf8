//! The remote data API as seen by the canvas.
//!
//! `ObjectStore` mirrors the REST boundary one method per endpoint. The
//! canvas only ever talks to it through `SceneClient`, which layers caching
//! and failure reporting on top.

use chrono::Utc;
use ea_core::steps::DefectStep;
use ea_core::{
    ApiError, ApiResult, ArchitecturalModel, ArchitecturalObject, DefectId, MigrationOutcome,
    MigrationPreview, MigrationRequest, ModelId, NewObject, ObjectId, ObjectKind, ObjectPatch,
    execute_migration, preview_migration,
};
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::RwLock;

/// Asynchronous object store.
///
/// Every call is made on behalf of the store's current principal; a store
/// without one rejects everything with `Unauthorized`.
pub trait ObjectStore: Send + Sync {
    /// `GET /models`. Models the caller may not read come back redacted.
    fn list_models(&self) -> impl Future<Output = ApiResult<Vec<ArchitecturalModel>>> + Send;

    /// `GET /models/{id}`
    fn get_model(&self, id: ModelId) -> impl Future<Output = ApiResult<ArchitecturalModel>> + Send;

    /// `GET /models/{id}/objects`
    fn list_objects(&self, model: ModelId) -> impl Future<Output = ApiResult<Vec<ArchitecturalObject>>> + Send;

    /// `POST /objects`
    fn create_object(&self, new: NewObject) -> impl Future<Output = ApiResult<ArchitecturalObject>> + Send;

    /// `PATCH /objects/{id}`
    fn patch_object(
        &self,
        id: ObjectId,
        patch: ObjectPatch,
    ) -> impl Future<Output = ApiResult<ArchitecturalObject>> + Send;

    /// `DELETE /objects/{id}`. Returns the removed object.
    fn delete_object(&self, id: ObjectId) -> impl Future<Output = ApiResult<ArchitecturalObject>> + Send;

    /// `POST /defects/{id}/steps/preview-migration`
    fn preview_step_migration(
        &self,
        defect: DefectId,
        text: String,
    ) -> impl Future<Output = ApiResult<MigrationPreview>> + Send;

    /// `POST /defects/{id}/steps/execute-migration`
    fn execute_step_migration(
        &self,
        defect: DefectId,
        request: MigrationRequest,
    ) -> impl Future<Output = ApiResult<MigrationOutcome>> + Send;

    /// `GET /defects/{id}/steps`
    fn list_defect_steps(&self, defect: DefectId) -> impl Future<Output = ApiResult<Vec<DefectStep>>> + Send;
}

// ─── In-memory store ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct StoreState {
    models: Vec<ArchitecturalModel>,
    /// Insertion order doubles as paint order.
    objects: Vec<ArchitecturalObject>,
    defects: HashMap<DefectId, DefectRecord>,
}

#[derive(Debug, Default, Clone)]
struct DefectRecord {
    steps: Vec<DefectStep>,
    original_text: String,
}

/// Process-local `ObjectStore` used by tests, demos, and the CLI.
#[derive(Debug)]
pub struct InMemoryStore {
    principal: Option<String>,
    state: RwLock<StoreState>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl InMemoryStore {
    pub fn new(principal: Option<&str>) -> Self {
        Self {
            principal: principal.map(str::to_string),
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Seed a model before the store is shared.
    pub fn with_model(mut self, model: ArchitecturalModel) -> Self {
        self.state.get_mut().models.push(model);
        self
    }

    /// Original free text recorded by the last migration of `defect`.
    pub async fn original_text(&self, defect: DefectId) -> Option<String> {
        let state = self.state.read().await;
        state.defects.get(&defect).map(|d| d.original_text.clone())
    }

    fn principal(&self) -> ApiResult<&str> {
        self.principal
            .as_deref()
            .ok_or_else(|| ApiError::Unauthorized("no authenticated user".into()))
    }
}

impl StoreState {
    fn model(&self, id: ModelId) -> ApiResult<&ArchitecturalModel> {
        self.models
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| ApiError::not_found("model", id))
    }

    fn readable_model(&self, id: ModelId, user: &str) -> ApiResult<&ArchitecturalModel> {
        let model = self.model(id)?;
        if model.readable_by(user) {
            Ok(model)
        } else {
            Err(ApiError::Unauthorized(format!("{user} may not access model {id}")))
        }
    }

    fn object_index(&self, id: ObjectId) -> ApiResult<usize> {
        self.objects
            .iter()
            .position(|o| o.id == id)
            .ok_or_else(|| ApiError::not_found("object", id))
    }

    /// Both endpoints must exist in `model` and must not be connectors.
    fn check_endpoints(&self, model: ModelId, source: ObjectId, target: ObjectId) -> ApiResult<()> {
        for end in [source, target] {
            let ok = self
                .objects
                .iter()
                .any(|o| o.id == end && o.model_id == model && o.kind != ObjectKind::Connector);
            if !ok {
                return Err(ApiError::Validation(format!(
                    "connector endpoint {end} is not an object of model {model}"
                )));
            }
        }
        Ok(())
    }
}

impl ObjectStore for InMemoryStore {
    async fn list_models(&self) -> ApiResult<Vec<ArchitecturalModel>> {
        let user = self.principal()?;
        let state = self.state.read().await;
        Ok(state
            .models
            .iter()
            .map(|m| {
                if m.readable_by(user) {
                    m.clone()
                } else {
                    ArchitecturalModel::redacted(m.id)
                }
            })
            .collect())
    }

    async fn get_model(&self, id: ModelId) -> ApiResult<ArchitecturalModel> {
        let user = self.principal()?;
        let state = self.state.read().await;
        state.readable_model(id, user).cloned()
    }

    async fn list_objects(&self, model: ModelId) -> ApiResult<Vec<ArchitecturalObject>> {
        let user = self.principal()?;
        let state = self.state.read().await;
        state.readable_model(model, user)?;
        Ok(state
            .objects
            .iter()
            .filter(|o| o.model_id == model)
            .cloned()
            .collect())
    }

    async fn create_object(&self, new: NewObject) -> ApiResult<ArchitecturalObject> {
        let user = self.principal()?;
        let (model_id, kind) = new.required()?;
        let mut state = self.state.write().await;
        state.readable_model(model_id, user)?;
        if let (ObjectKind::Connector, Some(s), Some(t)) = (kind, new.source, new.target) {
            state.check_endpoints(model_id, s, t)?;
        }

        let mut visual = new.visual.unwrap_or_default();
        if let Some(label) = new.label {
            visual.label = label;
        }
        let now = Utc::now();
        let object = ArchitecturalObject {
            id: ObjectId::with_prefix("obj"),
            model_id,
            kind,
            visual,
            description: new.description,
            source: new.source,
            target: new.target,
            properties: new.properties,
            revision: 1,
            created_at: now,
            updated_at: now,
        };
        log::debug!("created {} ({}) in {model_id}", object.id, kind.as_str());
        state.objects.push(object.clone());
        Ok(object)
    }

    async fn patch_object(&self, id: ObjectId, patch: ObjectPatch) -> ApiResult<ArchitecturalObject> {
        let user = self.principal()?;
        let mut state = self.state.write().await;
        let idx = state.object_index(id)?;
        let model_id = state.objects[idx].model_id;
        state.readable_model(model_id, user)?;

        let actual = state.objects[idx].revision;
        if let Some(expected) = patch.expected_revision
            && expected != actual
        {
            return Err(ApiError::Conflict {
                id: id.to_string(),
                expected,
                actual,
            });
        }

        let mut updated = state.objects[idx].clone();
        patch.apply_to(&mut updated)?;
        if updated.kind == ObjectKind::Connector {
            match updated.endpoints() {
                Some((s, t)) => state.check_endpoints(model_id, s, t)?,
                None => {
                    return Err(ApiError::Validation(
                        "connectors require `source` and `target`".into(),
                    ));
                }
            }
        }
        updated.revision = actual + 1;
        updated.updated_at = Utc::now();
        state.objects[idx] = updated.clone();
        Ok(updated)
    }

    async fn delete_object(&self, id: ObjectId) -> ApiResult<ArchitecturalObject> {
        let user = self.principal()?;
        let mut state = self.state.write().await;
        let idx = state.object_index(id)?;
        state.readable_model(state.objects[idx].model_id, user)?;
        Ok(state.objects.remove(idx))
    }

    async fn preview_step_migration(&self, defect: DefectId, text: String) -> ApiResult<MigrationPreview> {
        self.principal()?;
        log::debug!("preview migration for {defect}");
        Ok(preview_migration(&text))
    }

    async fn execute_step_migration(
        &self,
        defect: DefectId,
        request: MigrationRequest,
    ) -> ApiResult<MigrationOutcome> {
        self.principal()?;
        let original_text = request.original_text.clone();
        let outcome = execute_migration(defect, request);
        if !outcome.validation.is_valid {
            log::warn!(
                "persisting {} step(s) for {defect} with {} validation issue(s)",
                outcome.steps.len(),
                outcome.validation.errors.len()
            );
        }
        let mut state = self.state.write().await;
        state.defects.insert(
            defect,
            DefectRecord {
                steps: outcome.steps.clone(),
                original_text,
            },
        );
        Ok(outcome)
    }

    async fn list_defect_steps(&self, defect: DefectId) -> ApiResult<Vec<DefectStep>> {
        self.principal()?;
        let state = self.state.read().await;
        Ok(state
            .defects
            .get(&defect)
            .map(|d| d.steps.clone())
            .unwrap_or_default())
    }
}
