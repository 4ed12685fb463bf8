//! Architecture data model: models, the objects placed on their canvas, and
//! the create/patch payloads exchanged with the object store.
//!
//! Field names follow the JSON wire format (`camelCase`, `type` for the kind
//! discriminator) so the same structs serve as request and response bodies.

use crate::error::{ApiError, ApiResult};
use crate::geometry::{Bounds, Point, Size};
use crate::id::{ModelId, ObjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0], serialized as a hex string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let short = |i: usize| hex_val(bytes[i]).map(|v| (v * 17) as f32 / 255.0);
        let long = |i: usize| {
            Some((hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) as f32 / 255.0)
        };

        match bytes.len() {
            3 => Some(Self::rgba(short(0)?, short(1)?, short(2)?, 1.0)),
            4 => Some(Self::rgba(short(0)?, short(1)?, short(2)?, short(3)?)),
            6 => Some(Self::rgba(long(0)?, long(2)?, long(4)?, 1.0)),
            8 => Some(Self::rgba(long(0)?, long(2)?, long(4)?, long(6)?)),
            _ => None,
        }
    }

    /// Shortest `#RRGGBB[AA]` form.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

impl Default for Color {
    fn default() -> Self {
        // Neutral slate used by the shape palette when no color is set.
        Self::rgba(0.39, 0.45, 0.55, 1.0)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid color `{s}`")))
    }
}

// ─── Objects ─────────────────────────────────────────────────────────────

/// Discriminator of the renderable node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Service,
    Database,
    /// Generic rectangle-based shape.
    Shape,
    Connector,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Database => "database",
            Self::Shape => "shape",
            Self::Connector => "connector",
        }
    }
}

/// Visual sub-structure of an object: where and how it is drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visual {
    pub position: Point,
    pub size: Size,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub label: String,
}

impl Visual {
    pub fn at(position: Point, size: Size) -> Self {
        Self {
            position,
            size,
            color: Color::default(),
            label: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_origin_size(self.position, self.size)
    }

    /// Position must be finite and size strictly positive.
    pub fn validate(&self) -> ApiResult<()> {
        if !self.position.is_finite() {
            return Err(ApiError::Validation(format!(
                "position must be finite, got ({}, {})",
                self.position.x, self.position.y
            )));
        }
        if !self.size.is_positive() {
            return Err(ApiError::Validation(format!(
                "size must be positive, got {}x{}",
                self.size.width, self.size.height
            )));
        }
        Ok(())
    }
}

impl Default for Visual {
    fn default() -> Self {
        Self::at(Point::ORIGIN, Size::default())
    }
}

/// A node instance placed on exactly one model's canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchitecturalObject {
    pub id: ObjectId,
    pub model_id: ModelId,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub visual: Visual,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Connector endpoints. Unused for other kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,
    /// Bumped by every accepted patch; used for compare-and-swap updates.
    #[serde(default)]
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ArchitecturalObject {
    pub fn label(&self) -> &str {
        &self.visual.label
    }

    pub fn bounds(&self) -> Bounds {
        self.visual.bounds()
    }

    pub fn endpoints(&self) -> Option<(ObjectId, ObjectId)> {
        match (self.kind, self.source, self.target) {
            (ObjectKind::Connector, Some(s), Some(t)) => Some((s, t)),
            _ => None,
        }
    }
}

/// Attributes of `POST /objects`. `modelId` and `type` are required; they
/// are optional here so a missing field surfaces as a `Validation` error
/// rather than a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewObject {
    #[serde(default)]
    pub model_id: Option<ModelId>,
    #[serde(default, rename = "type")]
    pub kind: Option<ObjectKind>,
    #[serde(default)]
    pub visual: Option<Visual>,
    /// Overrides `visual.label` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl NewObject {
    pub fn new(model_id: ModelId, kind: ObjectKind, visual: Visual) -> Self {
        Self {
            model_id: Some(model_id),
            kind: Some(kind),
            visual: Some(visual),
            ..Default::default()
        }
    }

    /// A connector between two existing objects.
    pub fn connector(model_id: ModelId, source: ObjectId, target: ObjectId) -> Self {
        Self {
            source: Some(source),
            target: Some(target),
            ..Self::new(model_id, ObjectKind::Connector, Visual::default())
        }
    }

    /// Check the required attributes and return them.
    pub fn required(&self) -> ApiResult<(ModelId, ObjectKind)> {
        let model_id = self
            .model_id
            .ok_or_else(|| ApiError::Validation("`modelId` is required".into()))?;
        let kind = self
            .kind
            .ok_or_else(|| ApiError::Validation("`type` is required".into()))?;
        if kind == ObjectKind::Connector && (self.source.is_none() || self.target.is_none()) {
            return Err(ApiError::Validation(
                "connectors require `source` and `target`".into(),
            ));
        }
        if let Some(visual) = &self.visual {
            visual.validate()?;
        }
        Ok((model_id, kind))
    }
}

/// Partial update of `PATCH /objects/{id}`. Absent fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual: Option<Visual>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ObjectKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, serde_json::Value>>,
    /// When set, the patch only applies if the stored revision matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_revision: Option<u64>,
}

impl ObjectPatch {
    /// The narrowed drag path: only the visual changes.
    pub fn visual(visual: Visual) -> Self {
        Self {
            visual: Some(visual),
            ..Default::default()
        }
    }

    pub fn expecting(mut self, revision: u64) -> Self {
        self.expected_revision = Some(revision);
        self
    }

    pub fn is_visual_only(&self) -> bool {
        self.visual.is_some()
            && self.kind.is_none()
            && self.description.is_none()
            && self.source.is_none()
            && self.target.is_none()
            && self.properties.is_none()
    }

    /// Apply onto `object`. Validates the visual but not revisions; the
    /// store owns the compare-and-swap.
    pub fn apply_to(&self, object: &mut ArchitecturalObject) -> ApiResult<()> {
        if let Some(visual) = &self.visual {
            visual.validate()?;
            object.visual = visual.clone();
        }
        if let Some(kind) = self.kind {
            object.kind = kind;
        }
        if let Some(description) = &self.description {
            object.description = Some(description.clone());
        }
        if let Some(source) = self.source {
            object.source = Some(source);
        }
        if let Some(target) = self.target {
            object.target = Some(target);
        }
        if let Some(properties) = &self.properties {
            object.properties = properties.clone();
        }
        Ok(())
    }
}

// ─── Models ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelStatus {
    #[default]
    Active,
    Archived,
}

/// Label shown in list views for models the caller may not read.
pub const REDACTED_NAME: &str = "[Removed]";

/// A named container of architectural objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchitecturalModel {
    pub id: ModelId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default, rename = "type")]
    pub model_type: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub stakeholders: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas_data: Option<serde_json::Value>,
    #[serde(default)]
    pub status: ModelStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ArchitecturalModel {
    pub fn new(id: ModelId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description: String::new(),
            domain: String::new(),
            model_type: String::new(),
            version: "1.0".into(),
            state: "draft".into(),
            owner: None,
            stakeholders: Vec::new(),
            canvas_data: None,
            status: ModelStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Placeholder that keeps a list row without leaking its content.
    pub fn redacted(id: ModelId) -> Self {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        Self {
            id,
            name: REDACTED_NAME.into(),
            description: String::new(),
            domain: String::new(),
            model_type: String::new(),
            version: String::new(),
            state: String::new(),
            owner: None,
            stakeholders: Vec::new(),
            canvas_data: None,
            status: ModelStatus::Active,
            created_at: epoch,
            updated_at: epoch,
        }
    }

    pub fn is_redacted(&self) -> bool {
        self.name == REDACTED_NAME && self.owner.is_none()
    }

    /// Owner, stakeholders, and everyone on unowned models may read.
    pub fn readable_by(&self, user: &str) -> bool {
        match &self.owner {
            None => true,
            Some(owner) => owner == user || self.stakeholders.iter().any(|s| s == user),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn color_hex_roundtrip() {
        let c = Color::from_hex("#4F46E5").unwrap();
        assert_eq!(c.to_hex(), "#4F46E5");

        let c2 = Color::from_hex("#FF000080").unwrap();
        assert!((c2.a - 128.0 / 255.0).abs() < 0.01);
        assert_eq!(c2.to_hex().len(), 9);

        assert_eq!(Color::from_hex("#fff").unwrap().to_hex(), "#FFFFFF");
        assert!(Color::from_hex("#12").is_none());
    }

    #[test]
    fn object_wire_format() {
        let json = r##"{
            "id": "o1",
            "modelId": "m1",
            "type": "database",
            "visual": {
                "position": { "x": 10, "y": 20 },
                "size": { "width": 120, "height": 80 },
                "color": "#22C55E",
                "label": "orders"
            },
            "createdAt": "2025-01-01T00:00:00Z",
            "updatedAt": "2025-01-01T00:00:00Z"
        }"##;
        let obj: ArchitecturalObject = serde_json::from_str(json).unwrap();
        assert_eq!(obj.kind, ObjectKind::Database);
        assert_eq!(obj.model_id, ModelId::intern("m1"));
        assert_eq!(obj.label(), "orders");
        assert_eq!(obj.revision, 0);

        let out = serde_json::to_value(&obj).unwrap();
        assert_eq!(out["type"], "database");
        assert_eq!(out["visual"]["color"], "#22C55E");
        assert!(out.get("source").is_none());
    }

    #[test]
    fn new_object_requires_type_and_model() {
        let missing_type = NewObject {
            model_id: Some(ModelId::intern("m1")),
            ..Default::default()
        };
        assert!(matches!(missing_type.required(), Err(ApiError::Validation(_))));

        let missing_model = NewObject {
            kind: Some(ObjectKind::Service),
            ..Default::default()
        };
        assert!(matches!(missing_model.required(), Err(ApiError::Validation(_))));

        let ok = NewObject::new(ModelId::intern("m1"), ObjectKind::Service, Visual::default());
        assert!(ok.required().is_ok());
    }

    #[test]
    fn visual_rejects_bad_geometry() {
        let mut v = Visual::default();
        v.size = Size::new(0.0, 10.0);
        assert!(v.validate().is_err());
        v.size = Size::new(10.0, 10.0);
        v.position = Point::new(f32::NAN, 0.0);
        assert!(v.validate().is_err());
    }

    #[test]
    fn visual_patch_detection() {
        let patch = ObjectPatch::visual(Visual::default());
        assert!(patch.is_visual_only());
        let patch = ObjectPatch {
            description: Some("x".into()),
            ..ObjectPatch::visual(Visual::default())
        };
        assert!(!patch.is_visual_only());
    }

    #[test]
    fn model_access() {
        let mut m = ArchitecturalModel::new(ModelId::intern("m_acl"), "Payments");
        assert!(m.readable_by("anyone"));
        m.owner = Some("ana".into());
        m.stakeholders.push("li".into());
        assert!(m.readable_by("ana"));
        assert!(m.readable_by("li"));
        assert!(!m.readable_by("eve"));
        assert!(ArchitecturalModel::redacted(m.id).is_redacted());
    }
}
