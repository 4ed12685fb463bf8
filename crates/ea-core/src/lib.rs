pub mod config;
pub mod error;
pub mod geometry;
pub mod id;
pub mod model;
pub mod scene;
pub mod steps;
pub mod viewport;

pub use config::CanvasConfig;
pub use error::{ApiError, ApiResult};
pub use geometry::{Bounds, Point, Size};
pub use id::{DefectId, ModelId, ObjectId};
pub use model::*;
pub use scene::Scene;
pub use steps::{
    MigrationOutcome, MigrationPreview, MigrationRequest, ParsedStep, auto_parse_steps,
    execute_migration, preview_migration, validate_parsed_steps,
};
pub use viewport::{HitTarget, StageRef, Viewport, ZoomLimits, on_pan_end, on_wheel};
