//! Canvas tuning knobs.

use crate::viewport::{MAX_SCALE, MIN_SCALE, ZOOM_STEP, ZoomLimits};
use serde::{Deserialize, Serialize};

/// Configuration for viewport and interaction behavior.
///
/// Zoom limits may be narrowed but never widened past the hard
/// `[MIN_SCALE, MAX_SCALE]` range; `sanitized` enforces that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    pub min_scale: f32,
    pub max_scale: f32,
    /// Multiplicative factor per wheel notch.
    pub zoom_step: f32,
    /// Screen-pixel movement below which a press-release counts as a click.
    pub drag_slop: f32,
    /// World-unit distance within which a connector line counts as hit.
    pub connector_hit_tolerance: f32,
    /// Screen-pixel margin kept around content by `fit_bounds`.
    pub fit_padding: f32,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            zoom_step: ZOOM_STEP,
            drag_slop: 2.0,
            connector_hit_tolerance: 4.0,
            fit_padding: 40.0,
        }
    }
}

impl CanvasConfig {
    /// Clamp every field into its legal range.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if !self.min_scale.is_finite() {
            self.min_scale = defaults.min_scale;
        }
        if !self.max_scale.is_finite() {
            self.max_scale = defaults.max_scale;
        }
        self.min_scale = self.min_scale.clamp(MIN_SCALE, MAX_SCALE);
        self.max_scale = self.max_scale.clamp(self.min_scale, MAX_SCALE);
        if !(self.zoom_step.is_finite() && self.zoom_step > 1.0) {
            log::warn!("zoom step {} ignored, using {}", self.zoom_step, ZOOM_STEP);
            self.zoom_step = ZOOM_STEP;
        }
        self.drag_slop = finite_non_negative(self.drag_slop, defaults.drag_slop);
        self.connector_hit_tolerance =
            finite_non_negative(self.connector_hit_tolerance, defaults.connector_hit_tolerance);
        self.fit_padding = finite_non_negative(self.fit_padding, defaults.fit_padding);
        self
    }

    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits {
            min_scale: self.min_scale,
            max_scale: self.max_scale,
            step: self.zoom_step,
        }
    }

    /// Parse a JSON config document; missing fields take defaults.
    pub fn from_json(text: &str) -> Result<Self, String> {
        serde_json::from_str::<Self>(text)
            .map(Self::sanitized)
            .map_err(|e| format!("Config parse error: {e}"))
    }
}

fn finite_non_negative(value: f32, fallback: f32) -> f32 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = CanvasConfig::from_json(r#"{ "dragSlop": 5 }"#).unwrap();
        assert_eq!(cfg.drag_slop, 5.0);
        assert_eq!(cfg.zoom_step, ZOOM_STEP);
        assert_eq!(cfg.max_scale, MAX_SCALE);
    }

    #[test]
    fn zoom_limits_cannot_widen() {
        let cfg = CanvasConfig::from_json(r#"{ "minScale": 0.001, "maxScale": 50, "zoomStep": 0.5 }"#)
            .unwrap();
        assert_eq!(cfg.min_scale, MIN_SCALE);
        assert_eq!(cfg.max_scale, MAX_SCALE);
        assert_eq!(cfg.zoom_step, ZOOM_STEP);
    }

    #[test]
    fn inverted_limits_collapse() {
        let cfg = CanvasConfig {
            min_scale: 2.0,
            max_scale: 1.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(cfg.min_scale, 2.0);
        assert_eq!(cfg.max_scale, 2.0);
    }
}
