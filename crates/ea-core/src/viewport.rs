//! Viewport transform engine.
//!
//! Maps between screen pixels and world (canvas) coordinates:
//! `screen = world * scale + translation`. Wheel zoom keeps the world point
//! under the pointer fixed; pans only commit when the gesture started on the
//! stage itself.
//!
//! A `Viewport` is a `Copy` value and every operation returns a whole new
//! transform, so callers replace scale and translation in one assignment.

use crate::geometry::{Bounds, Point, Size};
use crate::id::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Hard lower zoom bound.
pub const MIN_SCALE: f32 = 0.05;
/// Hard upper zoom bound.
pub const MAX_SCALE: f32 = 10.0;
/// Multiplicative zoom factor per wheel event.
pub const ZOOM_STEP: f32 = 1.1;

/// Scale + translation of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub scale: f32,
    pub x: f32,
    pub y: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Zoom bounds and wheel step in effect for a canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min_scale: f32,
    pub max_scale: f32,
    pub step: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min_scale: MIN_SCALE,
            max_scale: MAX_SCALE,
            step: ZOOM_STEP,
        }
    }
}

impl ZoomLimits {
    /// Clamp into both these limits and the hard bounds.
    pub fn clamp(&self, scale: f32) -> f32 {
        let min = self.min_scale.max(MIN_SCALE);
        let max = self.max_scale.min(MAX_SCALE).max(min);
        scale.clamp(min, max)
    }
}

impl Viewport {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        x: 0.0,
        y: 0.0,
    };

    /// Back to scale 1 with no translation.
    pub fn reset(&mut self) {
        *self = Self::IDENTITY;
    }

    pub fn translation(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// `world = (screen - translation) / scale`
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new((screen.x - self.x) / self.scale, (screen.y - self.y) / self.scale)
    }

    /// `screen = world * scale + translation`
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(world.x * self.scale + self.x, world.y * self.scale + self.y)
    }

    /// Screen-space delta → world-space delta (no translation).
    pub fn screen_delta_to_world(&self, delta: Point) -> Point {
        Point::new(delta.x / self.scale, delta.y / self.scale)
    }

    /// The same transform with its scale clamped into `limits` and any
    /// non-finite component reset to identity. Deserialized viewports may
    /// carry a zero scale, which would make `screen_to_world` divide by zero.
    #[must_use]
    pub fn normalized(&self, limits: &ZoomLimits) -> Self {
        let finite_or = |v: f32, default: f32| if v.is_finite() { v } else { default };
        Self {
            scale: limits.clamp(finite_or(self.scale, 1.0)),
            x: finite_or(self.x, 0.0),
            y: finite_or(self.y, 0.0),
        }
    }

    /// Set the scale (clamped) keeping `anchor` (screen) stationary.
    #[must_use]
    pub fn zoom_to(&self, scale: f32, anchor: Point, limits: &ZoomLimits) -> Self {
        let world = self.normalized(limits).screen_to_world(anchor);
        let scale = limits.clamp(scale);
        Self {
            scale,
            x: anchor.x - world.x * scale,
            y: anchor.y - world.y * scale,
        }
    }

    /// Scale and center `content` inside a `screen`-sized canvas.
    #[must_use]
    pub fn fit_bounds(content: Bounds, screen: Size, padding: f32, limits: &ZoomLimits) -> Self {
        let avail_w = (screen.width - 2.0 * padding).max(1.0);
        let avail_h = (screen.height - 2.0 * padding).max(1.0);
        if content.width <= 0.0 || content.height <= 0.0 {
            let center = content.center();
            return Self {
                scale: 1.0,
                x: screen.width / 2.0 - center.x,
                y: screen.height / 2.0 - center.y,
            };
        }
        let scale = limits.clamp((avail_w / content.width).min(avail_h / content.height));
        let center = content.center();
        Self {
            scale,
            x: screen.width / 2.0 - center.x * scale,
            y: screen.height / 2.0 - center.y * scale,
        }
    }
}

/// Apply one wheel event with the default limits.
///
/// Negative `delta_y` zooms in. A missing pointer (event after unmount) or a
/// zero/non-finite delta leaves the transform unchanged.
pub fn on_wheel(delta_y: f32, pointer: Option<Point>, current: Viewport) -> Viewport {
    on_wheel_with(delta_y, pointer, current, &ZoomLimits::default())
}

/// `on_wheel` with explicit limits.
pub fn on_wheel_with(
    delta_y: f32,
    pointer: Option<Point>,
    current: Viewport,
    limits: &ZoomLimits,
) -> Viewport {
    let Some(pointer) = pointer.filter(Point::is_finite) else {
        log::trace!("wheel without pointer position ignored");
        return current;
    };
    if delta_y == 0.0 || !delta_y.is_finite() {
        return current;
    }

    let current = current.normalized(limits);
    let old_scale = current.scale;
    let new_scale = if delta_y < 0.0 {
        old_scale * limits.step
    } else {
        old_scale / limits.step
    };
    let next = current.zoom_to(new_scale, pointer, limits);
    log::trace!("zoom {old_scale:.3} -> {:.3} at ({}, {})", next.scale, pointer.x, pointer.y);
    next
}

// ─── Pan target discrimination ───────────────────────────────────────────

/// Identity of a mounted canvas root. Minted once per mount, so a handle
/// from a previous mount never compares equal to the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageRef(u64);

impl StageRef {
    pub fn mint() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// What a pointer gesture landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitTarget {
    /// The canvas background.
    Stage(StageRef),
    /// A shape on the canvas.
    Object(ObjectId),
}

/// Commit a pan when the gesture's target is the stage itself.
///
/// Returns `None` (no-op) for gestures that targeted an object or when the
/// stage is gone.
pub fn on_pan_end(
    final_translation: Point,
    target: HitTarget,
    stage: Option<StageRef>,
    current: Viewport,
) -> Option<Viewport> {
    let stage = stage?;
    if target != HitTarget::Stage(stage) || !final_translation.is_finite() {
        return None;
    }
    Some(Viewport {
        scale: current.scale,
        x: final_translation.x,
        y: final_translation.y,
    })
}
