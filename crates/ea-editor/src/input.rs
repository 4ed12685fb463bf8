//! Input abstraction layer.
//!
//! Normalizes pointer, wheel, and keyboard events from whatever host owns
//! the canvas into one `InputEvent` stream. Pointer positions are in screen
//! pixels relative to the canvas origin.

use ea_core::Point;
use serde::{Deserialize, Serialize};

/// A normalized input event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InputEvent {
    /// Mouse down, touch start, pen contact.
    PointerDown { x: f32, y: f32 },

    PointerMove { x: f32, y: f32 },

    PointerUp { x: f32, y: f32 },

    /// Wheel or trackpad scroll. `pointer` is absent when the host could
    /// not resolve a position (event delivered after unmount).
    Wheel {
        delta_y: f32,
        #[serde(default)]
        pointer: Option<Point>,
    },

    Key { key: Key },
}

/// Keys the canvas reacts to; anything else is carried through as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    Other(String),
}

impl Key {
    /// Map a DOM-style key name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Self::Escape,
            "Delete" | "Del" => Self::Delete,
            "Backspace" => Self::Backspace,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Self::Delete | Self::Backspace)
    }
}

impl InputEvent {
    pub fn pointer_down(x: f32, y: f32) -> Self {
        Self::PointerDown { x, y }
    }

    pub fn pointer_move(x: f32, y: f32) -> Self {
        Self::PointerMove { x, y }
    }

    pub fn pointer_up(x: f32, y: f32) -> Self {
        Self::PointerUp { x, y }
    }

    pub fn key(name: &str) -> Self {
        Self::Key {
            key: Key::from_name(name),
        }
    }

    /// Screen position if this is a pointer event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y } | Self::PointerMove { x, y } | Self::PointerUp { x, y } => {
                Some(Point::new(*x, *y))
            }
            _ => None,
        }
    }
}
