pub mod cache;
pub mod canvas;
pub mod input;
pub mod interaction;
pub mod protocol;
pub mod store;

pub use canvas::{CanvasSession, FlushReport};
pub use input::{InputEvent, Key};
pub use interaction::{Hit, Intent, InteractionMachine, InteractionState, ShapeEvents};
pub use protocol::{DeleteOutcome, Notice, SceneClient};
pub use store::{InMemoryStore, ObjectStore};
