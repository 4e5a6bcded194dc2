pub mod config;
pub mod drag;
pub mod input;
pub mod store;

pub use config::EditorConfig;
pub use drag::{DragResolver, DragState, DropOutcome, DropRejection, Grab};
pub use input::{DropTarget, GestureEvent};
pub use store::{ChangeNotification, EditorStore};
