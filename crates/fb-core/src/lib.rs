pub mod admit;
pub mod check;
pub mod error;
pub mod fields;
pub mod id;
pub mod legacy;
pub mod locate;
pub mod model;
pub mod mutate;
pub mod persist;
pub mod registry;

pub use check::{Diagnostic, Severity, check_document};
pub use error::{FormError, Result};
pub use fields::{FieldPatch, FieldStatus, FieldTemplate};
pub use id::{IdAllocator, ListId, NodeId};
pub use legacy::to_legacy;
pub use model::*;
pub use mutate::{MoveOutcome, MoveRejection};
pub use persist::{Item, PersistedDocument, PersistedField, PersistedTab, deserialize, serialize};
