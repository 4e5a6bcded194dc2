use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormError {
    #[error("Keyname must be unique: {0}")]
    KeynameTaken(String),

    #[error("Display name must be unique: {0}")]
    DisplayNameTaken(String),

    #[error("Keyname is mandatory")]
    EmptyKeyname,

    #[error("Display name is mandatory")]
    EmptyDisplayName,

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Field belongs to the layer and cannot be changed: {0}")]
    ExistingFieldLocked(String),

    #[error("Id is already in use: {0}")]
    DuplicateId(String),

    #[error("Element type cannot change from {from} to {to}")]
    KindChanged { from: &'static str, to: &'static str },

    #[error("{prop} is not a field property of {kind}")]
    NotAFieldProp { kind: &'static str, prop: String },

    #[error("Invalid form item: {0}")]
    InvalidItem(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FormError>;
