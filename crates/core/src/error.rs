use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("authentication required: {0}")]
    AuthRequired(String),
    #[error("upload error: {0}")]
    Upload(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("data integrity error: {0}")]
    DataIntegrity(String),
    #[error("transport error: {0}")]
    Transport(String),
}
