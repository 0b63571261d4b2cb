use thiserror::Error;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("malformed note document: {0}")]
    Document(#[source] serde_json::Error),
    #[error("malformed editor settings: {0}")]
    Settings(#[source] serde_json::Error),
    #[error("browser call failed: {0}")]
    Dom(String),
}

pub type Result<T> = std::result::Result<T, EditorError>;
