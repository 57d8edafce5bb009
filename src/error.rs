pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Writes against a document discovered on disk.
    #[error("file-backed document is read-only: {0}")]
    ReadOnly(String),

    #[error("invalid request: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn document_not_found(id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: "document",
            id: id.into(),
        }
    }
}
