use thiserror::Error;

pub type Result<T> = std::result::Result<T, TasklineError>;

#[derive(Debug, Error)]
pub enum TasklineError {
    #[error("Ticket not found: {0}")]
    TicketNotFound(i64),

    #[error("User {user_id} is not assigned to project {project_id}")]
    AccessDenied { user_id: i64, project_id: i64 },

    #[error("Headline missing")]
    MissingHeadline,

    #[error("Invalid date input: {0}")]
    InvalidDate(String),

    #[error("Invalid ticket reference: {0}")]
    InvalidReference(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl TasklineError {
    /// True for the rejections a caller renders as a form message rather
    /// than a generic failure notice.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TasklineError::AccessDenied { .. } | TasklineError::MissingHeadline
        )
    }
}
