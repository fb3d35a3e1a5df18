use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("student '{0}' not found")]
    StudentNotFound(String),

    #[error("fee structure not found for class {0}")]
    FeeStructureNotFound(u8),

    #[error("student with id '{0}' already exists")]
    Conflict(String),

    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("corrupt '{key}' collection: {source}")]
    Corrupt {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl StoreError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        StoreError::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable code reported to IPC clients.
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::StudentNotFound(_) => "not_found",
            StoreError::FeeStructureNotFound(_) => "fee_structure_not_found",
            StoreError::Conflict(_) => "conflict",
            StoreError::Validation { .. } => "validation",
            StoreError::Corrupt { .. } | StoreError::Storage(_) => "storage_failed",
        }
    }
}
