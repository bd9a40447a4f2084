use thiserror::Error;

/// Main error type for the vendor graph engine
#[derive(Error, Debug)]
pub enum VendorGraphError {
    /// Relational store errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown vendor
    #[error("Not found: {0}")]
    NotFound(String),

    /// Query parameters rejected before traversal
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backend could not serve the request
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Deadline passed or the caller cancelled mid-traversal
    #[error("Traversal budget exceeded: {0}")]
    TraversalBudgetExceeded(String),
}

impl VendorGraphError {
    /// True when another backend could still answer the request: store
    /// failures, plus `NotFound` since a graph snapshot can lag the
    /// relational store.
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            VendorGraphError::Database(_)
                | VendorGraphError::Io(_)
                | VendorGraphError::Serialization(_)
                | VendorGraphError::ServiceUnavailable(_)
                | VendorGraphError::NotFound(_)
        )
    }

    /// Collapse store-level failures into `ServiceUnavailable`, leaving
    /// request-level errors untouched.
    pub fn into_unavailable(self) -> Self {
        match self {
            VendorGraphError::Database(e) => VendorGraphError::ServiceUnavailable(e.to_string()),
            VendorGraphError::Io(e) => VendorGraphError::ServiceUnavailable(e.to_string()),
            VendorGraphError::Serialization(e) => {
                VendorGraphError::ServiceUnavailable(e.to_string())
            }
            other => other,
        }
    }
}

/// Convenient Result type using VendorGraphError
pub type Result<T> = std::result::Result<T, VendorGraphError>;
