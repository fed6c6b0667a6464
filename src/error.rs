use thiserror::Error;

/// Coarse classification of a [`ShipmentError`], stable enough for an API
/// layer to map onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    NotAuthorized,
    Precondition,
    Validation,
    Conflict,
    Upstream,
}

#[derive(Error, Debug)]
pub enum ShipmentError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Not authorized: {0}")]
    NotAuthorized(String),
    #[error("{0}")]
    Precondition(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Tracking number already in use: {0}")]
    DuplicateTrackingNumber(String),
    #[error("Payment gateway error: {0}")]
    GatewayError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ShipmentError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::NotAuthorized(_) => ErrorKind::NotAuthorized,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::ValidationError(_) => ErrorKind::Validation,
            Self::DuplicateTrackingNumber(_) => ErrorKind::Conflict,
            _ => ErrorKind::Upstream,
        }
    }
}

pub type Result<T> = std::result::Result<T, ShipmentError>;
