use crate::domain::response::ResponseCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BillingError {
    #[error("{code}: {debug_message}")]
    Response {
        code: ResponseCode,
        debug_message: String,
    },
    #[error("A purchase of {0} is already in progress")]
    PurchaseInProgress(String),
    #[error("Pending operation queue is full ({0} queued)")]
    QueueFull(usize),
    #[error("Product details not found for {0}")]
    ProductNotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl BillingError {
    /// Builds an error from a vendor response code.
    pub fn response(code: ResponseCode, debug_message: impl Into<String>) -> Self {
        Self::Response {
            code,
            debug_message: debug_message.into(),
        }
    }

    /// The semantic category reported to listeners.
    ///
    /// Local failures (storage, serialization, queue bookkeeping) have no
    /// vendor counterpart and fall into the generic `Error` category.
    pub fn category(&self) -> ResponseCode {
        match self {
            Self::Response { code, .. } => *code,
            Self::ProductNotFound(_) => ResponseCode::ItemUnavailable,
            _ => ResponseCode::Error,
        }
    }
}

pub type Result<T> = std::result::Result<T, BillingError>;
