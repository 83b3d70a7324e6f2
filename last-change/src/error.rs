//! Error types for last-change

use state_store::StoreError;

/// Errors that can occur while collecting or encoding LastChange events
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// `start_transaction` was called while a transaction was already open
    #[error("A LastChange transaction is already open")]
    TransactionAlreadyOpen,

    /// `commit` was called with no open transaction
    #[error("No LastChange transaction is open")]
    NoOpenTransaction,

    /// A variable update inside a transaction failed
    #[error("Variable store error: {0}")]
    Store(#[from] StoreError),

    /// The LastChange document could not be written or read
    #[error("LastChange document error: {0}")]
    Document(String),
}

impl From<quick_xml::Error> for CollectorError {
    fn from(err: quick_xml::Error) -> Self {
        CollectorError::Document(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for CollectorError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        CollectorError::Document(err.to_string())
    }
}

/// Result type for last-change operations
pub type Result<T> = std::result::Result<T, CollectorError>;
