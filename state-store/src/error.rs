//! Error types for state-store

use crate::variable::VariableId;

/// Errors returned by [`VariableContainer`](crate::VariableContainer) operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The id is outside the range the container was built with
    #[error("Unknown variable id: {0}")]
    UnknownVariable(VariableId),
}

/// Result type for state-store operations
pub type Result<T> = std::result::Result<T, StoreError>;
