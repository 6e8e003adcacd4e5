//! Store-level errors

use thiserror::Error;

/// Errors raised by a `NestedSetStore` realization.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("node \"{0}\" missing from store")]
    MissingNode(String),

    #[error("a transaction is already open")]
    TransactionOpen,

    #[error("no transaction is open")]
    NoTransaction,
}

impl StoreError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result type for store primitives.
pub type StoreResult<T> = Result<T, StoreError>;
