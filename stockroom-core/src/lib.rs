pub mod models;
pub mod commands;
pub mod repository;
pub mod ledger;

pub use models::{Part, PartType, PartWithType, Transaction, TransactionType, TransactionWithType};
pub use commands::{NewPartType, StockAddition, StockRemoval, MAX_QUANTITY};
pub use repository::InventoryRepository;
pub use ledger::{InventoryLedger, LedgerLimits};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Insufficient parts in inventory: requested {requested}, available {available}")]
    InsufficientStock {
        part_id: i64,
        requested: i64,
        available: i64,
    },
    #[error("{0}")]
    Conflict(String),
    #[error("Store error: {0}")]
    Store(#[source] BoxError),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Wraps a failure of the underlying store (driver, pool, decoding).
    pub fn store<E: Into<BoxError>>(err: E) -> Self {
        Self::Store(err.into())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
