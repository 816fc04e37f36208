use async_trait::async_trait;

use crate::commands::{NewPartType, StockAddition, StockRemoval};
use crate::models::{PartType, PartWithType, Transaction, TransactionWithType};
use crate::LedgerResult;

/// Storage seam for the inventory ledger.
///
/// Implementations receive already-validated input. Every mutating method must
/// apply all of its statements atomically: either the whole effect is visible
/// afterwards or none of it is.
#[async_trait]
pub trait InventoryRepository: Send + Sync {
    /// All part types, sorted by name ascending.
    async fn list_part_types(&self) -> LedgerResult<Vec<PartType>>;

    /// Inserts the part type and its zero-count part in one unit.
    async fn create_part_type(&self, input: &NewPartType) -> LedgerResult<PartType>;

    /// All parts joined with their type, sorted by part type name.
    async fn list_parts(&self) -> LedgerResult<Vec<PartWithType>>;

    async fn add_parts(&self, input: &StockAddition) -> LedgerResult<Transaction>;

    /// Fails with `InsufficientStock` without mutating anything when the part
    /// holds fewer than `input.quantity` units.
    async fn remove_parts(&self, input: &StockRemoval) -> LedgerResult<Transaction>;

    /// The newest `limit` transactions, newest first.
    async fn list_transactions(&self, limit: i64) -> LedgerResult<Vec<TransactionWithType>>;

    async fn delete_part_type(&self, part_type_id: i64) -> LedgerResult<()>;
}
