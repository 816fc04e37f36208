use std::sync::Arc;
use tracing::{info, warn};

use crate::commands::{positive_id, NewPartType, StockAddition, StockRemoval};
use crate::models::{PartType, PartWithType, Transaction, TransactionWithType};
use crate::repository::InventoryRepository;
use crate::{LedgerError, LedgerResult};

/// Bounds applied to `list_transactions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerLimits {
    pub default_transaction_limit: i64,
    pub max_transaction_limit: i64,
}

impl Default for LedgerLimits {
    fn default() -> Self {
        Self {
            default_transaction_limit: 50,
            max_transaction_limit: 500,
        }
    }
}

/// Owns all reads and writes of part types, parts and transactions.
///
/// Input is validated here; consistency of the count and the audit log is the
/// repository's job.
#[derive(Clone)]
pub struct InventoryLedger {
    repo: Arc<dyn InventoryRepository>,
    limits: LedgerLimits,
}

impl InventoryLedger {
    pub fn new(repo: Arc<dyn InventoryRepository>, limits: LedgerLimits) -> Self {
        Self { repo, limits }
    }

    pub async fn list_part_types(&self) -> LedgerResult<Vec<PartType>> {
        self.repo.list_part_types().await
    }

    pub async fn create_part_type(&self, input: NewPartType) -> LedgerResult<PartType> {
        let input = input.validated()?;
        let part_type = self.repo.create_part_type(&input).await?;
        info!(part_type_id = part_type.id, name = %part_type.name, "Created part type");
        Ok(part_type)
    }

    pub async fn list_parts(&self) -> LedgerResult<Vec<PartWithType>> {
        self.repo.list_parts().await
    }

    pub async fn add_parts(&self, input: StockAddition) -> LedgerResult<Transaction> {
        let input = input.validated()?;
        let transaction = self.repo.add_parts(&input).await?;
        info!(
            part_id = input.part_id,
            quantity = input.quantity,
            user = %input.user_name,
            transaction_id = transaction.id,
            "Added parts"
        );
        Ok(transaction)
    }

    pub async fn remove_parts(&self, input: StockRemoval) -> LedgerResult<Transaction> {
        let input = input.validated()?;
        match self.repo.remove_parts(&input).await {
            Ok(transaction) => {
                info!(
                    part_id = input.part_id,
                    quantity = input.quantity,
                    user = %input.user_name,
                    reason = %input.reason,
                    transaction_id = transaction.id,
                    "Removed parts"
                );
                Ok(transaction)
            }
            Err(err @ LedgerError::InsufficientStock { .. }) => {
                warn!(part_id = input.part_id, "Rejected removal: {}", err);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Most recent transactions, newest first. `None` means the configured
    /// default; values above the configured maximum are clamped.
    pub async fn list_transactions(&self, limit: Option<i64>) -> LedgerResult<Vec<TransactionWithType>> {
        let limit = limit.unwrap_or(self.limits.default_transaction_limit);
        if limit <= 0 {
            return Err(LedgerError::validation("limit must be a positive integer"));
        }
        self.repo
            .list_transactions(limit.min(self.limits.max_transaction_limit))
            .await
    }

    pub async fn delete_part_type(&self, part_type_id: i64) -> LedgerResult<()> {
        let part_type_id = positive_id("id", part_type_id)?;
        match self.repo.delete_part_type(part_type_id).await {
            Ok(()) => {
                info!(part_type_id, "Deleted part type");
                Ok(())
            }
            Err(err @ LedgerError::Conflict(_)) => {
                warn!(part_type_id, "Rejected part type deletion: {}", err);
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}
