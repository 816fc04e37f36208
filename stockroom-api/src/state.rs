use std::sync::Arc;
use stockroom_core::InventoryLedger;
use stockroom_store::DbClient;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbClient>,
    pub ledger: Arc<InventoryLedger>,
}

impl AppState {
    pub fn new(db: DbClient, ledger: InventoryLedger) -> Self {
        Self {
            db: Arc::new(db),
            ledger: Arc::new(ledger),
        }
    }
}
