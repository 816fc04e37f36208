use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool};
use stockroom_core::{
    InventoryRepository, LedgerError, LedgerResult, NewPartType, Part, PartType, PartWithType,
    StockAddition, StockRemoval, Transaction, TransactionType, TransactionWithType,
};

pub struct SqliteInventoryRepository {
    pool: SqlitePool,
}

impl SqliteInventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct PartTypeRow {
    id: i64,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PartTypeRow> for PartType {
    fn from(row: PartTypeRow) -> Self {
        PartType {
            id: row.id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PartRow {
    id: i64,
    part_type_id: i64,
    current_count: i64,
    created_at: DateTime<Utc>,
}

impl From<PartRow> for Part {
    fn from(row: PartRow) -> Self {
        Part {
            id: row.id,
            part_type_id: row.part_type_id,
            current_count: row.current_count,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PartWithTypeRow {
    #[sqlx(flatten)]
    part: PartRow,
    part_type_name: String,
    part_type_description: Option<String>,
    part_type_created_at: DateTime<Utc>,
}

impl From<PartWithTypeRow> for PartWithType {
    fn from(row: PartWithTypeRow) -> Self {
        PartWithType {
            part_type: PartType {
                id: row.part.part_type_id,
                name: row.part_type_name,
                description: row.part_type_description,
                created_at: row.part_type_created_at,
            },
            part: row.part.into(),
        }
    }
}

#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    part_id: i64,
    transaction_type: String,
    quantity: i64,
    user_name: String,
    reason: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = LedgerError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let transaction_type: TransactionType =
            row.transaction_type.parse().map_err(LedgerError::store)?;
        Ok(Transaction {
            id: row.id,
            part_id: row.part_id,
            transaction_type,
            quantity: row.quantity,
            user_name: row.user_name,
            reason: row.reason,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TransactionWithTypeRow {
    #[sqlx(flatten)]
    transaction: TransactionRow,
    part_type_name: String,
}

const TRANSACTION_COLUMNS: &str =
    "id, part_id, transaction_type, quantity, user_name, reason, description, created_at";

/// Appends one audit row inside the caller's transaction.
async fn insert_transaction(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    part_id: i64,
    transaction_type: TransactionType,
    quantity: i64,
    user_name: &str,
    reason: Option<&str>,
    description: Option<&str>,
) -> LedgerResult<Transaction> {
    let sql = format!(
        r#"
        INSERT INTO transactions (part_id, transaction_type, quantity, user_name, reason, description, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING {}
        "#,
        TRANSACTION_COLUMNS
    );

    let row: TransactionRow = sqlx::query_as(&sql)
        .bind(part_id)
        .bind(transaction_type.as_str())
        .bind(quantity)
        .bind(user_name)
        .bind(reason)
        .bind(description)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await
        .map_err(LedgerError::store)?;

    row.try_into()
}

async fn current_count(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    part_id: i64,
) -> LedgerResult<Option<i64>> {
    sqlx::query_scalar("SELECT current_count FROM parts WHERE id = ?")
        .bind(part_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(LedgerError::store)
}

fn part_not_found(part_id: i64) -> LedgerError {
    LedgerError::NotFound(format!("Part {} not found", part_id))
}

/// Explains why a guarded part type delete matched nothing. Runs inside the
/// same write transaction, so the answer reflects the state the delete saw.
async fn deletion_blocker(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    part_type_id: i64,
) -> LedgerResult<LedgerError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM part_types WHERE id = ?")
        .bind(part_type_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(LedgerError::store)?;

    if exists.is_none() {
        return Ok(LedgerError::NotFound(format!("Part type {} not found", part_type_id)));
    }

    let history: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM transactions t
        JOIN parts p ON t.part_id = p.id
        WHERE p.part_type_id = ?
        "#,
    )
    .bind(part_type_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(LedgerError::store)?;

    if history > 0 {
        return Ok(LedgerError::Conflict(
            "Cannot delete part type with existing transactions".to_string(),
        ));
    }

    let stocked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM parts WHERE part_type_id = ? AND current_count > 0",
    )
    .bind(part_type_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(LedgerError::store)?;

    if stocked > 0 {
        return Ok(LedgerError::Conflict(
            "Cannot delete part type with current inventory".to_string(),
        ));
    }

    Ok(LedgerError::Conflict(format!(
        "Part type {} still has parts attached",
        part_type_id
    )))
}

#[async_trait]
impl InventoryRepository for SqliteInventoryRepository {
    async fn list_part_types(&self) -> LedgerResult<Vec<PartType>> {
        let rows: Vec<PartTypeRow> = sqlx::query_as(
            "SELECT id, name, description, created_at FROM part_types ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(LedgerError::store)?;

        Ok(rows.into_iter().map(PartType::from).collect())
    }

    async fn create_part_type(&self, input: &NewPartType) -> LedgerResult<PartType> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(LedgerError::store)?;

        let row: PartTypeRow = sqlx::query_as(
            r#"
            INSERT INTO part_types (name, description, created_at)
            VALUES (?, ?, ?)
            RETURNING id, name, description, created_at
            "#,
        )
        .bind(&input.name)
        .bind(input.description.as_deref())
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(LedgerError::store)?;

        sqlx::query("INSERT INTO parts (part_type_id, current_count, created_at) VALUES (?, 0, ?)")
            .bind(row.id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(LedgerError::store)?;

        tx.commit().await.map_err(LedgerError::store)?;

        Ok(row.into())
    }

    async fn list_parts(&self) -> LedgerResult<Vec<PartWithType>> {
        let rows: Vec<PartWithTypeRow> = sqlx::query_as(
            r#"
            SELECT
                p.id, p.part_type_id, p.current_count, p.created_at,
                pt.name AS part_type_name,
                pt.description AS part_type_description,
                pt.created_at AS part_type_created_at
            FROM parts p
            JOIN part_types pt ON p.part_type_id = pt.id
            ORDER BY pt.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(LedgerError::store)?;

        Ok(rows.into_iter().map(PartWithType::from).collect())
    }

    async fn add_parts(&self, input: &StockAddition) -> LedgerResult<Transaction> {
        let mut tx = self.pool.begin().await.map_err(LedgerError::store)?;

        // SQLite promotes an overflowing integer sum to REAL instead of
        // failing, so the headroom check has to be part of the update.
        let updated = sqlx::query(
            "UPDATE parts SET current_count = current_count + ? WHERE id = ? AND current_count <= ? - ?",
        )
        .bind(input.quantity)
        .bind(input.part_id)
        .bind(i64::MAX)
        .bind(input.quantity)
        .execute(&mut *tx)
        .await
        .map_err(LedgerError::store)?;

        if updated.rows_affected() == 0 {
            return match current_count(&mut tx, input.part_id).await? {
                None => Err(part_not_found(input.part_id)),
                Some(current) => Err(LedgerError::Conflict(format!(
                    "Adding {} parts would overflow the inventory count (current {})",
                    input.quantity, current
                ))),
            };
        }

        let transaction = insert_transaction(
            &mut tx,
            input.part_id,
            TransactionType::Add,
            input.quantity,
            &input.user_name,
            None,
            input.description.as_deref(),
        )
        .await?;

        tx.commit().await.map_err(LedgerError::store)?;

        Ok(transaction)
    }

    async fn remove_parts(&self, input: &StockRemoval) -> LedgerResult<Transaction> {
        let mut tx = self.pool.begin().await.map_err(LedgerError::store)?;

        // Check and decrement in one statement; no window for a concurrent
        // removal to slip between them.
        let updated = sqlx::query(
            "UPDATE parts SET current_count = current_count - ? WHERE id = ? AND current_count >= ?",
        )
        .bind(input.quantity)
        .bind(input.part_id)
        .bind(input.quantity)
        .execute(&mut *tx)
        .await
        .map_err(LedgerError::store)?;

        if updated.rows_affected() == 0 {
            return match current_count(&mut tx, input.part_id).await? {
                None => Err(part_not_found(input.part_id)),
                Some(available) => Err(LedgerError::InsufficientStock {
                    part_id: input.part_id,
                    requested: input.quantity,
                    available,
                }),
            };
        }

        let transaction = insert_transaction(
            &mut tx,
            input.part_id,
            TransactionType::Remove,
            input.quantity,
            &input.user_name,
            Some(&input.reason),
            input.description.as_deref(),
        )
        .await?;

        tx.commit().await.map_err(LedgerError::store)?;

        Ok(transaction)
    }

    async fn list_transactions(&self, limit: i64) -> LedgerResult<Vec<TransactionWithType>> {
        let rows: Vec<TransactionWithTypeRow> = sqlx::query_as(
            r#"
            SELECT
                t.id, t.part_id, t.transaction_type, t.quantity, t.user_name,
                t.reason, t.description, t.created_at,
                pt.name AS part_type_name
            FROM transactions t
            JOIN parts p ON t.part_id = p.id
            JOIN part_types pt ON p.part_type_id = pt.id
            ORDER BY t.created_at DESC, t.id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(LedgerError::store)?;

        rows.into_iter()
            .map(|row| -> LedgerResult<TransactionWithType> {
                Ok(TransactionWithType {
                    transaction: row.transaction.try_into()?,
                    part_type_name: row.part_type_name,
                })
            })
            .collect()
    }

    async fn delete_part_type(&self, part_type_id: i64) -> LedgerResult<()> {
        let mut tx = self.pool.begin().await.map_err(LedgerError::store)?;

        // Write first: a deferred transaction that reads before its first
        // write cannot wait out a concurrent writer and fails with SQLITE_BUSY.
        // The guards live in the delete predicates, so only an empty part
        // without history goes, and the type only goes once it has no part.
        sqlx::query(
            r#"
            DELETE FROM parts
            WHERE part_type_id = ?
              AND current_count = 0
              AND NOT EXISTS (SELECT 1 FROM transactions t WHERE t.part_id = parts.id)
            "#,
        )
        .bind(part_type_id)
        .execute(&mut *tx)
        .await
        .map_err(LedgerError::store)?;

        let deleted = sqlx::query(
            r#"
            DELETE FROM part_types
            WHERE id = ?
              AND NOT EXISTS (SELECT 1 FROM parts WHERE part_type_id = ?)
            "#,
        )
        .bind(part_type_id)
        .bind(part_type_id)
        .execute(&mut *tx)
        .await
        .map_err(LedgerError::store)?;

        if deleted.rows_affected() == 0 {
            // Dropping `tx` rolls back the part delete above.
            return Err(deletion_blocker(&mut tx, part_type_id).await?);
        }

        tx.commit().await.map_err(LedgerError::store)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbClient;

    async fn repo() -> (SqliteInventoryRepository, DbClient) {
        let db = DbClient::in_memory().await.unwrap();
        (SqliteInventoryRepository::new(db.pool.clone()), db)
    }

    async fn widget(repo: &SqliteInventoryRepository, name: &str) -> Part {
        let part_type = repo
            .create_part_type(&NewPartType::new(name, Some("test".to_string())))
            .await
            .unwrap();
        repo.list_parts()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.part)
            .find(|p| p.part_type_id == part_type.id)
            .unwrap()
    }

    fn addition(part_id: i64, quantity: i64) -> StockAddition {
        StockAddition {
            part_id,
            quantity,
            user_name: "alex".to_string(),
            description: None,
        }
    }

    fn removal(part_id: i64, quantity: i64) -> StockRemoval {
        StockRemoval {
            part_id,
            quantity,
            user_name: "alex".to_string(),
            reason: "used in build".to_string(),
            description: Some("line 3".to_string()),
        }
    }

    async fn transaction_count(db: &DbClient) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
            .fetch_one(&db.pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_part_type_creates_zero_count_part() {
        let (repo, _db) = repo().await;
        let part = widget(&repo, "Widget").await;
        assert_eq!(part.current_count, 0);

        let parts = repo.list_parts().await.unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].part, part);
        assert_eq!(parts[0].part_type.id, part.part_type_id);
        assert_eq!(parts[0].part_type.name, "Widget");
        assert_eq!(parts[0].part_type.description.as_deref(), Some("test"));
    }

    #[tokio::test]
    async fn test_duplicate_name_is_store_error_and_leaves_no_part() {
        let (repo, _db) = repo().await;
        widget(&repo, "Widget").await;

        let err = repo
            .create_part_type(&NewPartType::new("Widget", None))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Store(_)));
        assert_eq!(repo.list_part_types().await.unwrap().len(), 1);
        assert_eq!(repo.list_parts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_listings_sorted_by_name() {
        let (repo, _db) = repo().await;
        for name in ["Sprocket", "Axle", "Gasket"] {
            widget(&repo, name).await;
        }

        let names: Vec<String> = repo
            .list_part_types()
            .await
            .unwrap()
            .into_iter()
            .map(|pt| pt.name)
            .collect();
        assert_eq!(names, vec!["Axle", "Gasket", "Sprocket"]);

        let part_names: Vec<String> = repo
            .list_parts()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.part_type.name)
            .collect();
        assert_eq!(part_names, names);
    }

    #[tokio::test]
    async fn test_add_then_remove_updates_count_and_log() {
        let (repo, db) = repo().await;
        let part = widget(&repo, "Bolt").await;

        let added = repo.add_parts(&addition(part.id, 10)).await.unwrap();
        assert_eq!(added.transaction_type, TransactionType::Add);
        assert_eq!(added.reason, None);

        let removed = repo.remove_parts(&removal(part.id, 4)).await.unwrap();
        assert_eq!(removed.transaction_type, TransactionType::Remove);
        assert_eq!(removed.reason.as_deref(), Some("used in build"));
        assert_eq!(removed.description.as_deref(), Some("line 3"));

        let part = repo.list_parts().await.unwrap().remove(0).part;
        assert_eq!(part.current_count, 6);
        assert_eq!(transaction_count(&db).await, 2);
    }

    #[tokio::test]
    async fn test_remove_more_than_stock_changes_nothing() {
        let (repo, db) = repo().await;
        let part = widget(&repo, "Nut").await;
        repo.add_parts(&addition(part.id, 3)).await.unwrap();

        let err = repo.remove_parts(&removal(part.id, 4)).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientStock { requested: 4, available: 3, .. }
        ));
        assert_eq!(repo.list_parts().await.unwrap()[0].part.current_count, 3);
        assert_eq!(transaction_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_add_past_i64_max_is_rejected() {
        let (repo, db) = repo().await;
        let part = widget(&repo, "Rivet").await;
        repo.add_parts(&addition(part.id, i64::MAX)).await.unwrap();

        let err = repo.add_parts(&addition(part.id, 1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
        assert!(err.to_string().contains("overflow"));

        let parts = repo.list_parts().await.unwrap();
        assert_eq!(parts[0].part.current_count, i64::MAX);
        let stored_type: String = sqlx::query_scalar("SELECT typeof(current_count) FROM parts WHERE id = ?")
            .bind(part.id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
        assert_eq!(stored_type, "integer");
        assert_eq!(transaction_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_unknown_part_is_not_found() {
        let (repo, db) = repo().await;

        let err = repo.add_parts(&addition(99, 1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));

        let err = repo.remove_parts(&removal(99, 1)).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));

        assert_eq!(transaction_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_list_transactions_newest_first_with_type_name() {
        let (repo, _db) = repo().await;
        let part = widget(&repo, "Washer").await;

        let mut ids = Vec::new();
        for quantity in 1..=5 {
            ids.push(repo.add_parts(&addition(part.id, quantity)).await.unwrap().id);
        }

        let recent = repo.list_transactions(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].transaction.id, ids[4]);
        assert_eq!(recent[1].transaction.id, ids[3]);
        assert_eq!(recent[0].transaction.quantity, 5);
        assert!(recent.iter().all(|t| t.part_type_name == "Washer"));
    }

    #[tokio::test]
    async fn test_delete_clean_part_type_removes_both_rows() {
        let (repo, _db) = repo().await;
        let part = widget(&repo, "Spring").await;

        repo.delete_part_type(part.part_type_id).await.unwrap();

        assert!(repo.list_part_types().await.unwrap().is_empty());
        assert!(repo.list_parts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_blocked_by_history() {
        let (repo, _db) = repo().await;
        let part = widget(&repo, "Pin").await;
        repo.add_parts(&addition(part.id, 2)).await.unwrap();
        repo.remove_parts(&removal(part.id, 2)).await.unwrap();

        let err = repo.delete_part_type(part.part_type_id).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete part type with existing transactions");
        assert_eq!(repo.list_part_types().await.unwrap().len(), 1);
        assert_eq!(repo.list_parts().await.unwrap().len(), 1);
        assert_eq!(repo.list_transactions(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_blocked_by_inventory() {
        let (repo, db) = repo().await;
        let part = widget(&repo, "Clip").await;
        // Stock without history can only come from outside the ledger.
        sqlx::query("UPDATE parts SET current_count = 5 WHERE id = ?")
            .bind(part.id)
            .execute(&db.pool)
            .await
            .unwrap();

        let err = repo.delete_part_type(part.part_type_id).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot delete part type with current inventory");
        assert_eq!(repo.list_parts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_unknown_part_type_is_not_found() {
        let (repo, _db) = repo().await;
        let err = repo.delete_part_type(42).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }
}
