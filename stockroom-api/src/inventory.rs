use axum::{
    extract::{rejection::{JsonRejection, PathRejection, QueryRejection}, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use stockroom_core::{
    NewPartType, PartType, PartWithType, StockAddition, StockRemoval, Transaction,
    TransactionWithType,
};

use crate::{error::AppError, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreatePartTypeRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeletePartTypeRequest {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPartsRequest {
    pub part_id: i64,
    pub quantity: i64,
    pub user_name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovePartsRequest {
    pub part_id: i64,
    pub quantity: i64,
    pub user_name: String,
    pub reason: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,
}

impl SuccessResponse {
    fn ok() -> Self {
        Self { success: true, transaction: None }
    }

    fn recorded(transaction: Transaction) -> Self {
        Self { success: true, transaction: Some(transaction) }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/part-types",
            get(list_part_types)
                .post(create_part_type)
                .delete(delete_part_type),
        )
        .route("/api/part-types/{id}", delete(delete_part_type_by_path))
        .route("/api/parts", get(list_parts))
        .route("/api/parts/add", post(add_parts))
        .route("/api/parts/remove", post(remove_parts))
        .route("/api/transactions", get(list_transactions))
}

// ============================================================================
// Part Types
// ============================================================================

/// GET /api/part-types
async fn list_part_types(State(state): State<AppState>) -> Result<Json<Vec<PartType>>, AppError> {
    Ok(Json(state.ledger.list_part_types().await?))
}

/// POST /api/part-types
async fn create_part_type(
    State(state): State<AppState>,
    payload: Result<Json<CreatePartTypeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PartType>), AppError> {
    let Json(req) = payload?;
    let part_type = state
        .ledger
        .create_part_type(NewPartType::new(req.name, req.description))
        .await?;
    Ok((StatusCode::CREATED, Json(part_type)))
}

/// DELETE /api/part-types with `{"id": ..}` in the body
async fn delete_part_type(
    State(state): State<AppState>,
    payload: Result<Json<DeletePartTypeRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Json(req) = payload?;
    state.ledger.delete_part_type(req.id).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// DELETE /api/part-types/{id}
async fn delete_part_type_by_path(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Path(id) = id?;
    state.ledger.delete_part_type(id).await?;
    Ok(Json(SuccessResponse::ok()))
}

// ============================================================================
// Parts
// ============================================================================

/// GET /api/parts
async fn list_parts(State(state): State<AppState>) -> Result<Json<Vec<PartWithType>>, AppError> {
    Ok(Json(state.ledger.list_parts().await?))
}

/// POST /api/parts/add
async fn add_parts(
    State(state): State<AppState>,
    payload: Result<Json<AddPartsRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Json(req) = payload?;
    let transaction = state
        .ledger
        .add_parts(StockAddition {
            part_id: req.part_id,
            quantity: req.quantity,
            user_name: req.user_name,
            description: req.description,
        })
        .await?;
    Ok(Json(SuccessResponse::recorded(transaction)))
}

/// POST /api/parts/remove
async fn remove_parts(
    State(state): State<AppState>,
    payload: Result<Json<RemovePartsRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Json(req) = payload?;
    let transaction = state
        .ledger
        .remove_parts(StockRemoval {
            part_id: req.part_id,
            quantity: req.quantity,
            user_name: req.user_name,
            reason: req.reason,
            description: req.description,
        })
        .await?;
    Ok(Json(SuccessResponse::recorded(transaction)))
}

// ============================================================================
// Transactions
// ============================================================================

/// GET /api/transactions?limit=N
async fn list_transactions(
    State(state): State<AppState>,
    query: Result<Query<ListTransactionsQuery>, QueryRejection>,
) -> Result<Json<Vec<TransactionWithType>>, AppError> {
    let Query(query) = query?;
    Ok(Json(state.ledger.list_transactions(query.limit).await?))
}
