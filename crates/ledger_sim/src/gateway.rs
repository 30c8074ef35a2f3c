//! HTTP gateway exposing a [`LocalLedger`] with the JSON wire protocol.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use shared::{
    error::{ErrorCode, RpcError, RpcException},
    protocol::{ContractQuery, QueryResult, TransactionReceipt, TransactionRequest},
};
use tracing::{debug, warn};

use crate::LocalLedger;

pub fn query_route() -> &'static str {
    "/query"
}

pub fn transactions_route() -> &'static str {
    "/transactions"
}

pub fn build_router(ledger: Arc<LocalLedger>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(query_route(), post(query))
        .route(transactions_route(), post(submit_transaction))
        .with_state(ledger)
}

pub fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Reverted => StatusCode::CONFLICT,
        ErrorCode::Destroyed => StatusCode::GONE,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn into_response_error(err: RpcException) -> (StatusCode, Json<RpcError>) {
    (status_for(err.code), Json(RpcError::from(err)))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn query(
    State(ledger): State<Arc<LocalLedger>>,
    Json(query): Json<ContractQuery>,
) -> Result<Json<QueryResult>, (StatusCode, Json<RpcError>)> {
    let method = query.method_name();
    match ledger.query(query).await {
        Ok(result) => {
            debug!(method, "query served");
            Ok(Json(result))
        }
        Err(err) => {
            debug!(method, error = %err, "query rejected");
            Err(into_response_error(err))
        }
    }
}

async fn submit_transaction(
    State(ledger): State<Arc<LocalLedger>>,
    Json(request): Json<TransactionRequest>,
) -> Result<Json<TransactionReceipt>, (StatusCode, Json<RpcError>)> {
    let method = request.call.method_name();
    let from = request.from.clone();
    ledger.execute(request).await.map(Json).map_err(|err| {
        warn!(%from, method, error = %err, "transaction reverted");
        into_response_error(err)
    })
}
