//! The route handler for listing transactions a page at a time.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    app_state::TransactionState,
    pagination::{Pagination, PaginationQuery},
    request_cancellation,
    transaction::{Transaction, TransactionStore},
};

/// A page of transactions, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListTransactionsResponse {
    /// The transactions on this page.
    pub transactions: Vec<Transaction>,
    /// The page size that was used.
    pub limit: i64,
    /// The number of transactions that were skipped.
    pub offset: i64,
}

/// A route handler that responds with a page of transactions ordered by date,
/// newest first.
///
/// The `limit` and `offset` query parameters select the page. Missing,
/// non-numeric or out-of-range values fall back to the defaults.
pub async fn list_transactions_endpoint<S>(
    State(state): State<TransactionState<S>>,
    query: Result<Query<PaginationQuery>, QueryRejection>,
) -> Result<Json<ListTransactionsResponse>, Error>
where
    S: TransactionStore + Send + Sync,
{
    let query = query.map(|Query(query)| query).unwrap_or_else(|rejection| {
        tracing::debug!("Using the default page for an invalid query: {rejection}");
        PaginationQuery::default()
    });
    let Pagination { limit, offset } = Pagination::from_query(&query);
    let (cancel, _guard) = request_cancellation();

    let transactions = state
        .transaction_store
        .list(limit, offset, &cancel)
        .await?;

    Ok(Json(ListTransactionsResponse {
        transactions,
        limit,
        offset,
    }))
}
