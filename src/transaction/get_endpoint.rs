//! The route handler for fetching a single transaction.

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};

use crate::{
    Error, app_state::TransactionState, database_id::TransactionId, request_cancellation,
    transaction::{Transaction, TransactionStore},
};

/// A route handler that responds with the transaction with the ID in the path.
///
/// Responds with a 404 if there is no such transaction.
pub async fn get_transaction_endpoint<S>(
    State(state): State<TransactionState<S>>,
    transaction_id: Result<Path<TransactionId>, PathRejection>,
) -> Result<Json<Transaction>, Error>
where
    S: TransactionStore + Send + Sync,
{
    let Path(transaction_id) =
        transaction_id.map_err(|rejection| Error::Validation(rejection.body_text()))?;
    let (cancel, _guard) = request_cancellation();

    state
        .transaction_store
        .get(transaction_id, &cancel)
        .await?
        .map(Json)
        .ok_or(Error::NotFound)
}
