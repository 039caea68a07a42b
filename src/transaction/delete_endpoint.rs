//! The route handler for deleting a transaction.

use axum::{
    Json,
    extract::{Path, State, rejection::PathRejection},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error, app_state::TransactionState, database_id::TransactionId, request_cancellation,
    transaction::TransactionStore,
};

/// The message sent when a transaction is deleted.
pub const DELETED_MESSAGE: &str = "Transaction deleted successfully";

/// Confirms that a transaction was deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteTransactionResponse {
    /// Always [DELETED_MESSAGE].
    pub message: String,
}

/// A route handler for permanently deleting the transaction with the ID in
/// the path.
///
/// Responds with a 404 if there is no such transaction.
pub async fn delete_transaction_endpoint<S>(
    State(state): State<TransactionState<S>>,
    transaction_id: Result<Path<TransactionId>, PathRejection>,
) -> Result<Json<DeleteTransactionResponse>, Error>
where
    S: TransactionStore + Send + Sync,
{
    let Path(transaction_id) =
        transaction_id.map_err(|rejection| Error::Validation(rejection.body_text()))?;
    let (cancel, _guard) = request_cancellation();

    state
        .transaction_store
        .delete(transaction_id, &cancel)
        .await?;

    tracing::info!("Deleted transaction {transaction_id}.");

    Ok(Json(DeleteTransactionResponse {
        message: DELETED_MESSAGE.to_owned(),
    }))
}
