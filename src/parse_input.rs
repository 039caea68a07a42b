//! Extracts transactions from free text and stores them in one step.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{
    Error, Transaction, parser::TransactionParser, request_cancellation,
    transaction::TransactionStore,
};

/// The message sent with every successful parse.
pub const SUCCESS_MESSAGE: &str = "Successfully parsed and saved transactions";

/// The text to extract transactions from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseRequest {
    /// A free-text description of one or more transactions, e.g.
    /// "spent 25.50 on lunch at Joe's Diner".
    pub text: String,
}

/// The transactions that were extracted and stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResponse {
    /// The stored transactions in the order they were mentioned.
    pub transactions: Vec<Transaction>,
    /// Always [SUCCESS_MESSAGE].
    pub message: String,
}

/// Runs a [TransactionParser] and saves its output to a [TransactionStore].
#[derive(Debug, Clone)]
pub struct ParseAndSave<P, S> {
    parser: P,
    transaction_store: S,
}

impl<P, S> ParseAndSave<P, S>
where
    P: TransactionParser + Send + Sync,
    S: TransactionStore + Send + Sync,
{
    /// Create a pipeline from `parser` into `transaction_store`.
    pub fn new(parser: P, transaction_store: S) -> Self {
        Self {
            parser,
            transaction_store,
        }
    }

    /// Extract the transactions in `request` and store all of them as one
    /// batch.
    ///
    /// Nothing is stored when the parser finds no transactions.
    ///
    /// # Errors
    /// Parser errors are returned unchanged. If saving fails, no transaction
    /// is stored and the store's error is returned.
    pub async fn execute(
        &self,
        request: ParseRequest,
        cancel: &CancellationToken,
    ) -> Result<ParseResponse, Error> {
        let builders = self.parser.parse(&request.text, cancel).await?;

        let transactions = if builders.is_empty() {
            tracing::info!("No transactions found in the text.");
            Vec::new()
        } else {
            self.transaction_store.save_batch(builders, cancel).await?
        };

        tracing::info!("Saved {} parsed transactions.", transactions.len());

        Ok(ParseResponse {
            transactions,
            message: SUCCESS_MESSAGE.to_owned(),
        })
    }
}

/// A route handler that parses free text into transactions and stores them.
///
/// Responds with a 400 if the body is not JSON or the text is blank.
pub async fn parse_input_endpoint<P, S>(
    State(pipeline): State<ParseAndSave<P, S>>,
    request: Result<Json<ParseRequest>, JsonRejection>,
) -> Result<Json<ParseResponse>, Error>
where
    P: TransactionParser + Send + Sync,
    S: TransactionStore + Send + Sync,
{
    let Json(request) = request.map_err(|rejection| Error::Validation(rejection.body_text()))?;

    if request.text.trim().is_empty() {
        return Err(Error::Validation("text cannot be empty".to_owned()));
    }

    let (cancel, _guard) = request_cancellation();

    pipeline.execute(request, &cancel).await.map(Json)
}
