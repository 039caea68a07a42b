//! Implements a struct that holds the state of the REST server.

use axum::extract::FromRef;

use crate::{ParseAndSave, parser::TransactionParser, transaction::TransactionStore};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState<P, S>
where
    P: TransactionParser + Clone + Send + Sync,
    S: TransactionStore + Clone + Send + Sync,
{
    /// Extracts transactions from free text and stores them.
    pub parse_and_save: ParseAndSave<P, S>,
    /// The store for managing [transactions](crate::Transaction).
    pub transaction_store: S,
}

impl<P, S> AppState<P, S>
where
    P: TransactionParser + Clone + Send + Sync,
    S: TransactionStore + Clone + Send + Sync,
{
    /// Create a new [AppState] where the parse pipeline and the transaction
    /// routes share `transaction_store`.
    pub fn new(parser: P, transaction_store: S) -> Self {
        Self {
            parse_and_save: ParseAndSave::new(parser, transaction_store.clone()),
            transaction_store,
        }
    }
}

/// The state needed to get, list, update or delete a transaction.
#[derive(Debug, Clone)]
pub struct TransactionState<S>
where
    S: TransactionStore + Send + Sync,
{
    /// The store for managing [transactions](crate::Transaction).
    pub transaction_store: S,
}

impl<P, S> FromRef<AppState<P, S>> for TransactionState<S>
where
    P: TransactionParser + Clone + Send + Sync,
    S: TransactionStore + Clone + Send + Sync,
{
    fn from_ref(state: &AppState<P, S>) -> Self {
        Self {
            transaction_store: state.transaction_store.clone(),
        }
    }
}

impl<P, S> FromRef<AppState<P, S>> for ParseAndSave<P, S>
where
    P: TransactionParser + Clone + Send + Sync,
    S: TransactionStore + Clone + Send + Sync,
{
    fn from_ref(state: &AppState<P, S>) -> Self {
        state.parse_and_save.clone()
    }
}
