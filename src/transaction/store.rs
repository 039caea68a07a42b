//! Defines the transaction store trait.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::{
    Error,
    database_id::TransactionId,
    transaction::{Transaction, TransactionBuilder},
};

/// Handles the creation, retrieval, update and deletion of transactions.
///
/// Every operation takes a [CancellationToken]. Implementers should abort
/// the in-flight operation when the token fires and return
/// [Error::Cancelled].
pub trait TransactionStore {
    /// Store all of `builders` as a single atomic unit and return the stored
    /// transactions in the same order.
    ///
    /// Either every transaction is stored or none are. An empty batch is a
    /// no-op.
    fn save_batch(
        &self,
        builders: Vec<TransactionBuilder>,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<Transaction>, Error>> + Send;

    /// Retrieve a transaction by its `id`, or `None` if there is no such
    /// transaction.
    fn get(
        &self,
        id: TransactionId,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Option<Transaction>, Error>> + Send;

    /// Retrieve up to `limit` transactions ordered by date, newest first,
    /// skipping the first `offset`.
    ///
    /// A non-positive `limit` is treated as the default page size and a
    /// negative `offset` as zero.
    fn list(
        &self,
        limit: i64,
        offset: i64,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<Transaction>, Error>> + Send;

    /// Replace every field of the stored transaction with the same ID as
    /// `transaction`.
    ///
    /// Returns [Error::NotFound] if there is no transaction with that ID.
    fn update(
        &self,
        transaction: Transaction,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Transaction, Error>> + Send;

    /// Permanently delete the transaction with `id`.
    ///
    /// Returns [Error::NotFound] if there is no transaction with that ID.
    fn delete(
        &self,
        id: TransactionId,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}
