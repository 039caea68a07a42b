//! Transactions and everything needed to store and serve them:
//! - the `Transaction` model and `TransactionBuilder` for unsaved transactions,
//! - the `TransactionStore` trait and its SQLite implementation,
//! - the route handlers for reading, updating and deleting transactions.

mod core;
mod delete_endpoint;
mod edit_endpoint;
mod get_endpoint;
mod list_endpoint;
mod sqlite;
mod store;

pub use core::{
    Category, DEFAULT_CURRENCY, EXPENSE_CATEGORIES, INCOME_CATEGORIES, Transaction,
    TransactionBuilder, TransactionType, storable_utc_date,
};
pub use delete_endpoint::{DELETED_MESSAGE, DeleteTransactionResponse, delete_transaction_endpoint};
pub use edit_endpoint::{UpdateTransactionRequest, update_transaction_endpoint};
pub use get_endpoint::get_transaction_endpoint;
pub use list_endpoint::{ListTransactionsResponse, list_transactions_endpoint};
pub use sqlite::{SQLiteTransactionStore, create_transaction_table};
pub use store::TransactionStore;
