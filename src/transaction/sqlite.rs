//! Implements a SQLite backed transaction store.

use std::str::FromStr;

use rust_decimal::Decimal;
use rusqlite::{Connection, OptionalExtension, Row, named_params, params, types::Type};
use tokio_util::sync::CancellationToken;

use crate::{
    Error,
    database_id::TransactionId,
    db::SharedConnection,
    pagination::Pagination,
    transaction::{
        Transaction, TransactionBuilder, TransactionStore,
        core::{format_stored_date, parse_stored_date},
    },
};

const SELECT_COLUMNS: &str =
    "id, amount, currency, category, type, date, vendor, description";

/// Stores transactions in a SQLite database.
///
/// The transaction table must exist, see [crate::initialize_db].
#[derive(Debug, Clone)]
pub struct SQLiteTransactionStore {
    database: SharedConnection,
}

impl SQLiteTransactionStore {
    /// Create a new store for the shared SQLite connection.
    pub fn new(database: SharedConnection) -> Self {
        Self { database }
    }
}

impl TransactionStore for SQLiteTransactionStore {
    /// Insert all transactions inside one SQL transaction.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Validation] if a date cannot be stored,
    /// - [Error::Cancelled] if `cancel` fires before the batch is committed,
    /// - or [Error::SqlError] if any insert or the commit fails.
    ///
    /// Nothing is stored when an error is returned.
    async fn save_batch(
        &self,
        builders: Vec<TransactionBuilder>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>, Error> {
        if builders.is_empty() {
            return Ok(Vec::new());
        }

        let rows = builders
            .into_iter()
            .map(|builder| Ok((format_stored_date(builder.date)?, builder)))
            .collect::<Result<Vec<_>, Error>>()?;

        self.database
            .run(cancel, move |connection| insert_batch(rows, connection))
            .await
    }

    /// Retrieve a transaction in the database by its `id`.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] if there is a SQL error.
    async fn get(
        &self,
        id: TransactionId,
        cancel: &CancellationToken,
    ) -> Result<Option<Transaction>, Error> {
        self.database
            .run(cancel, move |connection| {
                connection
                    .prepare(&format!(
                        "SELECT {SELECT_COLUMNS} FROM \"transaction\" WHERE id = :id"
                    ))?
                    .query_row(named_params! {":id": id}, map_transaction_row)
                    .optional()
                    .map_err(Error::from)
            })
            .await
    }

    /// Get a page of transactions, newest first.
    ///
    /// Transactions on the same date are ordered by descending ID so that
    /// pages are stable.
    ///
    /// # Errors
    /// This function will return a [Error::SqlError] if there is a SQL error.
    async fn list(
        &self,
        limit: i64,
        offset: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>, Error> {
        let Pagination { limit, offset } = Pagination::new(limit, offset);

        self.database
            .run(cancel, move |connection| {
                connection
                    .prepare(&format!(
                        "SELECT {SELECT_COLUMNS} FROM \"transaction\"
                         ORDER BY date DESC, id DESC
                         LIMIT :limit OFFSET :offset"
                    ))?
                    .query_map(
                        named_params! {":limit": limit, ":offset": offset},
                        map_transaction_row,
                    )?
                    .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
                    .collect()
            })
            .await
    }

    /// Overwrite the stored transaction with the same ID.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Validation] if the date cannot be stored,
    /// - [Error::NotFound] if no row has the transaction's ID,
    /// - or [Error::SqlError] if there is some other SQL error.
    async fn update(
        &self,
        transaction: Transaction,
        cancel: &CancellationToken,
    ) -> Result<Transaction, Error> {
        let date = format_stored_date(transaction.date)?;

        self.database
            .run(cancel, move |connection| {
                let rows_affected = connection.execute(
                    "UPDATE \"transaction\"
                     SET amount = ?1,
                         currency = ?2,
                         category = ?3,
                         type = ?4,
                         date = ?5,
                         vendor = ?6,
                         description = ?7,
                         updated_at = CURRENT_TIMESTAMP
                     WHERE id = ?8",
                    params![
                        transaction.amount.to_string(),
                        transaction.currency,
                        transaction.category,
                        transaction.kind,
                        date,
                        transaction.vendor,
                        transaction.description,
                        transaction.id,
                    ],
                )?;

                if rows_affected == 0 {
                    return Err(Error::NotFound);
                }

                Ok(transaction)
            })
            .await
    }

    /// Delete the transaction with `id`.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NotFound] if no row has the ID `id`,
    /// - or [Error::SqlError] if there is some other SQL error.
    async fn delete(&self, id: TransactionId, cancel: &CancellationToken) -> Result<(), Error> {
        self.database
            .run(cancel, move |connection| {
                let rows_affected = connection
                    .execute("DELETE FROM \"transaction\" WHERE id = :id", named_params! {":id": id})?;

                match rows_affected {
                    0 => Err(Error::NotFound),
                    _ => Ok(()),
                }
            })
            .await
    }
}

/// Insert each builder with its date already formatted by
/// [format_stored_date].
fn insert_batch(
    rows: Vec<(String, TransactionBuilder)>,
    connection: &mut Connection,
) -> Result<Vec<Transaction>, Error> {
    let sql_transaction = connection.transaction()?;
    let mut transactions = Vec::with_capacity(rows.len());

    {
        // Prepare the insert statement once for reuse
        let mut statement = sql_transaction.prepare(&format!(
            "INSERT INTO \"transaction\" (amount, currency, category, type, date, vendor, description)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING {SELECT_COLUMNS}"
        ))?;

        for (date, builder) in rows {
            let transaction = statement.query_row(
                params![
                    builder.amount.to_string(),
                    builder.currency,
                    builder.category,
                    builder.kind,
                    date,
                    builder.vendor,
                    builder.description,
                ],
                map_transaction_row,
            )?;

            transactions.push(transaction);
        }
    }

    // Dropping the SQL transaction without committing rolls back every insert.
    sql_transaction.commit()?;

    Ok(transactions)
}

/// Create the transaction table and its indexes in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                amount TEXT NOT NULL,
                currency TEXT NOT NULL CHECK (length(currency) = 3),
                category TEXT NOT NULL,
                type TEXT NOT NULL CHECK (type IN ('income', 'expense')),
                date TEXT NOT NULL,
                vendor TEXT,
                description TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date);",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_type ON \"transaction\"(type);",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_category ON \"transaction\"(category);",
        (),
    )?;

    Ok(())
}

/// Map a database row to a Transaction.
///
/// The row must contain the columns in the order of `SELECT_COLUMNS`.
fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;

    let raw_amount: String = row.get(1)?;
    let amount = Decimal::from_str(&raw_amount).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(error))
    })?;

    let currency = row.get(2)?;
    let category = row.get(3)?;
    let kind = row.get(4)?;

    let raw_date: String = row.get(5)?;
    let date = parse_stored_date(&raw_date).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(error))
    })?;

    let vendor = row.get(6)?;
    let description = row.get(7)?;

    Ok(Transaction {
        id,
        amount,
        currency,
        category,
        kind,
        date,
        vendor,
        description,
    })
}
