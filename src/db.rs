//! Database set-up and the shared, cancellable SQLite connection.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use rusqlite::{Connection, InterruptHandle, Transaction as SqlTransaction, TransactionBehavior};
use tokio_util::sync::CancellationToken;

use crate::{Error, transaction::create_transaction_table};

/// Create the tables for the domain models if they do not exist yet.
///
/// All tables are created in a single exclusive transaction.
///
/// # Errors
/// Returns an [Error::SqlError] if a table or index cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// A SQLite connection shared between concurrent requests.
///
/// Statements run on tokio's blocking thread pool via [SharedConnection::run]
/// so that they do not stall the async runtime.
#[derive(Clone)]
pub struct SharedConnection {
    connection: Arc<Mutex<Connection>>,
    interrupt_handle: Arc<InterruptHandle>,
}

impl fmt::Debug for SharedConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedConnection").finish_non_exhaustive()
    }
}

impl SharedConnection {
    /// Wrap `connection` so that it can be shared between requests.
    pub fn new(connection: Connection) -> Self {
        let interrupt_handle = Arc::new(connection.get_interrupt_handle());

        Self {
            connection: Arc::new(Mutex::new(connection)),
            interrupt_handle,
        }
    }

    /// Run `operation` with exclusive access to the connection.
    ///
    /// If `cancel` fires while `operation` is executing, the running SQL
    /// statement is interrupted and any open SQL transaction is rolled back
    /// when `operation` returns its error. If `cancel` fires before the
    /// connection is acquired, `operation` is never run. An operation that
    /// finishes despite the cancellation reports its real outcome.
    ///
    /// # Errors
    /// Returns:
    /// - [Error::Cancelled] if `cancel` fired before or during the operation,
    /// - [Error::DatabaseLockError] if the connection mutex is poisoned,
    /// - or whatever error `operation` returns.
    pub async fn run<T, F>(&self, cancel: &CancellationToken, operation: F) -> Result<T, Error>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, Error> + Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let is_running = Arc::new(Mutex::new(false));

        let mut task = {
            let connection = self.connection.clone();
            let is_running = is_running.clone();
            let cancel = cancel.clone();

            tokio::task::spawn_blocking(move || {
                let mut connection = connection.lock().map_err(|_| Error::DatabaseLockError)?;

                {
                    let mut is_running = is_running.lock().map_err(|_| Error::DatabaseLockError)?;

                    if cancel.is_cancelled() {
                        return Err(Error::Cancelled);
                    }

                    *is_running = true;
                }

                let result = operation(&mut connection);

                if let Ok(mut is_running) = is_running.lock() {
                    *is_running = false;
                }

                result
            })
        };

        let joined = tokio::select! {
            biased;
            joined = &mut task => joined,
            _ = cancel.cancelled() => {
                interrupt_if_running(&is_running, &self.interrupt_handle);
                task.await
            }
        };

        match joined {
            Ok(result) => result,
            Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
            Err(_) => Err(Error::Cancelled),
        }
    }
}

/// Interrupt the connection only while the cancelled operation holds it.
///
/// The connection lock is held for as long as `is_running` is true, so the
/// interrupt cannot hit a statement that belongs to another request.
fn interrupt_if_running(is_running: &Mutex<bool>, interrupt_handle: &InterruptHandle) {
    match is_running.lock() {
        Ok(is_running) if *is_running => {
            tracing::debug!("Interrupting SQLite statement for a cancelled request.");
            interrupt_handle.interrupt();
        }
        Ok(_) => {}
        Err(error) => tracing::error!("Could not check whether the query is running: {error}"),
    }
}
