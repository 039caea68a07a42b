//! Expense Tracker turns free-text descriptions of spending and earning into
//! structured transactions.
//!
//! Text such as "spent 25.50 on lunch at Joe's Diner" is sent to a text
//! completion service, the reply is normalised into transactions, and the
//! transactions are stored in a SQLite database. The library exposes the
//! whole pipeline as a JSON REST API.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;
use tokio_util::sync::{CancellationToken, DropGuard};

mod app_state;
mod config;
mod database_id;
mod db;
mod endpoints;
mod health;
mod logging;
mod pagination;
mod parse_input;
mod parser;
mod routing;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use config::Config;
pub use database_id::TransactionId;
pub use db::{SharedConnection, initialize as initialize_db};
pub use health::HealthResponse;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use parse_input::{ParseAndSave, ParseRequest, ParseResponse, SUCCESS_MESSAGE};
pub use parser::{
    CompletionClient, CompletionParser, CompletionRequest, OpenAiClient, ParserConfig,
    TransactionParser, build_system_prompt, currency_or_default, date_or_now,
    parse_completion_output, type_or_expense,
};
pub use routing::build_router;
pub use transaction::{
    Category, DEFAULT_CURRENCY, DELETED_MESSAGE, DeleteTransactionResponse, EXPENSE_CATEGORIES,
    INCOME_CATEGORIES, ListTransactionsResponse, SQLiteTransactionStore, Transaction,
    TransactionBuilder, TransactionStore, TransactionType, UpdateTransactionRequest,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// Create a cancellation token for a single request.
///
/// The token is cancelled when the returned guard is dropped. Route handlers
/// hold on to the guard so that work started on behalf of a client that
/// disconnects (which drops the handler future) is cancelled too.
pub(crate) fn request_cancellation() -> (CancellationToken, DropGuard) {
    let token = CancellationToken::new();
    let guard = token.clone().drop_guard();

    (token, guard)
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The client sent a request that is missing required data or contains
    /// invalid values.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The call to the text completion service failed or the service did not
    /// return any output.
    #[error("the completion service failed: {0}")]
    ExternalService(String),

    /// The text completion service replied with something other than the
    /// expected JSON document.
    ///
    /// `content` holds the raw reply so that it can be logged for debugging.
    #[error("could not parse the completion response ({reason}), content: {content}")]
    MalformedResponse {
        /// Why the content could not be parsed.
        reason: String,
        /// The raw text returned by the completion service.
        content: String,
    },

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows or when
    /// an update or delete affects zero rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The operation was cancelled before it could finish, e.g. because the
    /// client went away.
    #[error("the operation was cancelled")]
    Cancelled,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.code == rusqlite::ErrorCode::OperationInterrupted =>
            {
                Error::Cancelled
            }
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The JSON body sent to clients when a request fails.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

fn render_error(status: StatusCode, error: &'static str, details: Option<String>) -> Response {
    (status, Json(ErrorBody { error, details })).into_response()
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Validation(details) => {
                render_error(StatusCode::BAD_REQUEST, "Invalid request", Some(details))
            }
            Error::NotFound => render_error(StatusCode::NOT_FOUND, "Transaction not found", None),
            Error::ExternalService(details) => {
                tracing::error!("The completion service failed: {details}");
                render_error(
                    StatusCode::BAD_GATEWAY,
                    "Failed to parse input",
                    Some("The completion service could not be reached.".to_owned()),
                )
            }
            Error::MalformedResponse { reason, content } => {
                tracing::error!("Could not parse completion response ({reason}): {content:?}");
                render_error(
                    StatusCode::BAD_GATEWAY,
                    "Failed to parse input",
                    Some("The completion service returned an unexpected response.".to_owned()),
                )
            }
            Error::Cancelled => {
                tracing::warn!("A request was cancelled before it finished.");
                render_error(StatusCode::SERVICE_UNAVAILABLE, "Request cancelled", None)
            }
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                render_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                    Some("An unexpected error occurred, check the server logs for more details.".to_owned()),
                )
            }
        }
    }
}
