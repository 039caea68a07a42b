//! The route handler for replacing a stored transaction.

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    Error,
    app_state::TransactionState,
    database_id::TransactionId,
    request_cancellation,
    transaction::{Transaction, TransactionStore, TransactionType},
};

/// The new values for every field of a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateTransactionRequest {
    /// The positive amount of money spent or earned.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// The three letter currency code.
    pub currency: String,
    /// What the money was spent on or where it came from.
    pub category: String,
    /// Either "income" or "expense".
    #[serde(rename = "type")]
    pub kind: String,
    /// When the transaction happened as an RFC 3339 timestamp.
    pub date: String,
    /// Who the money was paid to or received from.
    #[serde(default)]
    pub vendor: Option<String>,
    /// A note about what the transaction was for.
    #[serde(default)]
    pub description: Option<String>,
}

impl UpdateTransactionRequest {
    /// Check the request and turn it into the transaction with `id`.
    ///
    /// The currency is upper-cased, the same as for parsed transactions.
    ///
    /// # Errors
    /// Returns an [Error::Validation] describing the first invalid field,
    /// including a date that falls outside the years 0 to 9999 in UTC.
    pub fn into_transaction(self, id: TransactionId) -> Result<Transaction, Error> {
        let kind: TransactionType = self.kind.parse()?;
        let date = OffsetDateTime::parse(&self.date, &Rfc3339).map_err(|error| {
            Error::Validation(format!(
                "date must be an RFC 3339 timestamp, got \"{}\": {error}",
                self.date
            ))
        })?;

        Transaction::build(self.amount, kind, date)
            .currency(&self.currency.trim().to_uppercase())
            .category(self.category)
            .vendor(self.vendor)
            .description(self.description)
            .validate()
            .map(|builder| builder.finalise(id))
    }
}

/// A route handler that replaces every field of the transaction with the ID
/// in the path and responds with the updated transaction.
///
/// Responds with a 400 if the body is invalid and a 404 if there is no such
/// transaction.
pub async fn update_transaction_endpoint<S>(
    State(state): State<TransactionState<S>>,
    transaction_id: Result<Path<TransactionId>, PathRejection>,
    request: Result<Json<UpdateTransactionRequest>, JsonRejection>,
) -> Result<Json<Transaction>, Error>
where
    S: TransactionStore + Send + Sync,
{
    let Path(transaction_id) =
        transaction_id.map_err(|rejection| Error::Validation(rejection.body_text()))?;
    let Json(request) = request.map_err(|rejection| Error::Validation(rejection.body_text()))?;
    let transaction = request.into_transaction(transaction_id)?;
    let (cancel, _guard) = request_cancellation();

    let updated = state
        .transaction_store
        .update(transaction, &cancel)
        .await?;

    tracing::info!("Updated transaction {transaction_id}.");

    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, routing::put};
    use axum_test::TestServer;
    use rust_decimal::Decimal;
    use serde_json::{Value, json};
    use time::macros::datetime;
    use tokio_util::sync::CancellationToken;

    use crate::{
        Error, SQLiteTransactionStore, Transaction, TransactionStore, TransactionType,
        app_state::TransactionState,
        endpoints::{self, format_endpoint},
        test_utils::get_test_store,
    };

    use super::{UpdateTransactionRequest, update_transaction_endpoint};

    fn valid_request() -> UpdateTransactionRequest {
        UpdateTransactionRequest {
            amount: Decimal::new(1999, 2),
            currency: "EUR".to_owned(),
            category: "shopping".to_owned(),
            kind: "expense".to_owned(),
            date: "2024-02-01T09:30:00+01:00".to_owned(),
            vendor: Some("Bookshop".to_owned()),
            description: None,
        }
    }

    #[test]
    fn valid_request_becomes_transaction() {
        let got = valid_request().into_transaction(7);

        assert_eq!(
            got,
            Ok(Transaction::build(
                Decimal::new(1999, 2),
                TransactionType::Expense,
                datetime!(2024-02-01 08:30 UTC),
            )
            .currency("EUR")
            .category("shopping")
            .vendor(Some("Bookshop".to_owned()))
            .finalise(7))
        );
    }

    #[test]
    fn invalid_fields_are_rejected() {
        let cases = [
            UpdateTransactionRequest {
                amount: Decimal::ZERO,
                ..valid_request()
            },
            UpdateTransactionRequest {
                currency: "EU".to_owned(),
                ..valid_request()
            },
            UpdateTransactionRequest {
                category: String::new(),
                ..valid_request()
            },
            UpdateTransactionRequest {
                kind: "refund".to_owned(),
                ..valid_request()
            },
            UpdateTransactionRequest {
                date: "2024-02-01".to_owned(),
                ..valid_request()
            },
        ];

        for request in cases {
            let description = format!("{request:?}");

            let got = request.into_transaction(1);

            assert!(
                matches!(got, Err(Error::Validation(_))),
                "want validation error for {description}, got {got:?}"
            );
        }
    }

    #[test]
    fn currency_is_upper_cased() {
        let request = UpdateTransactionRequest {
            currency: " eur ".to_owned(),
            ..valid_request()
        };

        let got = request.into_transaction(7).unwrap();

        assert_eq!(got.currency, "EUR");
    }

    #[test]
    fn dates_outside_stored_range_are_rejected() {
        let cases = ["9999-12-31T23:30:00-01:00", "0000-01-01T00:30:00+01:00"].map(|date| {
            UpdateTransactionRequest {
                date: date.to_owned(),
                ..valid_request()
            }
        });

        for request in cases {
            let description = format!("{request:?}");

            let got = request.into_transaction(1);

            assert!(
                matches!(got, Err(Error::Validation(_))),
                "want validation error for {description}, got {got:?}"
            );
        }
    }

    async fn get_test_server() -> (TestServer, SQLiteTransactionStore, Transaction) {
        let store = get_test_store();
        let saved = store
            .save_batch(
                vec![
                    Transaction::build(
                        Decimal::TEN,
                        TransactionType::Expense,
                        datetime!(2024-01-15 12:00 UTC),
                    )
                    .category("food"),
                ],
                &CancellationToken::new(),
            )
            .await
            .unwrap()
            .remove(0);
        let app = Router::new()
            .route(
                endpoints::TRANSACTION,
                put(update_transaction_endpoint::<SQLiteTransactionStore>),
            )
            .with_state(TransactionState {
                transaction_store: store.clone(),
            });

        (
            TestServer::new(app),
            store,
            saved,
        )
    }

    #[tokio::test]
    async fn updates_transaction() {
        let (server, store, saved) = get_test_server().await;

        let response = server
            .put(&format_endpoint(endpoints::TRANSACTION, saved.id))
            .json(&valid_request())
            .await;

        response.assert_status_ok();
        let want = valid_request().into_transaction(saved.id).unwrap();
        assert_eq!(response.json::<Transaction>(), want);
        assert_eq!(
            store.get(saved.id, &CancellationToken::new()).await,
            Ok(Some(want))
        );
    }

    #[tokio::test]
    async fn missing_transaction_is_not_found() {
        let (server, _, saved) = get_test_server().await;

        server
            .put(&format_endpoint(endpoints::TRANSACTION, saved.id + 1))
            .json(&valid_request())
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_body_is_bad_request() {
        let (server, store, saved) = get_test_server().await;

        let response = server
            .put(&format_endpoint(endpoints::TRANSACTION, saved.id))
            .json(&json!({"amount": -5, "currency": "USD", "category": "food",
                "type": "expense", "date": "2024-01-15T12:00:00Z"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"], "Invalid request");
        assert_eq!(
            store.get(saved.id, &CancellationToken::new()).await,
            Ok(Some(saved))
        );
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let (server, _, saved) = get_test_server().await;

        server
            .put(&format_endpoint(endpoints::TRANSACTION, saved.id))
            .json(&json!({"amount": 5}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn lower_case_currency_is_stored_upper_cased() {
        let (server, store, saved) = get_test_server().await;

        let response = server
            .put(&format_endpoint(endpoints::TRANSACTION, saved.id))
            .json(&UpdateTransactionRequest {
                currency: "eur".to_owned(),
                ..valid_request()
            })
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<Transaction>().currency, "EUR");
        let stored = store
            .get(saved.id, &CancellationToken::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.currency, "EUR");
    }

    #[tokio::test]
    async fn out_of_range_date_is_bad_request_and_store_stays_usable() {
        let (server, store, saved) = get_test_server().await;

        let response = server
            .put(&format_endpoint(endpoints::TRANSACTION, saved.id))
            .json(&UpdateTransactionRequest {
                date: "9999-12-31T23:30:00-01:00".to_owned(),
                ..valid_request()
            })
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            store.get(saved.id, &CancellationToken::new()).await,
            Ok(Some(saved.clone()))
        );
        server
            .put(&format_endpoint(endpoints::TRANSACTION, saved.id))
            .json(&valid_request())
            .await
            .assert_status_ok();
    }
}
