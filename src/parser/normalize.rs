//! Maps the completion service's JSON output onto transactions.
//!
//! The completion service is not trusted to follow the output contract to
//! the letter, so two fields have explicit fallbacks instead of failing the
//! whole batch:
//! - a date that is not RFC 3339, or that falls outside the years 0 to 9999
//!   in UTC, becomes the time of parsing ([date_or_now]),
//! - a type other than "income" or "expense" becomes an expense
//!   ([type_or_expense]).

use rust_decimal::Decimal;
use serde::Deserialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    Error,
    transaction::{Category, Transaction, TransactionBuilder, TransactionType, storable_utc_date},
};

/// The document the completion service is asked to return.
///
/// Missing or `null` fields are treated as empty values.
#[derive(Debug, Deserialize)]
struct CompletionOutput {
    transactions: Option<Vec<RawTransaction>>,
}

#[derive(Debug, Deserialize)]
struct RawTransaction {
    amount: Option<Decimal>,
    currency: Option<String>,
    category: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    date: Option<String>,
    vendor: Option<String>,
    description: Option<String>,
}

/// Parse `date` as an RFC 3339 timestamp, falling back to `now`.
///
/// Dates that cannot be stored, i.e. those outside the years 0 to 9999 once
/// converted to UTC, also fall back to `now`. A bad date never rejects the
/// transaction it belongs to.
pub fn date_or_now(date: &str, now: OffsetDateTime) -> OffsetDateTime {
    match OffsetDateTime::parse(date, &Rfc3339) {
        Ok(parsed) if storable_utc_date(parsed).is_some() => parsed,
        Ok(_) => {
            tracing::debug!("Using the current time in place of out of range date {date:?}");
            now
        }
        Err(error) => {
            tracing::debug!("Using the current time in place of date {date:?}: {error}");
            now
        }
    }
}

/// Map `kind` to a [TransactionType], treating anything other than exactly
/// "income" or "expense" as an expense.
pub fn type_or_expense(kind: &str) -> TransactionType {
    match kind {
        "income" => TransactionType::Income,
        "expense" => TransactionType::Expense,
        other => {
            tracing::debug!("Treating unknown transaction type {other:?} as an expense");
            TransactionType::Expense
        }
    }
}

/// Upper-case `currency`, or use `default_currency` when it is blank.
pub fn currency_or_default(currency: &str, default_currency: &str) -> String {
    match currency.trim() {
        "" => default_currency.to_owned(),
        currency => currency.to_uppercase(),
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|text| !text.trim().is_empty())
}

impl RawTransaction {
    fn into_builder(self, now: OffsetDateTime, default_currency: &str) -> TransactionBuilder {
        let kind = type_or_expense(self.kind.as_deref().unwrap_or_default());
        let date = date_or_now(self.date.as_deref().unwrap_or_default(), now);
        let category = Category::from(self.category.unwrap_or_default());

        if !category.matches_type(kind) {
            tracing::warn!(
                "Keeping category {category:?} which is not a known {kind} category"
            );
        }

        Transaction::build(self.amount.unwrap_or_default(), kind, date)
            .currency(&currency_or_default(
                self.currency.as_deref().unwrap_or_default(),
                default_currency,
            ))
            .category(category)
            .vendor(non_empty(self.vendor))
            .description(non_empty(self.description))
    }
}

/// Parse the text returned by the completion service into transactions, in
/// the order they appear in `content`.
///
/// `now` is used for transactions without a valid date.
///
/// # Errors
/// Returns an [Error::MalformedResponse] holding `content` if it is not a
/// JSON object of the expected shape.
pub fn parse_completion_output(
    content: &str,
    now: OffsetDateTime,
    default_currency: &str,
) -> Result<Vec<TransactionBuilder>, Error> {
    let output: CompletionOutput =
        serde_json::from_str(content).map_err(|error| Error::MalformedResponse {
            reason: error.to_string(),
            content: content.to_owned(),
        })?;

    Ok(output
        .transactions
        .unwrap_or_default()
        .into_iter()
        .map(|raw| raw.into_builder(now, default_currency))
        .collect())
}
