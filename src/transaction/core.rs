//! Defines the core data models for transactions.

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::{
    OffsetDateTime, PrimitiveDateTime, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::{Error, database_id::TransactionId};

// ============================================================================
// MODELS
// ============================================================================

/// The currency used when the text does not mention one.
pub const DEFAULT_CURRENCY: &str = "MXN";

/// The categories that describe where money was spent.
pub const EXPENSE_CATEGORIES: [&str; 8] = [
    "food",
    "transport",
    "utilities",
    "shopping",
    "health",
    "education",
    "entertainment",
    "other",
];

/// The categories that describe where money came from.
pub const INCOME_CATEGORIES: [&str; 4] = ["salary", "freelance", "investments", "bonus"];

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money that was earned, e.g. a salary payment.
    Income,
    /// Money that was spent.
    Expense,
}

impl TransactionType {
    /// The lowercase name used in JSON and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    /// Parse the exact, lowercase name of a transaction type.
    ///
    /// Completion output is mapped leniently by the parser instead, see
    /// `type_or_expense`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(Error::Validation(format!(
                "\"{other}\" is not a transaction type, expected \"income\" or \"expense\""
            ))),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// The label describing what a transaction was for, e.g. "food" or "salary".
///
/// Categories are expected to come from [EXPENSE_CATEGORIES] or
/// [INCOME_CATEGORIES], but any string is accepted and stored as-is. Use
/// [Category::is_known] and [Category::matches_type] to check membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    /// The category as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the category is one of [EXPENSE_CATEGORIES].
    pub fn is_expense_category(&self) -> bool {
        EXPENSE_CATEGORIES.contains(&self.0.as_str())
    }

    /// Whether the category is one of [INCOME_CATEGORIES].
    pub fn is_income_category(&self) -> bool {
        INCOME_CATEGORIES.contains(&self.0.as_str())
    }

    /// Whether the category belongs to either closed set.
    pub fn is_known(&self) -> bool {
        self.is_expense_category() || self.is_income_category()
    }

    /// Whether the category belongs to the set for `transaction_type`.
    pub fn matches_type(&self, transaction_type: TransactionType) -> bool {
        match transaction_type {
            TransactionType::Income => self.is_income_category(),
            TransactionType::Expense => self.is_expense_category(),
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Self("other".to_owned())
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().map(Category::from)
    }
}

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build] and hand the
/// builder to a [TransactionStore](crate::TransactionStore), which assigns
/// the ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The amount of money spent or earned, always positive.
    ///
    /// Whether the money was spent or earned is given by `kind`.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    /// The three letter currency code, e.g. "MXN".
    pub currency: String,
    /// What the money was spent on or where it came from.
    pub category: Category,
    /// Whether the money was earned or spent.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// When the transaction happened.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// Who the money was paid to or received from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// A note about what the transaction was for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(amount: Decimal, kind: TransactionType, date: OffsetDateTime) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            currency: DEFAULT_CURRENCY.to_owned(),
            category: Category::default(),
            kind,
            date,
            vendor: None,
            description: None,
        }
    }
}

/// A transaction that has not been stored yet and therefore has no ID.
///
/// Fields default to [DEFAULT_CURRENCY], the "other" category and no vendor
/// or description.
///
/// # Examples
///
/// ```ignore
/// use rust_decimal::dec;
/// use time::macros::datetime;
///
/// let lunch = Transaction::build(dec!(25.50), TransactionType::Expense, datetime!(2024-01-15 12:00 UTC))
///     .currency("USD")
///     .category("food")
///     .vendor(Some("Joe's Diner".to_owned()));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBuilder {
    /// The positive amount of money spent or earned.
    pub amount: Decimal,
    /// The three letter currency code.
    pub currency: String,
    /// What the money was spent on or where it came from.
    pub category: Category,
    /// Whether the money was earned or spent.
    pub kind: TransactionType,
    /// When the transaction happened.
    pub date: OffsetDateTime,
    /// Who the money was paid to or received from.
    pub vendor: Option<String>,
    /// A note about what the transaction was for.
    pub description: Option<String>,
}

impl TransactionBuilder {
    /// Set the currency code.
    pub fn currency(mut self, currency: &str) -> Self {
        self.currency = currency.to_owned();
        self
    }

    /// Set the category.
    pub fn category(mut self, category: impl Into<Category>) -> Self {
        self.category = category.into();
        self
    }

    /// Set the vendor.
    pub fn vendor(mut self, vendor: Option<String>) -> Self {
        self.vendor = vendor;
        self
    }

    /// Set the description.
    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Check the invariants that every stored transaction must satisfy.
    ///
    /// # Errors
    /// Returns an [Error::Validation] if the amount is not positive, the
    /// currency is not a three letter code, the category is empty or the date
    /// cannot be stored.
    pub fn validate(self) -> Result<Self, Error> {
        if self.amount <= Decimal::ZERO {
            return Err(Error::Validation(format!(
                "amount must be greater than zero, got {}",
                self.amount
            )));
        }

        if self.currency.chars().count() != 3 {
            return Err(Error::Validation(format!(
                "currency must be a three letter code, got \"{}\"",
                self.currency
            )));
        }

        if self.category.as_str().trim().is_empty() {
            return Err(Error::Validation("category cannot be empty".to_owned()));
        }

        format_stored_date(self.date)?;

        Ok(self)
    }

    /// Attach the ID assigned by the store.
    pub fn finalise(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            amount: self.amount,
            currency: self.currency,
            category: self.category,
            kind: self.kind,
            date: self.date,
            vendor: self.vendor,
            description: self.description,
        }
    }
}

// ============================================================================
// DATE STORAGE
// ============================================================================

const STORED_DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:9]Z"
);

/// Convert `date` to UTC if the result can be stored, i.e. its year is
/// between 0 and 9999.
pub fn storable_utc_date(date: OffsetDateTime) -> Option<OffsetDateTime> {
    date.checked_to_offset(UtcOffset::UTC)
        .filter(|date| (0..=9999).contains(&date.year()))
}

/// Format `date` as fixed-width UTC text so that sorting the text sorts the
/// dates chronologically.
///
/// # Errors
/// Returns an [Error::Validation] if `date` is outside the range accepted by
/// [storable_utc_date].
pub(crate) fn format_stored_date(date: OffsetDateTime) -> Result<String, Error> {
    let utc_date = storable_utc_date(date).ok_or_else(|| {
        Error::Validation(format!("date {date} must fall between the years 0 and 9999 in UTC"))
    })?;

    utc_date
        .format(STORED_DATE_FORMAT)
        .map_err(|error| Error::Validation(format!("could not format date {date}: {error}")))
}

/// Parse text written by [format_stored_date].
pub(crate) fn parse_stored_date(text: &str) -> Result<OffsetDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(text, STORED_DATE_FORMAT).map(PrimitiveDateTime::assume_utc)
}

// ============================================================================
// TESTS
// ============================================================================
