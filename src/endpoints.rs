//! The paths of the REST API's routes.
//!
//! Paths with parameters use axum's `{param}` syntax. Use [format_endpoint]
//! to fill in a parameter, e.g. when building URLs in tests.

/// Liveness check.
pub const HEALTH: &str = "/health";
/// Parse free text into transactions and save them.
pub const PARSE: &str = "/parse";
/// The collection of stored transactions.
pub const TRANSACTIONS: &str = "/transactions";
/// A single stored transaction.
pub const TRANSACTION: &str = "/transactions/{transaction_id}";

/// Replace the first `{...}` parameter in `endpoint` with `id`.
///
/// Returns `endpoint` unchanged if it has no parameter.
pub fn format_endpoint(endpoint: &str, id: i64) -> String {
    let (Some(start), Some(end)) = (endpoint.find('{'), endpoint.find('}')) else {
        return endpoint.to_owned();
    };

    format!("{}{id}{}", &endpoint[..start], &endpoint[end + 1..])
}

#[cfg(test)]
mod tests {
    use super::{TRANSACTION, TRANSACTIONS, format_endpoint};

    #[test]
    fn formats_parameter() {
        assert_eq!(format_endpoint(TRANSACTION, 42), "/transactions/42");
    }

    #[test]
    fn leaves_endpoint_without_parameter() {
        assert_eq!(format_endpoint(TRANSACTIONS, 42), TRANSACTIONS);
    }
}
