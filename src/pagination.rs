//! This modules defines the common functionality for paging data.

use serde::{Deserialize, Serialize};

/// The number of transactions returned when a request does not specify a
/// valid, positive limit.
pub const DEFAULT_LIMIT: i64 = 10;

/// A window into a list of items, `limit` items starting at `offset`.
///
/// Construct it with [Pagination::new] or [Pagination::from_query] so that
/// out-of-range values are replaced by the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// The maximum number of items in the window, always positive.
    pub limit: i64,
    /// The number of items to skip, never negative.
    pub offset: i64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Pagination {
    /// Create a window, replacing a non-positive `limit` with
    /// [DEFAULT_LIMIT] and a negative `offset` with zero.
    ///
    /// There is no upper bound on `limit`.
    pub fn new(limit: i64, offset: i64) -> Self {
        Self {
            limit: if limit <= 0 { DEFAULT_LIMIT } else { limit },
            offset: offset.max(0),
        }
    }

    /// Create a window from raw query string values.
    ///
    /// Values that are missing or are not integers fall back to the defaults
    /// in the same way as out-of-range values.
    pub fn from_query(query: &PaginationQuery) -> Self {
        let parse = |value: &Option<String>, default: i64| {
            value
                .as_deref()
                .and_then(|value| value.trim().parse::<i64>().ok())
                .unwrap_or(default)
        };

        Self::new(
            parse(&query.limit, DEFAULT_LIMIT),
            parse(&query.offset, 0),
        )
    }
}

/// The raw pagination parameters in a query string.
///
/// The values are kept as strings so that garbage such as `?limit=abc` can be
/// handled by falling back to the defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PaginationQuery {
    /// The requested page size.
    pub limit: Option<String>,
    /// The requested number of items to skip.
    pub offset: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_LIMIT, Pagination, PaginationQuery};

    #[test]
    fn keeps_valid_values() {
        assert_eq!(
            Pagination::new(25, 5),
            Pagination {
                limit: 25,
                offset: 5
            }
        );
    }

    #[test]
    fn non_positive_limit_uses_default() {
        for limit in [0, -1, i64::MIN] {
            assert_eq!(Pagination::new(limit, 0).limit, DEFAULT_LIMIT);
        }
    }

    #[test]
    fn negative_offset_uses_zero() {
        assert_eq!(Pagination::new(10, -3).offset, 0);
    }

    #[test]
    fn huge_limit_is_not_capped() {
        assert_eq!(Pagination::new(1_000_000, 0).limit, 1_000_000);
    }

    #[test]
    fn query_garbage_uses_defaults() {
        let query = PaginationQuery {
            limit: Some("abc".to_owned()),
            offset: Some("1.5".to_owned()),
        };

        assert_eq!(Pagination::from_query(&query), Pagination::default());
    }

    #[test]
    fn missing_query_uses_defaults() {
        assert_eq!(
            Pagination::from_query(&PaginationQuery::default()),
            Pagination::default()
        );
    }

    #[test]
    fn query_values_are_parsed() {
        let query = PaginationQuery {
            limit: Some("3".to_owned()),
            offset: Some("6".to_owned()),
        };

        assert_eq!(
            Pagination::from_query(&query),
            Pagination {
                limit: 3,
                offset: 6
            }
        );
    }
}
