//! The liveness check.

use axum::Json;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Tells a client that the server is up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "healthy".
    pub status: String,
    /// The current time in UTC.
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
}

/// A route handler that responds with the server's status and clock.
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_owned(),
        time: OffsetDateTime::now_utc(),
    })
}
