//! Application router configuration.

use axum::{
    Router,
    http::{
        HeaderName, Method, StatusCode,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::{
    AppState, endpoints,
    health::get_health,
    parse_input::parse_input_endpoint,
    parser::TransactionParser,
    transaction::{
        TransactionStore, delete_transaction_endpoint, get_transaction_endpoint,
        list_transactions_endpoint, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router<P, S>(state: AppState<P, S>) -> Router
where
    P: TransactionParser + Clone + Send + Sync + 'static,
    S: TransactionStore + Clone + Send + Sync + 'static,
{
    Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::PARSE, post(parse_input_endpoint::<P, S>))
        .route(endpoints::TRANSACTIONS, get(list_transactions_endpoint::<S>))
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint::<S>)
                .put(update_transaction_endpoint::<S>)
                .delete(delete_transaction_endpoint::<S>),
        )
        .fallback(get_404_not_found)
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            ACCEPT,
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
}

async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        axum::Json(serde_json::json!({"error": "Not found"})),
    )
        .into_response()
}
