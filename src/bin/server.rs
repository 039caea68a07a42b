use std::{fs::OpenOptions, net::SocketAddr, path::Path, process::exit, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
};
use axum_server::{Handle, tls_rustls::RustlsConfig};
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use expense_tracker::{
    AppState, CompletionParser, Config, OpenAiClient, SQLiteTransactionStore, SharedConnection,
    build_router, graceful_shutdown, initialize_db,
};

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(error) = setup_logging(&config.log_path) {
        eprintln!("Could not open log file {}: {error}", config.log_path.display());
        exit(1);
    }

    let parser_config = match config.parser_config() {
        Ok(parser_config) => parser_config,
        Err(error) => {
            tracing::error!("Invalid configuration: {error}");
            exit(1);
        }
    };

    let connection = match open_database(&config.db_path) {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!(
                "Could not open database {}: {error}",
                config.db_path.display()
            );
            exit(1);
        }
    };

    let client = OpenAiClient::new(
        &config.openai_base_url,
        &config.openai_api_key,
        &config.openai_model,
    );
    let state = AppState::new(
        CompletionParser::new(client, parser_config),
        SQLiteTransactionStore::new(SharedConnection::new(connection)),
    );

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(build_router(state));

    #[cfg(debug_assertions)]
    let router = router.layer(axum::middleware::from_fn(
        expense_tracker::logging_middleware,
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let result = match &config.cert_path {
        Some(cert_path) => {
            let tls_config = match RustlsConfig::from_pem_file(
                cert_path.join("cert.pem"),
                cert_path.join("key.pem"),
            )
            .await
            {
                Ok(tls_config) => tls_config,
                Err(error) => {
                    tracing::error!("Could not open TLS certificates: {error}");
                    exit(1);
                }
            };

            tracing::info!("HTTPS server listening on {addr}");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(router.into_make_service())
                .await
        }
        None => {
            tracing::info!("HTTP server listening on {addr}");
            axum_server::bind(addr)
                .handle(handle)
                .serve(router.into_make_service())
                .await
        }
    };

    if let Err(error) = result {
        tracing::error!("Server stopped with an error: {error}");
        exit(1);
    }

    tracing::info!("Server exiting");
}

fn open_database(path: &Path) -> Result<Connection, expense_tracker::Error> {
    let connection = Connection::open(path)?;
    initialize_db(&connection)?;

    Ok(connection)
}

fn setup_logging(log_path: &Path) -> std::io::Result<()> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(filter::LevelFilter::DEBUG),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    Ok(())
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // By default, `TraceLayer` will log 5xx responses but errors are
        // logged where they are turned into responses, so disable that.
        .on_failure(());

    router.layer(tracing_layer)
}
