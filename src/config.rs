//! Server configuration read from the command line or the environment.

use std::path::PathBuf;

use clap::Parser;

use crate::{Error, parser::ParserConfig, transaction::DEFAULT_CURRENCY};

/// The REST API server for expense_tracker.
///
/// Every option can also be set with the environment variable named in its
/// help text.
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// File path to the application SQLite database.
    #[arg(long, env = "DATABASE_PATH", default_value = "expenses.db")]
    pub db_path: PathBuf,

    /// The port to serve the API from.
    #[arg(short, long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory holding an SSL certificate `cert.pem` and key `key.pem`.
    ///
    /// The server uses plain HTTP if this is not set.
    #[arg(long, env = "CERT_PATH")]
    pub cert_path: Option<PathBuf>,

    /// The bearer token for the completion service.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// The base URL of the OpenAI compatible completion service.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    /// The completion model to use.
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-3.5-turbo")]
    pub openai_model: String,

    /// The maximum number of tokens the completion service may generate.
    #[arg(long, env = "COMPLETION_MAX_TOKENS", default_value_t = 1000)]
    pub max_tokens: u32,

    /// The sampling temperature for the completion service.
    #[arg(long, env = "COMPLETION_TEMPERATURE", default_value_t = 0.1)]
    pub temperature: f32,

    /// The currency used when the text does not mention one.
    #[arg(long, env = "DEFAULT_CURRENCY", default_value = DEFAULT_CURRENCY)]
    pub default_currency: String,

    /// File path for the debug log.
    #[arg(long, env = "LOG_PATH", default_value = "debug.log")]
    pub log_path: PathBuf,
}

impl Config {
    /// The parser settings, with the default currency upper-cased.
    ///
    /// # Errors
    /// Returns an [Error::Validation] if the API key is blank or the default
    /// currency is not a three letter code.
    pub fn parser_config(&self) -> Result<ParserConfig, Error> {
        if self.openai_api_key.trim().is_empty() {
            return Err(Error::Validation("OPENAI_API_KEY cannot be empty".to_owned()));
        }

        let default_currency = self.default_currency.trim().to_uppercase();

        if default_currency.chars().count() != 3 {
            return Err(Error::Validation(format!(
                "the default currency must be a three letter code, got \"{}\"",
                self.default_currency
            )));
        }

        Ok(ParserConfig {
            default_currency,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        })
    }
}
