//! Turns free text into transactions with the help of a text completion
//! service.

mod completion;
mod normalize;
mod prompt;

use std::future::Future;

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::{
    Error,
    transaction::{DEFAULT_CURRENCY, TransactionBuilder},
};

pub use completion::{CompletionClient, CompletionRequest, OpenAiClient};
pub use normalize::{currency_or_default, date_or_now, parse_completion_output, type_or_expense};
pub use prompt::build_system_prompt;

/// Extracts transactions from free text.
pub trait TransactionParser {
    /// Extract zero or more unsaved transactions from `text`, in the order
    /// they are mentioned.
    ///
    /// # Errors
    /// Returns:
    /// - [Error::ExternalService] if the completion service fails or gives no
    ///   output,
    /// - [Error::MalformedResponse] if its output cannot be decoded,
    /// - [Error::Cancelled] if `cancel` fires first.
    fn parse(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Vec<TransactionBuilder>, Error>> + Send;
}

/// Settings for the prompt sent to the completion service.
#[derive(Debug, Clone, PartialEq)]
pub struct ParserConfig {
    /// The currency to use when the text does not mention one.
    pub default_currency: String,
    /// The maximum number of tokens the service may generate.
    pub max_tokens: u32,
    /// The sampling temperature.
    pub temperature: f32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            default_currency: DEFAULT_CURRENCY.to_owned(),
            max_tokens: 1000,
            temperature: 0.1,
        }
    }
}

/// A [TransactionParser] that asks a [CompletionClient] to do the extraction.
#[derive(Debug, Clone)]
pub struct CompletionParser<C> {
    client: C,
    config: ParserConfig,
    system_prompt: String,
}

impl<C> CompletionParser<C>
where
    C: CompletionClient,
{
    /// Create a parser that sends prompts built from `config` to `client`.
    pub fn new(client: C, config: ParserConfig) -> Self {
        let system_prompt = build_system_prompt(&config.default_currency);

        Self {
            client,
            config,
            system_prompt,
        }
    }
}

impl<C> TransactionParser for CompletionParser<C>
where
    C: CompletionClient + Sync,
{
    async fn parse(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<TransactionBuilder>, Error> {
        let request = CompletionRequest {
            system: self.system_prompt.clone(),
            user: text.to_owned(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let content = self
            .client
            .complete(request, cancel)
            .await?
            .ok_or_else(|| {
                Error::ExternalService("no response from the completion service".to_owned())
            })?;

        let transactions = parse_completion_output(
            &content,
            OffsetDateTime::now_utc(),
            &self.config.default_currency,
        )?;

        tracing::debug!("Parsed {} transactions from the text.", transactions.len());

        Ok(transactions)
    }
}
