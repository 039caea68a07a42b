//! The client for the external text completion service.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::Error;

/// A single prompt for the completion service.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// The instructions that describe the task and the output format.
    pub system: String,
    /// The text to complete, i.e. the user's description of their spending.
    pub user: String,
    /// The maximum number of tokens the service may generate.
    pub max_tokens: u32,
    /// The sampling temperature, lower values give more predictable output.
    pub temperature: f32,
}

/// Sends prompts to a text completion service.
pub trait CompletionClient {
    /// Send `request` and return the text of the first candidate, or `None`
    /// if the service returned no candidates.
    ///
    /// # Errors
    /// Returns [Error::ExternalService] if the service could not be reached
    /// or responded with an error, and [Error::Cancelled] if `cancel` fires
    /// before the service responds.
    fn complete(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Option<String>, Error>> + Send;
}

/// A client for an OpenAI compatible chat completions API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// Create a client that sends requests to `{base_url}/chat/completions`.
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
        }
    }

    async fn send(&self, request: CompletionRequest) -> Result<Option<String>, Error> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|error| Error::ExternalService(format!("could not send request: {error}")))?;

        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::ExternalService(format!(
                "the service responded with {status}: {text}"
            )));
        }

        let response: ChatResponse = response.json().await.map_err(|error| {
            Error::ExternalService(format!("could not read the response: {error}"))
        })?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default()))
    }
}

impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, Error> {
        tokio::select! {
            result = self.send(request) => result,
            _ = cancel.cancelled() => {
                tracing::debug!("Abandoning completion request for a cancelled request.");
                Err(Error::Cancelled)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use std::{
        net::SocketAddr,
        sync::{Arc, Mutex},
        time::Duration,
    };

    use axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode, header::AUTHORIZATION},
        response::{IntoResponse, Response},
        routing::post,
    };
    use serde_json::{Value, json};
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    use crate::Error;

    use super::{CompletionClient, CompletionRequest, OpenAiClient};

    #[derive(Clone, Default)]
    struct Received {
        body: Arc<Mutex<Option<Value>>>,
        authorization: Arc<Mutex<Option<String>>>,
    }

    async fn serve(router: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        address
    }

    fn get_request() -> CompletionRequest {
        CompletionRequest {
            system: "You are a parser.".to_owned(),
            user: "spent 10 on coffee".to_owned(),
            max_tokens: 1000,
            temperature: 0.1,
        }
    }

    async fn fixed_response(status: StatusCode, body: Value) -> SocketAddr {
        let router = Router::new().route(
            "/chat/completions",
            post(move || async move { (status, Json(body)).into_response() }),
        );

        serve(router).await
    }

    #[tokio::test]
    async fn sends_chat_request_and_returns_first_choice() {
        async fn handler(
            State(received): State<Received>,
            headers: HeaderMap,
            Json(body): Json<Value>,
        ) -> Response {
            *received.body.lock().unwrap() = Some(body);
            *received.authorization.lock().unwrap() = headers
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);

            Json(json!({
                "choices": [
                    {"message": {"role": "assistant", "content": "first"}},
                    {"message": {"role": "assistant", "content": "second"}}
                ]
            }))
            .into_response()
        }

        let received = Received::default();
        let router = Router::new()
            .route("/v1/chat/completions", post(handler))
            .with_state(received.clone());
        let address = serve(router).await;
        let client = OpenAiClient::new(&format!("http://{address}/v1/"), "secret", "gpt-test");

        let got = client
            .complete(get_request(), &CancellationToken::new())
            .await;

        assert_eq!(got, Ok(Some("first".to_owned())));
        assert_eq!(
            received.authorization.lock().unwrap().as_deref(),
            Some("Bearer secret")
        );
        let body = received.body.lock().unwrap().clone().unwrap();
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "You are a parser.");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "spent 10 on coffee");
    }

    #[tokio::test]
    async fn no_choices_returns_none() {
        let address = fixed_response(StatusCode::OK, json!({"choices": []})).await;
        let client = OpenAiClient::new(&format!("http://{address}"), "secret", "gpt-test");

        let got = client
            .complete(get_request(), &CancellationToken::new())
            .await;

        assert_eq!(got, Ok(None));
    }

    #[tokio::test]
    async fn error_status_is_external_service_error() {
        let address = fixed_response(
            StatusCode::TOO_MANY_REQUESTS,
            json!({"error": {"message": "rate limited"}}),
        )
        .await;
        let client = OpenAiClient::new(&format!("http://{address}"), "secret", "gpt-test");

        let got = client
            .complete(get_request(), &CancellationToken::new())
            .await;

        match got {
            Err(Error::ExternalService(message)) => {
                assert!(message.contains("429"), "message {message:?}");
                assert!(message.contains("rate limited"), "message {message:?}");
            }
            other => panic!("want external service error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_service_is_external_service_error() {
        // Bind then drop a listener to get a port that nothing listens on.
        let address = TcpListener::bind("127.0.0.1:0")
            .await
            .unwrap()
            .local_addr()
            .unwrap();
        let client = OpenAiClient::new(&format!("http://{address}"), "secret", "gpt-test");

        let got = client
            .complete(get_request(), &CancellationToken::new())
            .await;

        assert!(matches!(got, Err(Error::ExternalService(_))), "got {got:?}");
    }

    #[tokio::test]
    async fn cancellation_abandons_request() {
        let router = Router::new().route(
            "/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!({"choices": []}))
            }),
        );
        let address = serve(router).await;
        let client = OpenAiClient::new(&format!("http://{address}"), "secret", "gpt-test");
        let cancel = CancellationToken::new();

        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            })
        };

        let got = client.complete(get_request(), &cancel).await;

        canceller.await.unwrap();
        assert_eq!(got, Err(Error::Cancelled));
    }
}
