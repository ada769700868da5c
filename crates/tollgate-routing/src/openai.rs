//! OpenAI-compatible chat completions backend

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tollgate_config::ModelsConfig;
use tollgate_core::ModelTier;
use url::Url;

use crate::{
    backend::{BackendError, Generation, ModelBackend},
    pricing::count_tokens,
};

/// Longest error body kept in a [`BackendError::Status`]
const MAX_ERROR_BODY: usize = 512;

/// Backend speaking the `/chat/completions` protocol
pub struct OpenAiBackend {
    client: Client,
    base_url: Url,
    api_key: Option<SecretString>,
    cheap_model: String,
    expensive_model: String,
}

impl OpenAiBackend {
    pub fn new(config: &ModelsConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &ModelsConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            cheap_model: config.cheap.model.clone(),
            expensive_model: config.expensive.model.clone(),
        }
    }

    fn completions_url(&self) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/chat/completions")
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[async_trait]
impl ModelBackend for OpenAiBackend {
    async fn invoke(&self, tier: ModelTier, prompt: &str, max_output_tokens: u32) -> Result<Generation, BackendError> {
        let model = self.model(tier);
        let body = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: max_output_tokens,
        };

        let mut builder = self.client.post(self.completions_url()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(tier = %tier, model, error = %e, "model request failed");
            BackendError::Request(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            if message.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY).rev().find(|&i| message.is_char_boundary(i)).unwrap_or(0);
                message.truncate(cut);
            }

            tracing::warn!(tier = %tier, model, status = %status, "model backend returned error");
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("failed to parse response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| BackendError::InvalidResponse("response has no message content".to_owned()))?;

        let (input_tokens, output_tokens) = match parsed.usage {
            Some(usage) => (usage.prompt_tokens, usage.completion_tokens),
            None => (count_tokens(prompt), count_tokens(&text)),
        };

        Ok(Generation {
            text,
            input_tokens,
            output_tokens,
        })
    }

    fn model(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Cheap => &self.cheap_model,
            ModelTier::Expensive => &self.expensive_model,
        }
    }
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend")
            .field("base_url", &self.base_url.as_str())
            .field("cheap_model", &self.cheap_model)
            .field("expensive_model", &self.expensive_model)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use tollgate_config::TierModelConfig;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, header, method, path},
    };

    use super::*;

    fn config(base_url: &str) -> ModelsConfig {
        ModelsConfig {
            base_url: base_url.parse().unwrap(),
            api_key: Some(SecretString::from("sk-test")),
            cheap: TierModelConfig {
                model: "small".to_owned(),
                input_per_mtok: 0.15,
                output_per_mtok: 0.60,
            },
            expensive: TierModelConfig {
                model: "large".to_owned(),
                input_per_mtok: 2.5,
                output_per_mtok: 10.0,
            },
        }
    }

    #[tokio::test]
    async fn sends_tier_model_and_reads_usage() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "large",
                "max_tokens": 300,
                "messages": [{"role": "user", "content": "plan day two"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "Morning hike, then lunch."}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 7}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(&config(&format!("{}/v1", server.uri())));
        let generation = backend.invoke(ModelTier::Expensive, "plan day two", 300).await.unwrap();

        assert_eq!(generation.text, "Morning hike, then lunch.");
        assert_eq!(generation.input_tokens, 12);
        assert_eq!(generation.output_tokens, 7);
    }

    #[tokio::test]
    async fn missing_usage_is_estimated() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "Visit the old town."}}]
            })))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(&config(&server.uri()));
        let generation = backend.invoke(ModelTier::Cheap, "where to go", 50).await.unwrap();

        assert!(generation.input_tokens > 0);
        assert!(generation.output_tokens > 0);
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(&config(&server.uri()));
        let err = backend.invoke(ModelTier::Cheap, "hi", 10).await.unwrap_err();

        match err {
            BackendError::Status { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "slow down");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_are_invalid() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let backend = OpenAiBackend::new(&config(&server.uri()));
        assert!(matches!(
            backend.invoke(ModelTier::Cheap, "hi", 10).await,
            Err(BackendError::InvalidResponse(_))
        ));
    }
}
