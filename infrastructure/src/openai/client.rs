//! [`CompletionClient`] over an OpenAI-compatible HTTP endpoint.

use super::error::OpenAiError;
use super::sse;
use super::types::{ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, WireMessage};
use crate::config::FileProviderConfig;
use async_trait::async_trait;
use futures::StreamExt;
use persona_application::{CompletionClient, CompletionError, Fragment, FragmentStream};
use persona_domain::Prompt;
use std::time::Duration;
use tracing::{debug, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything needed to address the endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub model: String,
    /// Sent as a bearer token when present.
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl OpenAiSettings {
    /// Settings from the `[provider]` section, with the key read from the
    /// configured environment variable.
    pub fn from_config(config: &FileProviderConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            model: config.parse_model().0,
            api_key: config.api_key(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            top_p: config.top_p,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Chat completions client.
///
/// Does not enforce an overall deadline; the orchestrator bounds each call.
pub struct OpenAiCompletionClient {
    http: reqwest::Client,
    settings: OpenAiSettings,
}

impl OpenAiCompletionClient {
    pub fn new(settings: OpenAiSettings) -> Result<Self, OpenAiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &OpenAiSettings {
        &self.settings
    }

    fn body<'a>(&'a self, prompt: &'a Prompt, stream: bool) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.settings.model,
            messages: WireMessage::from_prompt(prompt),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            top_p: self.settings.top_p,
            stream,
        }
    }

    /// Send the request; non-success statuses become [`OpenAiError::Status`].
    async fn send(&self, prompt: &Prompt, stream: bool) -> Result<reqwest::Response, OpenAiError> {
        let body = self.body(prompt, stream);
        debug!(
            model = %self.settings.model,
            messages = body.messages.len(),
            stream,
            "Sending chat completion request"
        );

        let mut request = self.http.post(self.settings.endpoint()).json(&body);
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Chat completion request rejected");
            return Err(OpenAiError::from_status(status.as_u16(), &text));
        }
        Ok(response)
    }

    async fn complete_inner(&self, prompt: &Prompt) -> Result<String, OpenAiError> {
        let response = self.send(prompt, false).await?;
        let text = response.text().await?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&text)?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(OpenAiError::EmptyResponse)?;
        Ok(choice.message.content.unwrap_or_default())
    }
}

/// Text of the first choice's delta, if any.
fn fragment_of(payload: &str) -> Result<Option<Fragment>, OpenAiError> {
    let chunk: ChatCompletionChunk = serde_json::from_str(payload)?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|text| !text.is_empty())
        .map(Fragment::new))
}

#[async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, CompletionError> {
        Ok(self.complete_inner(prompt).await?)
    }

    async fn stream(&self, prompt: &Prompt) -> Result<FragmentStream, CompletionError> {
        let response = self.send(prompt, true).await?;
        let fragments = sse::data_payloads(response.bytes_stream()).filter_map(|payload| {
            let item = match payload.and_then(|data| fragment_of(&data)) {
                Ok(Some(fragment)) => Some(Ok(fragment)),
                Ok(None) => None,
                Err(e) => Some(Err(CompletionError::from(e))),
            };
            futures::future::ready(item)
        });
        Ok(fragments.boxed())
    }
}
