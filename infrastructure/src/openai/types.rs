//! Wire types for the chat completions endpoint.

use persona_domain::Prompt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(super) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage<'a>>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct WireMessage<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

impl<'a> WireMessage<'a> {
    /// System instruction first, then the turns in order.
    pub fn from_prompt(prompt: &'a Prompt) -> Vec<Self> {
        let system = (!prompt.system_text.is_empty()).then(|| WireMessage {
            role: "system",
            content: prompt.system_text.as_str(),
        });
        system
            .into_iter()
            .chain(prompt.turns.iter().map(|turn| WireMessage {
                role: turn.speaker().as_str(),
                content: turn.text(),
            }))
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ResponseChoice>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ResponseChoice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub(super) struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// One `data:` payload of a streamed reply.
#[derive(Debug, Deserialize)]
pub(super) struct ChatCompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChunkChoice {
    #[serde(default)]
    pub delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}
