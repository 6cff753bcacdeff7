//! Chat use case.
//!
//! [`ChatOrchestrator`] coordinates one conversational exchange:
//!
//! ```text
//! resolve role → append user turn → truncate → build prompt
//!   → call completion client (retry on transient) → append assistant turn
//!   → record history (best-effort) → emit result
//! ```
//!
//! Two entry points share that pipeline: [`chat`](ChatOrchestrator::chat)
//! returns the whole reply, [`chat_stream`](ChatOrchestrator::chat_stream)
//! returns a [`ChatStream`] of incremental chunks. The remaining methods are
//! thin pass-throughs to the session store and role registry.

mod retry;
mod streaming;

pub use streaming::ChatStream;

use crate::config::{ChatParams, RetryPolicy};
use crate::ports::completion_client::{CompletionClient, CompletionError};
use crate::ports::history_recorder::{HistoryRecorder, NoHistoryRecorder, RecorderError};
use crate::session_store::{ExchangeGuard, SessionStore};
use chrono::{DateTime, Utc};
use persona_domain::util::preview;
use persona_domain::{
    ContextSummary, ContextWindow, DomainError, Prompt, RolePromptRegistry, TruncateMode, Turn,
};
use retry::RetryFailure;
use serde::Serialize;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur during a chat call.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Completion failed after {attempts} attempt(s): {last}")]
    CompletionFailed {
        attempts: u32,
        #[source]
        last: CompletionError,
    },

    #[error("Completion rejected: {0}")]
    PermanentCompletion(#[source] CompletionError),

    #[error("Stream interrupted after partial output: {0}")]
    StreamInterrupted(#[source] CompletionError),

    #[error("Invalid settings: {0}")]
    InvalidSettings(#[source] DomainError),

    #[error("Another exchange for '{user_id}' is still running after {waited:?}")]
    Busy { user_id: String, waited: Duration },

    #[error("History unavailable: {0}")]
    History(#[from] RecorderError),
}

impl From<DomainError> for ChatError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::UnknownRole(role) => ChatError::UnknownRole(role),
            other => ChatError::InvalidSettings(other),
        }
    }
}

impl From<RetryFailure> for ChatError {
    fn from(failure: RetryFailure) -> Self {
        match failure {
            RetryFailure::Permanent(error) => ChatError::PermanentCompletion(error),
            RetryFailure::Exhausted { attempts, last } => {
                ChatError::CompletionFailed { attempts, last }
            }
        }
    }
}

/// Result of a buffered [`ChatOrchestrator::chat`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub timestamp: DateTime<Utc>,
    pub current_role: String,
    /// True when an explicit role was requested but is not registered, and
    /// the session's current role was used instead.
    pub role_fallback: bool,
}

/// Everything fixed at the start of an exchange, reused by every attempt.
struct PreparedExchange {
    guard: ExchangeGuard,
    user_turn: Turn,
    prompt: Prompt,
    role: String,
    role_fallback: bool,
}

/// Top-level coordinator between callers, sessions and the completion client.
pub struct ChatOrchestrator {
    store: Arc<SessionStore>,
    client: Arc<dyn CompletionClient>,
    recorder: Arc<dyn HistoryRecorder>,
    retry: RetryPolicy,
    call_timeout: Option<Duration>,
    exchange_wait: Duration,
}

impl ChatOrchestrator {
    /// Create an orchestrator. Fails if `params.default_role` is not registered.
    pub fn new(
        client: Arc<dyn CompletionClient>,
        registry: Arc<RolePromptRegistry>,
        params: ChatParams,
    ) -> Result<Self, ChatError> {
        let store = SessionStore::new(registry, params.window, params.default_role)?;
        Ok(Self {
            store: Arc::new(store),
            client,
            recorder: Arc::new(NoHistoryRecorder),
            retry: params.retry,
            call_timeout: params.call_timeout,
            exchange_wait: params.exchange_wait,
        })
    }

    /// Create with a history recorder.
    pub fn with_history_recorder(mut self, recorder: Arc<dyn HistoryRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    // ==================== Chat ====================

    /// Send `message` for `user_id` and wait for the full reply.
    ///
    /// On failure the user turn stays in the session, no assistant turn is
    /// added, and the error is returned.
    pub async fn chat(
        &self,
        user_id: &str,
        message: &str,
        role_type: Option<&str>,
    ) -> Result<ChatResponse, ChatError> {
        let exchange = self.prepare(user_id, message, role_type).await?;

        let prompt = &exchange.prompt;
        let reply = retry::with_retry(&self.retry, || {
            within(self.call_timeout, self.client.complete(prompt))
        })
        .await
        .map_err(|failure| {
            warn!(user_id, "Chat failed: {:?}", failure);
            ChatError::from(failure)
        })?;

        let assistant_turn = Turn::assistant(reply.clone());
        self.store.append_turn(user_id, assistant_turn.clone());
        record_exchange(
            self.recorder.as_ref(),
            user_id,
            &exchange.user_turn,
            &assistant_turn,
        );
        debug!(user_id, bytes = reply.len(), "Chat completed");

        Ok(ChatResponse {
            response: reply,
            timestamp: assistant_turn.timestamp(),
            current_role: exchange.role,
            role_fallback: exchange.role_fallback,
        })
    }

    /// Send `message` for `user_id` and receive the reply incrementally.
    ///
    /// The returned stream always ends with exactly one terminal chunk.
    /// Failures, including an unknown current role, arrive as an `error`
    /// chunk rather than as a return error.
    pub async fn chat_stream(
        &self,
        user_id: &str,
        message: &str,
        role_type: Option<&str>,
    ) -> ChatStream {
        match self.prepare(user_id, message, role_type).await {
            Ok(exchange) => streaming::spawn(streaming::StreamTask {
                client: self.client.clone(),
                store: self.store.clone(),
                recorder: self.recorder.clone(),
                retry: self.retry.clone(),
                idle_timeout: self.call_timeout,
                user_id: user_id.to_string(),
                user_turn: exchange.user_turn,
                prompt: exchange.prompt,
                role: exchange.role,
                role_fallback: exchange.role_fallback,
                guard: exchange.guard,
            }),
            Err(error) => ChatStream::failed(error, self.store.current_role(user_id)),
        }
    }

    /// Steps shared by both chat modes, performed while holding the user's
    /// exchange gate.
    async fn prepare(
        &self,
        user_id: &str,
        message: &str,
        role_type: Option<&str>,
    ) -> Result<PreparedExchange, ChatError> {
        let guard = tokio::time::timeout(self.exchange_wait, self.store.begin_exchange(user_id))
            .await
            .map_err(|_| {
                warn!(user_id, "Exchange gate still held after {:?}", self.exchange_wait);
                ChatError::Busy {
                    user_id: user_id.to_string(),
                    waited: self.exchange_wait,
                }
            })?;

        let role_fallback = self.resolve_role(user_id, role_type);
        let role = self.store.current_role(user_id);
        let system_text = self.store.registry().lookup(&role)?;

        info!(user_id, role = %role, "Chat: {}", preview(message, 80));

        let user_turn = Turn::user(message);
        let turns = self.store.append_turn(user_id, user_turn.clone());

        Ok(PreparedExchange {
            guard,
            user_turn,
            prompt: Prompt::new(system_text, turns),
            role,
            role_fallback,
        })
    }

    /// Apply an explicit per-call role. Returns true if it had to fall back.
    fn resolve_role(&self, user_id: &str, role_type: Option<&str>) -> bool {
        let Some(requested) = role_type else {
            return false;
        };
        if self.store.set_role(user_id, requested) {
            return false;
        }
        warn!(
            user_id,
            "Unknown role '{}', keeping '{}'",
            requested,
            self.store.current_role(user_id)
        );
        true
    }

    // ==================== Role Management ====================

    /// Switch the user's role. Returns false if `role_type` is not registered.
    pub fn set_role(&self, user_id: &str, role_type: &str) -> bool {
        self.store.set_role(user_id, role_type)
    }

    pub fn get_current_role(&self, user_id: &str) -> String {
        self.store.current_role(user_id)
    }

    pub fn list_available_roles(&self) -> BTreeSet<String> {
        self.store.registry().list_ids()
    }

    // ==================== Context Management ====================

    pub fn clear_context(&self, user_id: &str) {
        self.store.clear(user_id);
    }

    pub fn clear_all_contexts(&self) {
        self.store.clear_all();
    }

    pub fn get_current_context(&self, user_id: &str) -> Option<Vec<Turn>> {
        self.store.turns(user_id)
    }

    pub fn get_context_summary(&self, user_id: &str) -> ContextSummary {
        self.store.summary(user_id)
    }

    /// Change the context window for subsequent truncations.
    ///
    /// `max_turns` of zero is rejected and nothing changes.
    pub fn update_settings(
        &self,
        max_turns: Option<usize>,
        truncate_mode: Option<TruncateMode>,
    ) -> Result<ContextWindow, ChatError> {
        let mut window = self.store.window();
        if let Some(max_turns) = max_turns {
            window = window.with_max_turns(max_turns)?;
        }
        if let Some(mode) = truncate_mode {
            window = window.with_mode(mode);
        }
        self.store.set_window(window);
        info!(
            max_turns = window.max_turns(),
            mode = %window.mode(),
            "Context window updated"
        );
        Ok(window)
    }

    /// The durable transcript for `user_id`.
    pub fn conversation_history(&self, user_id: &str) -> Result<Vec<Turn>, ChatError> {
        Ok(self.recorder.history(user_id)?)
    }
}

/// Await `fut`, turning an elapsed `limit` into [`CompletionError::Timeout`].
async fn within<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = Result<T, CompletionError>>,
) -> Result<T, CompletionError> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or(Err(CompletionError::Timeout)),
        None => fut.await,
    }
}

fn record_exchange(recorder: &dyn HistoryRecorder, user_id: &str, user: &Turn, reply: &Turn) {
    for turn in [user, reply] {
        if let Err(e) = recorder.record(user_id, turn) {
            warn!(user_id, "Failed to record history: {}", e);
        }
    }
}

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use persona_domain::Speaker;

    #[tokio::test]
    async fn test_chat_appends_one_exchange() {
        let client = ScriptedClient::new().reply("Hi there");
        let orchestrator = orchestrator(client.clone(), 10);

        let response = orchestrator.chat("u1", "hello", None).await.unwrap();
        assert_eq!(response.response, "Hi there");
        assert_eq!(response.current_role, "default");
        assert!(!response.role_fallback);

        let turns = orchestrator.get_current_context("u1").unwrap();
        assert_eq!(texts(&turns), vec!["hello", "Hi there"]);

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].system_text, "You are a helpful assistant.");
        assert_eq!(texts(&prompts[0].turns), vec!["hello"]);
    }

    #[tokio::test]
    async fn test_retry_then_success_appends_single_reply() {
        let client = ScriptedClient::new()
            .fail(CompletionError::Timeout)
            .fail(CompletionError::RateLimited("slow down".into()))
            .reply("third time lucky");
        let orchestrator = orchestrator(client.clone(), 10);

        let response = orchestrator.chat("u1", "hello", None).await.unwrap();
        assert_eq!(response.response, "third time lucky");

        let turns = orchestrator.get_current_context("u1").unwrap();
        let replies = turns.iter().filter(|t| t.is_assistant()).count();
        assert_eq!(replies, 1);
        assert_eq!(turns.len(), 2);

        // Every attempt saw the identical prompt
        let prompts = client.prompts();
        assert_eq!(prompts.len(), 3);
        assert!(prompts.iter().all(|p| *p == prompts[0]));
    }

    #[tokio::test]
    async fn test_exhausted_retries_keep_user_turn() {
        let client = ScriptedClient::new()
            .fail(CompletionError::Timeout)
            .fail(CompletionError::Network("reset".into()))
            .fail(CompletionError::Timeout);
        let orchestrator = orchestrator(client.clone(), 10);

        let error = orchestrator.chat("u1", "hello", None).await.unwrap_err();
        match error {
            ChatError::CompletionFailed { attempts, last } => {
                assert_eq!(attempts, 3);
                assert_eq!(last, CompletionError::Timeout);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let turns = orchestrator.get_current_context("u1").unwrap();
        assert_eq!(texts(&turns), vec!["hello"]);
        assert_eq!(client.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_immediate() {
        let client = ScriptedClient::new()
            .fail(CompletionError::InvalidRequest("bad model".into()))
            .reply("never reached");
        let orchestrator = orchestrator(client.clone(), 10);

        let error = orchestrator.chat("u1", "hello", None).await.unwrap_err();
        assert!(matches!(error, ChatError::PermanentCompletion(_)));
        assert_eq!(client.prompts().len(), 1);
        assert_eq!(orchestrator.get_current_context("u1").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_call_timeout_is_transient() {
        let client = ScriptedClient::new().stall().reply("after stall");
        let orchestrator = orchestrator(client.clone(), 10);

        let response = orchestrator.chat("u1", "hello", None).await.unwrap();
        assert_eq!(response.response, "after stall");
        assert_eq!(client.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_explicit_role_switches_session() {
        let client = ScriptedClient::new().reply("fn main() {}");
        let orchestrator = orchestrator(client.clone(), 10);

        let response = orchestrator.chat("u1", "write code", Some("code")).await.unwrap();
        assert_eq!(response.current_role, "code");
        assert!(!response.role_fallback);
        assert_eq!(orchestrator.get_current_role("u1"), "code");
        assert_eq!(
            client.prompts()[0].system_text,
            "You are a coding assistant that helps with programming."
        );
    }

    #[tokio::test]
    async fn test_invalid_role_falls_back_and_reports() {
        let client = ScriptedClient::new().reply("ok");
        let orchestrator = orchestrator(client.clone(), 10);
        orchestrator.set_role("u1", "creative");

        let response = orchestrator.chat("u1", "hi", Some("pirate")).await.unwrap();
        assert!(response.role_fallback);
        assert_eq!(response.current_role, "creative");
        assert_eq!(orchestrator.get_current_role("u1"), "creative");
    }

    #[tokio::test]
    async fn test_prompt_uses_truncated_history() {
        let client = ScriptedClient::new().reply("a0").reply("a1").reply("a2");
        let orchestrator = orchestrator(client.clone(), 2);

        for q in ["q0", "q1", "q2"] {
            orchestrator.chat("u1", q, None).await.unwrap();
        }

        let prompts = client.prompts();
        assert_eq!(texts(&prompts[2].turns), vec!["q0", "a0", "q1", "a1", "q2"]);
        let turns = orchestrator.get_current_context("u1").unwrap();
        assert_eq!(texts(&turns), vec!["q1", "a1", "q2", "a2"]);
    }

    #[tokio::test]
    async fn test_single_turn_window_keeps_previous_exchange() {
        let client = ScriptedClient::new().reply("a0").reply("a1");
        let orchestrator = orchestrator(client.clone(), 1);

        orchestrator.chat("u1", "q0", None).await.unwrap();
        orchestrator.chat("u1", "q1", None).await.unwrap();

        let prompts = client.prompts();
        assert_eq!(texts(&prompts[1].turns), vec!["q0", "a0", "q1"]);
        assert_eq!(
            texts(&orchestrator.get_current_context("u1").unwrap()),
            vec!["q1", "a1"]
        );
    }

    #[tokio::test]
    async fn test_history_recorded_after_exchange() {
        let client = ScriptedClient::new().reply("Hi");
        let recorder = Arc::new(MemoryRecorder::default());
        let orchestrator = orchestrator(client, 10).with_history_recorder(recorder.clone());

        orchestrator.chat("u1", "hello", None).await.unwrap();

        let history = orchestrator.conversation_history("u1").unwrap();
        assert_eq!(texts(&history), vec!["hello", "Hi"]);
        assert_eq!(history[0].speaker(), Speaker::User);
        assert_eq!(history[1].speaker(), Speaker::Assistant);
    }

    #[tokio::test]
    async fn test_history_failure_does_not_affect_session() {
        let client = ScriptedClient::new().reply("Hi");
        let orchestrator =
            orchestrator(client, 10).with_history_recorder(Arc::new(FailingRecorder));

        let response = orchestrator.chat("u1", "hello", None).await.unwrap();
        assert_eq!(response.response, "Hi");
        assert_eq!(orchestrator.get_current_context("u1").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_same_user_messages_do_not_interleave() {
        let orchestrator = echo_orchestrator(Duration::from_millis(20));

        let (first, second) = tokio::join!(
            orchestrator.chat("u1", "first", None),
            orchestrator.chat("u1", "second", None),
        );
        first.unwrap();
        second.unwrap();

        let turns = orchestrator.get_current_context("u1").unwrap();
        assert_eq!(turns.len(), 4);
        for pair in turns.chunks(2) {
            assert!(pair[0].is_user());
            assert!(pair[1].is_assistant());
            assert_eq!(pair[1].text(), format!("echo: {}", pair[0].text()));
        }
    }

    #[tokio::test]
    async fn test_distinct_users_are_independent() {
        let orchestrator = echo_orchestrator(Duration::from_millis(20));

        let (a, b) = tokio::join!(
            orchestrator.chat("alice", "hi from alice", Some("code")),
            orchestrator.chat("bob", "hi from bob", None),
        );
        assert_eq!(a.unwrap().response, "echo: hi from alice");
        assert_eq!(b.unwrap().response, "echo: hi from bob");

        assert_eq!(orchestrator.get_current_role("alice"), "code");
        assert_eq!(orchestrator.get_current_role("bob"), "default");
        assert_eq!(
            texts(&orchestrator.get_current_context("bob").unwrap()),
            vec!["hi from bob", "echo: hi from bob"]
        );
    }

    #[test]
    fn test_set_role_facade() {
        let orchestrator = orchestrator(ScriptedClient::new(), 10);

        assert!(!orchestrator.set_role("u1", "nobody"));
        assert_eq!(orchestrator.get_current_role("u1"), "default");

        assert!(orchestrator.set_role("u1", "professional"));
        assert_eq!(orchestrator.get_current_role("u1"), "professional");

        assert!(orchestrator.list_available_roles().contains("professional"));
    }

    #[tokio::test]
    async fn test_clear_context_twice() {
        let client = ScriptedClient::new().reply("Hi");
        let orchestrator = orchestrator(client, 10);
        orchestrator.chat("u1", "hello", Some("code")).await.unwrap();

        orchestrator.clear_context("u1");
        orchestrator.clear_context("u1");

        let summary = orchestrator.get_context_summary("u1");
        assert_eq!(summary.turn_count, 0);
        assert_eq!(summary.current_role, "default");
        assert_eq!(orchestrator.get_current_context("u1"), Some(vec![]));
    }

    #[tokio::test]
    async fn test_clear_all_contexts() {
        let client = ScriptedClient::new().reply("a").reply("b");
        let orchestrator = orchestrator(client, 10);
        orchestrator.chat("u1", "x", None).await.unwrap();
        orchestrator.chat("u2", "y", None).await.unwrap();

        orchestrator.clear_all_contexts();
        assert!(orchestrator.get_current_context("u1").is_none());
        assert!(orchestrator.get_current_context("u2").is_none());
    }

    #[test]
    fn test_update_settings() {
        let orchestrator = orchestrator(ScriptedClient::new(), 10);

        let window = orchestrator
            .update_settings(Some(3), Some(TruncateMode::Clear))
            .unwrap();
        assert_eq!(window.max_turns(), 3);
        assert_eq!(window.mode(), TruncateMode::Clear);

        let error = orchestrator.update_settings(Some(0), None).unwrap_err();
        assert!(matches!(error, ChatError::InvalidSettings(_)));
        assert_eq!(orchestrator.get_context_summary("u1").max_turns, 3);
    }

    #[test]
    fn test_new_rejects_unknown_default_role() {
        let result = ChatOrchestrator::new(
            Arc::new(ScriptedClient::new()),
            Arc::new(RolePromptRegistry::with_builtin()),
            ChatParams::default().with_default_role("nobody"),
        );
        assert!(matches!(result, Err(ChatError::UnknownRole(_))));
    }
}
