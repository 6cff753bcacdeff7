//! Test mocks shared by the chat use case tests.

use super::*;
use crate::ports::completion_client::{Fragment, FragmentStream};
use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

// ==================== Helpers ====================

pub(super) fn texts(turns: &[Turn]) -> Vec<&str> {
    turns.iter().map(Turn::text).collect()
}

pub(super) fn orchestrator(client: ScriptedClient, max_turns: usize) -> ChatOrchestrator {
    let params = ChatParams::default()
        .with_window(ContextWindow::try_new(max_turns, TruncateMode::Sliding).unwrap())
        .with_retry(RetryPolicy::immediate(3))
        .with_call_timeout(Some(Duration::from_millis(50)));
    ChatOrchestrator::new(
        Arc::new(client),
        Arc::new(RolePromptRegistry::with_builtin()),
        params,
    )
    .unwrap()
}

pub(super) fn orchestrator_with_timeout(
    client: ScriptedClient,
    timeout: Option<Duration>,
) -> ChatOrchestrator {
    let params = ChatParams::default()
        .with_retry(RetryPolicy::immediate(3))
        .with_call_timeout(timeout);
    ChatOrchestrator::new(
        Arc::new(client),
        Arc::new(RolePromptRegistry::with_builtin()),
        params,
    )
    .unwrap()
}

pub(super) fn orchestrator_with_exchange_wait(
    client: ScriptedClient,
    wait: Duration,
) -> ChatOrchestrator {
    let params = ChatParams::default()
        .with_retry(RetryPolicy::immediate(3))
        .with_call_timeout(Some(Duration::from_millis(50)))
        .with_exchange_wait(wait);
    ChatOrchestrator::new(
        Arc::new(client),
        Arc::new(RolePromptRegistry::with_builtin()),
        params,
    )
    .unwrap()
}

pub(super) fn echo_orchestrator(delay: Duration) -> ChatOrchestrator {
    let params = ChatParams::default().with_retry(RetryPolicy::immediate(1));
    ChatOrchestrator::new(
        Arc::new(EchoClient { delay }),
        Arc::new(RolePromptRegistry::with_builtin()),
        params,
    )
    .unwrap()
}

// ==================== Scripted Client ====================

enum Reply {
    Text(String),
    Fail(CompletionError),
    Stall,
}

enum StreamScript {
    OpenFail(CompletionError),
    Items {
        items: Vec<Result<Fragment, CompletionError>>,
        hang: bool,
    },
}

#[derive(Default)]
struct Script {
    replies: Mutex<VecDeque<Reply>>,
    streams: Mutex<VecDeque<StreamScript>>,
    prompts: Mutex<Vec<Prompt>>,
    released: Arc<AtomicBool>,
}

/// Completion client that plays back queued results and records prompts.
#[derive(Clone, Default)]
pub(super) struct ScriptedClient {
    script: Arc<Script>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.script.replies.lock().push_back(Reply::Text(text.to_string()));
        self
    }

    pub fn fail(self, error: CompletionError) -> Self {
        self.script.replies.lock().push_back(Reply::Fail(error));
        self
    }

    /// Next buffered call never returns.
    pub fn stall(self) -> Self {
        self.script.replies.lock().push_back(Reply::Stall);
        self
    }

    pub fn stream_ok(self, fragments: &[&str]) -> Self {
        self.push_stream(fragments, None, false)
    }

    pub fn stream_then_fail(self, fragments: &[&str], error: CompletionError) -> Self {
        self.push_stream(fragments, Some(error), false)
    }

    /// Stream that yields `fragments` and then stays open without ending.
    pub fn stream_hang(self, fragments: &[&str]) -> Self {
        self.push_stream(fragments, None, true)
    }

    pub fn stream_open_fail(self, error: CompletionError) -> Self {
        self.script
            .streams
            .lock()
            .push_back(StreamScript::OpenFail(error));
        self
    }

    fn push_stream(self, fragments: &[&str], error: Option<CompletionError>, hang: bool) -> Self {
        let mut items: Vec<_> = fragments.iter().map(|f| Ok(Fragment::new(*f))).collect();
        items.extend(error.map(Err));
        self.script
            .streams
            .lock()
            .push_back(StreamScript::Items { items, hang });
        self
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.script.prompts.lock().clone()
    }

    pub fn released_flag(&self) -> ReleasedFlag {
        ReleasedFlag(self.script.released.clone())
    }
}

/// Observes whether the last hanging stream was dropped.
pub(super) struct ReleasedFlag(Arc<AtomicBool>);

impl ReleasedFlag {
    pub fn is_released(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct DropSignal(Arc<AtomicBool>);

impl Drop for DropSignal {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, CompletionError> {
        self.script.prompts.lock().push(prompt.clone());
        let next = self.script.replies.lock().pop_front();
        match next {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(error)) => Err(error),
            Some(Reply::Stall) => futures::future::pending().await,
            None => Err(CompletionError::Other("No more replies".to_string())),
        }
    }

    async fn stream(&self, prompt: &Prompt) -> Result<FragmentStream, CompletionError> {
        self.script.prompts.lock().push(prompt.clone());
        let next = self.script.streams.lock().pop_front();
        match next {
            Some(StreamScript::OpenFail(error)) => Err(error),
            Some(StreamScript::Items { items, hang }) => {
                let signal = DropSignal(self.script.released.clone());
                let items = futures::stream::iter(items);
                if hang {
                    let tail = futures::stream::pending().map(move |item| {
                        let _keep = &signal;
                        item
                    });
                    Ok(items.chain(tail).boxed())
                } else {
                    drop(signal);
                    Ok(items.boxed())
                }
            }
            None => Err(CompletionError::Other("No more streams".to_string())),
        }
    }
}

// ==================== Echo Client ====================

/// Replies with the last user message after a delay.
pub(super) struct EchoClient {
    delay: Duration,
}

#[async_trait]
impl CompletionClient for EchoClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, CompletionError> {
        tokio::time::sleep(self.delay).await;
        Ok(format!("echo: {}", prompt.last_user_text().unwrap_or_default()))
    }
}

// ==================== Recorders ====================

#[derive(Default)]
pub(super) struct MemoryRecorder {
    turns: Mutex<Vec<(String, Turn)>>,
}

impl HistoryRecorder for MemoryRecorder {
    fn record(&self, user_id: &str, turn: &Turn) -> Result<(), RecorderError> {
        self.turns.lock().push((user_id.to_string(), turn.clone()));
        Ok(())
    }

    fn history(&self, user_id: &str) -> Result<Vec<Turn>, RecorderError> {
        Ok(self
            .turns
            .lock()
            .iter()
            .filter(|(id, _)| id == user_id)
            .map(|(_, turn)| turn.clone())
            .collect())
    }
}

pub(super) struct FailingRecorder;

impl HistoryRecorder for FailingRecorder {
    fn record(&self, _user_id: &str, _turn: &Turn) -> Result<(), RecorderError> {
        Err(RecorderError::Io(std::io::Error::other("disk full")))
    }
}
