//! Streaming chat.
//!
//! A [`ChatStream`] is the single-consumer end of a bounded channel fed by a
//! background task. The task pulls fragments from the completion client one
//! at a time and forwards each as a `content` chunk; the channel holds at most
//! one chunk, so the remote stream is only polled as fast as the caller reads.
//!
//! Retries are allowed only while nothing has been forwarded. After the first
//! content chunk a failure becomes a terminal `error` chunk.
//!
//! Dropping or cancelling the [`ChatStream`] before its terminal chunk stops
//! the task, releases the remote stream and discards the partial reply.

use super::retry;
use super::{ChatError, record_exchange, within};
use crate::config::RetryPolicy;
use crate::ports::completion_client::{CompletionClient, CompletionError, FragmentStream};
use crate::ports::history_recorder::HistoryRecorder;
use crate::session_store::{ExchangeGuard, SessionStore};
use futures::{Stream, StreamExt};
use persona_domain::{Prompt, StreamChunk, Turn};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Handle for consuming a streamed reply.
///
/// Yields `content` chunks followed by exactly one `done` or `error` chunk,
/// then ends.
pub struct ChatStream {
    receiver: mpsc::Receiver<StreamChunk>,
    cancel: CancellationToken,
    role: String,
    role_fallback: bool,
    finished: bool,
}

impl ChatStream {
    fn new(
        receiver: mpsc::Receiver<StreamChunk>,
        cancel: CancellationToken,
        role: String,
        role_fallback: bool,
    ) -> Self {
        Self {
            receiver,
            cancel,
            role,
            role_fallback,
            finished: false,
        }
    }

    /// A stream that only yields one `error` chunk.
    pub(super) fn failed(error: ChatError, role: String) -> Self {
        let (tx, rx) = mpsc::channel(1);
        // capacity 1, receiver alive: cannot fail
        let _ = tx.try_send(StreamChunk::error(error.to_string(), role.as_str()));
        Self::new(rx, CancellationToken::new(), role, false)
    }

    /// True when an explicit role was requested but is not registered.
    pub fn role_fallback(&self) -> bool {
        self.role_fallback
    }

    /// Role the reply is generated under.
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Stop consuming. No further chunks are delivered and the partial reply
    /// is not stored.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.receiver.close();
        self.finished = true;
    }

    /// Receive the next chunk, or `None` after the terminal chunk.
    pub async fn next_chunk(&mut self) -> Option<StreamChunk> {
        StreamExt::next(self).await
    }

    /// Consume the stream and return every chunk.
    pub async fn collect_chunks(mut self) -> Vec<StreamChunk> {
        let mut chunks = Vec::new();
        while let Some(chunk) = self.next_chunk().await {
            chunks.push(chunk);
        }
        chunks
    }
}

impl Stream for ChatStream {
    type Item = StreamChunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(chunk)) => {
                if chunk.is_terminal() {
                    self.finished = true;
                }
                Poll::Ready(Some(chunk))
            }
            Poll::Ready(None) => {
                // producer vanished without a terminal chunk
                self.finished = true;
                let role = self.role.clone();
                Poll::Ready(Some(StreamChunk::error("Stream ended unexpectedly", role)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ChatStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// State moved into the background task of one streamed exchange.
pub(super) struct StreamTask {
    pub client: Arc<dyn CompletionClient>,
    pub store: Arc<SessionStore>,
    pub recorder: Arc<dyn HistoryRecorder>,
    pub retry: RetryPolicy,
    pub idle_timeout: Option<Duration>,
    pub user_id: String,
    pub user_turn: Turn,
    pub prompt: Prompt,
    pub role: String,
    pub role_fallback: bool,
    pub guard: ExchangeGuard,
}

enum Outcome {
    Finished(String),
    Failed(ChatError),
    Cancelled,
}

/// Start the background task and return the consumer handle.
pub(super) fn spawn(task: StreamTask) -> ChatStream {
    let (tx, rx) = mpsc::channel(1);
    let cancel = CancellationToken::new();
    let stream = ChatStream::new(rx, cancel.clone(), task.role.clone(), task.role_fallback);
    tokio::spawn(task.run(tx, cancel));
    stream
}

impl StreamTask {
    async fn run(self, tx: mpsc::Sender<StreamChunk>, cancel: CancellationToken) {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Outcome::Cancelled,
            outcome = self.pump(&tx) => outcome,
        };

        let terminal = match outcome {
            Outcome::Finished(_) | Outcome::Cancelled if cancel.is_cancelled() => {
                debug!(user_id = %self.user_id, "Stream cancelled by consumer, discarding partial reply");
                None
            }
            Outcome::Finished(text) => {
                let assistant_turn = Turn::assistant(text);
                self.store
                    .append_turn(&self.user_id, assistant_turn.clone());
                record_exchange(
                    self.recorder.as_ref(),
                    &self.user_id,
                    &self.user_turn,
                    &assistant_turn,
                );
                debug!(user_id = %self.user_id, bytes = assistant_turn.text().len(), "Stream completed");
                Some(StreamChunk::done(self.role.as_str()))
            }
            Outcome::Failed(error) => {
                warn!(user_id = %self.user_id, "Stream failed: {}", error);
                Some(StreamChunk::error(error.to_string(), self.role.as_str()))
            }
            Outcome::Cancelled => {
                debug!(user_id = %self.user_id, "Stream consumer went away, discarding partial reply");
                None
            }
        };

        // the session is final here; delivering the terminal chunk must not
        // keep the next exchange waiting
        drop(self.guard);
        if let Some(chunk) = terminal {
            let _ = tx.send(chunk).await;
        }
    }

    /// Drive attempts until the reply finishes, fails, or the consumer leaves.
    async fn pump(&self, tx: &mpsc::Sender<StreamChunk>) -> Outcome {
        let mut buffer = String::new();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match self.open().await {
                Ok(mut fragments) => loop {
                    let next = match self.idle_timeout {
                        Some(limit) => tokio::time::timeout(limit, fragments.next())
                            .await
                            .unwrap_or(Some(Err(CompletionError::Timeout))),
                        None => fragments.next().await,
                    };
                    match next {
                        None => return Outcome::Finished(buffer),
                        Some(Ok(fragment)) if fragment.text.is_empty() => continue,
                        Some(Ok(fragment)) => {
                            buffer.push_str(&fragment.text);
                            let chunk = StreamChunk::content(fragment.text, self.role.as_str());
                            if tx.send(chunk).await.is_err() {
                                return Outcome::Cancelled;
                            }
                        }
                        Some(Err(error)) => break error,
                    }
                },
                Err(error) => error,
            };

            if !buffer.is_empty() {
                return Outcome::Failed(ChatError::StreamInterrupted(error));
            }
            match retry::next_delay(&self.retry, attempt, error) {
                Ok(delay) => tokio::time::sleep(delay).await,
                Err(failure) => return Outcome::Failed(ChatError::from(failure)),
            }
        }
    }

    async fn open(&self) -> Result<FragmentStream, CompletionError> {
        within(self.idle_timeout, self.client.stream(&self.prompt)).await
    }
}
