//! Server-sent event framing for streamed completions.
//!
//! Buffers raw body chunks, splits them into lines and yields the payload of
//! each `data:` line. A `data: [DONE]` line ends the stream; comments, blank
//! lines and other fields are skipped.

use super::error::OpenAiError;
use futures::{Stream, StreamExt};
use std::pin::Pin;

const DONE_MARKER: &str = "[DONE]";

/// What a single SSE line carries.
#[derive(Debug, PartialEq, Eq)]
pub enum SseLine<'a> {
    Data(&'a str),
    Done,
    Skip,
}

/// Classify one line (without its line terminator).
pub fn parse_line(line: &str) -> SseLine<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return SseLine::Skip;
    }
    let Some(data) = trimmed
        .strip_prefix("data: ")
        .or_else(|| trimmed.strip_prefix("data:"))
    else {
        return SseLine::Skip;
    };
    match data.trim() {
        DONE_MARKER => SseLine::Done,
        "" => SseLine::Skip,
        payload => SseLine::Data(payload),
    }
}

struct State<S> {
    body: Pin<Box<S>>,
    buffer: Vec<u8>,
    finished: bool,
}

/// Turn a byte stream into the sequence of `data:` payloads.
///
/// A transport error is yielded once and ends the sequence. Body end without
/// `[DONE]` also ends it; a trailing unterminated line is still parsed.
pub fn data_payloads<S, B, E>(body: S) -> impl Stream<Item = Result<String, OpenAiError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<OpenAiError> + Send,
{
    let state = State {
        body: Box::pin(body),
        buffer: Vec::with_capacity(8192),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        loop {
            if let Some(newline) = state.buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = state.buffer.drain(..=newline).collect();
                match classify(&line[..newline]) {
                    Some(Event::Payload(payload)) => return Some((Ok(payload), state)),
                    Some(Event::Done) => return None,
                    None => continue,
                }
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e.into()), state));
                }
                None => {
                    state.finished = true;
                    let rest = std::mem::take(&mut state.buffer);
                    return match classify(&rest) {
                        Some(Event::Payload(payload)) => Some((Ok(payload), state)),
                        _ => None,
                    };
                }
            }
        }
    })
}

enum Event {
    Payload(String),
    Done,
}

/// `None` for lines to skip, including invalid UTF-8.
fn classify(raw: &[u8]) -> Option<Event> {
    let line = std::str::from_utf8(raw).ok()?;
    match parse_line(line) {
        SseLine::Data(payload) => Some(Event::Payload(payload.to_string())),
        SseLine::Done => Some(Event::Done),
        SseLine::Skip => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(
        chunks: &[&str],
    ) -> impl Stream<Item = Result<Vec<u8>, OpenAiError>> + Send + Unpin + use<> {
        let chunks: Vec<_> = chunks.iter().map(|c| Ok(c.as_bytes().to_vec())).collect();
        futures::stream::iter(chunks)
    }

    async fn collect(chunks: &[&str]) -> Vec<String> {
        data_payloads(body(chunks))
            .map(|item| item.unwrap())
            .collect()
            .await
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("data: {\"a\":1}"), SseLine::Data("{\"a\":1}"));
        assert_eq!(parse_line("data:{\"a\":1}\r"), SseLine::Data("{\"a\":1}"));
        assert_eq!(parse_line("data: [DONE]"), SseLine::Done);
        assert_eq!(parse_line(": keep-alive"), SseLine::Skip);
        assert_eq!(parse_line("event: message"), SseLine::Skip);
        assert_eq!(parse_line("data: "), SseLine::Skip);
        assert_eq!(parse_line(""), SseLine::Skip);
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let payloads = collect(&["data: {\"x\"", ":1}\n\ndata: {\"y\":2}\n", "\n"]).await;
        assert_eq!(payloads, vec!["{\"x\":1}", "{\"y\":2}"]);
    }

    #[tokio::test]
    async fn test_done_marker_stops_stream() {
        let payloads = collect(&["data: a\n\ndata: [DONE]\n\ndata: never\n\n"]).await;
        assert_eq!(payloads, vec!["a"]);
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline() {
        let payloads = collect(&["data: a\n", "data: b"]).await;
        assert_eq!(payloads, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_transport_error_ends_stream() {
        let chunks = vec![
            Ok(b"data: a\n".to_vec()),
            Err(OpenAiError::EmptyResponse),
            Ok(b"data: b\n".to_vec()),
        ];
        let items: Vec<_> = data_payloads(futures::stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "a");
        assert!(items[1].is_err());
    }
}
