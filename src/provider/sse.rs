//! Server-sent event decoding for streamed completions.
//!
//! Bytes are buffered until a full line is available, so a multi-byte UTF-8
//! character split across network chunks is decoded intact.

use crate::error::ApiError;
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;

struct SseDecoder<S> {
    inner: Pin<Box<S>>,
    buffer: Vec<u8>,
    data: Vec<String>,
    ready: VecDeque<String>,
    finished: bool,
}

impl<S> SseDecoder<S> {
    fn new(inner: S) -> Self {
        Self {
            inner: Box::pin(inner),
            buffer: Vec::new(),
            data: Vec::new(),
            ready: VecDeque::new(),
            finished: false,
        }
    }

    fn feed(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        while let Some(newline) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            self.line(&line[..newline]);
        }
    }

    fn line(&mut self, raw: &[u8]) {
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);
        if line.is_empty() {
            self.dispatch();
        } else if let Some(value) = line.strip_prefix("data:") {
            self.data
                .push(value.strip_prefix(' ').unwrap_or(value).to_string());
        }
        // Comments, `event:`, `id:` and `retry:` fields carry nothing we use.
    }

    fn dispatch(&mut self) {
        if !self.data.is_empty() {
            self.ready.push_back(self.data.join("\n"));
            self.data.clear();
        }
    }

    fn finish(&mut self) {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            self.line(&rest);
        }
        self.dispatch();
        self.finished = true;
    }
}

/// Decode a byte stream into the payloads of its `data:` events.
///
/// Multi-line data fields are joined with `\n`. A transport error is yielded
/// once and ends the stream.
pub fn data_events<S, B>(inner: S) -> impl Stream<Item = Result<String, ApiError>> + Send
where
    S: Stream<Item = Result<B, ApiError>> + Send + 'static,
    B: AsRef<[u8]> + Send,
{
    stream::unfold(SseDecoder::new(inner), |mut decoder| async move {
        loop {
            if let Some(event) = decoder.ready.pop_front() {
                return Some((Ok(event), decoder));
            }
            if decoder.finished {
                return None;
            }
            match decoder.inner.next().await {
                Some(Ok(chunk)) => decoder.feed(chunk.as_ref()),
                Some(Err(err)) => {
                    decoder.finished = true;
                    decoder.ready.clear();
                    return Some((Err(err), decoder));
                }
                None => decoder.finish(),
            }
        }
    })
}
