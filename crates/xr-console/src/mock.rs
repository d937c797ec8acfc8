//! In-memory mock transport for testing dialogues without a device.
//!
//! The mock plays the device side of the console: queued output is
//! served to reads, and every complete input line consumes the next
//! queued response. A blank input line re-displays the most recent
//! output, which is how a real console reacts to a bare carriage
//! return, so nudge-driven recovery paths are testable.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

#[derive(Debug, Default)]
struct MockState {
    /// Bytes waiting to be read by the session.
    output: VecDeque<u8>,
    /// Every byte the session has written, verbatim.
    input: Vec<u8>,
    /// Written text not yet terminated by a newline.
    pending_line: String,
    /// Responses popped one per complete non-empty input line.
    responses: VecDeque<String>,
    /// Most recent output text, re-displayed on a blank input line.
    last_output: String,
    eof: bool,
    reader: Option<Waker>,
}

impl MockState {
    fn push_output(&mut self, text: &str) {
        self.output.extend(text.as_bytes());
        if let Some(waker) = self.reader.take() {
            waker.wake();
        }
    }

    fn consume_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            // Bare carriage return: the device re-displays its prompt.
            let redisplay = self.last_output.clone();
            if !redisplay.is_empty() {
                self.push_output(&redisplay);
            }
        } else if let Some(response) = self.responses.pop_front() {
            self.last_output.clone_from(&response);
            self.push_output(&response);
        }
    }
}

/// Scripted device end of a console stream.
///
/// Cloning yields another handle to the same state, so tests keep a
/// handle for inspection while the session owns the other.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create an empty mock with nothing queued.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue text for the session to read immediately. Also becomes the
    /// text re-displayed on a blank input line.
    pub fn queue_output_str(&self, text: &str) {
        let mut state = self.lock();
        text.clone_into(&mut state.last_output);
        state.push_output(text);
    }

    /// Queue a response consumed by the next complete non-empty input
    /// line. Responses are served in queue order.
    pub fn respond_with(&self, text: &str) {
        self.lock().responses.push_back(text.to_string());
    }

    /// Take every byte written so far, clearing the record.
    #[must_use]
    pub fn take_input(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().input)
    }

    /// Take everything written so far as lossy text.
    #[must_use]
    pub fn take_input_str(&self) -> String {
        String::from_utf8_lossy(&self.take_input()).into_owned()
    }

    /// Mark the stream closed; further reads return zero bytes.
    pub fn signal_eof(&self) {
        let mut state = self.lock();
        state.eof = true;
        if let Some(waker) = state.reader.take() {
            waker.wake();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl AsyncRead for MockTransport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let mut state = self.lock();
        if state.output.is_empty() {
            if state.eof {
                return Poll::Ready(Ok(()));
            }
            state.reader = Some(cx.waker().clone());
            return Poll::Pending;
        }
        let n = buf.remaining().min(state.output.len());
        for byte in state.output.drain(..n) {
            buf.put_slice(&[byte]);
        }
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for MockTransport {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let mut state = self.lock();
        state.input.extend_from_slice(buf);
        let text = String::from_utf8_lossy(buf).into_owned();
        state.pending_line.push_str(&text);
        while let Some(pos) = state.pending_line.find('\n') {
            let line: String = state.pending_line.drain(..=pos).collect();
            state.consume_line(&line);
        }
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        self.lock().eof = true;
        Poll::Ready(Ok(()))
    }
}
