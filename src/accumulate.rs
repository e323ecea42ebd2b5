//! Buffering of chunked event streams into a single binary value.
//!
//! A producer (typically [`LakeService::read_file`](crate::LakeService::read_file))
//! emits zero or more [`StreamEvent::Data`] events followed by exactly one
//! terminal event, [`StreamEvent::End`] or [`StreamEvent::Error`]. The
//! [`Accumulator`] state machine collects the chunks in arrival order and
//! yields their concatenation on `End`, or propagates the carried error on
//! `Error`, discarding whatever was buffered.

use std::fmt;
use std::pin::pin;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// One unit of data delivered by a streaming source.
///
/// Text chunks are converted to bytes as UTF-8 exactly once, at ingestion;
/// binary chunks contribute their bytes as-is.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Chunk {
    Text(String),
    Binary(Bytes),
}

impl Chunk {
    /// The chunk's byte content.
    pub fn into_bytes(self) -> Bytes {
        match self {
            Chunk::Text(s) => Bytes::from(s.into_bytes()),
            Chunk::Binary(b) => b,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Chunk::Text(s) => s.len(),
            Chunk::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for Chunk {
    fn from(s: &str) -> Self {
        Chunk::Text(s.to_string())
    }
}

impl From<String> for Chunk {
    fn from(s: String) -> Self {
        Chunk::Text(s)
    }
}

impl From<Bytes> for Chunk {
    fn from(b: Bytes) -> Self {
        Chunk::Binary(b)
    }
}

impl From<Vec<u8>> for Chunk {
    fn from(b: Vec<u8>) -> Self {
        Chunk::Binary(Bytes::from(b))
    }
}

impl From<&[u8]> for Chunk {
    fn from(b: &[u8]) -> Self {
        Chunk::Binary(Bytes::copy_from_slice(b))
    }
}

/// One event emitted by a chunked streaming source.
///
/// A well-formed stream emits any number of `Data` events followed by exactly
/// one terminal event (`End` or `Error`), and nothing after that.
#[derive(Debug)]
pub enum StreamEvent {
    Data(Chunk),
    End,
    Error(Error),
}

impl StreamEvent {
    fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Data(_) => "data",
            StreamEvent::End => "end",
            StreamEvent::Error(_) => "error",
        }
    }
}

/// The event stream handed out by [`LakeService::read_file`](crate::LakeService::read_file).
pub type ChunkStream = BoxStream<'static, StreamEvent>;

/// Result of feeding one event to an [`Accumulator`].
#[derive(Debug)]
pub enum Step {
    /// The stream is still open; keep feeding events.
    Pending,
    /// `End` arrived; the finished buffer is handed to the caller.
    Done(Bytes),
}

enum State {
    Listening(BytesMut),
    Completed,
    Failed,
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Listening(_) => "listening",
            State::Completed => "completed",
            State::Failed => "failed",
        }
    }
}

/// State machine turning a chunked event stream into one buffered value.
///
/// States: `Listening` (appending chunks), `Completed`, `Failed`. The
/// terminal states accept no further events: pushing anything after `End` or
/// `Error` is a protocol violation on the producer's side and is rejected
/// with [`Error::ProtocolViolation`] rather than silently ignored.
///
/// Most callers want the [`accumulate`] driver instead of feeding events by
/// hand.
pub struct Accumulator {
    state: State,
}

impl Accumulator {
    /// Create an accumulator in the `Listening` state with an empty buffer.
    pub fn new() -> Self {
        Self {
            state: State::Listening(BytesMut::new()),
        }
    }

    /// Whether a terminal event has been observed.
    pub fn is_terminal(&self) -> bool {
        !matches!(self.state, State::Listening(_))
    }

    /// Number of bytes buffered so far. Zero once a terminal state is reached.
    pub fn buffered_len(&self) -> usize {
        match &self.state {
            State::Listening(buf) => buf.len(),
            State::Completed | State::Failed => 0,
        }
    }

    /// Feed one event, driving a single state transition.
    ///
    /// - `Data` in `Listening` appends the chunk's bytes and returns
    ///   [`Step::Pending`].
    /// - `End` in `Listening` moves to `Completed` and returns
    ///   [`Step::Done`] with ownership of the concatenated buffer.
    /// - `Error` in `Listening` moves to `Failed`, discards the partial
    ///   buffer, and returns the carried error verbatim.
    /// - Any event in a terminal state fails with
    ///   [`Error::ProtocolViolation`].
    pub fn push(&mut self, event: StreamEvent) -> Result<Step> {
        match std::mem::replace(&mut self.state, State::Failed) {
            State::Listening(mut buf) => match event {
                StreamEvent::Data(chunk) => {
                    buf.extend_from_slice(&chunk.into_bytes());
                    self.state = State::Listening(buf);
                    Ok(Step::Pending)
                }
                StreamEvent::End => {
                    self.state = State::Completed;
                    Ok(Step::Done(buf.freeze()))
                }
                // Partial buffer is dropped here; the state stays Failed.
                StreamEvent::Error(err) => Err(err),
            },
            terminal => {
                let kind = event.kind();
                tracing::warn!(state = terminal.name(), event = kind, "event after terminal event");
                self.state = terminal;
                Err(Error::ProtocolViolation(format!(
                    "{kind} event received after the terminal event"
                )))
            }
        }
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Accumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Avoid dumping the buffered bytes.
        f.debug_struct("Accumulator")
            .field("state", &self.state.name())
            .field("buffered_len", &self.buffered_len())
            .finish()
    }
}

/// Buffer a chunked event stream fully into memory.
///
/// Resolves to the ordered concatenation of every chunk once `End` arrives,
/// or fails with the carried error if `Error` arrives first. A source stream
/// that runs dry without a terminal event breaks the producer contract and
/// fails with [`Error::ProtocolViolation`].
///
/// Memory use is proportional to the total bytes streamed; there is no
/// backpressure or spill-to-disk.
pub async fn accumulate<S>(stream: S) -> Result<Bytes>
where
    S: Stream<Item = StreamEvent> + Send,
{
    let mut stream = pin!(stream);
    let mut acc = Accumulator::new();

    while let Some(event) = stream.next().await {
        if let Step::Done(bytes) = acc.push(event)? {
            return Ok(bytes);
        }
    }

    Err(Error::ProtocolViolation(
        "source stream ended without a terminal event".to_string(),
    ))
}

/// [`accumulate`], abandoned when `cancel` fires.
///
/// On cancellation the source stream is dropped, the partial buffer is
/// discarded, and the call fails with [`Error::Cancelled`].
pub async fn accumulate_with_cancel<S>(stream: S, cancel: &CancellationToken) -> Result<Bytes>
where
    S: Stream<Item = StreamEvent> + Send,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = accumulate(stream) => result,
    }
}

/// [`accumulate`], abandoned after `duration`.
///
/// A timeout behaves exactly like cancellation: the partial buffer is
/// discarded and the call fails with [`Error::Cancelled`].
pub async fn accumulate_timeout<S>(stream: S, duration: Duration) -> Result<Bytes>
where
    S: Stream<Item = StreamEvent> + Send,
{
    match tokio::time::timeout(duration, accumulate(stream)).await {
        Ok(result) => result,
        Err(_) => Err(Error::Cancelled),
    }
}
