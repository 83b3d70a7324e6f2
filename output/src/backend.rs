//! The seam between the playback engine and a media pipeline
//!
//! A backend performs the actual decoding and rendering. It is driven
//! through the [`Backend`] trait and reports asynchronous happenings
//! (end of stream, tags, buffering) as [`BackendEvent`]s through the
//! [`EventSender`] it receives at initialization.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::mpsc;

use crate::config::OutputConfig;
use crate::error::BackendFailure;

/// Result of a backend call
pub type BackendResult<T> = std::result::Result<T, BackendFailure>;

/// Pipeline state as reported by the backend itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendState {
    Null,
    Ready,
    Paused,
    Playing,
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendState::Null => write!(f, "NULL"),
            BackendState::Ready => write!(f, "READY"),
            BackendState::Paused => write!(f, "PAUSED"),
            BackendState::Playing => write!(f, "PLAYING"),
        }
    }
}

/// Asynchronous notification from a backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// The current stream played to its end
    EndOfStream,
    /// The current stream is close to its end; queue the next one now
    AboutToFinish,
    /// The pipeline hit an error
    Error {
        message: String,
        debug: Option<String>,
    },
    /// The pipeline changed state
    StateChanged {
        old: BackendState,
        new: BackendState,
    },
    /// Tags found in the stream, as `(tag name, value)` pairs
    TagsDiscovered(Vec<(String, String)>),
    /// Buffer fill level, 0 to 100
    BufferingProgress(u8),
}

/// Handle a backend uses to report events to the engine
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<BackendEvent>,
}

impl EventSender {
    /// Send an event; returns `false` once the engine has gone away
    pub fn send(&self, event: BackendEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Create a connected event sender and receiver
pub fn event_channel() -> (EventSender, mpsc::Receiver<BackendEvent>) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, rx)
}

/// A media pipeline the engine can drive
///
/// Calls are synchronous and expected to return promptly. Time values
/// are in nanoseconds; volume is a linear fraction in `[0.0, 1.0]`.
pub trait Backend: Send {
    /// Prepare the pipeline
    ///
    /// Events must be reported through `events` from here on.
    fn initialize(&mut self, config: &OutputConfig, events: EventSender) -> BackendResult<()>;

    /// MIME types this backend can render
    fn supported_mime_types(&self) -> BTreeSet<String>;

    fn set_uri(&mut self, uri: &str) -> BackendResult<()>;

    fn play(&mut self) -> BackendResult<()>;

    fn pause(&mut self) -> BackendResult<()>;

    /// Stop playback and return the pipeline to its ready state
    fn stop(&mut self) -> BackendResult<()>;

    fn seek(&mut self, position_ns: i64) -> BackendResult<()>;

    fn query_duration(&mut self) -> BackendResult<i64>;

    fn query_position(&mut self) -> BackendResult<i64>;

    fn volume(&self) -> BackendResult<f32>;

    fn set_volume(&mut self, volume: f32) -> BackendResult<()>;

    fn mute(&self) -> BackendResult<bool>;

    fn set_mute(&mut self, mute: bool) -> BackendResult<()>;
}
