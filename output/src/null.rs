//! Backend that accepts every command and renders nothing
//!
//! Useful when running the protocol side without audio hardware. It
//! keeps a simulated play position so position queries look plausible.

use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::backend::{Backend, BackendEvent, BackendResult, BackendState, EventSender};
use crate::config::OutputConfig;
use crate::error::BackendFailure;

const MIME_TYPES: &[&str] = &[
    "audio/flac",
    "audio/mpeg",
    "audio/ogg",
    "audio/vnd.wave",
    "audio/x-aiff",
    "audio/x-m4a",
];

/// Discards all media
#[derive(Debug)]
pub struct NullBackend {
    events: Option<EventSender>,
    state: BackendState,
    uri: String,
    /// Position accumulated before the current play run
    elapsed: Duration,
    playing_since: Option<Instant>,
    volume: f32,
    mute: bool,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            events: None,
            state: BackendState::Null,
            uri: String::new(),
            elapsed: Duration::ZERO,
            playing_since: None,
            volume: 1.0,
            mute: false,
        }
    }

    fn position(&self) -> Duration {
        self.elapsed
            + self
                .playing_since
                .map(|since| since.elapsed())
                .unwrap_or_default()
    }

    fn transition(&mut self, new: BackendState) {
        let old = self.state;
        if old == new {
            return;
        }
        self.state = new;
        if let Some(events) = &self.events {
            events.send(BackendEvent::StateChanged { old, new });
        }
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for NullBackend {
    fn initialize(&mut self, _config: &OutputConfig, events: EventSender) -> BackendResult<()> {
        self.events = Some(events);
        self.transition(BackendState::Ready);
        Ok(())
    }

    fn supported_mime_types(&self) -> BTreeSet<String> {
        MIME_TYPES.iter().map(|mime| mime.to_string()).collect()
    }

    fn set_uri(&mut self, uri: &str) -> BackendResult<()> {
        debug!("Null output discarding {}", uri);
        self.uri = uri.to_string();
        self.elapsed = Duration::ZERO;
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn play(&mut self) -> BackendResult<()> {
        if self.uri.is_empty() {
            return Err(BackendFailure::new("no uri set"));
        }
        if self.playing_since.is_none() {
            self.playing_since = Some(Instant::now());
        }
        self.transition(BackendState::Playing);
        Ok(())
    }

    fn pause(&mut self) -> BackendResult<()> {
        self.elapsed = self.position();
        self.playing_since = None;
        self.transition(BackendState::Paused);
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        self.elapsed = Duration::ZERO;
        self.playing_since = None;
        self.transition(BackendState::Ready);
        Ok(())
    }

    fn seek(&mut self, position_ns: i64) -> BackendResult<()> {
        let position = u64::try_from(position_ns)
            .map_err(|_| BackendFailure::new("negative seek position"))?;
        self.elapsed = Duration::from_nanos(position);
        if self.playing_since.is_some() {
            self.playing_since = Some(Instant::now());
        }
        Ok(())
    }

    fn query_duration(&mut self) -> BackendResult<i64> {
        Err(BackendFailure::new("null output has no stream duration"))
    }

    fn query_position(&mut self) -> BackendResult<i64> {
        if self.state == BackendState::Null {
            return Err(BackendFailure::new("not initialized"));
        }
        i64::try_from(self.position().as_nanos())
            .map_err(|_| BackendFailure::new("position out of range"))
    }

    fn volume(&self) -> BackendResult<f32> {
        Ok(self.volume)
    }

    fn set_volume(&mut self, volume: f32) -> BackendResult<()> {
        self.volume = volume;
        Ok(())
    }

    fn mute(&self) -> BackendResult<bool> {
        Ok(self.mute)
    }

    fn set_mute(&mut self, mute: bool) -> BackendResult<()> {
        self.mute = mute;
        Ok(())
    }
}
