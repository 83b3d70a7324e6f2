//! Playback state and track bookkeeping types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Why playback is paused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PauseReason {
    /// The control point asked for it; only an explicit `play()` resumes
    User,
    /// The backend ran out of buffered data; resumes by itself
    Buffering,
}

/// State of the playback engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackState {
    Stopped,
    Ready,
    Playing,
    Paused(PauseReason),
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    /// UPnP TransportState value for this state
    pub fn transport_state(&self) -> &'static str {
        match self {
            PlaybackState::Stopped | PlaybackState::Ready => "STOPPED",
            PlaybackState::Playing => "PLAYING",
            PlaybackState::Paused(_) => "PAUSED_PLAYBACK",
        }
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "STOPPED"),
            PlaybackState::Ready => write!(f, "READY"),
            PlaybackState::Playing => write!(f, "PLAYING"),
            PlaybackState::Paused(PauseReason::User) => write!(f, "PAUSED (user)"),
            PlaybackState::Paused(PauseReason::Buffering) => write!(f, "PAUSED (buffering)"),
        }
    }
}

/// Transition reported to the protocol layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// The stream ended and there was nothing queued
    PlaybackStopped,
    /// The queued next stream took over after end-of-stream
    StartedNextStream,
}

/// Current and queued media locators
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTarget {
    pub uri: String,
    pub next_uri: String,
}

impl TrackTarget {
    /// Move `next_uri` into `uri`, leaving `next_uri` empty
    ///
    /// Returns the new current URI, or `None` (and changes nothing) when
    /// no next URI is queued.
    pub fn advance(&mut self) -> Option<&str> {
        if self.next_uri.is_empty() {
            return None;
        }
        self.uri = std::mem::take(&mut self.next_uri);
        Some(&self.uri)
    }
}

/// Duration and position of the current track, in nanoseconds
///
/// `None` means unknown. `stale` marks a cached snapshot returned
/// because the backend could not answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTiming {
    pub duration_ns: Option<i64>,
    pub position_ns: Option<i64>,
    pub stale: bool,
}

impl TrackTiming {
    /// Nothing known yet
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn fresh(duration_ns: i64, position_ns: i64) -> Self {
        Self {
            duration_ns: non_negative(duration_ns),
            position_ns: non_negative(position_ns),
            stale: false,
        }
    }

    /// The same values, marked as stale
    pub fn as_stale(self) -> Self {
        Self {
            stale: true,
            ..self
        }
    }
}

pub(crate) fn non_negative(value: i64) -> Option<i64> {
    (value >= 0).then_some(value)
}
