//! Scripted backend for tests
//!
//! [`ScriptedBackend`] records every call and answers from a script that
//! the paired [`ScriptHandle`] can change while the backend is owned by
//! an engine.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::{Backend, BackendEvent, BackendResult, EventSender};
use crate::config::OutputConfig;
use crate::error::BackendFailure;

/// A call received by the scripted backend
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Initialize,
    SetUri(String),
    Play,
    Pause,
    Stop,
    Seek(i64),
    QueryDuration,
    QueryPosition,
    SetVolume(f32),
    SetMute(bool),
}

#[derive(Debug)]
struct Script {
    calls: Vec<Call>,
    failing: HashSet<&'static str>,
    events: Option<EventSender>,
    mime_types: BTreeSet<String>,
    mime_queries: usize,
    duration_ns: Option<i64>,
    position_ns: Option<i64>,
    volume: f32,
    mute: bool,
}

impl Script {
    fn record(&mut self, call: Call, command: &'static str) -> BackendResult<()> {
        self.calls.push(call);
        if self.failing.contains(command) {
            Err(BackendFailure::new(format!("scripted {} failure", command)))
        } else {
            Ok(())
        }
    }
}

/// Backend driven entirely by its script
#[derive(Debug)]
pub struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
}

/// Test-side view of a [`ScriptedBackend`]
#[derive(Debug, Clone)]
pub struct ScriptHandle {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    /// Create a backend that succeeds at everything
    pub fn new() -> (Self, ScriptHandle) {
        let script = Arc::new(Mutex::new(Script {
            calls: Vec::new(),
            failing: HashSet::new(),
            events: None,
            mime_types: ["audio/mpeg", "audio/flac"]
                .into_iter()
                .map(String::from)
                .collect(),
            mime_queries: 0,
            duration_ns: None,
            position_ns: None,
            volume: 1.0,
            mute: false,
        }));

        (
            Self {
                script: Arc::clone(&script),
            },
            ScriptHandle { script },
        )
    }
}

impl ScriptHandle {
    /// Every call received so far
    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().calls.clone()
    }

    /// Forget recorded calls
    pub fn clear_calls(&self) {
        self.script.lock().calls.clear();
    }

    /// Make a command fail (or succeed again)
    ///
    /// Command names match the [`Backend`] method names: `set_uri`,
    /// `play`, `pause`, `stop`, `seek`, `query_duration`, `query_position`,
    /// `set_volume`, `set_mute`, `initialize`.
    pub fn set_failing(&self, command: &'static str, failing: bool) {
        let mut script = self.script.lock();
        if failing {
            script.failing.insert(command);
        } else {
            script.failing.remove(command);
        }
    }

    /// Answers for timing queries; `None` makes the query fail
    pub fn set_timing(&self, duration_ns: Option<i64>, position_ns: Option<i64>) {
        let mut script = self.script.lock();
        script.duration_ns = duration_ns;
        script.position_ns = position_ns;
    }

    pub fn set_mime_types(&self, mime_types: &[&str]) {
        self.script.lock().mime_types = mime_types.iter().map(|m| m.to_string()).collect();
    }

    /// How many times the MIME types were queried
    pub fn mime_queries(&self) -> usize {
        self.script.lock().mime_queries
    }

    /// Report an event as the backend would; `false` before initialization
    pub fn emit(&self, event: BackendEvent) -> bool {
        let events = self.script.lock().events.clone();
        events.map(|events| events.send(event)).unwrap_or(false)
    }
}

impl Backend for ScriptedBackend {
    fn initialize(&mut self, _config: &OutputConfig, events: EventSender) -> BackendResult<()> {
        let mut script = self.script.lock();
        script.events = Some(events);
        script.record(Call::Initialize, "initialize")
    }

    fn supported_mime_types(&self) -> BTreeSet<String> {
        let mut script = self.script.lock();
        script.mime_queries += 1;
        script.mime_types.clone()
    }

    fn set_uri(&mut self, uri: &str) -> BackendResult<()> {
        self.script
            .lock()
            .record(Call::SetUri(uri.to_string()), "set_uri")
    }

    fn play(&mut self) -> BackendResult<()> {
        self.script.lock().record(Call::Play, "play")
    }

    fn pause(&mut self) -> BackendResult<()> {
        self.script.lock().record(Call::Pause, "pause")
    }

    fn stop(&mut self) -> BackendResult<()> {
        self.script.lock().record(Call::Stop, "stop")
    }

    fn seek(&mut self, position_ns: i64) -> BackendResult<()> {
        self.script.lock().record(Call::Seek(position_ns), "seek")
    }

    fn query_duration(&mut self) -> BackendResult<i64> {
        let mut script = self.script.lock();
        script.record(Call::QueryDuration, "query_duration")?;
        script
            .duration_ns
            .ok_or_else(|| BackendFailure::new("duration unknown"))
    }

    fn query_position(&mut self) -> BackendResult<i64> {
        let mut script = self.script.lock();
        script.record(Call::QueryPosition, "query_position")?;
        script
            .position_ns
            .ok_or_else(|| BackendFailure::new("position unknown"))
    }

    fn volume(&self) -> BackendResult<f32> {
        Ok(self.script.lock().volume)
    }

    fn set_volume(&mut self, volume: f32) -> BackendResult<()> {
        let mut script = self.script.lock();
        script.record(Call::SetVolume(volume), "set_volume")?;
        script.volume = volume;
        Ok(())
    }

    fn mute(&self) -> BackendResult<bool> {
        Ok(self.script.lock().mute)
    }

    fn set_mute(&mut self, mute: bool) -> BackendResult<()> {
        let mut script = self.script.lock();
        script.record(Call::SetMute(mute), "set_mute")?;
        script.mute = mute;
        Ok(())
    }
}
