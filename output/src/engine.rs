//! Playback state machine
//!
//! [`PlaybackEngine`] owns the selected backend and the playback state.
//! Commands come from protocol worker threads; events come from the
//! backend's event loop. One mutex guards the whole read-modify-write of
//! each, and listeners are called only after it has been released, so a
//! listener can call back into the engine.
//!
//! ```text
//!            play()                    pause()
//!  Ready ───────────────► Playing ─────────────► Paused(User)
//!    ▲                    │  ▲  ◄──────────────────┘ play()
//!    │ stop()             │  │
//!    │              <100% │  │ 100%
//!  Stopped ◄── EOS ───────┘  └── Paused(Buffering)
//! ```

use std::collections::BTreeSet;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Weak};
use std::thread;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::backend::{Backend, BackendEvent, BackendResult};
use crate::config::OutputConfig;
use crate::error::{OutputError, Result};
use crate::metadata::TrackMetadata;
use crate::registry::{Capabilities, SelectedBackend};
use crate::state::{non_negative, PauseReason, PlaybackState, TrackTarget, TrackTiming, Transition};

type TransitionListener = Arc<dyn Fn(Transition) + Send + Sync>;
type MetadataListener = Arc<dyn Fn(&TrackMetadata) + Send + Sync>;

struct Core {
    backend: Box<dyn Backend>,
    state: PlaybackState,
    target: TrackTarget,
    metadata: TrackMetadata,
    /// Last good timing answer for the current track
    timing: TrackTiming,
}

#[derive(Default)]
struct Listeners {
    transition: Vec<TransitionListener>,
    metadata: Vec<MetadataListener>,
}

/// What to tell listeners once the lock is released
enum Notification {
    Transition(Transition),
    Metadata(TrackMetadata),
}

/// Drives a backend from commands and backend events
pub struct PlaybackEngine {
    core: Mutex<Core>,
    listeners: RwLock<Listeners>,
    capabilities: Capabilities,
    buffering_enabled: bool,
}

impl PlaybackEngine {
    /// Wrap an already initialized backend
    ///
    /// No event loop is started; feed events with [`handle_event`].
    ///
    /// [`handle_event`]: PlaybackEngine::handle_event
    pub fn new(backend: Box<dyn Backend>, capabilities: Capabilities, config: &OutputConfig) -> Self {
        Self {
            core: Mutex::new(Core {
                backend,
                state: PlaybackState::Ready,
                target: TrackTarget::default(),
                metadata: TrackMetadata::default(),
                timing: TrackTiming::unknown(),
            }),
            listeners: RwLock::new(Listeners::default()),
            capabilities,
            buffering_enabled: config.buffering_enabled(),
        }
    }

    /// Build an engine around the selected backend and start its event loop
    ///
    /// The event loop runs on its own thread until the backend drops its
    /// event sender or the engine is dropped.
    pub fn start(selected: SelectedBackend, config: &OutputConfig) -> Result<Arc<Self>> {
        let SelectedBackend {
            name,
            backend,
            capabilities,
            events,
            ..
        } = selected;

        let engine = Arc::new(Self::new(backend, capabilities, config));

        if let Some(volume) = config.initial_volume() {
            info!(
                "Setting initial volume to {:.3} ({} dB)",
                volume, config.initial_volume_db
            );
            engine.set_volume(volume)?;
        }
        engine.set_mute(false)?;

        let weak = Arc::downgrade(&engine);
        thread::Builder::new()
            .name("output-events".to_string())
            .spawn(move || run_event_loop(weak, events))?;

        info!("Playback engine started on output '{}'", name);
        Ok(engine)
    }

    /// Set the current media URI; an empty string clears it
    pub fn set_uri(&self, uri: &str) -> Result<()> {
        check_uri(uri)?;
        let mut core = self.core.lock();
        info!("Set uri to '{}'", uri);
        core.target.uri = uri.to_string();
        core.metadata = TrackMetadata::default();
        core.timing = TrackTiming::unknown();
        Ok(())
    }

    /// Queue the URI to play after the current one
    pub fn set_next_uri(&self, uri: &str) -> Result<()> {
        check_uri(uri)?;
        let mut core = self.core.lock();
        info!("Set next uri to '{}'", uri);
        core.target.next_uri = uri.to_string();
        Ok(())
    }

    /// Start, restart or resume playback
    pub fn play(&self) -> Result<()> {
        let mut guard = self.core.lock();
        let core = &mut *guard;

        if let PlaybackState::Paused(reason) = core.state {
            debug!("Resuming playback paused by {:?}", reason);
            core.backend.play()?;
            core.state = PlaybackState::Playing;
            return Ok(());
        }

        if core.target.uri.is_empty() {
            return Err(OutputError::InvalidState {
                command: "play",
                state: core.state,
            });
        }

        load_and_play(core.backend.as_mut(), &core.target.uri)?;
        core.state = PlaybackState::Playing;
        core.timing = TrackTiming::unknown();
        info!("Playing '{}'", core.target.uri);
        Ok(())
    }

    /// Stop playback
    ///
    /// The engine is `Stopped` afterwards even if the backend failed.
    pub fn stop(&self) -> Result<()> {
        let mut core = self.core.lock();
        let result = core.backend.stop();
        core.state = PlaybackState::Stopped;
        core.timing = TrackTiming::unknown();

        if let Err(e) = &result {
            warn!("Backend failed to stop cleanly: {}", e);
        }
        result.map_err(OutputError::from)
    }

    /// Pause playback; only valid while playing
    pub fn pause(&self) -> Result<()> {
        let mut core = self.core.lock();
        if !core.state.is_playing() {
            return Err(OutputError::InvalidState {
                command: "pause",
                state: core.state,
            });
        }

        core.backend.pause()?;
        core.state = PlaybackState::Paused(PauseReason::User);
        Ok(())
    }

    /// Seek to an absolute position in nanoseconds
    pub fn seek(&self, position_ns: i64) -> Result<()> {
        if position_ns < 0 {
            return Err(OutputError::InvalidArgument(format!(
                "seek position must not be negative: {}",
                position_ns
            )));
        }

        let mut core = self.core.lock();
        core.backend.seek(position_ns)?;
        debug!("Seeked to {} ns", position_ns);
        Ok(())
    }

    /// Duration and position of the current track
    ///
    /// The backend is only asked while playing. Whatever it cannot
    /// answer comes from the last good snapshot, and the result is then
    /// marked stale.
    pub fn get_position(&self) -> TrackTiming {
        let mut guard = self.core.lock();
        let core = &mut *guard;

        if !core.state.is_playing() {
            return core.timing.as_stale();
        }

        let duration = core.backend.query_duration();
        let position = core.backend.query_position();

        let mut stale = false;
        match duration {
            Ok(ns) => core.timing.duration_ns = non_negative(ns).or(core.timing.duration_ns),
            Err(e) => {
                warn!("Duration query failed, using cached value: {}", e);
                stale = true;
            }
        }
        match position {
            Ok(ns) => core.timing.position_ns = non_negative(ns).or(core.timing.position_ns),
            Err(e) => {
                warn!("Position query failed, using cached value: {}", e);
                stale = true;
            }
        }

        TrackTiming {
            stale,
            ..core.timing
        }
    }

    pub fn get_volume(&self) -> Result<f32> {
        Ok(self.core.lock().backend.volume()?)
    }

    /// Set the volume as a fraction in `[0.0, 1.0]`
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(OutputError::InvalidArgument(format!(
                "volume must be within 0.0..=1.0: {}",
                volume
            )));
        }

        self.core.lock().backend.set_volume(volume)?;
        debug!("Volume set to {:.3}", volume);
        Ok(())
    }

    pub fn get_mute(&self) -> Result<bool> {
        Ok(self.core.lock().backend.mute()?)
    }

    pub fn set_mute(&self, mute: bool) -> Result<()> {
        self.core.lock().backend.set_mute(mute)?;
        debug!("Mute set to {}", mute);
        Ok(())
    }

    pub fn state(&self) -> PlaybackState {
        self.core.lock().state
    }

    pub fn target(&self) -> TrackTarget {
        self.core.lock().target.clone()
    }

    pub fn metadata(&self) -> TrackMetadata {
        self.core.lock().metadata.clone()
    }

    /// MIME types the backend reported when it was selected
    pub fn supported_media(&self) -> &BTreeSet<String> {
        self.capabilities.mime_types()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Register a listener for playback transitions
    pub fn on_transition<F>(&self, listener: F)
    where
        F: Fn(Transition) + Send + Sync + 'static,
    {
        self.listeners.write().transition.push(Arc::new(listener));
    }

    /// Register a listener for metadata changes
    pub fn on_metadata<F>(&self, listener: F)
    where
        F: Fn(&TrackMetadata) + Send + Sync + 'static,
    {
        self.listeners.write().metadata.push(Arc::new(listener));
    }

    /// Apply one backend event
    ///
    /// Backend failures on this path are logged, never returned.
    pub fn handle_event(&self, event: BackendEvent) {
        let notification = {
            let mut guard = self.core.lock();
            self.apply(&mut guard, event)
        };

        match notification {
            Some(Notification::Transition(transition)) => {
                let listeners = self.listeners.read().transition.clone();
                for listener in &listeners {
                    listener(transition);
                }
            }
            Some(Notification::Metadata(metadata)) => {
                let listeners = self.listeners.read().metadata.clone();
                for listener in &listeners {
                    listener(&metadata);
                }
            }
            None => {}
        }
    }

    fn apply(&self, core: &mut Core, event: BackendEvent) -> Option<Notification> {
        match event {
            BackendEvent::AboutToFinish => {
                let Some(uri) = core.target.advance().map(str::to_string) else {
                    debug!("About to finish with no next uri queued");
                    return None;
                };

                info!("About to finish, queueing '{}'", uri);
                core.timing = TrackTiming::unknown();
                if let Err(e) = core.backend.set_uri(&uri) {
                    error!("Failed to queue next uri '{}': {}", uri, e);
                }
                None
            }

            BackendEvent::EndOfStream => {
                core.timing = TrackTiming::unknown();

                let Some(uri) = core.target.advance().map(str::to_string) else {
                    info!("End of stream");
                    core.state = PlaybackState::Stopped;
                    return Some(Notification::Transition(Transition::PlaybackStopped));
                };

                info!("End of stream, starting next stream '{}'", uri);
                match load_and_play(core.backend.as_mut(), &uri) {
                    Ok(()) => {
                        core.state = PlaybackState::Playing;
                        Some(Notification::Transition(Transition::StartedNextStream))
                    }
                    Err(e) => {
                        error!("Failed to start next stream '{}': {}", uri, e);
                        core.state = PlaybackState::Stopped;
                        Some(Notification::Transition(Transition::PlaybackStopped))
                    }
                }
            }

            BackendEvent::Error { message, debug: details } => {
                error!(
                    "Backend error: {} (debug: {})",
                    message,
                    details.as_deref().unwrap_or("none")
                );
                None
            }

            BackendEvent::StateChanged { old, new } => {
                debug!("Backend state changed {} -> {}", old, new);
                None
            }

            BackendEvent::BufferingProgress(percent) => {
                if !self.buffering_enabled {
                    return None;
                }
                self.apply_buffering(core, percent);
                None
            }

            BackendEvent::TagsDiscovered(tags) => core
                .metadata
                .apply(tags.as_slice())
                .then(|| Notification::Metadata(core.metadata.clone())),
        }
    }

    fn apply_buffering(&self, core: &mut Core, percent: u8) {
        match core.state {
            PlaybackState::Playing if percent < 100 => {
                debug!("Buffering at {}%, pausing", percent);
                match core.backend.pause() {
                    Ok(()) => core.state = PlaybackState::Paused(PauseReason::Buffering),
                    Err(e) => error!("Failed to pause for buffering: {}", e),
                }
            }
            PlaybackState::Paused(PauseReason::Buffering) if percent >= 100 => {
                debug!("Buffering complete, resuming");
                match core.backend.play() {
                    Ok(()) => core.state = PlaybackState::Playing,
                    Err(e) => error!("Failed to resume after buffering: {}", e),
                }
            }
            _ => {}
        }
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core.lock();
        f.debug_struct("PlaybackEngine")
            .field("state", &core.state)
            .field("target", &core.target)
            .field("buffering_enabled", &self.buffering_enabled)
            .finish()
    }
}

fn check_uri(uri: &str) -> Result<()> {
    if uri.is_empty() {
        return Ok(());
    }
    url::Url::parse(uri)
        .map(|_| ())
        .map_err(|e| OutputError::InvalidArgument(format!("malformed uri '{}': {}", uri, e)))
}

/// Reset the backend to ready, load `uri` and start it
fn load_and_play(backend: &mut dyn Backend, uri: &str) -> BackendResult<()> {
    backend.stop()?;
    backend.set_uri(uri)?;
    backend.play()
}

fn run_event_loop(engine: Weak<PlaybackEngine>, events: Receiver<BackendEvent>) {
    debug!("Output event loop started");
    for event in events.iter() {
        let Some(engine) = engine.upgrade() else {
            break;
        };
        engine.handle_event(event);
    }
    debug!("Output event loop stopped");
}
