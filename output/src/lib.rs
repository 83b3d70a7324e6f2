//! Playback Engine and Media Backends
//!
//! This crate turns transport commands and backend events into playback
//! state. A backend is chosen once from a [`BackendRegistry`], then moved
//! into a [`PlaybackEngine`] that serializes every state change behind a
//! single lock.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use output::{BackendRegistry, OutputConfig, PlaybackEngine, Transition};
//!
//! let config = OutputConfig::default();
//! let selected = BackendRegistry::builtin().select(None, &config)?;
//! let engine = PlaybackEngine::start(selected, &config)?;
//!
//! engine.on_transition(|transition| match transition {
//!     Transition::PlaybackStopped => println!("stopped"),
//!     Transition::StartedNextStream => println!("next track"),
//! });
//!
//! engine.set_uri("http://192.168.1.10/music/track.flac")?;
//! engine.play()?;
//! # Ok::<(), output::OutputError>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! BackendRegistry ──select()──► SelectedBackend ──start()──► PlaybackEngine
//!                                                              │      ▲
//!                                     commands (protocol side) │      │ BackendEvent
//!                                                              ▼      │
//!                                                          dyn Backend ┘
//! ```

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod null;
pub mod registry;
pub mod state;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use backend::{event_channel, Backend, BackendEvent, BackendResult, BackendState, EventSender};
pub use config::OutputConfig;
pub use engine::PlaybackEngine;
pub use error::{BackendFailure, OutputError, Result};
pub use metadata::{Tag, TrackMetadata};
pub use null::NullBackend;
pub use registry::{BackendEntry, BackendFactory, BackendRegistry, Capabilities, SelectedBackend};
pub use state::{PauseReason, PlaybackState, TrackTarget, TrackTiming, Transition};
