//! Media Renderer State Layer
//!
//! Keeps a UPnP/DLNA renderer's protocol-visible state in step with what
//! the media backend is actually doing. Transport commands drive the
//! [`PlaybackEngine`](output::PlaybackEngine); its transitions and the
//! command outcomes land in the AVTransport, RenderingControl and
//! ConnectionManager variables, and changes reach subscribers as batched
//! LastChange documents.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use media_renderer::{logging, Renderer, RendererConfig};
//!
//! logging::init_logging_from_env()?;
//!
//! let config = RendererConfig::new().with_mime_filter("audio");
//! let renderer = Renderer::start(&config, |namespace: &str, document: &str| {
//!     println!("{namespace}: {document}");
//! })?;
//!
//! renderer.set_av_transport_uri("http://192.168.1.10/music/track.flac")?;
//! renderer.play()?;
//! println!("{:?}", renderer.position_info()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! control point ──► Renderer ──► PlaybackEngine ──► dyn Backend
//!                      │               │
//!                      │   Transition  │
//!                      ▼ ◄─────────────┘
//!        AVTransport / RenderingControl / ConnectionManager
//!                      │ (VariableContainer + LastChangeCollector)
//!                      ▼
//!                  EventSink
//! ```

pub mod config;
pub mod connection_manager;
pub mod didl;
pub mod error;
pub mod logging;
pub mod renderer;
pub mod services;
pub mod time;

pub use config::RendererConfig;
pub use error::{RendererError, Result};
pub use renderer::{PositionInfo, Renderer, TransportInfo};
pub use services::Service;

// Re-export the layers a caller works with directly
pub use last_change::{ChannelSink, EventSink, LastChangeEvent};
pub use output::{BackendEntry, BackendRegistry, OutputConfig, PlaybackState, TrackMetadata};
