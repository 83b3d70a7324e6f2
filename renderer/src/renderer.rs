//! The renderer facade
//!
//! [`Renderer`] ties the playback engine to the AVTransport,
//! RenderingControl and ConnectionManager services. Every command first
//! runs on the engine, then mirrors the outcome into the service
//! variables inside one transaction. A service lock may be held while
//! reading engine state; the engine never takes a service lock.

use std::sync::{Arc, Weak};

use last_change::document::{AV_TRANSPORT_NAMESPACE, RENDERING_CONTROL_NAMESPACE};
use last_change::EventSink;
use output::{
    BackendRegistry, PauseReason, PlaybackEngine, PlaybackState, TrackMetadata, Transition,
};
use state_store::VariableContainer;
use tracing::{error, info};

use crate::config::RendererConfig;
use crate::connection_manager::{advertised_types, sink_protocol_info, MimeTypeFilter};
use crate::didl;
use crate::error::{RendererError, Result};
use crate::services::{
    av_transport as avt, connection_manager as cm, rendering_control as rcs, Service,
};
use crate::time::{format_time, parse_time};

/// Answer to a GetPositionInfo request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionInfo {
    pub track_uri: String,
    pub track_duration: String,
    pub rel_time: String,
    pub abs_time: String,
    /// The backend could not answer and cached values were used
    pub stale: bool,
}

/// Answer to a GetTransportInfo request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportInfo {
    pub state: String,
    pub status: String,
    pub speed: String,
}

/// A media renderer: one playback engine and its three services
pub struct Renderer {
    output_name: Option<&'static str>,
    engine: Arc<PlaybackEngine>,
    av_transport: Arc<Service>,
    rendering_control: Service,
    connection_manager: Service,
}

impl Renderer {
    /// Start a renderer on one of the built-in outputs
    pub fn start<S>(config: &RendererConfig, sink: S) -> Result<Self>
    where
        S: EventSink + 'static,
    {
        Self::start_with_registry(config, BackendRegistry::builtin(), sink)
    }

    /// Start a renderer, selecting the output from `registry`
    ///
    /// LastChange documents of both evented services go to `sink`.
    pub fn start_with_registry<S>(
        config: &RendererConfig,
        registry: BackendRegistry,
        sink: S,
    ) -> Result<Self>
    where
        S: EventSink + 'static,
    {
        config.validate()?;

        let selected = registry.select(config.output.as_deref(), &config.output_config)?;
        let name = selected.name;
        let engine = PlaybackEngine::start(selected, &config.output_config)?;

        let mut renderer = Self::with_engine(engine, config, sink)?;
        renderer.output_name = Some(name);
        info!("Renderer ready on output '{}'", name);
        Ok(renderer)
    }

    /// Build the services around an engine that is already running
    pub fn with_engine<S>(
        engine: Arc<PlaybackEngine>,
        config: &RendererConfig,
        sink: S,
    ) -> Result<Self>
    where
        S: EventSink + 'static,
    {
        let sink: Arc<dyn EventSink> = Arc::new(sink);

        let mut rcs_vars = VariableContainer::new(&rcs::VARIABLES);
        rcs_vars.set(rcs::VOLUME, volume_percent(engine.get_volume()?).to_string())?;
        rcs_vars.set(rcs::MUTE, mute_value(engine.get_mute()?))?;
        let rendering_control = Service::evented(
            "RenderingControl",
            rcs_vars,
            RENDERING_CONTROL_NAMESPACE,
            forward(&sink),
        );

        let av_transport = Arc::new(Service::evented(
            "AVTransport",
            VariableContainer::new(&avt::VARIABLES),
            AV_TRANSPORT_NAMESPACE,
            forward(&sink),
        ));

        let filter = MimeTypeFilter::parse(config.mime_filter.as_deref().unwrap_or_default());
        let types = advertised_types(engine.supported_media(), &filter);
        let mut cm_vars = VariableContainer::new(&cm::VARIABLES);
        if !types.is_empty() {
            cm_vars.set(cm::SINK_PROTOCOL_INFO, sink_protocol_info(&types))?;
        }
        let connection_manager = Service::new("ConnectionManager", cm_vars);

        let services = Arc::clone(&av_transport);
        let weak_engine: Weak<PlaybackEngine> = Arc::downgrade(&engine);
        engine.on_transition(move |transition| {
            let Some(engine) = weak_engine.upgrade() else {
                return;
            };
            if let Err(e) = apply_transition(&services, &engine, transition) {
                error!("Failed to publish {:?}: {}", transition, e);
            }
        });
        let services = Arc::clone(&av_transport);
        engine.on_metadata(move |meta| {
            info!("Now playing '{}' by '{}'", meta.title, meta.artist);
            let published = didl::encode(meta).and_then(|document| {
                services.update(|vars| {
                    vars.set(avt::CURRENT_TRACK_META_DATA, document)?;
                    Ok(())
                })
            });
            if let Err(e) = published {
                error!("Failed to publish track metadata: {}", e);
            }
        });

        Ok(Self {
            output_name: None,
            engine,
            av_transport,
            rendering_control,
            connection_manager,
        })
    }

    /// SetAVTransportURI
    pub fn set_av_transport_uri(&self, uri: &str) -> Result<()> {
        self.engine.set_uri(uri)?;
        self.av_transport.update(|vars| {
            vars.set(avt::AV_TRANSPORT_URI, uri)?;
            vars.set(avt::CURRENT_TRACK_URI, uri)?;
            vars.set(avt::CURRENT_TRACK_DURATION, format_time(None))?;
            vars.set(avt::CURRENT_TRACK_META_DATA, "")?;
            reset_time_positions(vars)
        })
    }

    /// SetNextAVTransportURI
    pub fn set_next_av_transport_uri(&self, uri: &str) -> Result<()> {
        self.engine.set_next_uri(uri)?;
        self.av_transport.update(|vars| {
            vars.set(avt::NEXT_AV_TRANSPORT_URI, uri)?;
            Ok(())
        })
    }

    pub fn play(&self) -> Result<()> {
        self.engine.play()?;
        let target = self.engine.target();
        self.av_transport.update(|vars| {
            set_transport_state(vars, PlaybackState::Playing)?;
            vars.set(avt::CURRENT_TRACK_URI, target.uri.as_str())?;
            Ok(())
        })
    }

    pub fn pause(&self) -> Result<()> {
        self.engine.pause()?;
        self.av_transport
            .update(|vars| set_transport_state(vars, PlaybackState::Paused(PauseReason::User)))
    }

    /// Stop playback; the services report STOPPED even if the backend failed
    pub fn stop(&self) -> Result<()> {
        let stopped = self.engine.stop();
        self.av_transport.update(|vars| {
            set_transport_state(vars, PlaybackState::Stopped)?;
            reset_time_positions(vars)
        })?;
        Ok(stopped?)
    }

    /// Seek to an `H:MM:SS[.fff]` position
    pub fn seek(&self, target: &str) -> Result<()> {
        let position_ns = parse_time(target)?;
        self.engine.seek(position_ns)?;
        Ok(())
    }

    /// GetPositionInfo; refreshes the duration and time position variables
    pub fn position_info(&self) -> Result<PositionInfo> {
        let timing = self.engine.get_position();
        let track_duration = format_time(timing.duration_ns);
        let position = format_time(timing.position_ns);

        self.av_transport.update(|vars| {
            vars.set(avt::CURRENT_TRACK_DURATION, track_duration.as_str())?;
            vars.set(avt::RELATIVE_TIME_POSITION, position.as_str())?;
            vars.set(avt::ABSOLUTE_TIME_POSITION, position.as_str())?;
            Ok(())
        })?;

        Ok(PositionInfo {
            track_uri: self
                .av_transport
                .get(avt::CURRENT_TRACK_URI)
                .unwrap_or_default(),
            track_duration,
            rel_time: position.clone(),
            abs_time: position,
            stale: timing.stale,
        })
    }

    /// GetTransportInfo
    pub fn transport_info(&self) -> TransportInfo {
        let get = |id| self.av_transport.get(id).unwrap_or_default();
        TransportInfo {
            state: get(avt::TRANSPORT_STATE),
            status: get(avt::TRANSPORT_STATUS),
            speed: get(avt::TRANSPORT_PLAY_SPEED),
        }
    }

    /// Set the volume in percent, 0 to 100
    pub fn set_volume(&self, percent: u8) -> Result<()> {
        if percent > 100 {
            return Err(RendererError::InvalidArgument(format!(
                "volume must be within 0..=100: {}",
                percent
            )));
        }

        self.engine.set_volume(f32::from(percent) / 100.0)?;
        self.rendering_control.update(|vars| {
            vars.set(rcs::VOLUME, percent.to_string())?;
            Ok(())
        })
    }

    /// Volume in percent, 0 to 100
    pub fn volume(&self) -> Result<u8> {
        Ok(volume_percent(self.engine.get_volume()?))
    }

    pub fn set_mute(&self, mute: bool) -> Result<()> {
        self.engine.set_mute(mute)?;
        self.rendering_control.update(|vars| {
            vars.set(rcs::MUTE, mute_value(mute))?;
            Ok(())
        })
    }

    pub fn mute(&self) -> Result<bool> {
        Ok(self.engine.get_mute()?)
    }

    /// GetProtocolInfo as `(source, sink)`
    pub fn protocol_info(&self) -> (String, String) {
        (
            self.connection_manager
                .get(cm::SOURCE_PROTOCOL_INFO)
                .unwrap_or_default(),
            self.connection_manager
                .get(cm::SINK_PROTOCOL_INFO)
                .unwrap_or_default(),
        )
    }

    pub fn current_connection_ids(&self) -> String {
        self.connection_manager
            .get(cm::CURRENT_CONNECTION_IDS)
            .unwrap_or_default()
    }

    pub fn metadata(&self) -> TrackMetadata {
        self.engine.metadata()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.engine.state()
    }

    /// Name of the selected output, when started from a registry
    pub fn output_name(&self) -> Option<&'static str> {
        self.output_name
    }

    pub fn engine(&self) -> &Arc<PlaybackEngine> {
        &self.engine
    }

    pub fn av_transport(&self) -> &Service {
        &self.av_transport
    }

    pub fn rendering_control(&self) -> &Service {
        &self.rendering_control
    }

    pub fn connection_manager(&self) -> &Service {
        &self.connection_manager
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("output", &self.output_name)
            .field("engine", &self.engine)
            .finish()
    }
}

/// Mirror an engine transition into the AVTransport variables
///
/// A command may have run between the transition and this listener, so
/// the transport state is read from the engine while the service lock is
/// held instead of being taken from the transition.
fn apply_transition(
    av_transport: &Service,
    engine: &PlaybackEngine,
    transition: Transition,
) -> Result<()> {
    match transition {
        Transition::PlaybackStopped => av_transport.update(|vars| {
            set_transport_state(vars, engine.state())?;
            reset_time_positions(vars)
        }),
        Transition::StartedNextStream => av_transport.update(|vars| {
            let target = engine.target();
            info!("Started next stream '{}'", target.uri);
            vars.set(avt::AV_TRANSPORT_URI, target.uri.as_str())?;
            vars.set(avt::CURRENT_TRACK_URI, target.uri.as_str())?;
            vars.set(avt::NEXT_AV_TRANSPORT_URI, target.next_uri.as_str())?;
            vars.set(avt::CURRENT_TRACK_DURATION, format_time(None))?;
            vars.set(avt::CURRENT_TRACK_META_DATA, "")?;
            set_transport_state(vars, engine.state())?;
            reset_time_positions(vars)
        }),
    }
}

fn set_transport_state(vars: &mut VariableContainer, state: PlaybackState) -> Result<()> {
    vars.set(avt::TRANSPORT_STATE, state.transport_state())?;
    vars.set(avt::CURRENT_TRANSPORT_ACTIONS, transport_actions(state))?;
    Ok(())
}

fn reset_time_positions(vars: &mut VariableContainer) -> Result<()> {
    vars.set(avt::RELATIVE_TIME_POSITION, format_time(None))?;
    vars.set(avt::ABSOLUTE_TIME_POSITION, format_time(None))?;
    Ok(())
}

/// Actions a control point may issue next
fn transport_actions(state: PlaybackState) -> &'static str {
    match state {
        PlaybackState::Stopped | PlaybackState::Ready => "Play",
        PlaybackState::Playing => "Pause,Stop,Seek",
        PlaybackState::Paused(_) => "Play,Stop,Seek",
    }
}

fn volume_percent(volume: f32) -> u8 {
    (volume.clamp(0.0, 1.0) * 100.0).round() as u8
}

fn mute_value(mute: bool) -> &'static str {
    if mute {
        "1"
    } else {
        "0"
    }
}

fn forward(sink: &Arc<dyn EventSink>) -> impl Fn(&str, &str) + Send + Sync + 'static {
    let sink = Arc::clone(sink);
    move |namespace: &str, document: &str| sink.notify(namespace, document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_percent() {
        assert_eq!(volume_percent(0.5), 50);
        assert_eq!(volume_percent(0.004), 0);
        assert_eq!(volume_percent(1.7), 100);
    }

    #[test]
    fn test_transport_actions() {
        assert_eq!(transport_actions(PlaybackState::Ready), "Play");
        assert_eq!(
            transport_actions(PlaybackState::Paused(PauseReason::Buffering)),
            "Play,Stop,Seek"
        );
    }
}
