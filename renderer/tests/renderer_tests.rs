//! End-to-end behaviour of the renderer with a scripted output

use std::sync::mpsc::Receiver;
use std::sync::{Arc, Weak};
use std::time::Duration;

use last_change::document::decode;
use media_renderer::{
    BackendEntry, BackendRegistry, ChannelSink, LastChangeEvent, OutputConfig, PlaybackState,
    Renderer, RendererConfig, RendererError,
};
use output::testing::{Call, ScriptHandle, ScriptedBackend};
use output::{BackendEvent, PlaybackEngine, Transition};
use parking_lot::Mutex;

const AVT: &str = "urn:schemas-upnp-org:metadata-1-0/AVT/";
const RCS: &str = "urn:schemas-upnp-org:metadata-1-0/RCS/";

const A: &str = "http://192.168.1.10/music/a.flac";
const B: &str = "http://192.168.1.10/music/b.flac";

fn scripted_registry() -> (BackendRegistry, ScriptHandle) {
    let (backend, handle) = ScriptedBackend::new();
    handle.set_mime_types(&["audio/mpeg", "audio/flac", "video/mp4"]);
    let slot = Mutex::new(Some(backend));
    let registry = BackendRegistry::from_entries(vec![BackendEntry::new(
        "scripted",
        "Scripted output",
        move || Box::new(slot.lock().take().unwrap_or_else(|| ScriptedBackend::new().0)),
    )]);
    (registry, handle)
}

fn start(config: &RendererConfig) -> (Renderer, ScriptHandle, Receiver<LastChangeEvent>) {
    let (registry, handle) = scripted_registry();
    let (sink, rx) = ChannelSink::new();
    let renderer = Renderer::start_with_registry(config, registry, sink).unwrap();
    (renderer, handle, rx)
}

fn next_event(rx: &Receiver<LastChangeEvent>) -> (String, Vec<(String, String)>) {
    let event = rx
        .recv_timeout(Duration::from_secs(5))
        .expect("a LastChange document");
    let vars = decode(&event.document).unwrap();
    (event.namespace, vars)
}

fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
    expected
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_startup_sends_no_documents() {
    let (renderer, _handle, rx) = start(&RendererConfig::default());

    assert!(rx.try_recv().is_err());
    assert_eq!(renderer.output_name(), Some("scripted"));
    assert_eq!(renderer.volume().unwrap(), 100);
    assert_eq!(renderer.transport_info().state, "STOPPED");
}

#[test]
fn test_play_is_one_document() {
    let (renderer, handle, rx) = start(&RendererConfig::default());

    renderer.set_av_transport_uri(A).unwrap();
    let (namespace, vars) = next_event(&rx);
    assert_eq!(namespace, AVT);
    assert_eq!(
        vars,
        pairs(&[("AVTransportURI", A), ("CurrentTrackURI", A)])
    );

    renderer.play().unwrap();
    let (_, vars) = next_event(&rx);
    assert_eq!(
        vars,
        pairs(&[
            ("TransportState", "PLAYING"),
            ("CurrentTransportActions", "Pause,Stop,Seek"),
        ])
    );
    assert!(rx.try_recv().is_err());
    assert!(handle.calls().contains(&Call::SetUri(A.to_string())));
}

#[test]
fn test_rejected_play_changes_nothing() {
    let (renderer, handle, rx) = start(&RendererConfig::default());
    renderer.set_av_transport_uri(A).unwrap();
    next_event(&rx);

    handle.set_failing("play", true);
    assert!(matches!(renderer.play(), Err(RendererError::Output(_))));
    assert!(rx.try_recv().is_err());
    assert_eq!(renderer.transport_info().state, "STOPPED");
}

#[test]
fn test_end_of_stream_reports_stopped() {
    let (renderer, handle, rx) = start(&RendererConfig::default());
    renderer.set_av_transport_uri(A).unwrap();
    renderer.play().unwrap();
    next_event(&rx);
    next_event(&rx);

    assert!(handle.emit(BackendEvent::EndOfStream));

    let (_, vars) = next_event(&rx);
    assert_eq!(
        vars,
        pairs(&[("TransportState", "STOPPED"), ("CurrentTransportActions", "Play")])
    );
    assert_eq!(renderer.playback_state(), PlaybackState::Stopped);
}

#[test]
fn test_end_of_stream_starts_queued_track() {
    let (renderer, handle, rx) = start(&RendererConfig::default());
    renderer.set_av_transport_uri(A).unwrap();
    renderer.play().unwrap();
    renderer.set_next_av_transport_uri(B).unwrap();
    for _ in 0..3 {
        next_event(&rx);
    }

    assert!(handle.emit(BackendEvent::EndOfStream));

    let (_, vars) = next_event(&rx);
    assert_eq!(
        vars,
        pairs(&[
            ("AVTransportURI", B),
            ("NextAVTransportURI", ""),
            ("CurrentTrackURI", B),
        ])
    );
    assert_eq!(renderer.playback_state(), PlaybackState::Playing);
    assert_eq!(renderer.transport_info().state, "PLAYING");
}

#[test]
fn test_stop_reports_stopped_even_on_backend_failure() {
    let (renderer, handle, rx) = start(&RendererConfig::default());
    renderer.set_av_transport_uri(A).unwrap();
    renderer.play().unwrap();
    next_event(&rx);
    next_event(&rx);

    handle.set_failing("stop", true);
    assert!(renderer.stop().is_err());

    let (_, vars) = next_event(&rx);
    assert_eq!(vars[0], ("TransportState".to_string(), "STOPPED".to_string()));
}

#[test]
fn test_volume_and_mute_go_to_rendering_control() {
    let (renderer, _handle, rx) = start(&RendererConfig::default());

    renderer.set_volume(35).unwrap();
    let (namespace, vars) = next_event(&rx);
    assert_eq!(namespace, RCS);
    assert_eq!(vars, pairs(&[("Volume", "35")]));
    assert_eq!(renderer.volume().unwrap(), 35);

    renderer.set_mute(true).unwrap();
    assert_eq!(next_event(&rx).1, pairs(&[("Mute", "1")]));
    assert!(renderer.mute().unwrap());

    assert!(matches!(
        renderer.set_volume(101),
        Err(RendererError::InvalidArgument(_))
    ));
}

#[test]
fn test_initial_volume_from_config() {
    let config = RendererConfig::new()
        .with_output_config(OutputConfig::new().with_initial_volume_db(-6.0));
    let (renderer, _handle, _rx) = start(&config);

    assert_eq!(renderer.volume().unwrap(), 50);
    assert!(renderer
        .rendering_control()
        .initial_event()
        .unwrap()
        .unwrap()
        .contains("<Volume val=\"50\"/>"));
}

#[test]
fn test_position_info_uses_time_format() {
    let (renderer, handle, rx) = start(&RendererConfig::default());
    renderer.set_av_transport_uri(A).unwrap();
    renderer.play().unwrap();
    next_event(&rx);
    next_event(&rx);

    handle.set_timing(Some(245_000_000_000), Some(62_500_000_000));
    let info = renderer.position_info().unwrap();
    assert_eq!(info.track_uri, A);
    assert_eq!(info.track_duration, "0:04:05");
    assert_eq!(info.rel_time, "0:01:02");
    assert!(!info.stale);

    // Only the duration is evented
    assert_eq!(next_event(&rx).1, pairs(&[("CurrentTrackDuration", "0:04:05")]));

    handle.set_timing(None, None);
    let info = renderer.position_info().unwrap();
    assert!(info.stale);
    assert_eq!(info.rel_time, "0:01:02");
}

#[test]
fn test_seek_parses_time() {
    let (renderer, handle, _rx) = start(&RendererConfig::default());
    renderer.set_av_transport_uri(A).unwrap();
    renderer.play().unwrap();
    handle.clear_calls();

    renderer.seek("0:01:30").unwrap();
    assert_eq!(handle.calls(), vec![Call::Seek(90_000_000_000)]);

    assert!(matches!(
        renderer.seek("ninety"),
        Err(RendererError::InvalidTime(_))
    ));
}

#[test]
fn test_protocol_info_is_filtered() {
    let config = RendererConfig::new().with_mime_filter("audio,-audio/x-scpls");
    let (renderer, _handle, _rx) = start(&config);

    let (source, sink) = renderer.protocol_info();
    assert_eq!(source, "");
    assert_eq!(
        sink,
        "http-get:*:audio/L16;rate=44100;channels=2:*,\
         http-get:*:audio/flac:*,\
         http-get:*:audio/mpeg:*,\
         http-get:*:audio/x-mpeg:*"
    );
    assert_eq!(renderer.current_connection_ids(), "0");
}

#[test]
fn test_unknown_output() {
    let (registry, _handle) = scripted_registry();
    let (sink, _rx) = ChannelSink::new();
    let config = RendererConfig::new().with_output("pulse");

    assert!(matches!(
        Renderer::start_with_registry(&config, registry, sink),
        Err(RendererError::Output(output::OutputError::UnknownBackend(_)))
    ));
}

#[test]
fn test_lastchange_variable_mirrors_document() {
    let (renderer, _handle, rx) = start(&RendererConfig::default());
    renderer.set_volume(20).unwrap();
    let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();

    assert_eq!(
        renderer.rendering_control().get_by_name("LastChange"),
        Some(event.document)
    );
}

#[test]
fn test_stop_racing_next_stream_leaves_services_stopped() {
    let config = RendererConfig::default();
    let (registry, handle) = scripted_registry();
    let selected = registry.select(None, &config.output_config).unwrap();
    let engine = PlaybackEngine::start(selected, &config.output_config).unwrap();

    // A control point's Stop lands after the engine advanced but before
    // the renderer mirrors the new stream
    let slot: Arc<Mutex<Option<Weak<Renderer>>>> = Arc::new(Mutex::new(None));
    let stopper = Arc::clone(&slot);
    engine.on_transition(move |transition| {
        if transition != Transition::StartedNextStream {
            return;
        }
        if let Some(renderer) = stopper.lock().as_ref().and_then(Weak::upgrade) {
            renderer.stop().unwrap();
        }
    });

    let (sink, _rx) = ChannelSink::new();
    let renderer = Arc::new(Renderer::with_engine(Arc::clone(&engine), &config, sink).unwrap());
    *slot.lock() = Some(Arc::downgrade(&renderer));

    renderer.set_av_transport_uri(A).unwrap();
    renderer.play().unwrap();
    renderer.set_next_av_transport_uri(B).unwrap();
    engine.handle_event(BackendEvent::EndOfStream);

    assert_eq!(engine.state(), PlaybackState::Stopped);
    assert_eq!(renderer.transport_info().state, "STOPPED");
    assert_eq!(
        renderer.av_transport().get_by_name("CurrentTransportActions").as_deref(),
        Some("Play")
    );
    assert_eq!(
        renderer.av_transport().get_by_name("CurrentTrackURI").as_deref(),
        Some(B)
    );
    assert!(handle.calls().contains(&Call::SetUri(B.to_string())));
}

#[test]
fn test_stream_tags_publish_track_metadata() {
    let (renderer, handle, rx) = start(&RendererConfig::default());
    renderer.set_av_transport_uri(A).unwrap();
    renderer.play().unwrap();
    next_event(&rx);
    next_event(&rx);

    assert!(handle.emit(BackendEvent::TagsDiscovered(vec![
        ("title".to_string(), "So What".to_string()),
        ("artist".to_string(), "Miles Davis".to_string()),
    ])));

    let (namespace, vars) = next_event(&rx);
    assert_eq!(namespace, AVT);
    assert_eq!(vars.len(), 1);
    assert_eq!(vars[0].0, "CurrentTrackMetaData");
    assert!(vars[0].1.contains("<dc:title>So What</dc:title>"));
    assert!(vars[0].1.contains("<upnp:artist>Miles Davis</upnp:artist>"));
    assert_eq!(renderer.metadata().title, "So What");

    renderer.set_av_transport_uri(B).unwrap();
    let (_, vars) = next_event(&rx);
    assert!(vars.contains(&("CurrentTrackMetaData".to_string(), String::new())));
}

#[test]
fn test_fully_filtered_protocol_info_keeps_default() {
    let config = RendererConfig::new().with_mime_filter("-audio,-video");
    let (renderer, _handle, rx) = start(&config);

    let (_, sink) = renderer.protocol_info();
    assert_eq!(sink, "");
    assert_eq!(
        renderer.connection_manager().get_by_name("SinkProtocolInfo").as_deref(),
        Some("")
    );
    assert!(rx.try_recv().is_err());
}
