//! The renderer's UPnP services and their state variables
//!
//! Each service owns one [`VariableContainer`] behind a mutex. Evented
//! services also carry a [`LastChangeCollector`]; every update runs as
//! one transaction so a command produces at most one LastChange document.
//! Documents are handed to the sink after the service lock is released.

use std::sync::Arc;

use last_change::{EventSink, LastChangeCollector};
use parking_lot::Mutex;
use state_store::{VariableContainer, VariableId, VariableSpec};

use crate::error::Result;

/// AVTransport state variables
pub mod av_transport {
    use super::*;

    pub static VARIABLES: [VariableSpec; 12] = [
        VariableSpec::evented("TransportState", "STOPPED"),
        VariableSpec::evented("TransportStatus", "OK"),
        VariableSpec::evented("TransportPlaySpeed", "1"),
        VariableSpec::evented("AVTransportURI", ""),
        VariableSpec::evented("NextAVTransportURI", ""),
        VariableSpec::evented("CurrentTrackURI", ""),
        VariableSpec::evented("CurrentTrackDuration", "0:00:00"),
        VariableSpec::silent("RelativeTimePosition", "0:00:00"),
        VariableSpec::silent("AbsoluteTimePosition", "0:00:00"),
        VariableSpec::evented("CurrentTransportActions", "Play"),
        VariableSpec::evented("CurrentTrackMetaData", ""),
        VariableSpec::silent("LastChange", ""),
    ];

    pub const TRANSPORT_STATE: VariableId = VariableId(0);
    pub const TRANSPORT_STATUS: VariableId = VariableId(1);
    pub const TRANSPORT_PLAY_SPEED: VariableId = VariableId(2);
    pub const AV_TRANSPORT_URI: VariableId = VariableId(3);
    pub const NEXT_AV_TRANSPORT_URI: VariableId = VariableId(4);
    pub const CURRENT_TRACK_URI: VariableId = VariableId(5);
    pub const CURRENT_TRACK_DURATION: VariableId = VariableId(6);
    pub const RELATIVE_TIME_POSITION: VariableId = VariableId(7);
    pub const ABSOLUTE_TIME_POSITION: VariableId = VariableId(8);
    pub const CURRENT_TRANSPORT_ACTIONS: VariableId = VariableId(9);
    pub const CURRENT_TRACK_META_DATA: VariableId = VariableId(10);
    pub const LAST_CHANGE: VariableId = VariableId(11);
}

/// RenderingControl state variables
pub mod rendering_control {
    use super::*;

    pub static VARIABLES: [VariableSpec; 3] = [
        VariableSpec::evented("Volume", "100"),
        VariableSpec::evented("Mute", "0"),
        VariableSpec::silent("LastChange", ""),
    ];

    pub const VOLUME: VariableId = VariableId(0);
    pub const MUTE: VariableId = VariableId(1);
    pub const LAST_CHANGE: VariableId = VariableId(2);
}

/// ConnectionManager state variables
pub mod connection_manager {
    use super::*;

    pub static VARIABLES: [VariableSpec; 3] = [
        VariableSpec::evented("SourceProtocolInfo", ""),
        VariableSpec::evented("SinkProtocolInfo", ""),
        VariableSpec::evented("CurrentConnectionIDs", "0"),
    ];

    pub const SOURCE_PROTOCOL_INFO: VariableId = VariableId(0);
    pub const SINK_PROTOCOL_INFO: VariableId = VariableId(1);
    pub const CURRENT_CONNECTION_IDS: VariableId = VariableId(2);
}

/// Documents committed under the service lock, waiting for delivery
#[derive(Clone, Default)]
struct Outbox(Arc<Mutex<Vec<(String, String)>>>);

impl Outbox {
    fn take(&self) -> Vec<(String, String)> {
        std::mem::take(&mut *self.0.lock())
    }
}

impl EventSink for Outbox {
    fn notify(&self, namespace: &str, document: &str) {
        self.0
            .lock()
            .push((namespace.to_string(), document.to_string()));
    }
}

struct Eventing {
    collector: LastChangeCollector,
    outbox: Outbox,
    sink: Arc<dyn EventSink>,
    /// Slot that mirrors the most recent LastChange document
    last_change: Option<VariableId>,
}

/// A service's variables plus its optional LastChange eventing
pub struct Service {
    name: &'static str,
    variables: Mutex<VariableContainer>,
    eventing: Option<Eventing>,
}

impl Service {
    /// A service without LastChange eventing
    pub fn new(name: &'static str, variables: VariableContainer) -> Self {
        Self {
            name,
            variables: Mutex::new(variables),
            eventing: None,
        }
    }

    /// A service whose changes are reported as LastChange documents
    ///
    /// Values set on `variables` before this call are the initial state
    /// and are not reported.
    pub fn evented<S>(
        name: &'static str,
        mut variables: VariableContainer,
        namespace: &str,
        sink: S,
    ) -> Self
    where
        S: EventSink + 'static,
    {
        let outbox = Outbox::default();
        let collector = LastChangeCollector::attach(&mut variables, namespace, outbox.clone());
        let last_change = variables.id_of("LastChange");
        Self {
            name,
            variables: Mutex::new(variables),
            eventing: Some(Eventing {
                collector,
                outbox,
                sink: Arc::new(sink),
                last_change,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Apply a group of variable changes as one transaction
    ///
    /// The collector is committed even when `f` fails. The sink is called
    /// once the service lock is released, so it may read this service.
    /// Documents from concurrent updates can reach the sink in either
    /// order; the LastChange variable always holds the latest one.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut VariableContainer) -> Result<T>,
    {
        let Some(eventing) = &self.eventing else {
            return f(&mut *self.variables.lock());
        };

        let (result, mirrored, documents) = {
            let mut variables = self.variables.lock();
            let result = eventing.collector.transaction(|| f(&mut *variables));
            let mirrored = match (eventing.last_change, eventing.collector.last_document()) {
                (Some(id), Some(document)) => variables.set(id, document).map(|_| ()),
                _ => Ok(()),
            };
            (result, mirrored, eventing.outbox.take())
        };

        for (namespace, document) in &documents {
            eventing.sink.notify(namespace, document);
        }

        mirrored?;
        result
    }

    pub fn get(&self, id: VariableId) -> Option<String> {
        self.variables.lock().get(id).map(str::to_string)
    }

    pub fn get_by_name(&self, name: &str) -> Option<String> {
        let variables = self.variables.lock();
        variables
            .id_of(name)
            .and_then(|id| variables.get(id))
            .map(str::to_string)
    }

    /// LastChange document a new subscriber receives first
    pub fn initial_event(&self) -> Option<Result<String>> {
        let eventing = self.eventing.as_ref()?;
        let variables = self.variables.lock();
        Some(
            eventing
                .collector
                .full_document(&variables)
                .map_err(Into::into),
        )
    }

    pub fn collector(&self) -> Option<&LastChangeCollector> {
        self.eventing.as_ref().map(|eventing| &eventing.collector)
    }
}

impl std::fmt::Debug for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("evented", &self.eventing.is_some())
            .finish()
    }
}
