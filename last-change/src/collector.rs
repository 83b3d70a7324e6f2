//! Transactional batching of variable changes into LastChange documents
//!
//! The collector listens to a [`VariableContainer`]. Changes to
//! event-worthy variables are either sent right away as a one-variable
//! document, or, while a transaction is open, held until [`commit`]
//! turns them into a single document.
//!
//! ```text
//! container.set() ──► listener ──► open?  ── yes ──► pending[id] = value
//!                                    │
//!                                    no ──► encode(one) ──► sink
//!
//! commit() ──► encode(pending) ──► sink
//! ```
//!
//! [`commit`]: LastChangeCollector::commit

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use state_store::{VariableChange, VariableContainer, VariableId};
use tracing::{debug, error};

use crate::document;
use crate::error::{CollectorError, Result};
use crate::sink::EventSink;

struct Inner {
    open: bool,
    /// Latest value per variable; a later change overwrites an earlier one
    pending: BTreeMap<VariableId, (&'static str, String)>,
    last_document: Option<String>,
}

/// Batches container changes into LastChange documents
///
/// Only one transaction can be open at a time. Cloning yields another
/// handle to the same collector.
///
/// # Example
///
/// ```rust
/// use last_change::{document, ChannelSink, LastChangeCollector};
/// use state_store::{VariableContainer, VariableId, VariableSpec};
///
/// static SPECS: [VariableSpec; 2] = [
///     VariableSpec::evented("TransportState", "STOPPED"),
///     VariableSpec::evented("CurrentTrackURI", ""),
/// ];
///
/// let mut vars = VariableContainer::new(&SPECS);
/// let (sink, rx) = ChannelSink::new();
/// let collector =
///     LastChangeCollector::attach(&mut vars, document::AV_TRANSPORT_NAMESPACE, sink);
///
/// collector.start_transaction().unwrap();
/// vars.set(VariableId(0), "PLAYING").unwrap();
/// vars.set(VariableId(1), "http://host/a.mp3").unwrap();
/// assert!(rx.try_recv().is_err());
///
/// collector.commit().unwrap();
/// let event = rx.try_recv().unwrap();
/// assert!(event.document.contains("<TransportState val=\"PLAYING\"/>"));
/// ```
#[derive(Clone)]
pub struct LastChangeCollector {
    namespace: Arc<str>,
    sink: Arc<dyn EventSink>,
    inner: Arc<Mutex<Inner>>,
}

impl LastChangeCollector {
    /// Create a collector and register it as a listener on `container`
    pub fn attach<S>(container: &mut VariableContainer, namespace: &str, sink: S) -> Self
    where
        S: EventSink + 'static,
    {
        let collector = Self {
            namespace: Arc::from(namespace),
            sink: Arc::new(sink),
            inner: Arc::new(Mutex::new(Inner {
                open: false,
                pending: BTreeMap::new(),
                last_document: None,
            })),
        };

        let listener = collector.clone();
        container.register_listener(move |change| listener.on_change(change));

        collector
    }

    fn on_change(&self, change: &VariableChange<'_>) {
        if !change.event_worthy {
            return;
        }

        let document = {
            let mut inner = self.inner.lock();
            if inner.open {
                inner
                    .pending
                    .insert(change.id, (change.name, change.new_value.to_string()));
                return;
            }

            match document::encode(&self.namespace, [(change.name, change.new_value)]) {
                Ok(doc) => {
                    inner.last_document = Some(doc.clone());
                    doc
                }
                Err(e) => {
                    error!("Failed to encode LastChange for {}: {}", change.name, e);
                    return;
                }
            }
        };

        debug!("Sending LastChange for {} outside a transaction", change.name);
        self.sink.notify(&self.namespace, &document);
    }

    /// Open a batching window
    ///
    /// Fails if a transaction is already open. That is a bug in the
    /// caller: two composite updates are interleaving on one service.
    pub fn start_transaction(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.open {
            error!(
                "LastChange transaction already open for {}; refusing to nest",
                self.namespace
            );
            return Err(CollectorError::TransactionAlreadyOpen);
        }
        inner.open = true;
        Ok(())
    }

    /// Close the open transaction, sending one document if anything changed
    pub fn commit(&self) -> Result<()> {
        let document = {
            let mut inner = self.inner.lock();
            if !inner.open {
                return Err(CollectorError::NoOpenTransaction);
            }
            inner.open = false;

            if inner.pending.is_empty() {
                return Ok(());
            }

            let pending = std::mem::take(&mut inner.pending);
            let doc = document::encode(
                &self.namespace,
                pending
                    .values()
                    .map(|(name, value)| (*name, value.as_str())),
            )?;
            inner.last_document = Some(doc.clone());
            debug!(
                "Committing LastChange with {} variables for {}",
                pending.len(),
                self.namespace
            );
            doc
        };

        self.sink.notify(&self.namespace, &document);
        Ok(())
    }

    /// Run `f` inside a transaction, committing afterwards
    ///
    /// The transaction is committed even when `f` returns an error, so
    /// whatever changed before the failure is still reported.
    pub fn transaction<T, E, F>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: From<CollectorError>,
    {
        self.start_transaction()?;
        let result = f();
        self.commit()?;
        result
    }

    /// Document describing every event-worthy variable's current value
    ///
    /// This is what a new subscriber receives as its initial event.
    pub fn full_document(&self, container: &VariableContainer) -> Result<String> {
        document::encode(
            &self.namespace,
            container.iter().filter_map(|(id, name, value)| {
                container
                    .is_event_worthy(id)
                    .filter(|&worthy| worthy)
                    .map(|_| (name, value))
            }),
        )
    }

    pub fn is_transaction_open(&self) -> bool {
        self.inner.lock().open
    }

    /// Number of variables waiting for commit
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Most recent document handed to the sink
    pub fn last_document(&self) -> Option<String> {
        self.inner.lock().last_document.clone()
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl std::fmt::Debug for LastChangeCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("LastChangeCollector")
            .field("namespace", &self.namespace)
            .field("open", &inner.open)
            .field("pending", &inner.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{decode, AV_TRANSPORT_NAMESPACE};
    use crate::sink::{ChannelSink, LastChangeEvent};
    use state_store::VariableSpec;
    use std::sync::mpsc;

    static SPECS: [VariableSpec; 4] = [
        VariableSpec::evented("TransportState", "STOPPED"),
        VariableSpec::evented("CurrentTrackURI", ""),
        VariableSpec::silent("RelativeTimePosition", "0:00:00"),
        VariableSpec::silent("LastChange", ""),
    ];

    const STATE: VariableId = VariableId(0);
    const URI: VariableId = VariableId(1);
    const REL_TIME: VariableId = VariableId(2);

    fn setup() -> (
        VariableContainer,
        LastChangeCollector,
        mpsc::Receiver<LastChangeEvent>,
    ) {
        let mut vars = VariableContainer::new(&SPECS);
        let (sink, rx) = ChannelSink::new();
        let collector = LastChangeCollector::attach(&mut vars, AV_TRANSPORT_NAMESPACE, sink);
        (vars, collector, rx)
    }

    fn decoded(event: &LastChangeEvent) -> Vec<(String, String)> {
        decode(&event.document).unwrap()
    }

    #[test]
    fn test_change_outside_transaction_is_sent_immediately() {
        let (mut vars, _collector, rx) = setup();

        vars.set(STATE, "PLAYING").unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.namespace, AV_TRANSPORT_NAMESPACE);
        assert_eq!(
            decoded(&event),
            vec![("TransportState".to_string(), "PLAYING".to_string())]
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_transaction_batches_and_last_write_wins() {
        let (mut vars, collector, rx) = setup();

        collector.start_transaction().unwrap();
        vars.set(STATE, "TRANSITIONING").unwrap();
        vars.set(STATE, "PLAYING").unwrap();
        vars.set(URI, "http://host/c.flac").unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(collector.pending_count(), 2);

        collector.commit().unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(
            decoded(&event),
            vec![
                ("TransportState".to_string(), "PLAYING".to_string()),
                ("CurrentTrackURI".to_string(), "http://host/c.flac".to_string()),
            ]
        );
        assert!(rx.try_recv().is_err());
        assert!(!collector.is_transaction_open());
    }

    #[test]
    fn test_nested_transaction_is_rejected() {
        let (_vars, collector, _rx) = setup();

        collector.start_transaction().unwrap();
        assert!(matches!(
            collector.start_transaction(),
            Err(CollectorError::TransactionAlreadyOpen)
        ));
        assert!(collector.is_transaction_open());
    }

    #[test]
    fn test_empty_commit_sends_nothing() {
        let (_vars, collector, rx) = setup();

        collector.start_transaction().unwrap();
        collector.commit().unwrap();

        assert!(rx.try_recv().is_err());
        assert!(collector.last_document().is_none());
    }

    #[test]
    fn test_commit_without_transaction_fails() {
        let (_vars, collector, _rx) = setup();
        assert!(matches!(
            collector.commit(),
            Err(CollectorError::NoOpenTransaction)
        ));
    }

    #[test]
    fn test_silent_variables_are_never_collected() {
        let (mut vars, collector, rx) = setup();

        vars.set(REL_TIME, "0:01:00").unwrap();
        assert!(rx.try_recv().is_err());

        collector.start_transaction().unwrap();
        vars.set(REL_TIME, "0:02:00").unwrap();
        collector.commit().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_unchanged_value_inside_transaction_is_not_collected() {
        let (mut vars, collector, rx) = setup();

        collector.start_transaction().unwrap();
        vars.set(STATE, "STOPPED").unwrap();
        collector.commit().unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_transaction_helper_commits_on_error() {
        let (mut vars, collector, rx) = setup();

        let result: std::result::Result<(), CollectorError> = collector.transaction(|| {
            vars.set(STATE, "PLAYING")?;
            Err(CollectorError::Document("boom".to_string()))
        });

        assert!(result.is_err());
        assert!(!collector.is_transaction_open());
        assert_eq!(
            decoded(&rx.try_recv().unwrap()),
            vec![("TransportState".to_string(), "PLAYING".to_string())]
        );
    }

    #[test]
    fn test_full_document_lists_event_worthy_variables() {
        let (mut vars, collector, _rx) = setup();
        vars.set(URI, "http://host/a.mp3").unwrap();

        let doc = collector.full_document(&vars).unwrap();
        assert_eq!(
            decode(&doc).unwrap(),
            vec![
                ("TransportState".to_string(), "STOPPED".to_string()),
                ("CurrentTrackURI".to_string(), "http://host/a.mp3".to_string()),
            ]
        );
    }

    #[test]
    fn test_last_document_tracks_latest_dispatch() {
        let (mut vars, collector, _rx) = setup();

        vars.set(STATE, "PLAYING").unwrap();
        let first = collector.last_document().unwrap();
        assert!(first.contains("PLAYING"));

        vars.set(STATE, "STOPPED").unwrap();
        let second = collector.last_document().unwrap();
        assert!(second.contains("STOPPED"));
    }
}
