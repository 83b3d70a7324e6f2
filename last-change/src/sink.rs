//! Destinations for finished LastChange documents
//!
//! The collector hands every document to an [`EventSink`]. The eventing
//! layer that talks to subscribers implements it; closures and
//! [`ChannelSink`] cover the in-process cases.

use std::sync::mpsc;

/// A finished LastChange document, as delivered through [`ChannelSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastChangeEvent {
    pub namespace: String,
    pub document: String,
}

/// Receiver of LastChange documents
///
/// Called without any collector lock held. Implementations must not open
/// a transaction on the collector that called them.
pub trait EventSink: Send + Sync {
    fn notify(&self, namespace: &str, document: &str);
}

impl<F> EventSink for F
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn notify(&self, namespace: &str, document: &str) {
        self(namespace, document)
    }
}

/// Forwards documents into a `std::sync::mpsc` channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<LastChangeEvent>,
}

impl ChannelSink {
    /// Create a sink together with the receiving end of its channel
    pub fn new() -> (Self, mpsc::Receiver<LastChangeEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn notify(&self, namespace: &str, document: &str) {
        let event = LastChangeEvent {
            namespace: namespace.to_string(),
            document: document.to_string(),
        };
        if self.tx.send(event).is_err() {
            tracing::debug!("LastChange receiver dropped, discarding document");
        }
    }
}
