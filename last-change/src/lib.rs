//! LastChange Event Aggregation
//!
//! UPnP AV services report state changes through a single evented
//! `LastChange` variable whose value is an XML document listing every
//! variable that changed. This crate turns bursts of
//! [`VariableContainer`](state_store::VariableContainer) changes into
//! those documents.
//!
//! # Features
//!
//! - **Transactions**: Composite updates become one coherent document
//! - **Deduplication**: A variable set twice in a transaction appears once, with its last value
//! - **Filtering**: Only event-worthy variables are reported
//! - **Pluggable Delivery**: Documents go to any [`EventSink`]
//!
//! # Quick Start
//!
//! ```rust
//! use last_change::{document, LastChangeCollector};
//! use state_store::{VariableContainer, VariableId, VariableSpec};
//!
//! static SPECS: [VariableSpec; 1] = [VariableSpec::evented("Volume", "100")];
//!
//! let mut vars = VariableContainer::new(&SPECS);
//! let collector = LastChangeCollector::attach(
//!     &mut vars,
//!     document::RENDERING_CONTROL_NAMESPACE,
//!     |namespace: &str, doc: &str| println!("{namespace}: {doc}"),
//! );
//!
//! // Outside a transaction every change is sent at once
//! vars.set(VariableId(0), "50").unwrap();
//! assert!(collector.last_document().unwrap().contains("val=\"50\""));
//! ```

pub mod collector;
pub mod document;
pub mod error;
pub mod sink;

pub use collector::LastChangeCollector;
pub use error::{CollectorError, Result};
pub use sink::{ChannelSink, EventSink, LastChangeEvent};
