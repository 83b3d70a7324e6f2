//! Renderer Variable Store
//!
//! A fixed-size container of named string variables with change
//! detection and listener fan-out. Each UPnP service of the renderer owns
//! one container; the LastChange collector listens to it.
//!
//! # Features
//!
//! - **Static Tables**: Variables are declared once as `VariableSpec`s
//! - **Change Detection**: Listeners only hear about values that actually change
//! - **Fan-out**: Every listener sees every change, in registration order
//!
//! # Quick Start
//!
//! ```rust
//! use state_store::{VariableContainer, VariableId, VariableSpec};
//!
//! static SPECS: [VariableSpec; 2] = [
//!     VariableSpec::evented("TransportState", "STOPPED"),
//!     VariableSpec::silent("RelativeTimePosition", "0:00:00"),
//! ];
//! const TRANSPORT_STATE: VariableId = VariableId(0);
//!
//! let mut vars = VariableContainer::new(&SPECS);
//! vars.register_listener(|change| {
//!     if change.event_worthy {
//!         println!("{} is now {}", change.name, change.new_value);
//!     }
//! });
//!
//! assert!(vars.set(TRANSPORT_STATE, "PLAYING").unwrap());
//! ```
//!
//! # Architecture
//!
//! ```text
//! VariableContainer
//!     │
//!     ├── slots: Vec<Slot>            (id = index)
//!     │       └── Slot { spec: &'static VariableSpec, value: String }
//!     │
//!     └── listeners: Vec<Arc<dyn Fn(&VariableChange)>>
//! ```

pub mod error;
pub mod event;
pub mod store;
pub mod variable;

pub use error::{Result, StoreError};
pub use event::VariableChange;
pub use store::{Listener, VariableContainer};
pub use variable::{VariableId, VariableSpec};

