//! Variable identifiers and static variable tables
//!
//! A service declares its variables once, as a `&'static [VariableSpec]`.
//! The position of a spec in that table is its [`VariableId`].
//!
//! # Example
//!
//! ```rust
//! use state_store::{VariableId, VariableSpec};
//!
//! pub const VOLUME: VariableId = VariableId(0);
//! pub const LAST_CHANGE: VariableId = VariableId(1);
//!
//! pub static RENDERING_CONTROL: [VariableSpec; 2] = [
//!     VariableSpec::evented("Volume", "0"),
//!     VariableSpec::silent("LastChange", ""),
//! ];
//! ```

use std::fmt;

/// Dense index of a variable inside its container
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId(pub u32);

impl VariableId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static description of one variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableSpec {
    /// Name, stable for the process lifetime
    pub name: &'static str,
    /// Value the container starts with
    pub initial: &'static str,
    /// Whether changes are surfaced to event subscribers
    pub event_worthy: bool,
}

impl VariableSpec {
    /// A variable whose changes are sent to subscribers
    pub const fn evented(name: &'static str, initial: &'static str) -> Self {
        Self {
            name,
            initial,
            event_worthy: true,
        }
    }

    /// A variable that is queried but never evented
    pub const fn silent(name: &'static str, initial: &'static str) -> Self {
        Self {
            name,
            initial,
            event_worthy: false,
        }
    }
}
