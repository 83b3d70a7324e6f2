//! Variable storage with change detection
//!
//! `VariableContainer` holds the current value of every variable a
//! service declares, and fans out a [`VariableChange`] to each registered
//! listener whenever a value actually changes.
//!
//! # Locking
//!
//! The container does no locking of its own. When more than one thread
//! can reach it, the owning service keeps it behind a mutex and holds
//! that mutex across `set`/`get`. Listeners run while that mutex is
//! held, so a listener must not try to lock the owning service again.

use std::sync::Arc;

use crate::error::{Result, StoreError};
use crate::event::VariableChange;
use crate::variable::{VariableId, VariableSpec};

/// Callback invoked for every change
pub type Listener = Arc<dyn Fn(&VariableChange<'_>) + Send + Sync>;

struct Slot {
    spec: &'static VariableSpec,
    value: String,
}

/// Fixed set of named string variables
///
/// # Example
///
/// ```rust
/// use state_store::{VariableContainer, VariableId, VariableSpec};
///
/// static SPECS: [VariableSpec; 1] = [VariableSpec::evented("Volume", "0")];
/// const VOLUME: VariableId = VariableId(0);
///
/// let mut vars = VariableContainer::new(&SPECS);
/// vars.register_listener(|change| {
///     println!("{}: {} -> {}", change.name, change.old_value, change.new_value);
/// });
///
/// assert_eq!(vars.set(VOLUME, "42"), Ok(true));
/// assert_eq!(vars.set(VOLUME, "42"), Ok(false));
/// assert_eq!(vars.get(VOLUME), Some("42"));
/// ```
pub struct VariableContainer {
    slots: Vec<Slot>,
    listeners: Vec<Listener>,
}

impl VariableContainer {
    /// Create a container with one variable per spec, ids assigned by position
    pub fn new(specs: &'static [VariableSpec]) -> Self {
        let slots = specs
            .iter()
            .map(|spec| Slot {
                spec,
                value: spec.initial.to_string(),
            })
            .collect();

        Self {
            slots,
            listeners: Vec::new(),
        }
    }

    /// Change a variable's value
    ///
    /// Returns `Ok(false)` without notifying anyone if the new value is
    /// byte-for-byte equal to the current one. Otherwise stores it, calls
    /// every listener in registration order and returns `Ok(true)`.
    pub fn set(&mut self, id: VariableId, value: impl Into<String>) -> Result<bool> {
        let value = value.into();
        let slot = self
            .slots
            .get_mut(id.index())
            .ok_or(StoreError::UnknownVariable(id))?;

        if slot.value == value {
            return Ok(false);
        }

        let old_value = std::mem::replace(&mut slot.value, value);
        let slot = &self.slots[id.index()];

        let change = VariableChange {
            id,
            name: slot.spec.name,
            old_value: &old_value,
            new_value: &slot.value,
            event_worthy: slot.spec.event_worthy,
        };

        // Dispatch from a copy so the list itself is never borrowed by a callback
        let listeners = self.listeners.clone();
        for listener in &listeners {
            listener(&change);
        }

        Ok(true)
    }

    /// Current value of a variable
    pub fn get(&self, id: VariableId) -> Option<&str> {
        self.slots.get(id.index()).map(|slot| slot.value.as_str())
    }

    /// Name of a variable
    pub fn name(&self, id: VariableId) -> Option<&'static str> {
        self.slots.get(id.index()).map(|slot| slot.spec.name)
    }

    /// Whether changes to a variable are evented
    pub fn is_event_worthy(&self, id: VariableId) -> Option<bool> {
        self.slots.get(id.index()).map(|slot| slot.spec.event_worthy)
    }

    /// Look a variable up by name
    pub fn id_of(&self, name: &str) -> Option<VariableId> {
        self.slots
            .iter()
            .position(|slot| slot.spec.name == name)
            .map(|index| VariableId(index as u32))
    }

    /// Register a listener for all future changes
    ///
    /// There is no way to unregister; listeners live as long as the container.
    pub fn register_listener<F>(&mut self, listener: F)
    where
        F: Fn(&VariableChange<'_>) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Iterate over `(id, name, value)` in id order
    pub fn iter(&self) -> impl Iterator<Item = (VariableId, &'static str, &str)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (VariableId(index as u32), slot.spec.name, slot.value.as_str()))
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for VariableContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableContainer")
            .field("variable_count", &self.slots.len())
            .field("listener_count", &self.listeners.len())
            .finish()
    }
}
