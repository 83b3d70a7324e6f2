//! Change notifications delivered to container listeners

use crate::variable::VariableId;

/// A single variable change, as seen by a listener
///
/// Borrowed from the container for the duration of the callback. A
/// listener that needs the values later must copy them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableChange<'a> {
    pub id: VariableId,
    pub name: &'static str,
    pub old_value: &'a str,
    pub new_value: &'a str,
    pub event_worthy: bool,
}
