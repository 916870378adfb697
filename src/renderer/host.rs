//! Host adapter contract.
//!
//! The reconciler never touches a real tree. It calls these operations on
//! whatever host it was created with: a DOM binding, a terminal widget tree,
//! or the bundled [`MemoryHost`](super::MemoryHost).

use crate::types::Value;

/// Opaque handle to a host node. Allocated by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Operations the reconciler needs from a host tree.
pub trait HostAdapter {
    /// Create an element node for `tag`.
    fn create_element(&mut self, tag: &str) -> NodeId;

    /// Create a text node.
    fn create_text(&mut self, text: &str) -> NodeId;

    /// Set, change or remove a property.
    ///
    /// `next` of `None` or `Some(Value::Null)` removes the property. Keys for
    /// which [`event_name`] returns a name are event listeners.
    fn patch_prop(&mut self, el: NodeId, key: &str, prev: Option<&Value>, next: Option<&Value>);

    /// Insert `child` into `parent` before `anchor`, or at the end when
    /// `anchor` is `None`. Inserting an attached node moves it.
    fn insert(&mut self, child: NodeId, parent: NodeId, anchor: Option<NodeId>);

    /// Detach `child` from its parent.
    fn remove(&mut self, child: NodeId);

    /// Replace all content of `el` with `text`.
    fn set_element_text(&mut self, el: NodeId, text: &str);

    fn parent_node(&self, node: NodeId) -> Option<NodeId>;

    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
}

/// Event name for a listener prop: `onClick` -> `click`.
///
/// Only keys of the form `on` followed by an uppercase ASCII letter qualify.
pub fn event_name(key: &str) -> Option<String> {
    let rest = key.strip_prefix("on")?;
    if rest.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        Some(rest.to_lowercase())
    } else {
        None
    }
}

/// True when a prop value means "absent".
pub fn is_removal(next: Option<&Value>) -> bool {
    matches!(next, None | Some(Value::Null))
}
