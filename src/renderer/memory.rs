//! In-memory host tree.
//!
//! [`MemoryHost`] implements [`HostAdapter`] over a plain node table and
//! records every operation it receives, so tests can assert both on the
//! resulting tree and on how the reconciler got there (a keyed reorder
//! should be moves, not remounts).

use std::collections::HashMap;
use std::fmt::Write as _;

use indexmap::IndexMap;

use super::host::{event_name, is_removal, HostAdapter, NodeId};
use crate::types::{Callback, Value};

/// One recorded host operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    CreateElement { node: NodeId, tag: String },
    CreateText { node: NodeId, text: String },
    SetAttr { node: NodeId, key: String, value: String },
    RemoveAttr { node: NodeId, key: String },
    SetListener { node: NodeId, event: String },
    RemoveListener { node: NodeId, event: String },
    /// Insert of a detached node.
    Insert { node: NodeId, parent: NodeId, anchor: Option<NodeId> },
    /// Insert of a node that was already attached somewhere.
    Move { node: NodeId, parent: NodeId, anchor: Option<NodeId> },
    Remove { node: NodeId },
    SetText { node: NodeId, text: String },
}

#[derive(Debug, Clone)]
enum NodeKind {
    Element(String),
    Text,
}

#[derive(Debug)]
struct MemNode {
    kind: NodeKind,
    text: String,
    attrs: IndexMap<String, String>,
    listeners: IndexMap<String, Callback>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl MemNode {
    fn new(kind: NodeKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
            attrs: IndexMap::new(),
            listeners: IndexMap::new(),
            children: Vec::new(),
            parent: None,
        }
    }
}

/// Host tree kept in memory, with an operation log.
#[derive(Debug, Default)]
pub struct MemoryHost {
    nodes: HashMap<NodeId, MemNode>,
    next_id: u64,
    ops: Vec<HostOp>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, node: MemNode) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(id, node);
        id
    }

    /// Create a detached element to mount into. Not recorded.
    pub fn create_root(&mut self, tag: &str) -> NodeId {
        self.alloc(MemNode::new(NodeKind::Element(tag.to_string()), ""))
    }

    fn detach(&mut self, child: NodeId) -> bool {
        let Some(parent) = self.nodes.get_mut(&child).and_then(|n| n.parent.take()) else {
            return false;
        };
        if let Some(parent) = self.nodes.get_mut(&parent) {
            parent.children.retain(|c| *c != child);
        }
        true
    }

    /// Drop a detached node and its descendants from the table.
    fn free(&mut self, node: NodeId) {
        let mut pending = vec![node];
        while let Some(id) = pending.pop() {
            if let Some(n) = self.nodes.remove(&id) {
                pending.extend(n.children);
            }
        }
    }

    /// Number of live nodes, roots included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    /// Drain the operation log.
    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    pub fn count_ops(&self, pred: impl Fn(&HostOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        match &self.nodes.get(&node)?.kind {
            NodeKind::Element(tag) => Some(tag),
            NodeKind::Text => None,
        }
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn attr(&self, node: NodeId, key: &str) -> Option<&str> {
        self.nodes.get(&node)?.attrs.get(key).map(String::as_str)
    }

    pub fn listener(&self, node: NodeId, event: &str) -> Option<Callback> {
        self.nodes.get(&node)?.listeners.get(event).cloned()
    }

    /// Concatenated text of a node and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(&node) else { return };
        out.push_str(&n.text);
        for child in &n.children {
            self.collect_text(*child, out);
        }
    }

    /// Markup for a node and its subtree: `<div id="a"><p>hi</p></div>`.
    pub fn serialize(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node, &mut out);
        out
    }

    /// Markup for the children of a node.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(n) = self.nodes.get(&node) {
            out.push_str(&n.text);
            for child in &n.children {
                self.write_node(*child, &mut out);
            }
        }
        out
    }

    fn write_node(&self, node: NodeId, out: &mut String) {
        let Some(n) = self.nodes.get(&node) else { return };
        match &n.kind {
            NodeKind::Text => out.push_str(&n.text),
            NodeKind::Element(tag) => {
                out.push('<');
                out.push_str(tag);
                for (key, value) in &n.attrs {
                    let _ = write!(out, " {key}=\"{value}\"");
                }
                out.push('>');
                out.push_str(&n.text);
                for child in &n.children {
                    self.write_node(*child, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

impl HostAdapter for MemoryHost {
    fn create_element(&mut self, tag: &str) -> NodeId {
        let node = self.alloc(MemNode::new(NodeKind::Element(tag.to_string()), ""));
        self.ops.push(HostOp::CreateElement {
            node,
            tag: tag.to_string(),
        });
        node
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        let node = self.alloc(MemNode::new(NodeKind::Text, text));
        self.ops.push(HostOp::CreateText {
            node,
            text: text.to_string(),
        });
        node
    }

    fn patch_prop(&mut self, el: NodeId, key: &str, _prev: Option<&Value>, next: Option<&Value>) {
        let Some(node) = self.nodes.get_mut(&el) else {
            tracing::warn!(?el, key, "patch_prop on unknown node");
            return;
        };
        if let Some(event) = event_name(key) {
            match next.and_then(Value::as_callback) {
                Some(handler) => {
                    node.listeners.insert(event.clone(), handler.clone());
                    self.ops.push(HostOp::SetListener { node: el, event });
                }
                None => {
                    node.listeners.shift_remove(&event);
                    self.ops.push(HostOp::RemoveListener { node: el, event });
                }
            }
            return;
        }
        match next {
            Some(value) if !is_removal(next) => {
                let value = value.to_string();
                node.attrs.insert(key.to_string(), value.clone());
                self.ops.push(HostOp::SetAttr {
                    node: el,
                    key: key.to_string(),
                    value,
                });
            }
            _ => {
                node.attrs.shift_remove(key);
                self.ops.push(HostOp::RemoveAttr {
                    node: el,
                    key: key.to_string(),
                });
            }
        }
    }

    fn insert(&mut self, child: NodeId, parent: NodeId, anchor: Option<NodeId>) {
        if !self.nodes.contains_key(&parent) {
            tracing::warn!(?parent, "insert into unknown node");
            return;
        }
        let moved = self.detach(child);
        let Some(p) = self.nodes.get_mut(&parent) else { return };
        let position = anchor.and_then(|a| p.children.iter().position(|c| *c == a));
        if anchor.is_some() && position.is_none() {
            tracing::warn!(?anchor, ?parent, "insert anchor is not a child; appending");
        }
        match position {
            Some(index) => p.children.insert(index, child),
            None => p.children.push(child),
        }
        if let Some(c) = self.nodes.get_mut(&child) {
            c.parent = Some(parent);
        }
        self.ops.push(if moved {
            HostOp::Move { node: child, parent, anchor }
        } else {
            HostOp::Insert { node: child, parent, anchor }
        });
    }

    fn remove(&mut self, child: NodeId) {
        self.detach(child);
        self.free(child);
        self.ops.push(HostOp::Remove { node: child });
    }

    fn set_element_text(&mut self, el: NodeId, text: &str) {
        let children = match self.nodes.get_mut(&el) {
            Some(node) => {
                node.text = text.to_string();
                std::mem::take(&mut node.children)
            }
            None => return,
        };
        // Replaced children cannot be reached again.
        for child in children {
            self.free(child);
        }
        self.ops.push(HostOp::SetText {
            node: el,
            text: text.to_string(),
        });
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node)?.parent
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(&node)?.parent?;
        let siblings = &self.nodes.get(&parent)?.children;
        let index = siblings.iter().position(|c| *c == node)?;
        siblings.get(index + 1).copied()
    }
}
