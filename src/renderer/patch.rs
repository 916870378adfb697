//! Patch - mounting, updating, moving and unmounting vnodes.

use std::rc::Rc;

use super::host::{HostAdapter, NodeId};
use super::RendererInner;
use crate::component::ComponentInstance;
use crate::error::{Result, RuntimeError};
use crate::types::{has_changed, Object};
use crate::vnode::{Children, VNode, VNodeType};

/// Props handled by the renderer itself, never passed to the host.
fn is_reserved_prop(key: &str) -> bool {
    key == "key"
}

fn host_node(vnode: &VNode) -> Result<NodeId> {
    vnode
        .el()
        .ok_or_else(|| RuntimeError::HostNodeMissing(vnode.describe()))
}

impl<H: HostAdapter + 'static> RendererInner<H> {
    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Reconcile `n2` against `n1` (or mount it when `n1` is `None`) inside
    /// `container`, inserting new host nodes before `anchor`.
    pub(crate) fn patch(
        self: &Rc<Self>,
        n1: Option<&VNode>,
        n2: &VNode,
        container: NodeId,
        parent: Option<&Rc<ComponentInstance>>,
        anchor: Option<NodeId>,
    ) -> Result<()> {
        if let Some(old) = n1 {
            if old.ptr_eq(n2) {
                return Ok(());
            }
            if !old.is_same_vnode_type(n2) {
                let before = self.first_host_node(old).or(anchor);
                self.patch(None, n2, container, parent, before)?;
                self.unmount(old, true);
                return Ok(());
            }
        }

        match n2.node_type() {
            VNodeType::Text => self.process_text(n1, n2, container, anchor),
            VNodeType::Fragment => self.process_fragment(n1, n2, container, parent, anchor),
            VNodeType::Element(tag) => match n1 {
                None => self.mount_element(tag, n2, container, parent, anchor),
                Some(old) => self.patch_element(old, n2, parent),
            },
            VNodeType::Component(component) => match n1 {
                None => self.mount_component(component, n2, container, parent, anchor),
                Some(old) => self.update_component(old, n2, anchor),
            },
        }
    }

    // =========================================================================
    // Text & Fragment
    // =========================================================================

    fn process_text(
        &self,
        n1: Option<&VNode>,
        n2: &VNode,
        container: NodeId,
        anchor: Option<NodeId>,
    ) -> Result<()> {
        let text = n2.children().as_text().unwrap_or_default();
        match n1 {
            None => {
                let mut host = self.host.borrow_mut();
                let el = host.create_text(text);
                host.insert(el, container, anchor);
                n2.set_el(Some(el));
            }
            Some(old) => {
                let el = host_node(old)?;
                n2.set_el(Some(el));
                if old.children().as_text() != Some(text) {
                    self.host.borrow_mut().set_element_text(el, text);
                }
            }
        }
        Ok(())
    }

    fn process_fragment(
        self: &Rc<Self>,
        n1: Option<&VNode>,
        n2: &VNode,
        container: NodeId,
        parent: Option<&Rc<ComponentInstance>>,
        anchor: Option<NodeId>,
    ) -> Result<()> {
        let next = n2.children().as_array();
        match n1 {
            None => self.mount_children(next, container, parent, anchor)?,
            Some(old) => {
                // Appends go right after the fragment's current last node.
                let anchor = match self.host_position(old) {
                    Some((_, after)) => after,
                    None => anchor,
                };
                self.patch_keyed_children(old.children().as_array(), next, container, parent, anchor)?
            }
        }
        n2.set_el(self.first_host_node(n2));
        Ok(())
    }

    // =========================================================================
    // Elements
    // =========================================================================

    fn mount_element(
        self: &Rc<Self>,
        tag: &str,
        n2: &VNode,
        container: NodeId,
        parent: Option<&Rc<ComponentInstance>>,
        anchor: Option<NodeId>,
    ) -> Result<()> {
        let el = self.host.borrow_mut().create_element(tag);
        n2.set_el(Some(el));

        match n2.children() {
            Children::Text(text) => self.host.borrow_mut().set_element_text(el, text),
            Children::Array(children) => self.mount_children(children, el, parent, None)?,
            Children::None | Children::Slots(_) => {}
        }

        let mut host = self.host.borrow_mut();
        for (key, value) in n2.props().entries() {
            if is_reserved_prop(&key) || value.is_null() {
                continue;
            }
            host.patch_prop(el, &key, None, Some(&value));
        }
        host.insert(el, container, anchor);
        Ok(())
    }

    fn patch_element(
        self: &Rc<Self>,
        n1: &VNode,
        n2: &VNode,
        parent: Option<&Rc<ComponentInstance>>,
    ) -> Result<()> {
        let el = host_node(n1)?;
        n2.set_el(Some(el));
        self.patch_props(el, n1.props(), n2.props());
        self.patch_children(n1, n2, el, parent)
    }

    fn patch_props(&self, el: NodeId, old: &Object, new: &Object) {
        if old.ptr_eq(new) {
            return;
        }
        let mut host = self.host.borrow_mut();
        for (key, next) in new.entries() {
            if is_reserved_prop(&key) {
                continue;
            }
            let prev = old.get(&key);
            if has_changed(&prev, &next) {
                let prev = old.contains_key(&key).then_some(&prev);
                host.patch_prop(el, &key, prev, Some(&next));
            }
        }
        for (key, prev) in old.entries() {
            if is_reserved_prop(&key) || new.contains_key(&key) {
                continue;
            }
            host.patch_prop(el, &key, Some(&prev), None);
        }
    }

    fn patch_children(
        self: &Rc<Self>,
        n1: &VNode,
        n2: &VNode,
        container: NodeId,
        parent: Option<&Rc<ComponentInstance>>,
    ) -> Result<()> {
        match (n1.children(), n2.children()) {
            (Children::Array(prev), Children::Text(next)) => {
                self.unmount_children(prev);
                self.host.borrow_mut().set_element_text(container, next);
            }
            (Children::Text(prev), Children::Text(next)) => {
                if prev != next {
                    self.host.borrow_mut().set_element_text(container, next);
                }
            }
            (_, Children::Text(next)) => {
                self.host.borrow_mut().set_element_text(container, next);
            }
            (Children::Array(prev), Children::Array(next)) => {
                self.patch_keyed_children(prev, next, container, parent, None)?;
            }
            (Children::Text(_), Children::Array(next)) => {
                self.host.borrow_mut().set_element_text(container, "");
                self.mount_children(next, container, parent, None)?;
            }
            (_, Children::Array(next)) => {
                self.mount_children(next, container, parent, None)?;
            }
            (Children::Array(prev), _) => self.unmount_children(prev),
            (Children::Text(_), _) => {
                self.host.borrow_mut().set_element_text(container, "");
            }
            _ => {}
        }
        Ok(())
    }

    pub(crate) fn mount_children(
        self: &Rc<Self>,
        children: &[VNode],
        container: NodeId,
        parent: Option<&Rc<ComponentInstance>>,
        anchor: Option<NodeId>,
    ) -> Result<()> {
        for child in children {
            self.patch(None, child, container, parent, anchor)?;
        }
        Ok(())
    }

    // =========================================================================
    // Unmount
    // =========================================================================

    fn unmount_children(&self, children: &[VNode]) {
        for child in children {
            self.unmount(child, true);
        }
    }

    /// Tear down `vnode`. Host nodes are detached only when `do_remove` is
    /// set; descendants of a removed element go with it.
    pub(crate) fn unmount(&self, vnode: &VNode, do_remove: bool) {
        match vnode.node_type() {
            VNodeType::Component(_) => self.unmount_component(vnode, do_remove),
            VNodeType::Fragment => {
                for child in vnode.children().as_array() {
                    self.unmount(child, do_remove);
                }
            }
            VNodeType::Element(_) => {
                for child in vnode.children().as_array() {
                    self.unmount(child, false);
                }
                if do_remove {
                    self.remove_host_node(vnode);
                }
            }
            VNodeType::Text => {
                if do_remove {
                    self.remove_host_node(vnode);
                }
            }
        }
    }

    fn remove_host_node(&self, vnode: &VNode) {
        match vnode.el() {
            Some(el) => self.host.borrow_mut().remove(el),
            None => tracing::warn!(vnode = %vnode.describe(), "unmount of a vnode without host node"),
        }
    }

    // =========================================================================
    // Host Node Lookup & Moves
    // =========================================================================

    fn component_sub_tree(&self, vnode: &VNode) -> Option<VNode> {
        let id = vnode.component()?;
        self.instance(id)?.sub_tree()
    }

    /// First host node a vnode owns, in document order.
    pub(crate) fn first_host_node(&self, vnode: &VNode) -> Option<NodeId> {
        match vnode.node_type() {
            VNodeType::Element(_) | VNodeType::Text => vnode.el(),
            VNodeType::Fragment => vnode
                .children()
                .as_array()
                .iter()
                .find_map(|child| self.first_host_node(child)),
            VNodeType::Component(_) => {
                let sub_tree = self.component_sub_tree(vnode)?;
                self.first_host_node(&sub_tree)
            }
        }
    }

    pub(crate) fn last_host_node(&self, vnode: &VNode) -> Option<NodeId> {
        match vnode.node_type() {
            VNodeType::Element(_) | VNodeType::Text => vnode.el(),
            VNodeType::Fragment => vnode
                .children()
                .as_array()
                .iter()
                .rev()
                .find_map(|child| self.last_host_node(child)),
            VNodeType::Component(_) => {
                let sub_tree = self.component_sub_tree(vnode)?;
                self.last_host_node(&sub_tree)
            }
        }
    }

    /// Move every host node `vnode` owns before `anchor`, keeping order.
    pub(crate) fn move_vnode(&self, vnode: &VNode, container: NodeId, anchor: Option<NodeId>) {
        match vnode.node_type() {
            VNodeType::Element(_) | VNodeType::Text => {
                if let Some(el) = vnode.el() {
                    self.host.borrow_mut().insert(el, container, anchor);
                }
            }
            VNodeType::Fragment => {
                for child in vnode.children().as_array() {
                    self.move_vnode(child, container, anchor);
                }
            }
            VNodeType::Component(_) => {
                if let Some(sub_tree) = self.component_sub_tree(vnode) {
                    self.move_vnode(&sub_tree, container, anchor);
                }
            }
        }
    }

    /// Where `vnode` currently sits: its host parent and the node right after
    /// its last host node.
    pub(crate) fn host_position(&self, vnode: &VNode) -> Option<(NodeId, Option<NodeId>)> {
        let first = self.first_host_node(vnode)?;
        let last = self.last_host_node(vnode)?;
        let host = self.host.borrow();
        let parent = host.parent_node(first)?;
        Some((parent, host.next_sibling(last)))
    }
}
