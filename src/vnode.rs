//! Virtual nodes - the lightweight tree the reconciler diffs.
//!
//! A [`VNode`] is immutable once created except for two back references the
//! renderer fills in while mounting: the host node it produced (`el`) and,
//! for component vnodes, the owning instance id. Both are plain ids, so a
//! vnode never owns a host node or a component instance.
//!
//! # Example
//!
//! ```ignore
//! use spark_runtime::{h, Object};
//!
//! let list = h("ul", None, vec![
//!     h("li", Object::new().with("key", "a"), "A"),
//!     h("li", Object::new().with("key", "b"), "B"),
//! ]);
//! ```

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::component::{Component, InstanceId};
use crate::renderer::NodeId;
use crate::types::{Object, Value};

// =============================================================================
// Shape Flags
// =============================================================================

bitflags! {
    /// Classification of a vnode and its children, derived once at creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ShapeFlags: u8 {
        const ELEMENT = 1 << 0;
        const STATEFUL_COMPONENT = 1 << 1;
        const TEXT_CHILDREN = 1 << 2;
        const ARRAY_CHILDREN = 1 << 3;
        const SLOT_CHILDREN = 1 << 4;
    }
}

// =============================================================================
// Node Type
// =============================================================================

/// Type discriminator of a vnode.
#[derive(Clone)]
pub enum VNodeType {
    /// Host element with a tag name.
    Element(Rc<str>),
    Component(Component),
    /// Host text node; the text lives in the children.
    Text,
    /// Children without a host node of their own.
    Fragment,
}

impl VNodeType {
    /// Same discriminator: equal tags, the same component definition, or both
    /// text / both fragment.
    pub fn same(&self, other: &VNodeType) -> bool {
        match (self, other) {
            (VNodeType::Element(a), VNodeType::Element(b)) => a == b,
            (VNodeType::Component(a), VNodeType::Component(b)) => a.ptr_eq(b),
            (VNodeType::Text, VNodeType::Text) => true,
            (VNodeType::Fragment, VNodeType::Fragment) => true,
            _ => false,
        }
    }

    fn shape(&self) -> ShapeFlags {
        match self {
            VNodeType::Element(_) => ShapeFlags::ELEMENT,
            VNodeType::Component(_) => ShapeFlags::STATEFUL_COMPONENT,
            VNodeType::Text | VNodeType::Fragment => ShapeFlags::empty(),
        }
    }
}

impl From<&str> for VNodeType {
    fn from(tag: &str) -> Self {
        VNodeType::Element(Rc::from(tag))
    }
}

impl From<String> for VNodeType {
    fn from(tag: String) -> Self {
        VNodeType::Element(Rc::from(tag))
    }
}

impl From<Component> for VNodeType {
    fn from(component: Component) -> Self {
        VNodeType::Component(component)
    }
}

impl From<&Component> for VNodeType {
    fn from(component: &Component) -> Self {
        VNodeType::Component(component.clone())
    }
}

impl fmt::Debug for VNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNodeType::Element(tag) => write!(f, "<{tag}>"),
            VNodeType::Component(c) => write!(f, "Component({})", c.name()),
            VNodeType::Text => write!(f, "Text"),
            VNodeType::Fragment => write!(f, "Fragment"),
        }
    }
}

// =============================================================================
// Keys
// =============================================================================

/// User-supplied list identity, from the `key` prop.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VNodeKey {
    Int(i64),
    Str(Rc<str>),
}

impl VNodeKey {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Str(s) => Some(VNodeKey::Str(s.clone())),
            other => match other.as_i64() {
                Some(i) => Some(VNodeKey::Int(i)),
                None => {
                    tracing::warn!(key = ?other, "ignoring unsupported vnode key type");
                    None
                }
            },
        }
    }
}

// =============================================================================
// Slots
// =============================================================================

/// What a slot function returns before normalization.
pub enum SlotContent {
    One(VNode),
    Many(Vec<VNode>),
}

impl SlotContent {
    /// Normalize to a list of vnodes.
    pub fn into_vec(self) -> Vec<VNode> {
        match self {
            SlotContent::One(vnode) => vec![vnode],
            SlotContent::Many(vnodes) => vnodes,
        }
    }
}

impl From<VNode> for SlotContent {
    fn from(vnode: VNode) -> Self {
        SlotContent::One(vnode)
    }
}

impl From<Vec<VNode>> for SlotContent {
    fn from(vnodes: Vec<VNode>) -> Self {
        SlotContent::Many(vnodes)
    }
}

pub type RawSlotFn = Rc<dyn Fn(&Object) -> SlotContent>;

/// Slot functions passed as component children, keyed by slot name.
#[derive(Clone, Default)]
pub struct RawSlots(IndexMap<Rc<str>, RawSlotFn>);

impl RawSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slot. `f` receives the props the child passes to `render_slot`.
    pub fn slot<R: Into<SlotContent>>(mut self, name: &str, f: impl Fn(&Object) -> R + 'static) -> Self {
        self.0.insert(Rc::from(name), Rc::new(move |props| f(props).into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<str>, &RawSlotFn)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// Children
// =============================================================================

pub enum Children {
    None,
    Text(Rc<str>),
    Array(Vec<VNode>),
    Slots(RawSlots),
}

impl Children {
    fn shape(&self) -> ShapeFlags {
        match self {
            Children::None => ShapeFlags::empty(),
            Children::Text(_) => ShapeFlags::TEXT_CHILDREN,
            Children::Array(_) => ShapeFlags::ARRAY_CHILDREN,
            Children::Slots(_) => ShapeFlags::SLOT_CHILDREN,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Children::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_array(&self) -> &[VNode] {
        match self {
            Children::Array(children) => children,
            _ => &[],
        }
    }
}

impl From<()> for Children {
    fn from(_: ()) -> Self {
        Children::None
    }
}

impl From<&str> for Children {
    fn from(text: &str) -> Self {
        Children::Text(Rc::from(text))
    }
}

impl From<String> for Children {
    fn from(text: String) -> Self {
        Children::Text(Rc::from(text))
    }
}

impl From<Vec<VNode>> for Children {
    fn from(children: Vec<VNode>) -> Self {
        Children::Array(children)
    }
}

impl From<VNode> for Children {
    fn from(child: VNode) -> Self {
        Children::Array(vec![child])
    }
}

impl From<RawSlots> for Children {
    fn from(slots: RawSlots) -> Self {
        Children::Slots(slots)
    }
}

// =============================================================================
// VNode
// =============================================================================

struct VNodeInner {
    node_type: VNodeType,
    props: Object,
    children: Children,
    shape: ShapeFlags,
    key: Option<VNodeKey>,
    el: Cell<Option<NodeId>>,
    component: Cell<Option<InstanceId>>,
}

/// Shared handle to a virtual node.
#[derive(Clone)]
pub struct VNode(Rc<VNodeInner>);

impl VNode {
    pub fn new(node_type: VNodeType, props: Option<Object>, children: Children) -> Self {
        let props = props.unwrap_or_default();
        let key = VNodeKey::from_value(&props.get("key"));

        let mut shape = node_type.shape() | children.shape();
        // Slot children only mean something on components.
        if !shape.contains(ShapeFlags::STATEFUL_COMPONENT) {
            shape.remove(ShapeFlags::SLOT_CHILDREN);
        }

        VNode(Rc::new(VNodeInner {
            node_type,
            props,
            children,
            shape,
            key,
            el: Cell::new(None),
            component: Cell::new(None),
        }))
    }

    pub fn node_type(&self) -> &VNodeType {
        &self.0.node_type
    }

    pub fn props(&self) -> &Object {
        &self.0.props
    }

    pub fn children(&self) -> &Children {
        &self.0.children
    }

    pub fn shape(&self) -> ShapeFlags {
        self.0.shape
    }

    pub fn key(&self) -> Option<&VNodeKey> {
        self.0.key.as_ref()
    }

    /// Host node produced by mounting, if mounted.
    pub fn el(&self) -> Option<NodeId> {
        self.0.el.get()
    }

    pub(crate) fn set_el(&self, el: Option<NodeId>) {
        self.0.el.set(el);
    }

    pub fn component(&self) -> Option<InstanceId> {
        self.0.component.get()
    }

    pub(crate) fn set_component(&self, id: Option<InstanceId>) {
        self.0.component.set(id);
    }

    /// Same type discriminator and same key (absent keys match each other).
    pub fn is_same_vnode_type(&self, other: &VNode) -> bool {
        self.0.node_type.same(&other.0.node_type) && self.0.key == other.0.key
    }

    pub fn ptr_eq(&self, other: &VNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Short label for logs and errors.
    pub fn describe(&self) -> String {
        match &self.0.node_type {
            VNodeType::Element(tag) => tag.to_string(),
            VNodeType::Component(c) => c.name().to_string(),
            VNodeType::Text => "#text".to_string(),
            VNodeType::Fragment => "#fragment".to_string(),
        }
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("VNode");
        s.field("type", &self.0.node_type);
        if let Some(key) = &self.0.key {
            s.field("key", key);
        }
        match &self.0.children {
            Children::None => {}
            Children::Text(text) => {
                s.field("text", text);
            }
            Children::Array(children) => {
                s.field("children", children);
            }
            Children::Slots(slots) => {
                s.field("slots", &slots.len());
            }
        }
        s.field("el", &self.0.el.get()).finish()
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Build a vnode: `h("div", props, children)` or `h(&component, props, slots)`.
pub fn h(
    node_type: impl Into<VNodeType>,
    props: impl Into<Option<Object>>,
    children: impl Into<Children>,
) -> VNode {
    VNode::new(node_type.into(), props.into(), children.into())
}

/// Text vnode, for mixing text with elements inside an array of children.
pub fn create_text_vnode(text: impl Into<Rc<str>>) -> VNode {
    VNode::new(VNodeType::Text, None, Children::Text(text.into()))
}

/// Fragment vnode: children with no wrapping host node.
pub fn fragment(children: Vec<VNode>) -> VNode {
    VNode::new(VNodeType::Fragment, None, Children::Array(children))
}
