//! Public instance - what a render function sees.
//!
//! Property lookup order is setup state, then props, then the `$`-prefixed
//! built-ins. Setup state is read through ref unwrapping, so a render that
//! reads a ref-backed field depends on that ref.

use std::rc::Rc;

use super::instance::{ComponentInstance, InstanceId};
use super::slots::Slots;
use crate::renderer::NodeId;
use crate::types::{Object, Value};

/// Result of a public-instance property lookup.
#[derive(Debug, Clone)]
pub enum PublicProperty {
    State(Value),
    Prop(Value),
    /// `$el`: root host node of the mounted subtree.
    El(Option<NodeId>),
    /// `$slots`
    Slots(Slots),
    /// `$props`
    Props(Object),
}

/// Render context of a component instance.
#[derive(Clone)]
pub struct PublicInstance {
    instance: Rc<ComponentInstance>,
}

impl PublicInstance {
    pub(crate) fn new(instance: Rc<ComponentInstance>) -> Self {
        Self { instance }
    }

    pub fn id(&self) -> InstanceId {
        self.instance.id()
    }

    pub fn lookup(&self, key: &str) -> Option<PublicProperty> {
        let state = self.instance.setup_state();
        if state.contains_key(key) {
            return Some(PublicProperty::State(state.get(key)));
        }
        let props = self.instance.props();
        if props.contains_key(key) {
            return Some(PublicProperty::Prop(props.get(key)));
        }
        match key {
            "$el" => Some(PublicProperty::El(self.instance.vnode().el())),
            "$slots" => Some(PublicProperty::Slots(self.instance.slots())),
            "$props" => Some(PublicProperty::Props(props)),
            _ => None,
        }
    }

    /// Setup state or prop value for `key`; `Null` when neither has it.
    pub fn get(&self, key: &str) -> Value {
        match self.lookup(key) {
            Some(PublicProperty::State(value) | PublicProperty::Prop(value)) => value,
            _ => Value::Null,
        }
    }

    /// Write a setup-state field. Props are readonly here.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        if self.instance.props().contains_key(key) && !self.instance.setup_state().contains_key(key) {
            tracing::warn!(key, component = self.instance.component().name(), "props are readonly");
            return;
        }
        self.instance.setup_state().set(key, value);
    }

    pub fn el(&self) -> Option<NodeId> {
        self.instance.vnode().el()
    }

    pub fn slots(&self) -> Slots {
        self.instance.slots()
    }

    pub fn props(&self) -> Object {
        self.instance.props()
    }
}
