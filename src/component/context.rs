//! Setup context, current instance and provide/inject.
//!
//! Provided values live in a chain of scopes that mirrors the component
//! parent chain. Each instance gets a fresh scope whose parent is its parent
//! component's scope (or the app scope for the root), so a provide never
//! leaks upward or sideways. `inject` starts looking at the parent's scope:
//! a component cannot inject what it provides itself.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use super::emit::emit;
use super::instance::{ComponentInstance, InstanceId};
use crate::types::Value;

// =============================================================================
// Provide Scopes
// =============================================================================

#[derive(Default)]
pub(crate) struct ProvideScope {
    parent: Option<Rc<ProvideScope>>,
    values: RefCell<HashMap<Rc<str>, Value>>,
}

impl ProvideScope {
    pub(crate) fn root() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub(crate) fn child(parent: &Rc<ProvideScope>) -> Rc<Self> {
        Rc::new(Self {
            parent: Some(parent.clone()),
            values: RefCell::new(HashMap::new()),
        })
    }

    pub(crate) fn provide(&self, key: &str, value: Value) {
        self.values.borrow_mut().insert(Rc::from(key), value);
    }

    /// Nearest value for `key`, this scope first.
    fn lookup(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.values.borrow().get(key) {
            return Some(value.clone());
        }
        self.parent.as_ref()?.lookup(key)
    }

    /// Nearest value for `key` among the ancestors of this scope.
    pub(crate) fn inject(&self, key: &str) -> Option<Value> {
        self.parent.as_ref()?.lookup(key)
    }
}

// =============================================================================
// Current Instance
// =============================================================================

struct CurrentFrame {
    id: InstanceId,
    provides: Rc<ProvideScope>,
}

thread_local! {
    static CURRENT_INSTANCE: RefCell<Vec<CurrentFrame>> = const { RefCell::new(Vec::new()) };
}

/// Marks an instance as current for the lifetime of the guard.
pub(crate) struct CurrentInstanceScope;

impl CurrentInstanceScope {
    pub(crate) fn enter(instance: &ComponentInstance) -> Self {
        CURRENT_INSTANCE.with(|stack| {
            stack.borrow_mut().push(CurrentFrame {
                id: instance.id(),
                provides: instance.provides().clone(),
            })
        });
        CurrentInstanceScope
    }
}

impl Drop for CurrentInstanceScope {
    fn drop(&mut self) {
        CURRENT_INSTANCE.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// The instance whose setup is running, if any.
pub fn current_instance() -> Option<InstanceId> {
    CURRENT_INSTANCE.with(|stack| stack.borrow().last().map(|frame| frame.id))
}

fn current_provides() -> Option<Rc<ProvideScope>> {
    CURRENT_INSTANCE.with(|stack| stack.borrow().last().map(|frame| frame.provides.clone()))
}

/// Provide `value` under `key` to descendants of the current instance.
/// Outside setup this does nothing.
pub fn provide(key: &str, value: impl Into<Value>) {
    match current_provides() {
        Some(scope) => scope.provide(key, value.into()),
        None => tracing::warn!(key, "provide() called outside of setup"),
    }
}

/// Nearest ancestor-provided value for `key`. Outside setup this is `None`.
pub fn inject(key: &str) -> Option<Value> {
    current_provides()?.inject(key)
}

pub fn inject_or(key: &str, default: impl Into<Value>) -> Value {
    inject(key).unwrap_or_else(|| default.into())
}

/// Like [`inject_or`], but the default is only built when needed.
pub fn inject_or_else(key: &str, default: impl FnOnce() -> Value) -> Value {
    inject(key).unwrap_or_else(default)
}

// =============================================================================
// Setup Context
// =============================================================================

/// Second argument of a setup function.
///
/// Cheap to clone, and safe to keep in event handlers: `emit` reads the
/// instance's props at call time and does nothing once it is gone.
#[derive(Clone)]
pub struct SetupContext {
    id: InstanceId,
    instance: Weak<ComponentInstance>,
    provides: Rc<ProvideScope>,
}

impl SetupContext {
    pub(crate) fn new(instance: &Rc<ComponentInstance>) -> Self {
        Self {
            id: instance.id(),
            instance: Rc::downgrade(instance),
            provides: instance.provides().clone(),
        }
    }

    pub fn instance(&self) -> InstanceId {
        self.id
    }

    /// Call the `on<Event>` handler from this component's props.
    pub fn emit(&self, event: &str, args: &[Value]) -> bool {
        let Some(instance) = self.instance.upgrade() else {
            tracing::debug!(event, "emit on an unmounted component");
            return false;
        };
        let props = instance.props();
        emit(&props, event, args)
    }

    pub fn provide(&self, key: &str, value: impl Into<Value>) {
        self.provides.provide(key, value.into());
    }

    pub fn inject(&self, key: &str) -> Option<Value> {
        self.provides.inject(key)
    }

    pub fn inject_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.inject(key).unwrap_or_else(|| default.into())
    }

    pub fn inject_or_else(&self, key: &str, default: impl FnOnce() -> Value) -> Value {
        self.inject(key).unwrap_or_else(default)
    }
}

impl fmt::Debug for SetupContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetupContext").field("instance", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_chain() {
        let app = ProvideScope::root();
        app.provide("theme", Value::from("dark"));

        let parent = ProvideScope::child(&app);
        parent.provide("foo", Value::from("fooVal"));

        let child = ProvideScope::child(&parent);
        child.provide("foo", Value::from("shadowed"));

        let grandchild = ProvideScope::child(&child);
        assert_eq!(grandchild.inject("foo"), Some(Value::from("shadowed")));
        assert_eq!(grandchild.inject("theme"), Some(Value::from("dark")));

        // A scope does not see its own provides.
        assert_eq!(child.inject("foo"), Some(Value::from("fooVal")));
        assert_eq!(parent.inject("foo"), None);
        assert_eq!(grandchild.inject("missing"), None);
    }

    #[test]
    fn test_free_functions_outside_setup() {
        assert_eq!(current_instance(), None);
        assert_eq!(inject("anything"), None);
        assert_eq!(inject_or("anything", 5), Value::Int(5));
        assert_eq!(inject_or_else("anything", || Value::from("lazy")), Value::from("lazy"));
        // Does not panic.
        provide("anything", 1);
    }
}
