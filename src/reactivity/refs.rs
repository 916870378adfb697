//! Refs - single-value reactive cells, and ref auto-unwrapping.
//!
//! A [`Ref`] keeps the raw value it was given and, when that value is a
//! container, a mutable reactive view of it. Reads track the ref's private
//! dependency set; writes trigger it only when the value actually changed.
//!
//! [`proxy_refs`] wraps a plain object (typically a setup result) so that refs
//! stored in it read and write like plain fields.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::effect::Dep;
use super::reactive::reactive_value;
use crate::types::{has_changed, Object, Value};

// =============================================================================
// Ref
// =============================================================================

struct RefInner {
    raw: RefCell<Value>,
    value: RefCell<Value>,
    dep: Dep,
}

/// A boxed reactive value.
#[derive(Clone)]
pub struct Ref(Rc<RefInner>);

impl Ref {
    /// Current value (the reactive view for containers). Tracks.
    pub fn get(&self) -> Value {
        self.0.dep.track();
        self.0.value.borrow().clone()
    }

    /// Current value without registering a dependency.
    pub fn get_untracked(&self) -> Value {
        self.0.value.borrow().clone()
    }

    /// The raw value as last written.
    pub fn raw(&self) -> Value {
        self.0.raw.borrow().clone()
    }

    /// Replace the value. A write of the same raw value does not trigger.
    pub fn set(&self, value: impl Into<Value>) {
        let value = value.into();
        if !has_changed(&self.0.raw.borrow(), &value) {
            return;
        }
        *self.0.value.borrow_mut() = reactive_value(&value);
        *self.0.raw.borrow_mut() = value;
        self.0.dep.trigger();
    }

    /// Read-modify-write helper.
    pub fn update(&self, f: impl FnOnce(&Value) -> Value) {
        let next = f(&self.get_untracked());
        self.set(next);
    }

    pub fn ptr_eq(&self, other: &Ref) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of effects currently reading this ref.
    pub fn dependent_count(&self) -> usize {
        self.0.dep.len()
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Ref").field(&*self.0.raw.borrow()).finish()
    }
}

/// Create a ref holding `value`.
pub fn ref_value(value: impl Into<Value>) -> Ref {
    let raw = value.into();
    Ref(Rc::new(RefInner {
        value: RefCell::new(reactive_value(&raw)),
        raw: RefCell::new(raw),
        dep: Dep::new(),
    }))
}

pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_))
}

/// Read through a ref or computed; other values are returned as-is.
pub fn unref(value: &Value) -> Value {
    match value {
        Value::Ref(r) => r.get(),
        Value::Computed(c) => c.get(),
        other => other.clone(),
    }
}

// =============================================================================
// Ref Auto-Unwrapping
// =============================================================================

/// Object view that unwraps refs on read and writes into them on set.
#[derive(Clone, Debug)]
pub struct ProxyRefs {
    target: Object,
}

impl ProxyRefs {
    pub fn get(&self, key: &str) -> Value {
        unref(&self.target.get(key))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.target.contains_key(key)
    }

    /// Assign into an existing ref unless `value` is itself a ref.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.target.get(key) {
            Value::Ref(existing) if !is_ref(&value) => existing.set(value),
            Value::Computed(_) if !is_ref(&value) => {
                tracing::warn!(key, "cannot assign to a computed value");
            }
            _ => {
                self.target.insert(key, value);
            }
        }
    }

    /// The wrapped object, refs intact.
    pub fn raw(&self) -> &Object {
        &self.target
    }
}

pub fn proxy_refs(target: Object) -> ProxyRefs {
    ProxyRefs { target }
}
