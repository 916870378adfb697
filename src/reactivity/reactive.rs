//! Reactive wrappers - typed views that track on read and trigger on write.
//!
//! A [`Reactive`] wraps a raw [`Object`] or [`Array`] without modifying it.
//! Three kinds exist:
//!
//! | kind | nested reads | tracks | writes |
//! |---|---|---|---|
//! | `Mutable` | wrapped `Mutable` | yes | write + trigger |
//! | `Readonly` | wrapped `Readonly` | no | warn, dropped |
//! | `ShallowReadonly` | raw | no | warn, dropped |
//!
//! # Example
//!
//! ```ignore
//! use spark_runtime::{reactive, is_reactive, Object};
//!
//! let state = reactive(Object::new().with("nested", Object::new().with("foo", 1)));
//! let nested = state.get("nested");
//! assert!(is_reactive(&nested));
//! ```

use std::fmt;

use super::graph::{track, trigger};
use crate::types::{Array, Object, PropKey, TargetId, Value};

// =============================================================================
// Target
// =============================================================================

/// The raw container behind a reactive wrapper.
#[derive(Clone)]
pub enum Target {
    Object(Object),
    Array(Array),
}

impl Target {
    pub fn id(&self) -> TargetId {
        match self {
            Target::Object(o) => o.id(),
            Target::Array(a) => a.id(),
        }
    }

    /// Extract the raw container from a value, unwrapping existing wrappers.
    pub fn from_value(value: &Value) -> Option<Target> {
        match value {
            Value::Object(o) => Some(Target::Object(o.clone())),
            Value::Array(a) => Some(Target::Array(a.clone())),
            Value::Reactive(r) => Some(r.target.clone()),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Target::Object(o) => Value::Object(o.clone()),
            Target::Array(a) => Value::Array(a.clone()),
        }
    }

    /// One spelling per slot: numeric names index arrays, indices name
    /// object fields. Tracking and triggering key on the result.
    fn normalize_key(&self, key: PropKey) -> PropKey {
        match (self, key) {
            (Target::Array(_), PropKey::Name(name)) => match name.parse::<usize>() {
                Ok(index) => PropKey::Index(index),
                Err(_) => PropKey::Name(name),
            },
            (Target::Object(_), PropKey::Index(index)) => PropKey::Name(index.to_string().into()),
            (_, key) => key,
        }
    }

    fn get_raw(&self, key: &PropKey) -> Value {
        match (self, key) {
            (Target::Object(o), PropKey::Name(name)) => o.get(name),
            (Target::Object(o), PropKey::Index(i)) => o.get(&i.to_string()),
            (Target::Array(a), PropKey::Index(i)) => a.get(*i),
            (Target::Array(a), PropKey::Name(name)) => match name.parse::<usize>() {
                Ok(i) => a.get(i),
                Err(_) if &**name == "length" => Value::from(a.len()),
                Err(_) => Value::Null,
            },
        }
    }

    fn set_raw(&self, key: &PropKey, value: Value) {
        match (self, key) {
            (Target::Object(o), PropKey::Name(name)) => {
                o.insert(name, value);
            }
            (Target::Object(o), PropKey::Index(i)) => {
                o.insert(&i.to_string(), value);
            }
            (Target::Array(a), PropKey::Index(i)) => a.set(*i, value),
            (Target::Array(a), PropKey::Name(name)) => match name.parse::<usize>() {
                Ok(i) => a.set(i, value),
                Err(_) => tracing::warn!(key = %name, "ignoring named write on an array target"),
            },
        }
    }

    fn has_raw(&self, key: &PropKey) -> bool {
        match (self, key) {
            (Target::Object(o), PropKey::Name(name)) => o.contains_key(name),
            (Target::Object(o), PropKey::Index(i)) => o.contains_key(&i.to_string()),
            (Target::Array(a), PropKey::Index(i)) => *i < a.len(),
            (Target::Array(a), PropKey::Name(name)) => {
                name.parse::<usize>().map(|i| i < a.len()).unwrap_or(false)
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            Target::Object(o) => o.len(),
            Target::Array(a) => a.len(),
        }
    }
}

impl From<Object> for Target {
    fn from(o: Object) -> Self {
        Target::Object(o)
    }
}

impl From<Array> for Target {
    fn from(a: Array) -> Self {
        Target::Array(a)
    }
}

impl From<Reactive> for Target {
    fn from(r: Reactive) -> Self {
        r.target
    }
}

impl From<&Reactive> for Target {
    fn from(r: &Reactive) -> Self {
        r.target.clone()
    }
}

// =============================================================================
// Reactive
// =============================================================================

/// Category of a reactive wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    Mutable,
    Readonly,
    ShallowReadonly,
}

/// Introspection queries answered by the wrapper itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactiveFlag {
    IsReactive,
    IsReadonly,
}

/// Typed view over a raw container.
#[derive(Clone)]
pub struct Reactive {
    target: Target,
    kind: ProxyKind,
}

impl Reactive {
    fn new(target: Target, kind: ProxyKind) -> Self {
        Self { target, kind }
    }

    pub fn kind(&self) -> ProxyKind {
        self.kind
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Answer an introspection flag without reading the underlying data.
    pub fn query(&self, flag: ReactiveFlag) -> bool {
        match flag {
            ReactiveFlag::IsReactive => self.kind == ProxyKind::Mutable,
            ReactiveFlag::IsReadonly => self.kind != ProxyKind::Mutable,
        }
    }

    pub fn get(&self, key: impl Into<PropKey>) -> Value {
        let key = self.target.normalize_key(key.into());
        let raw = self.target.get_raw(&key);
        if self.kind == ProxyKind::Mutable {
            track(self.target.id(), &key);
        }
        match self.kind {
            ProxyKind::ShallowReadonly => raw,
            kind => wrap_nested(raw, kind),
        }
    }

    pub fn has(&self, key: impl Into<PropKey>) -> bool {
        let key = self.target.normalize_key(key.into());
        if self.kind == ProxyKind::Mutable {
            track(self.target.id(), &key);
        }
        self.target.has_raw(&key)
    }

    /// Write through and trigger. Readonly wrappers log and drop the write.
    pub fn set(&self, key: impl Into<PropKey>, value: impl Into<Value>) {
        let key = self.target.normalize_key(key.into());
        if self.kind != ProxyKind::Mutable {
            tracing::warn!(key = %key, "cannot set key: target is readonly");
            return;
        }
        let grows = matches!((&self.target, &key), (Target::Array(a), PropKey::Index(i)) if *i >= a.len());
        self.target.set_raw(&key, to_raw(&value.into()));
        trigger(self.target.id(), &key);
        if grows {
            trigger(self.target.id(), &PropKey::length());
        }
    }

    pub fn len(&self) -> usize {
        if self.kind == ProxyKind::Mutable {
            track(self.target.id(), &PropKey::length());
        }
        self.target.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append to an array target. Returns the new index, or `None` when the
    /// wrapper is readonly or wraps an object.
    pub fn push(&self, value: impl Into<Value>) -> Option<usize> {
        if self.kind != ProxyKind::Mutable {
            tracing::warn!("cannot push: target is readonly");
            return None;
        }
        let Target::Array(array) = &self.target else {
            tracing::warn!("cannot push: target is not an array");
            return None;
        };
        let index = array.push(to_raw(&value.into()));
        trigger(array.id(), &PropKey::Index(index));
        trigger(array.id(), &PropKey::length());
        Some(index)
    }

    /// Same kind over the same target.
    pub fn same(&self, other: &Reactive) -> bool {
        self.kind == other.kind && self.target.id() == other.target.id()
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("kind", &self.kind)
            .field("target", &self.target.id())
            .finish()
    }
}

fn wrap_nested(value: Value, kind: ProxyKind) -> Value {
    match Target::from_value(&value) {
        Some(target) => Value::Reactive(Reactive::new(target, kind)),
        None => value,
    }
}

// =============================================================================
// Constructors & Predicates
// =============================================================================

/// Mutable wrapper: tracks reads, triggers writes, wraps nested containers.
pub fn reactive(target: impl Into<Target>) -> Reactive {
    Reactive::new(target.into(), ProxyKind::Mutable)
}

/// Readonly wrapper: never tracks, wraps nested containers readonly.
pub fn readonly(target: impl Into<Target>) -> Reactive {
    Reactive::new(target.into(), ProxyKind::Readonly)
}

/// Readonly at the top level only; nested values come back raw.
pub fn shallow_readonly(target: impl Into<Target>) -> Reactive {
    Reactive::new(target.into(), ProxyKind::ShallowReadonly)
}

/// Wrap a value if it is a container; return primitives unchanged.
pub fn reactive_value(value: &Value) -> Value {
    wrap_nested(value.clone(), ProxyKind::Mutable)
}

pub fn readonly_value(value: &Value) -> Value {
    wrap_nested(value.clone(), ProxyKind::Readonly)
}

pub fn shallow_readonly_value(value: &Value) -> Value {
    wrap_nested(value.clone(), ProxyKind::ShallowReadonly)
}

pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Reactive(r) if r.query(ReactiveFlag::IsReactive))
}

pub fn is_readonly(value: &Value) -> bool {
    matches!(value, Value::Reactive(r) if r.query(ReactiveFlag::IsReadonly))
}

pub fn is_proxy(value: &Value) -> bool {
    is_reactive(value) || is_readonly(value)
}

/// The raw container behind a wrapper; other values are returned as-is.
pub fn to_raw(value: &Value) -> Value {
    match value {
        Value::Reactive(r) => r.target.to_value(),
        other => other.clone(),
    }
}
