//! Core types - the dynamic value model shared by reactivity and rendering.
//!
//! Application state, props and setup results are all expressed as [`Value`]s.
//! Container values ([`Object`], [`Array`]) have shared identity: cloning a
//! handle clones the `Rc`, not the data, and equality between containers is
//! identity equality. Each container carries a [`TargetId`] so the dependency
//! graph can key on it without holding the container alive.
//!
//! # Example
//!
//! ```ignore
//! use spark_runtime::{Object, Value};
//!
//! let state = Object::new().with("count", 0).with("label", "clicks");
//! assert_eq!(state.get("count"), Value::Int(0));
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::reactivity::{Computed, Reactive, Ref};

// =============================================================================
// Target Identity
// =============================================================================

thread_local! {
    /// Counter for container identities. Never reused within a thread.
    static NEXT_TARGET_ID: Cell<u64> = const { Cell::new(1) };
}

/// Identity of a reactive target (an [`Object`] or [`Array`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    fn next() -> Self {
        NEXT_TARGET_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            TargetId(id)
        })
    }
}

// =============================================================================
// Property Keys
// =============================================================================

/// Key of a property on a reactive target: a named field or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropKey {
    Name(Rc<str>),
    Index(usize),
}

impl PropKey {
    /// Key used to track array length reads.
    pub fn length() -> Self {
        PropKey::Name(Rc::from("length"))
    }
}

impl From<&str> for PropKey {
    fn from(name: &str) -> Self {
        PropKey::Name(Rc::from(name))
    }
}

impl From<String> for PropKey {
    fn from(name: String) -> Self {
        PropKey::Name(Rc::from(name))
    }
}

impl From<Rc<str>> for PropKey {
    fn from(name: Rc<str>) -> Self {
        PropKey::Name(name)
    }
}

impl From<usize> for PropKey {
    fn from(index: usize) -> Self {
        PropKey::Index(index)
    }
}

impl fmt::Display for PropKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropKey::Name(name) => write!(f, "{name}"),
            PropKey::Index(index) => write!(f, "{index}"),
        }
    }
}

// =============================================================================
// Callback
// =============================================================================

/// A callable value (event handlers, emitted-event listeners).
///
/// Two callbacks are the same value only if they share the same allocation.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&[Value]) -> Value>);

impl Callback {
    pub fn new(f: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Callback(Rc::new(f))
    }

    /// Build a callback that ignores its return value.
    pub fn from_fn(f: impl Fn(&[Value]) + 'static) -> Self {
        Callback(Rc::new(move |args| {
            f(args);
            Value::Null
        }))
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }

    pub fn ptr_eq(&self, other: &Callback) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

// =============================================================================
// Object
// =============================================================================

struct ObjectInner {
    id: TargetId,
    fields: RefCell<IndexMap<Rc<str>, Value>>,
}

/// Insertion-ordered, string-keyed map with shared identity.
#[derive(Clone)]
pub struct Object(Rc<ObjectInner>);

impl Object {
    pub fn new() -> Self {
        Object(Rc::new(ObjectInner {
            id: TargetId::next(),
            fields: RefCell::new(IndexMap::new()),
        }))
    }

    /// Builder-style insert, for literal props and setup results.
    pub fn with(self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn id(&self) -> TargetId {
        self.0.id
    }

    /// Raw read. Does not track.
    pub fn get(&self, key: &str) -> Value {
        self.0.fields.borrow().get(key).cloned().unwrap_or(Value::Null)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.fields.borrow().contains_key(key)
    }

    /// Raw write. Does not trigger. Returns the previous value.
    pub fn insert(&self, key: &str, value: impl Into<Value>) -> Option<Value> {
        self.0.fields.borrow_mut().insert(Rc::from(key), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.fields.borrow_mut().shift_remove(key)
    }

    pub fn keys(&self) -> Vec<Rc<str>> {
        self.0.fields.borrow().keys().cloned().collect()
    }

    /// Snapshot of all entries in insertion order.
    pub fn entries(&self) -> Vec<(Rc<str>, Value)> {
        self.0
            .fields
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.fields.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.fields.borrow().is_empty()
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let object = Object::new();
        for (key, value) in iter {
            object.insert(key.as_ref(), value);
        }
        object
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.fields.borrow().iter()).finish()
    }
}

// =============================================================================
// Array
// =============================================================================

struct ArrayInner {
    id: TargetId,
    items: RefCell<Vec<Value>>,
}

/// Growable list with shared identity.
#[derive(Clone)]
pub struct Array(Rc<ArrayInner>);

impl Array {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Array(Rc::new(ArrayInner {
            id: TargetId::next(),
            items: RefCell::new(items),
        }))
    }

    pub fn id(&self) -> TargetId {
        self.0.id
    }

    pub fn get(&self, index: usize) -> Value {
        self.0.items.borrow().get(index).cloned().unwrap_or(Value::Null)
    }

    /// Raw write. Writing past the end pads with `Null`.
    pub fn set(&self, index: usize, value: impl Into<Value>) {
        let mut items = self.0.items.borrow_mut();
        if index >= items.len() {
            items.resize(index + 1, Value::Null);
        }
        items[index] = value.into();
    }

    pub fn push(&self, value: impl Into<Value>) -> usize {
        let mut items = self.0.items.borrow_mut();
        items.push(value.into());
        items.len() - 1
    }

    pub fn len(&self) -> usize {
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.borrow().is_empty()
    }

    pub fn to_vec(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.items.borrow().iter()).finish()
    }
}

// =============================================================================
// Value
// =============================================================================

/// A dynamically typed value.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Object(Object),
    Array(Array),
    Reactive(Reactive),
    Ref(Ref),
    Computed(Computed<Value>),
    Func(Callback),
}

impl Value {
    /// `Object.is`-style sameness.
    ///
    /// Numbers compare numerically across `Int`/`Float`, NaN is the same as
    /// NaN and `0.0` is not the same as `-0.0`. Containers, cells and
    /// callbacks compare by identity.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let (a, b) = (self.as_f64().unwrap_or(0.0), other.as_f64().unwrap_or(0.0));
                if a.is_nan() && b.is_nan() {
                    return true;
                }
                a.to_bits() == b.to_bits()
            }
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Reactive(a), Value::Reactive(b)) => a.same(b),
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            (Value::Computed(a), Value::Computed(b)) => a.ptr_eq(b),
            (Value::Func(a), Value::Func(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for values a reactive wrapper can wrap.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_) | Value::Reactive(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Value::Reactive(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_ref_cell(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_callback(&self) -> Option<&Callback> {
        match self {
            Value::Func(f) => Some(f),
            _ => None,
        }
    }
}

/// True when `new` is not the same value as `old`.
pub fn has_changed(old: &Value, new: &Value) -> bool {
    !old.same(new)
}

/// Render a value the way interpolations display it.
///
/// `Null` renders as the empty string; containers render as compact JSON-ish
/// text; refs and computeds render their current value.
pub fn to_display_string(value: &Value) -> String {
    value.to_string()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Object(o) => {
                write!(f, "{{")?;
                for (i, (key, value)) in o.entries().iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "\"{key}\":")?;
                    fmt_nested(f, value)?;
                }
                write!(f, "}}")
            }
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, value) in a.to_vec().iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    fmt_nested(f, value)?;
                }
                write!(f, "]")
            }
            Value::Reactive(r) => write!(f, "{}", r.target().to_value()),
            Value::Ref(r) => write!(f, "{}", r.get_untracked()),
            Value::Computed(c) => write!(f, "{}", c.get_untracked()),
            Value::Func(_) => write!(f, "[function]"),
        }
    }
}

fn fmt_nested(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Str(s) => write!(f, "\"{s}\""),
        Value::Null => write!(f, "null"),
        other => write!(f, "{other}"),
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::Str(s)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<Reactive> for Value {
    fn from(r: Reactive) -> Self {
        Value::Reactive(r)
    }
}

impl From<Ref> for Value {
    fn from(r: Ref) -> Self {
        Value::Ref(r)
    }
}

impl From<Computed<Value>> for Value {
    fn from(c: Computed<Value>) -> Self {
        Value::Computed(c)
    }
}

impl From<Callback> for Value {
    fn from(f: Callback) -> Self {
        Value::Func(f)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(Array::from_vec(items.into_iter().map(Into::into).collect()))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}
