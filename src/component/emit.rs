//! Component events.
//!
//! `emit("add-foo", args)` looks up the `onAddFoo` prop on the emitting
//! component's current props and calls it with `args`.

use crate::types::{Object, Value};

/// `add-foo` -> `addFoo`.
pub fn camelize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '-' {
            match chars.peek() {
                Some(next) if next.is_ascii_alphanumeric() => {
                    out.extend(next.to_uppercase());
                    chars.next();
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// First character uppercased.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Handler prop name for an event: `add-foo` -> `onAddFoo`.
pub fn to_handler_key(event: &str) -> String {
    format!("on{}", capitalize(&camelize(event)))
}

/// Call the handler for `event` found in `props`, if any.
///
/// Returns true when a handler was called.
pub(crate) fn emit(props: &Object, event: &str, args: &[Value]) -> bool {
    let key = to_handler_key(event);
    match props.get(&key) {
        Value::Func(handler) => {
            tracing::trace!(event, handler = %key, "emit");
            handler.call(args);
            true
        }
        Value::Null => false,
        other => {
            tracing::warn!(event, handler = %key, value = ?other, "event handler prop is not a function");
            false
        }
    }
}
