//! Dependency graph - target -> key -> dependency set.
//!
//! Entries are created lazily on the first tracked read and are never pruned;
//! effects leave the sets on cleanup and on `stop()`, but the (empty) sets
//! stay in place.

use std::cell::RefCell;
use std::collections::HashMap;

use super::effect::{is_tracking, Dep};
use crate::types::{PropKey, TargetId};

thread_local! {
    static TARGET_MAP: RefCell<HashMap<TargetId, HashMap<PropKey, Dep>>> = RefCell::new(HashMap::new());
}

/// Register the active effect as a dependent of `(target, key)`.
///
/// No-op when no effect is running or tracking is paused.
pub fn track(target: TargetId, key: &PropKey) {
    if !is_tracking() {
        return;
    }
    let dep = TARGET_MAP.with(|map| {
        map.borrow_mut()
            .entry(target)
            .or_default()
            .entry(key.clone())
            .or_default()
            .clone()
    });
    dep.track();
}

/// Notify every effect depending on `(target, key)`.
pub fn trigger(target: TargetId, key: &PropKey) {
    let dep = TARGET_MAP.with(|map| {
        map.borrow()
            .get(&target)
            .and_then(|keys| keys.get(key))
            .cloned()
    });
    if let Some(dep) = dep {
        dep.trigger();
    }
}

/// Number of effects currently depending on `(target, key)`.
pub fn dependent_count(target: TargetId, key: &PropKey) -> usize {
    TARGET_MAP.with(|map| {
        map.borrow()
            .get(&target)
            .and_then(|keys| keys.get(key))
            .map(Dep::len)
            .unwrap_or(0)
    })
}
