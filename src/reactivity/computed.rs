//! Computed values - lazily memoized derivations.
//!
//! The getter runs inside an effect whose scheduler only marks the value
//! dirty. Nothing recomputes until the next read, so the getter runs at most
//! once per invalidation window no matter how many writes or reads happen.
//!
//! A computed is also a dependency source of its own: effects that read it
//! are notified when it becomes dirty.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::effect::{Dep, EffectCore};

struct ComputedInner<T> {
    getter: Box<dyn Fn() -> T>,
    dirty: Cell<bool>,
    value: RefCell<Option<T>>,
    effect: Rc<EffectCore>,
    dep: Dep,
}

/// Memoized derived value.
pub struct Computed<T>(Rc<ComputedInner<T>>);

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Computed(self.0.clone())
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Current value, recomputing first if a dependency changed. Tracks.
    pub fn get(&self) -> T {
        self.0.dep.track();
        self.get_untracked()
    }

    /// Current value without registering a dependency on the computed.
    pub fn get_untracked(&self) -> T {
        if !self.0.dirty.get() {
            if let Some(value) = &*self.0.value.borrow() {
                return value.clone();
            }
        }
        self.0.dirty.set(false);
        let value = self.0.effect.run_with(|| (self.0.getter)());
        *self.0.value.borrow_mut() = Some(value.clone());
        value
    }

    pub fn is_dirty(&self) -> bool {
        self.0.dirty.get()
    }

    pub fn ptr_eq(&self, other: &Computed<T>) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("dirty", &self.0.dirty.get())
            .field("value", &*self.0.value.borrow())
            .finish()
    }
}

/// Create a computed value. It starts dirty; the getter first runs on the
/// first read.
pub fn computed<T: 'static>(getter: impl Fn() -> T + 'static) -> Computed<T> {
    let inner = Rc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
        let schedule_weak = weak.clone();
        // Recomputation goes through `run_with` on read; notifications only
        // reach the scheduler.
        let effect = EffectCore::new(
            || {},
            Some(Rc::new(move || {
                if let Some(inner) = schedule_weak.upgrade() {
                    if !inner.dirty.get() {
                        inner.dirty.set(true);
                        inner.dep.trigger();
                    }
                }
            })),
            None,
        );
        ComputedInner {
            getter: Box::new(getter),
            dirty: Cell::new(true),
            value: RefCell::new(None),
            effect,
            dep: Dep::new(),
        }
    });
    Computed(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactivity::{effect, reactive, ref_value};
    use crate::types::{Object, Value};

    #[test]
    fn test_computed_happy_path() {
        let user = reactive(Object::new().with("age", 1));
        let u = user.clone();
        let age = computed(move || u.get("age"));
        assert_eq!(age.get(), Value::Int(1));
    }

    #[test]
    fn test_computed_lazily() {
        let value = reactive(Object::new().with("foo", 1));
        let calls = Rc::new(Cell::new(0));

        let (v, c) = (value.clone(), calls.clone());
        let cvalue = computed(move || {
            c.set(c.get() + 1);
            v.get("foo")
        });

        // Lazy: nothing runs before the first read.
        assert_eq!(calls.get(), 0);
        assert!(cvalue.is_dirty());

        assert_eq!(cvalue.get(), Value::Int(1));
        assert_eq!(calls.get(), 1);

        // Memoized.
        cvalue.get();
        assert_eq!(calls.get(), 1);

        // Invalidated but not recomputed until read.
        value.set("foo", 2);
        assert_eq!(calls.get(), 1);
        value.set("foo", 3);
        assert_eq!(calls.get(), 1);

        assert_eq!(cvalue.get(), Value::Int(3));
        assert_eq!(calls.get(), 2);
        cvalue.get();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_effect_reading_computed_reruns() {
        let count = ref_value(1);
        let c = count.clone();
        let doubled = computed(move || c.get().as_i64().unwrap_or(0) * 2);

        let seen = Rc::new(Cell::new(0i64));
        let (d, s) = (doubled.clone(), seen.clone());
        let _runner = effect(move || s.set(d.get()));
        assert_eq!(seen.get(), 2);

        count.set(5);
        assert_eq!(seen.get(), 10);
    }

    #[test]
    fn test_chained_computed_recomputes_once_per_change() {
        let count = ref_value(1);
        let calls = Rc::new(Cell::new(0));

        let c = count.clone();
        let doubled = computed(move || c.get().as_i64().unwrap_or(0) * 2);
        let (d, n) = (doubled.clone(), calls.clone());
        let label = computed(move || {
            n.set(n.get() + 1);
            format!("x{}", d.get())
        });

        assert_eq!(label.get_untracked(), "x2");
        assert_eq!(label.get_untracked(), "x2");
        assert_eq!(calls.get(), 1);

        count.set(4);
        assert!(label.is_dirty());
        assert_eq!(label.get(), "x8");
        assert_eq!(calls.get(), 2);
        assert!(!doubled.is_dirty());
    }
}
