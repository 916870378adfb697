//! Effects - tracked computations and their dependency sets.
//!
//! An effect runs a closure while registered as the active effect. Every
//! reactive read during that run records the effect in the read's [`Dep`];
//! every write re-runs (or schedules) the recorded effects.
//!
//! Active effects form a per-thread stack. Nested runs (a component mounting a
//! child component inside its own render effect) push and pop around the
//! inner run, so the outer effect keeps tracking once the inner one returns.
//!
//! # Example
//!
//! ```ignore
//! use spark_runtime::{effect, ref_value, stop};
//!
//! let count = ref_value(0);
//! let c = count.clone();
//! let runner = effect(move || println!("count = {}", c.get()));
//!
//! count.set(1);  // prints "count = 1"
//! stop(&runner);
//! count.set(2);  // prints nothing
//! runner.run();  // prints "count = 2", without tracking
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

// =============================================================================
// Effect State
// =============================================================================

thread_local! {
    /// Stack of running effects. The last entry is the active effect.
    static EFFECT_STACK: RefCell<Vec<Rc<EffectCore>>> = const { RefCell::new(Vec::new()) };

    /// Whether reads should currently be tracked.
    static SHOULD_TRACK: Cell<bool> = const { Cell::new(true) };

    /// Saved `SHOULD_TRACK` values for pause/enable scopes.
    static TRACK_STACK: RefCell<Vec<bool>> = const { RefCell::new(Vec::new()) };

    static NEXT_EFFECT_ID: Cell<u64> = const { Cell::new(1) };
}

/// Identity of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(u64);

impl EffectId {
    fn next() -> Self {
        NEXT_EFFECT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            EffectId(id)
        })
    }
}

// =============================================================================
// Dependency Set
// =============================================================================

/// Set of effects depending on one reactive slot, in insertion order.
#[derive(Clone, Default)]
pub(crate) struct Dep(Rc<RefCell<Vec<Rc<EffectCore>>>>);

impl Dep {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn contains(&self, id: EffectId) -> bool {
        self.0.borrow().iter().any(|effect| effect.id == id)
    }

    fn remove(&self, id: EffectId) {
        self.0.borrow_mut().retain(|effect| effect.id != id);
    }

    pub(crate) fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Register the active effect, if tracking is enabled.
    pub(crate) fn track(&self) {
        if !is_tracking() {
            return;
        }
        let Some(effect) = active_effect() else { return };
        if self.contains(effect.id) {
            return;
        }
        self.0.borrow_mut().push(effect.clone());
        effect.deps.borrow_mut().push(self.clone());
    }

    /// Notify every dependent. The set is snapshotted first, since running an
    /// effect re-tracks into the same set.
    pub(crate) fn trigger(&self) {
        let effects: Vec<Rc<EffectCore>> = self.0.borrow().clone();
        let running = active_effect().map(|effect| effect.id);
        for effect in effects {
            // An effect writing what it reads does not re-enter itself.
            if Some(effect.id) == running {
                continue;
            }
            effect.notify();
        }
    }
}

// =============================================================================
// Effect Core
// =============================================================================

/// Scheduler callback invoked instead of re-running the effect.
pub type EffectScheduler = Rc<dyn Fn()>;

pub(crate) struct EffectCore {
    id: EffectId,
    f: Box<dyn Fn()>,
    active: Cell<bool>,
    scheduler: Option<EffectScheduler>,
    on_stop: RefCell<Option<Box<dyn FnOnce()>>>,
    deps: RefCell<Vec<Dep>>,
}

impl EffectCore {
    pub(crate) fn new(
        f: impl Fn() + 'static,
        scheduler: Option<EffectScheduler>,
        on_stop: Option<Box<dyn FnOnce()>>,
    ) -> Rc<Self> {
        Rc::new(Self {
            id: EffectId::next(),
            f: Box::new(f),
            active: Cell::new(true),
            scheduler,
            on_stop: RefCell::new(on_stop),
            deps: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn run(self: &Rc<Self>) {
        self.run_with(|| (self.f)());
    }

    /// Run `f` as this effect: dependencies read inside it are re-collected
    /// for this effect. A stopped effect runs `f` untracked.
    pub(crate) fn run_with<R>(self: &Rc<Self>, f: impl FnOnce() -> R) -> R {
        if !self.active.get() {
            let _paused = TrackingScope::paused();
            return f();
        }

        self.cleanup();
        let _active = ActiveEffectScope::enter(self.clone());
        let _tracking = TrackingScope::enabled();
        f()
    }

    pub(crate) fn stop(&self) {
        if !self.active.get() {
            return;
        }
        if let Some(on_stop) = self.on_stop.borrow_mut().take() {
            on_stop();
        }
        self.cleanup();
        self.active.set(false);
    }

    fn notify(self: &Rc<Self>) {
        match &self.scheduler {
            Some(scheduler) => scheduler(),
            None => self.run(),
        }
    }

    /// Remove this effect from every dependency set it belongs to.
    fn cleanup(&self) {
        let deps: Vec<Dep> = self.deps.borrow_mut().drain(..).collect();
        for dep in deps {
            dep.remove(self.id);
        }
    }

    pub(crate) fn id(&self) -> EffectId {
        self.id
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.get()
    }

    pub(crate) fn dep_count(&self) -> usize {
        self.deps.borrow().len()
    }
}

// =============================================================================
// Scopes
// =============================================================================

/// Pushes an effect onto the active stack for its lifetime.
struct ActiveEffectScope;

impl ActiveEffectScope {
    fn enter(effect: Rc<EffectCore>) -> Self {
        EFFECT_STACK.with(|stack| stack.borrow_mut().push(effect));
        ActiveEffectScope
    }
}

impl Drop for ActiveEffectScope {
    fn drop(&mut self) {
        EFFECT_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Overrides whether reads are tracked, restoring the previous state on drop.
pub(crate) struct TrackingScope;

impl TrackingScope {
    pub(crate) fn paused() -> Self {
        push_tracking(false);
        TrackingScope
    }

    pub(crate) fn enabled() -> Self {
        push_tracking(true);
        TrackingScope
    }
}

impl Drop for TrackingScope {
    fn drop(&mut self) {
        reset_tracking();
    }
}

fn push_tracking(should_track: bool) {
    let previous = SHOULD_TRACK.with(|flag| flag.replace(should_track));
    TRACK_STACK.with(|stack| stack.borrow_mut().push(previous));
}

/// Suspend dependency tracking until the matching [`reset_tracking`].
pub fn pause_tracking() {
    push_tracking(false);
}

/// Re-enable dependency tracking until the matching [`reset_tracking`].
pub fn enable_tracking() {
    push_tracking(true);
}

/// Restore the tracking state saved by the last pause/enable.
pub fn reset_tracking() {
    let previous = TRACK_STACK.with(|stack| stack.borrow_mut().pop());
    SHOULD_TRACK.with(|flag| flag.set(previous.unwrap_or(true)));
}

fn active_effect() -> Option<Rc<EffectCore>> {
    EFFECT_STACK.with(|stack| stack.borrow().last().cloned())
}

/// True when a read right now would register a dependency.
pub fn is_tracking() -> bool {
    SHOULD_TRACK.with(|flag| flag.get()) && EFFECT_STACK.with(|stack| !stack.borrow().is_empty())
}

// =============================================================================
// Public API
// =============================================================================

/// Options for [`effect_with`].
#[derive(Default)]
pub struct EffectOptions {
    /// Called on trigger instead of re-running the effect.
    pub scheduler: Option<EffectScheduler>,
    /// Called once when the effect is stopped.
    pub on_stop: Option<Box<dyn FnOnce()>>,
}

/// Handle to a running effect. Cloning shares the same effect.
#[derive(Clone)]
pub struct EffectRunner {
    core: Rc<EffectCore>,
}

impl EffectRunner {
    /// Run the effect now. A stopped effect still runs, untracked.
    pub fn run(&self) {
        self.core.run();
    }

    pub fn stop(&self) {
        self.core.stop();
    }

    pub fn is_active(&self) -> bool {
        self.core.is_active()
    }

    pub fn id(&self) -> EffectId {
        self.core.id()
    }

    /// Number of dependency sets this effect currently belongs to.
    pub fn dependency_count(&self) -> usize {
        self.core.dep_count()
    }
}

impl fmt::Debug for EffectRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectRunner")
            .field("id", &self.core.id())
            .field("active", &self.core.is_active())
            .finish()
    }
}

/// Create an effect and run it once.
pub fn effect(f: impl Fn() + 'static) -> EffectRunner {
    effect_with(f, EffectOptions::default())
}

/// Create an effect with a scheduler and/or stop callback and run it once.
pub fn effect_with(f: impl Fn() + 'static, options: EffectOptions) -> EffectRunner {
    let core = EffectCore::new(f, options.scheduler, options.on_stop);
    core.run();
    EffectRunner { core }
}

/// Stop an effect: it leaves every dependency set and no longer re-runs.
pub fn stop(runner: &EffectRunner) {
    runner.stop();
}
