//! Reactivity - effects, reactive wrappers, refs and computed values.
//!
//! # Architecture
//!
//! ```text
//! write ─► trigger(target, key) ─► Dep ─► effect.scheduler() | effect.run()
//!                                        ▲
//! read  ─► track(target, key) ───────────┘ (active effect joins the Dep)
//! ```
//!
//! All state is per thread. Nothing here is `Send`.

mod computed;
mod effect;
mod graph;
mod reactive;
mod refs;

pub use computed::{computed, Computed};
pub use effect::{
    effect, effect_with, enable_tracking, is_tracking, pause_tracking, reset_tracking, stop,
    EffectId, EffectOptions, EffectRunner, EffectScheduler,
};
pub(crate) use effect::TrackingScope;
pub use graph::{dependent_count, track, trigger};
pub use reactive::{
    is_proxy, is_reactive, is_readonly, reactive, reactive_value, readonly, readonly_value,
    shallow_readonly, shallow_readonly_value, to_raw, ProxyKind, Reactive, ReactiveFlag, Target,
};
pub use refs::{is_ref, proxy_refs, ref_value, unref, ProxyRefs, Ref};
