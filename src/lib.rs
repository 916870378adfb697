//! # spark-runtime
//!
//! Reactive UI runtime core: fine-grained reactivity, a batched update
//! scheduler, components, and a keyed virtual-tree reconciler that drives any
//! host tree through a small adapter trait.
//!
//! ## Architecture
//!
//! ```text
//! ref / reactive write ─► trigger ─► render effect scheduler ─► queue_job
//!                                                                  │
//!                                    microtask flush ◄─────────────┘
//!                                          │
//!                     render() ─► new vnode tree ─► patch(old, new) ─► HostAdapter
//! ```
//!
//! Everything is single-threaded and per thread: the dependency graph, the
//! effect stack, the job queue and the compiler registration all live in
//! `thread_local!` state.
//!
//! ## Modules
//!
//! - [`reactivity`] - effects, reactive wrappers, refs, computed values
//! - [`scheduler`] - microtasks, de-duplicated jobs, `next_tick`
//! - [`vnode`] - virtual nodes and `h`
//! - [`component`] - component definitions, instances, setup context
//! - [`renderer`] - host adapter, patch and keyed diff
//! - [`app`] - root component mounting and app config
//! - [`compiler`] - runtime template compiler hook

pub mod app;
pub mod compiler;
pub mod component;
pub mod error;
pub mod reactivity;
pub mod renderer;
pub mod scheduler;
pub mod types;
pub mod vnode;

pub use types::{has_changed, to_display_string, Array, Callback, Object, PropKey, TargetId, Value};

pub use error::{Result, RuntimeError};

pub use reactivity::{
    computed, effect, effect_with, is_proxy, is_reactive, is_readonly, is_ref, proxy_refs,
    reactive, readonly, ref_value, shallow_readonly, stop, to_raw, unref, Computed,
    EffectOptions, EffectRunner, ProxyRefs, Reactive, Ref,
};

pub use scheduler::{next_tick, next_tick_then, queue_job, run_microtasks, JobId, NextTick, SchedulerJob};

pub use vnode::{create_text_vnode, fragment, h, Children, RawSlots, VNode, VNodeKey, VNodeType};

pub use component::{
    current_instance, inject, inject_or, inject_or_else, provide, render_slot, Component,
    ComponentInstance, InstanceId, PublicInstance, SetupContext, Slots,
};

pub use renderer::{create_renderer, HostAdapter, HostOp, MemoryHost, NodeId, Renderer};

pub use app::{App, AppConfig};

pub use compiler::{register_runtime_compiler, TemplateCompiler};
