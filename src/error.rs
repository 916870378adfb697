//! Runtime errors.
//!
//! Readonly violations are not errors: they are logged with `tracing::warn!`
//! and the write is dropped. Everything else that can go wrong while mounting
//! or updating a tree is a [`RuntimeError`].

use thiserror::Error;

use crate::component::InstanceId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Structural template error reported by a template compiler.
    #[error("template error: element <{tag}> is missing its closing tag")]
    Template { tag: String },

    /// The component has neither a render function nor a template.
    #[error("component `{component}` has no render function and no template")]
    MissingRender { component: String },

    /// The component has a template but no compiler is registered.
    #[error("component `{component}` has a template but no runtime compiler is registered")]
    CompilerNotRegistered { component: String },

    #[error("component instance {0:?} is not mounted in this renderer")]
    InstanceNotFound(InstanceId),

    #[error("vnode `{0}` has no host node")]
    HostNodeMissing(String),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
