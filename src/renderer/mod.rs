//! Renderer - reconciles vnode trees into a host tree.
//!
//! # Architecture
//!
//! ```text
//! Renderer::render(vnode, container)
//!     └─► patch(old, new) ─┬─► text / element / fragment ─► HostAdapter ops
//!                          ├─► keyed children diff (LIS for minimal moves)
//!                          └─► component ─► setup ─► render effect ─► patch(subtree)
//! ```
//!
//! The renderer owns the host and an arena of component instances. Vnodes
//! point at their instance by id. Render effects hold only a weak handle to
//! the renderer, so dropping the last [`Renderer`] handle tears everything
//! down.

mod component;
mod host;
mod keyed;
mod memory;
mod patch;
mod sequence;

pub use host::{event_name, is_removal, HostAdapter, NodeId};
pub use memory::{HostOp, MemoryHost};
pub use sequence::longest_increasing_subsequence;

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::app::{App, AppConfig};
use crate::component::{Component, ComponentInstance, InstanceId, ProvideScope};
use crate::error::{Result, RuntimeError};
use crate::types::Value;
use crate::vnode::VNode;

// =============================================================================
// Renderer State
// =============================================================================

pub(crate) struct RendererInner<H> {
    host: RefCell<H>,
    instances: RefCell<HashMap<InstanceId, Rc<ComponentInstance>>>,
    /// Committed root vnode per container.
    roots: RefCell<HashMap<NodeId, VNode>>,
    /// Provide scopes for components mounted without a parent component.
    /// The innermost app mount is on top.
    app_scopes: RefCell<Vec<Rc<ProvideScope>>>,
    config: RefCell<AppConfig>,
}

impl<H: HostAdapter + 'static> RendererInner<H> {
    pub(crate) fn instance(&self, id: InstanceId) -> Option<Rc<ComponentInstance>> {
        self.instances.borrow().get(&id).cloned()
    }

    fn root_scope(&self) -> Rc<ProvideScope> {
        self.app_scopes
            .borrow()
            .last()
            .cloned()
            .unwrap_or_else(ProvideScope::root)
    }

    /// Hand an error from a scheduled update to the error handler.
    fn report_error(&self, error: &RuntimeError) {
        let handler = self.config.borrow().error_handler.clone();
        match handler {
            Some(handler) => handler(error),
            None => tracing::error!(%error, "error during scheduled update"),
        }
    }

    fn render_root(
        self: &Rc<Self>,
        vnode: &VNode,
        container: NodeId,
        scope: Option<Rc<ProvideScope>>,
    ) -> Result<()> {
        let old = self.roots.borrow().get(&container).cloned();
        let pushed = scope.is_some();
        if let Some(scope) = scope {
            self.app_scopes.borrow_mut().push(scope);
        }
        let result = self.patch(old.as_ref(), vnode, container, None, None);
        if pushed {
            self.app_scopes.borrow_mut().pop();
        }
        result?;
        self.roots.borrow_mut().insert(container, vnode.clone());
        Ok(())
    }
}

// =============================================================================
// Renderer Handle
// =============================================================================

/// Handle to a renderer bound to one host.
pub struct Renderer<H: HostAdapter + 'static> {
    inner: Rc<RendererInner<H>>,
}

impl<H: HostAdapter + 'static> Clone for Renderer<H> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Create a renderer that drives `host`.
pub fn create_renderer<H: HostAdapter + 'static>(host: H) -> Renderer<H> {
    Renderer {
        inner: Rc::new(RendererInner {
            host: RefCell::new(host),
            instances: RefCell::new(HashMap::new()),
            roots: RefCell::new(HashMap::new()),
            app_scopes: RefCell::new(Vec::new()),
            config: RefCell::new(AppConfig::default()),
        }),
    }
}

impl<H: HostAdapter + 'static> Renderer<H> {
    /// Create an app whose root component renders through this renderer.
    pub fn create_app(&self, root: Component) -> App<H> {
        App::new(self.clone(), root)
    }

    /// Render `vnode` into `container`, patching against whatever was
    /// rendered there before.
    pub fn render(&self, vnode: &VNode, container: NodeId) -> Result<()> {
        self.inner.render_root(vnode, container, None)
    }

    pub(crate) fn render_app(&self, vnode: &VNode, container: NodeId, scope: Rc<ProvideScope>) -> Result<()> {
        self.inner.render_root(vnode, container, Some(scope))
    }

    /// Unmount whatever was rendered into `container`.
    pub fn unmount(&self, container: NodeId) {
        let old = self.inner.roots.borrow_mut().remove(&container);
        if let Some(old) = old {
            self.inner.unmount(&old, true);
        }
    }

    /// The committed root vnode of `container`.
    pub fn root_vnode(&self, container: NodeId) -> Option<VNode> {
        self.inner.roots.borrow().get(&container).cloned()
    }

    pub fn instance(&self, id: InstanceId) -> Option<Rc<ComponentInstance>> {
        self.inner.instance(id)
    }

    /// Number of live component instances.
    pub fn instance_count(&self) -> usize {
        self.inner.instances.borrow().len()
    }

    pub fn with_host<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(&self.inner.host.borrow())
    }

    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.inner.host.borrow_mut())
    }

    pub fn config(&self) -> AppConfig {
        self.inner.config.borrow().clone()
    }

    pub(crate) fn update_config(&self, f: impl FnOnce(&mut AppConfig)) {
        f(&mut self.inner.config.borrow_mut());
    }
}

impl Renderer<MemoryHost> {
    /// Call the listener for `event` on `node`. Returns false when there is
    /// none.
    pub fn dispatch(&self, node: NodeId, event: &str, args: &[Value]) -> bool {
        let listener = self.inner.host.borrow().listener(node, event);
        match listener {
            Some(listener) => {
                listener.call(args);
                true
            }
            None => false,
        }
    }
}

impl<H: HostAdapter + 'static> fmt::Debug for Renderer<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("instances", &self.inner.instances.borrow().len())
            .field("roots", &self.inner.roots.borrow().len())
            .finish()
    }
}
