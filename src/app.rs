//! App - a root component bound to a renderer.
//!
//! # Example
//!
//! ```ignore
//! use spark_runtime::{create_renderer, MemoryHost};
//!
//! let renderer = create_renderer(MemoryHost::new());
//! let root = renderer.with_host_mut(|host| host.create_root("div"));
//!
//! let app = renderer.create_app(counter);
//! app.provide("theme", "dark");
//! app.mount(root)?;
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::component::{Component, ProvideScope};
use crate::error::{Result, RuntimeError};
use crate::renderer::{HostAdapter, NodeId, Renderer};
use crate::types::{Object, Value};
use crate::vnode::h;

pub type ErrorHandler = Rc<dyn Fn(&RuntimeError)>;

/// Renderer-wide settings.
#[derive(Clone, Default)]
pub struct AppConfig {
    /// Receives errors from updates run by the scheduler. Without one they
    /// are logged.
    pub error_handler: Option<ErrorHandler>,
    /// Warn when a reordered list contains children without keys.
    pub warn_on_missing_key: bool,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("error_handler", &self.error_handler.is_some())
            .field("warn_on_missing_key", &self.warn_on_missing_key)
            .finish()
    }
}

/// Root component plus app-level provides.
pub struct App<H: HostAdapter + 'static> {
    renderer: Renderer<H>,
    root: Component,
    root_props: RefCell<Option<Object>>,
    provides: Rc<ProvideScope>,
    container: Cell<Option<NodeId>>,
}

impl<H: HostAdapter + 'static> App<H> {
    pub(crate) fn new(renderer: Renderer<H>, root: Component) -> Self {
        Self {
            renderer,
            root,
            root_props: RefCell::new(None),
            provides: ProvideScope::root(),
            container: Cell::new(None),
        }
    }

    /// Props for the root component.
    pub fn with_props(self, props: Object) -> Self {
        *self.root_props.borrow_mut() = Some(props);
        self
    }

    /// Make `value` injectable under `key` by every component of this app.
    pub fn provide(&self, key: &str, value: impl Into<Value>) -> &Self {
        self.provides.provide(key, value.into());
        self
    }

    pub fn config_mut(&self, f: impl FnOnce(&mut AppConfig)) -> &Self {
        self.renderer.update_config(f);
        self
    }

    /// Render the root component into `container`.
    pub fn mount(&self, container: NodeId) -> Result<()> {
        if let Some(mounted) = self.container.get() {
            tracing::warn!(?mounted, "app is already mounted");
            return Ok(());
        }
        let props = self.root_props.borrow().clone();
        let vnode = h(&self.root, props, ());
        self.renderer.render_app(&vnode, container, self.provides.clone())?;
        self.container.set(Some(container));
        tracing::debug!(component = self.root.name(), ?container, "app mounted");
        Ok(())
    }

    /// Tear the app down. Does nothing when it is not mounted.
    pub fn unmount(&self) {
        if let Some(container) = self.container.take() {
            self.renderer.unmount(container);
            tracing::debug!(component = self.root.name(), ?container, "app unmounted");
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.container.get().is_some()
    }

    pub fn renderer(&self) -> &Renderer<H> {
        &self.renderer
    }

    pub fn root_component(&self) -> &Component {
        &self.root
    }
}

impl<H: HostAdapter + 'static> fmt::Debug for App<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root.name())
            .field("container", &self.container.get())
            .finish()
    }
}
