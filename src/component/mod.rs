//! Components - definitions, instances and everything setup sees.
//!
//! A [`Component`] is an immutable definition built once and shared by every
//! vnode that renders it. Mounting a component vnode creates a
//! [`ComponentInstance`]; the renderer owns instances in an arena and vnodes
//! refer to them by [`InstanceId`].
//!
//! # Example
//!
//! ```ignore
//! use spark_runtime::{h, ref_value, Component, Object};
//!
//! let counter = Component::build("Counter")
//!     .setup(|_props, _ctx| Object::new().with("count", ref_value(0)))
//!     .render(|ctx| h("p", None, ctx.get("count").to_string()))
//!     .finish();
//! ```

mod context;
mod emit;
mod instance;
mod public;
mod slots;

pub use context::{current_instance, inject, inject_or, inject_or_else, provide, SetupContext};
pub use emit::{camelize, capitalize, to_handler_key};
pub use instance::{ComponentInstance, InstanceId};
pub use public::{PublicInstance, PublicProperty};
pub use slots::{render_slot, SlotFn, Slots};

pub(crate) use context::ProvideScope;
pub(crate) use instance::setup_component;

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use crate::compiler::runtime_compiler;
use crate::error::{Result, RuntimeError};
use crate::reactivity::Reactive;
use crate::types::Object;
use crate::vnode::VNode;

/// Setup function: receives shallow-readonly props and the setup context,
/// returns the setup state.
pub type SetupFn = Rc<dyn Fn(&Reactive, &SetupContext) -> Object>;

/// Render function: builds the component's subtree from its public instance.
pub type RenderFn = Rc<dyn Fn(&PublicInstance) -> VNode>;

struct ComponentDef {
    name: Rc<str>,
    setup: Option<SetupFn>,
    render: Option<RenderFn>,
    template: Option<Rc<str>>,
    compiled: OnceCell<RenderFn>,
}

/// Shared component definition.
#[derive(Clone)]
pub struct Component(Rc<ComponentDef>);

impl Component {
    pub fn build(name: &str) -> ComponentBuilder {
        ComponentBuilder {
            name: Rc::from(name),
            setup: None,
            render: None,
            template: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn setup_fn(&self) -> Option<SetupFn> {
        self.0.setup.clone()
    }

    pub fn template(&self) -> Option<&str> {
        self.0.template.as_deref()
    }

    /// The render function, compiling the template on first use.
    ///
    /// An explicit render function wins over a template. The compiled result
    /// is cached on the definition, so every instance shares it.
    pub(crate) fn resolve_render(&self) -> Result<RenderFn> {
        if let Some(render) = &self.0.render {
            return Ok(render.clone());
        }
        if let Some(render) = self.0.compiled.get() {
            return Ok(render.clone());
        }
        let Some(template) = &self.0.template else {
            return Err(RuntimeError::MissingRender {
                component: self.name().to_string(),
            });
        };
        let Some(compiler) = runtime_compiler() else {
            return Err(RuntimeError::CompilerNotRegistered {
                component: self.name().to_string(),
            });
        };
        let render = compiler.compile(template)?;
        tracing::debug!(component = self.name(), "compiled template");
        Ok(self.0.compiled.get_or_init(|| render).clone())
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.0.name)
            .field("setup", &self.0.setup.is_some())
            .field("render", &self.0.render.is_some())
            .field("template", &self.0.template)
            .finish()
    }
}

/// Builder for [`Component`].
pub struct ComponentBuilder {
    name: Rc<str>,
    setup: Option<SetupFn>,
    render: Option<RenderFn>,
    template: Option<Rc<str>>,
}

impl ComponentBuilder {
    pub fn setup(mut self, f: impl Fn(&Reactive, &SetupContext) -> Object + 'static) -> Self {
        self.setup = Some(Rc::new(f));
        self
    }

    pub fn render(mut self, f: impl Fn(&PublicInstance) -> VNode + 'static) -> Self {
        self.render = Some(Rc::new(f));
        self
    }

    /// Template source, compiled by the registered runtime compiler when the
    /// component has no render function.
    pub fn template(mut self, source: &str) -> Self {
        self.template = Some(Rc::from(source));
        self
    }

    pub fn finish(self) -> Component {
        Component(Rc::new(ComponentDef {
            name: self.name,
            setup: self.setup,
            render: self.render,
            template: self.template,
            compiled: OnceCell::new(),
        }))
    }
}
