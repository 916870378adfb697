//! Component instances and setup.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::context::{CurrentInstanceScope, ProvideScope, SetupContext};
use super::slots::Slots;
use super::{Component, RenderFn};
use crate::error::{Result, RuntimeError};
use crate::reactivity::{proxy_refs, shallow_readonly, EffectRunner, ProxyRefs, TrackingScope};
use crate::renderer::NodeId;
use crate::types::Object;
use crate::vnode::VNode;

thread_local! {
    static NEXT_INSTANCE_ID: Cell<u64> = const { Cell::new(1) };
}

/// Stable id of a mounted component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    fn next() -> Self {
        NEXT_INSTANCE_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            InstanceId(id)
        })
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Runtime record of one mounted component.
///
/// Fields are interior-mutable because the renderer and the render effect
/// update them through a shared handle. No borrow is held across user code.
pub struct ComponentInstance {
    id: InstanceId,
    component: Component,
    parent: Option<InstanceId>,
    vnode: RefCell<VNode>,
    /// Vnode from a parent re-render, and the host node it sits before.
    next: RefCell<Option<(VNode, Option<NodeId>)>>,
    props: RefCell<Object>,
    setup_state: RefCell<ProxyRefs>,
    slots: RefCell<Slots>,
    provides: Rc<ProvideScope>,
    is_mounted: Cell<bool>,
    sub_tree: RefCell<Option<VNode>>,
    update: RefCell<Option<EffectRunner>>,
    render: RefCell<Option<RenderFn>>,
    render_error: RefCell<Option<RuntimeError>>,
}

impl ComponentInstance {
    /// Create an instance for a component vnode. Its provide scope chains to
    /// `parent_scope`.
    pub(crate) fn new(
        vnode: &VNode,
        component: Component,
        parent: Option<InstanceId>,
        parent_scope: &Rc<ProvideScope>,
    ) -> Rc<Self> {
        Rc::new(Self {
            id: InstanceId::next(),
            component,
            parent,
            vnode: RefCell::new(vnode.clone()),
            next: RefCell::new(None),
            props: RefCell::new(Object::new()),
            setup_state: RefCell::new(proxy_refs(Object::new())),
            slots: RefCell::new(Slots::default()),
            provides: ProvideScope::child(parent_scope),
            is_mounted: Cell::new(false),
            sub_tree: RefCell::new(None),
            update: RefCell::new(None),
            render: RefCell::new(None),
            render_error: RefCell::new(None),
        })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn component(&self) -> &Component {
        &self.component
    }

    pub fn parent(&self) -> Option<InstanceId> {
        self.parent
    }

    pub fn vnode(&self) -> VNode {
        self.vnode.borrow().clone()
    }

    pub(crate) fn set_vnode(&self, vnode: VNode) {
        *self.vnode.borrow_mut() = vnode;
    }

    pub(crate) fn set_next(&self, next: VNode, anchor: Option<NodeId>) {
        *self.next.borrow_mut() = Some((next, anchor));
    }

    pub(crate) fn take_next(&self) -> Option<(VNode, Option<NodeId>)> {
        self.next.borrow_mut().take()
    }

    pub fn props(&self) -> Object {
        self.props.borrow().clone()
    }

    pub fn setup_state(&self) -> ProxyRefs {
        self.setup_state.borrow().clone()
    }

    pub fn slots(&self) -> Slots {
        self.slots.borrow().clone()
    }

    pub(crate) fn provides(&self) -> &Rc<ProvideScope> {
        &self.provides
    }

    pub fn is_mounted(&self) -> bool {
        self.is_mounted.get()
    }

    pub(crate) fn set_mounted(&self, mounted: bool) {
        self.is_mounted.set(mounted);
    }

    pub fn sub_tree(&self) -> Option<VNode> {
        self.sub_tree.borrow().clone()
    }

    pub(crate) fn replace_sub_tree(&self, sub_tree: Option<VNode>) -> Option<VNode> {
        std::mem::replace(&mut *self.sub_tree.borrow_mut(), sub_tree)
    }

    /// The render effect runner, once the component has been mounted.
    pub fn update(&self) -> Option<EffectRunner> {
        self.update.borrow().clone()
    }

    pub(crate) fn set_update(&self, runner: EffectRunner) {
        *self.update.borrow_mut() = Some(runner);
    }

    pub(crate) fn render_fn(&self) -> Result<RenderFn> {
        match &*self.render.borrow() {
            Some(render) => Ok(render.clone()),
            None => Err(RuntimeError::MissingRender {
                component: self.component.name().to_string(),
            }),
        }
    }

    pub(crate) fn set_render_error(&self, error: RuntimeError) {
        *self.render_error.borrow_mut() = Some(error);
    }

    pub(crate) fn take_render_error(&self) -> Option<RuntimeError> {
        self.render_error.borrow_mut().take()
    }

    /// Adopt the props and slots of `vnode`, the instance's new vnode. The
    /// `key` prop identifies the vnode and is not passed on.
    pub(crate) fn update_from_vnode(&self, vnode: &VNode) {
        let props = Object::new();
        for (key, value) in vnode.props().entries() {
            if &*key != "key" {
                props.insert(&key, value);
            }
        }
        *self.props.borrow_mut() = props;
        *self.slots.borrow_mut() = Slots::from_vnode(vnode);
        self.set_vnode(vnode.clone());
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("id", &self.id)
            .field("component", &self.component.name())
            .field("parent", &self.parent)
            .field("is_mounted", &self.is_mounted.get())
            .finish()
    }
}

/// Initialize props and slots, run setup, and resolve the render function.
///
/// Setup runs with tracking paused and the instance marked current, and gets
/// the props behind a shallow-readonly view.
pub(crate) fn setup_component(instance: &Rc<ComponentInstance>) -> Result<()> {
    let vnode = instance.vnode();
    instance.update_from_vnode(&vnode);

    if let Some(setup) = instance.component.setup_fn() {
        let props = shallow_readonly(instance.props());
        let ctx = SetupContext::new(instance);
        let state = {
            let _current = CurrentInstanceScope::enter(instance);
            let _untracked = TrackingScope::paused();
            setup(&props, &ctx)
        };
        *instance.setup_state.borrow_mut() = proxy_refs(state);
    }

    let render = instance.component.resolve_render()?;
    *instance.render.borrow_mut() = Some(render);
    tracing::debug!(
        component = instance.component.name(),
        instance = instance.id.0,
        "component set up"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::current_instance;
    use crate::reactivity::{is_readonly, ref_value};
    use crate::types::Value;
    use crate::vnode::h;

    fn instance_for(component: &Component, props: Object) -> Rc<ComponentInstance> {
        let vnode = h(component, props, ());
        ComponentInstance::new(&vnode, component.clone(), None, &ProvideScope::root())
    }

    #[test]
    fn test_setup_state_unwraps_refs() {
        let comp = Component::build("Counter")
            .setup(|_, _| Object::new().with("count", ref_value(3)))
            .render(|_| h("div", None, ()))
            .finish();
        let instance = instance_for(&comp, Object::new());

        assert!(setup_component(&instance).is_ok());
        assert_eq!(instance.setup_state().get("count"), Value::Int(3));
    }

    #[test]
    fn test_setup_sees_readonly_props_and_current_instance() {
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        let comp = Component::build("Child")
            .setup(move |props, ctx| {
                *s.borrow_mut() = Some((
                    props.get("count"),
                    is_readonly(&Value::from(props.clone())),
                    current_instance() == Some(ctx.instance()),
                ));
                Object::new()
            })
            .render(|_| h("div", None, ()))
            .finish();
        let instance = instance_for(&comp, Object::new().with("count", 1));

        assert!(setup_component(&instance).is_ok());
        assert_eq!(*seen.borrow(), Some((Value::Int(1), true, true)));
        assert_eq!(current_instance(), None);
    }

    #[test]
    fn test_missing_render_is_an_error() {
        let comp = Component::build("Empty").finish();
        let instance = instance_for(&comp, Object::new());
        assert_eq!(
            setup_component(&instance),
            Err(RuntimeError::MissingRender {
                component: "Empty".to_string()
            })
        );
    }

    #[test]
    fn test_template_without_compiler() {
        let comp = Component::build("Tpl").template("<div></div>").finish();
        let instance = instance_for(&comp, Object::new());
        assert!(matches!(
            setup_component(&instance),
            Err(RuntimeError::CompilerNotRegistered { .. })
        ));
    }

    #[test]
    fn test_key_is_not_passed_as_a_prop() {
        let comp = Component::build("Item").render(|_| h("li", None, ())).finish();
        let instance = instance_for(&comp, Object::new().with("key", "a").with("label", "x"));

        assert!(setup_component(&instance).is_ok());
        assert!(!instance.props().contains_key("key"));
        assert_eq!(instance.props().get("label"), Value::from("x"));
        assert!(instance.vnode().key().is_some(), "the vnode keeps its key");
    }
}
