//! Component mounting, the render effect, and parent-driven updates.

use std::rc::Rc;

use super::host::{HostAdapter, NodeId};
use super::RendererInner;
use crate::component::{setup_component, Component, ComponentInstance, InstanceId, PublicInstance};
use crate::error::{Result, RuntimeError};
use crate::reactivity::{effect_with, EffectOptions, EffectRunner};
use crate::scheduler::{invalidate_job, queue_job, JobId, SchedulerJob};
use crate::types::has_changed;
use crate::vnode::{ShapeFlags, VNode, VNodeType};

/// Where a searched component sits within a subtree.
enum Following {
    Missing,
    /// Found, with nothing after it inside the subtree.
    Open,
    /// Found, and new host nodes go before this one (`None`: append).
    At(Option<NodeId>),
}

fn job_id(id: InstanceId) -> JobId {
    JobId(id.as_u64())
}

/// True when `next` must re-render the child: slot children, or props that
/// differ in any key, in either direction.
fn should_update_component(prev: &VNode, next: &VNode) -> bool {
    if prev.shape().contains(ShapeFlags::SLOT_CHILDREN) || next.shape().contains(ShapeFlags::SLOT_CHILDREN) {
        return true;
    }
    let (prev_props, next_props) = (prev.props(), next.props());
    if prev_props.ptr_eq(next_props) {
        return false;
    }
    if prev_props.len() != next_props.len() {
        return true;
    }
    next_props
        .entries()
        .iter()
        .any(|(key, value)| !prev_props.contains_key(key) || has_changed(&prev_props.get(key), value))
}

impl<H: HostAdapter + 'static> RendererInner<H> {
    pub(crate) fn mount_component(
        self: &Rc<Self>,
        component: &Component,
        vnode: &VNode,
        container: NodeId,
        parent: Option<&Rc<ComponentInstance>>,
        anchor: Option<NodeId>,
    ) -> Result<()> {
        let scope = match parent {
            Some(parent) => parent.provides().clone(),
            None => self.root_scope(),
        };
        let instance = ComponentInstance::new(vnode, component.clone(), parent.map(|p| p.id()), &scope);
        let id = instance.id();
        vnode.set_component(Some(id));
        self.instances.borrow_mut().insert(id, instance.clone());
        tracing::debug!(component = component.name(), instance = id.as_u64(), "mounting component");

        if let Err(error) = setup_component(&instance) {
            self.instances.borrow_mut().remove(&id);
            return Err(error);
        }
        self.setup_render_effect(&instance, container, anchor)
    }

    fn setup_render_effect(
        self: &Rc<Self>,
        instance: &Rc<ComponentInstance>,
        container: NodeId,
        anchor: Option<NodeId>,
    ) -> Result<()> {
        let id = instance.id();
        let renderer = Rc::downgrade(self);

        let job = {
            let renderer = renderer.clone();
            SchedulerJob::new(job_id(id), move || {
                if let Some(renderer) = renderer.upgrade() {
                    renderer.run_scheduled_update(id);
                }
            })
        };

        let runner = effect_with(
            move || {
                let Some(renderer) = renderer.upgrade() else {
                    return;
                };
                if let Err(error) = renderer.render_component(id, container, anchor) {
                    match renderer.instance(id) {
                        Some(instance) => instance.set_render_error(error),
                        None => tracing::error!(%error, "render failed for a discarded instance"),
                    }
                }
            },
            EffectOptions {
                scheduler: Some(Rc::new(move || queue_job(job.clone()))),
                on_stop: None,
            },
        );
        instance.set_update(runner.clone());

        match instance.take_render_error() {
            Some(error) => {
                self.discard_failed_mount(instance, &runner);
                Err(error)
            }
            None => Ok(()),
        }
    }

    /// Undo a mount whose first render failed. Nothing of the instance may
    /// react to later writes.
    fn discard_failed_mount(&self, instance: &Rc<ComponentInstance>, runner: &EffectRunner) {
        let id = instance.id();
        runner.stop();
        invalidate_job(job_id(id));
        if let Some(sub_tree) = instance.replace_sub_tree(None) {
            self.unmount(&sub_tree, true);
        }
        self.instances.borrow_mut().remove(&id);
        instance.vnode().set_component(None);
        tracing::debug!(component = instance.component().name(), instance = id.as_u64(), "discarded failed mount");
    }

    /// Body of the render effect.
    fn render_component(self: &Rc<Self>, id: InstanceId, container: NodeId, anchor: Option<NodeId>) -> Result<()> {
        let instance = self.instance(id).ok_or(RuntimeError::InstanceNotFound(id))?;
        let render = instance.render_fn()?;

        if !instance.is_mounted() {
            let sub_tree = render(&PublicInstance::new(instance.clone()));
            instance.replace_sub_tree(Some(sub_tree.clone()));
            self.patch(None, &sub_tree, container, Some(&instance), anchor)?;
            instance.vnode().set_el(self.first_host_node(&sub_tree));
            instance.set_mounted(true);
            tracing::debug!(component = instance.component().name(), instance = id.as_u64(), "component mounted");
            return Ok(());
        }

        // A parent re-render knows where this component sits now.
        let mut next_anchor = None;
        if let Some((next, anchor)) = instance.take_next() {
            next.set_el(instance.vnode().el());
            next.set_component(Some(id));
            instance.update_from_vnode(&next);
            next_anchor = Some(anchor);
        }

        let sub_tree = render(&PublicInstance::new(instance.clone()));
        let prev = instance.replace_sub_tree(Some(sub_tree.clone()));
        // The subtree may have moved since mount; patch where it is now. A
        // subtree without host nodes grows before its next sibling.
        let (container, anchor) = match prev.as_ref().and_then(|prev| self.host_position(prev)) {
            Some(position) => position,
            None => {
                let anchor = next_anchor
                    .or_else(|| self.anchor_after_instance(id))
                    .unwrap_or(anchor);
                (container, anchor)
            }
        };
        self.patch(prev.as_ref(), &sub_tree, container, Some(&instance), anchor)?;
        instance.vnode().set_el(self.first_host_node(&sub_tree));
        tracing::trace!(component = instance.component().name(), instance = id.as_u64(), "component updated");
        Ok(())
    }

    fn run_scheduled_update(&self, id: InstanceId) {
        let Some(instance) = self.instance(id) else {
            return;
        };
        if let Some(update) = instance.update() {
            update.run();
        }
        if let Some(error) = instance.take_render_error() {
            self.report_error(&error);
        }
    }

    /// Parent re-rendered with a new vnode for a mounted child.
    pub(crate) fn update_component(self: &Rc<Self>, n1: &VNode, n2: &VNode, anchor: Option<NodeId>) -> Result<()> {
        let id = n1
            .component()
            .ok_or_else(|| RuntimeError::HostNodeMissing(n1.describe()))?;
        n2.set_component(Some(id));
        let instance = self.instance(id).ok_or(RuntimeError::InstanceNotFound(id))?;

        if !should_update_component(n1, n2) {
            n2.set_el(n1.el());
            instance.set_vnode(n2.clone());
            return Ok(());
        }

        instance.set_next(n2.clone(), anchor);
        // The direct run below covers any update already queued for this
        // instance.
        invalidate_job(job_id(id));
        if let Some(update) = instance.update() {
            update.run();
        }
        match instance.take_render_error() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Position Lookup
    // =========================================================================

    /// Host node that follows instance `id` in its parent's tree, for a
    /// re-render whose previous subtree owned no host nodes. `Some(None)`
    /// means the end of the container.
    fn anchor_after_instance(&self, id: InstanceId) -> Option<Option<NodeId>> {
        let instance = self.instance(id)?;
        let Some(parent_id) = instance.parent() else {
            let roots: Vec<VNode> = self.roots.borrow().values().cloned().collect();
            return roots.iter().find_map(|root| match self.following(root, id) {
                Following::Missing => None,
                Following::Open => Some(None),
                Following::At(anchor) => Some(anchor),
            });
        };
        let sub_tree = self.instance(parent_id)?.sub_tree()?;
        match self.following(&sub_tree, id) {
            Following::Missing => None,
            Following::At(anchor) => Some(anchor),
            Following::Open => self.anchor_after_instance(parent_id),
        }
    }

    fn following(&self, vnode: &VNode, target: InstanceId) -> Following {
        match vnode.node_type() {
            VNodeType::Text => Following::Missing,
            VNodeType::Component(_) if vnode.component() == Some(target) => Following::Open,
            VNodeType::Component(_) => match vnode.component().and_then(|id| self.instance(id)) {
                Some(instance) => match instance.sub_tree() {
                    Some(sub_tree) => self.following(&sub_tree, target),
                    None => Following::Missing,
                },
                None => Following::Missing,
            },
            VNodeType::Fragment => self.following_in(vnode.children().as_array(), target),
            // Nothing after the target inside an element: append to it.
            VNodeType::Element(_) => match self.following_in(vnode.children().as_array(), target) {
                Following::Open => Following::At(None),
                found => found,
            },
        }
    }

    fn following_in(&self, children: &[VNode], target: InstanceId) -> Following {
        for (index, child) in children.iter().enumerate() {
            match self.following(child, target) {
                Following::Missing => continue,
                Following::Open => {
                    return match children[index + 1..].iter().find_map(|next| self.first_host_node(next)) {
                        Some(next) => Following::At(Some(next)),
                        None => Following::Open,
                    };
                }
                found => return found,
            }
        }
        Following::Missing
    }

    pub(crate) fn unmount_component(&self, vnode: &VNode, do_remove: bool) {
        let Some(id) = vnode.component() else {
            return;
        };
        let Some(instance) = self.instances.borrow_mut().remove(&id) else {
            return;
        };
        if let Some(update) = instance.update() {
            update.stop();
        }
        invalidate_job(job_id(id));
        if let Some(sub_tree) = instance.replace_sub_tree(None) {
            self.unmount(&sub_tree, do_remove);
        }
        instance.set_mounted(false);
        tracing::debug!(component = instance.component().name(), instance = id.as_u64(), "component unmounted");
    }
}
