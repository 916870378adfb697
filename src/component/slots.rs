//! Normalized slots and `render_slot`.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::types::Object;
use crate::vnode::{fragment, Children, ShapeFlags, VNode};

/// Normalized slot function: slot props in, a list of vnodes out.
pub type SlotFn = Rc<dyn Fn(&Object) -> Vec<VNode>>;

/// A component instance's slots, keyed by name.
#[derive(Clone, Default)]
pub struct Slots(Rc<IndexMap<Rc<str>, SlotFn>>);

impl Slots {
    /// Normalize the slot children of a component vnode. Any other children
    /// give no slots.
    pub(crate) fn from_vnode(vnode: &VNode) -> Self {
        if !vnode.shape().contains(ShapeFlags::SLOT_CHILDREN) {
            return Self::default();
        }
        let Children::Slots(raw) = vnode.children() else {
            return Self::default();
        };
        let normalized = raw
            .iter()
            .map(|(name, f)| {
                let f = f.clone();
                let slot: SlotFn = Rc::new(move |props: &Object| f(props).into_vec());
                (name.clone(), slot)
            })
            .collect();
        Slots(Rc::new(normalized))
    }

    pub fn get(&self, name: &str) -> Option<SlotFn> {
        self.0.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> Vec<Rc<str>> {
        self.0.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Slots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.keys()).finish()
    }
}

/// Render slot `name` with `props` as a fragment. `None` when the slot is
/// absent.
pub fn render_slot(slots: &Slots, name: &str, props: &Object) -> Option<VNode> {
    let slot = slots.get(name)?;
    Some(fragment(slot(props)))
}
