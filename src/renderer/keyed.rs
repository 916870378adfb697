//! Keyed children diff.
//!
//! ```text
//! old: a b [c d e] f g
//! new: a b [e c d h] f g
//!      ^^^ prefix   ^^^ suffix
//! ```
//!
//! Matching prefix and suffix nodes are patched in place. What is left is
//! either a pure append, a pure removal, or a middle region where nodes are
//! matched by key (or by type for unkeyed nodes), stale nodes removed, and
//! survivors outside the longest increasing subsequence moved.

use std::collections::HashMap;
use std::rc::Rc;

use super::host::{HostAdapter, NodeId};
use super::sequence::longest_increasing_subsequence;
use super::RendererInner;
use crate::component::ComponentInstance;
use crate::error::Result;
use crate::vnode::{VNode, VNodeKey};

impl<H: HostAdapter + 'static> RendererInner<H> {
    /// Anchor for a node placed before `children[next_pos]`: the first host
    /// node owned by any later sibling, or `parent_anchor` past the end.
    fn anchor_at(&self, children: &[VNode], next_pos: usize, parent_anchor: Option<NodeId>) -> Option<NodeId> {
        children
            .get(next_pos..)
            .and_then(|rest| rest.iter().find_map(|next| self.first_host_node(next)))
            .or(parent_anchor)
    }

    pub(crate) fn patch_keyed_children(
        self: &Rc<Self>,
        c1: &[VNode],
        c2: &[VNode],
        container: NodeId,
        parent: Option<&Rc<ComponentInstance>>,
        parent_anchor: Option<NodeId>,
    ) -> Result<()> {
        let mut i = 0;
        // One past the last unsynced index of each list.
        let mut end1 = c1.len();
        let mut end2 = c2.len();

        // 1. prefix
        while i < end1 && i < end2 {
            let (n1, n2) = (&c1[i], &c2[i]);
            if !n1.is_same_vnode_type(n2) {
                break;
            }
            // Old siblings are still in place; an empty fragment grows before them.
            let anchor = self.anchor_at(c1, i + 1, parent_anchor);
            self.patch(Some(n1), n2, container, parent, anchor)?;
            i += 1;
        }

        // 2. suffix
        while i < end1 && i < end2 {
            let (n1, n2) = (&c1[end1 - 1], &c2[end2 - 1]);
            if !n1.is_same_vnode_type(n2) {
                break;
            }
            let anchor = self.anchor_at(c2, end2, parent_anchor);
            self.patch(Some(n1), n2, container, parent, anchor)?;
            end1 -= 1;
            end2 -= 1;
        }

        // 3. only new nodes left: mount them
        if i >= end1 {
            if i < end2 {
                let anchor = self.anchor_at(c2, end2, parent_anchor);
                for child in &c2[i..end2] {
                    self.patch(None, child, container, parent, anchor)?;
                }
            }
            return Ok(());
        }

        // 4. only old nodes left: remove them
        if i >= end2 {
            for child in &c1[i..end1] {
                self.unmount(child, true);
            }
            return Ok(());
        }

        // 5. unknown middle region
        let (s1, s2) = (i, i);
        let new_slice = &c2[s2..end2];

        if self.config.borrow().warn_on_missing_key && new_slice.iter().any(|c| c.key().is_none()) {
            tracing::warn!(
                children = new_slice.len(),
                "list children without keys are matched by position and type"
            );
        }

        let key_to_new_index: HashMap<&VNodeKey, usize> = new_slice
            .iter()
            .enumerate()
            .filter_map(|(offset, child)| child.key().map(|key| (key, s2 + offset)))
            .collect();

        let to_be_patched = new_slice.len();
        let mut patched = 0;
        // new index (relative to s2) -> old index + 1; 0 means "mount".
        let mut new_index_to_old_index = vec![0usize; to_be_patched];
        let mut moved = false;
        let mut max_new_index_so_far = 0;

        for (old_index, prev) in c1.iter().enumerate().take(end1).skip(s1) {
            if patched >= to_be_patched {
                self.unmount(prev, true);
                continue;
            }

            let new_index = match prev.key() {
                Some(key) => key_to_new_index.get(key).copied(),
                None => (s2..end2).find(|&j| {
                    new_index_to_old_index[j - s2] == 0 && prev.is_same_vnode_type(&c2[j])
                }),
            };

            let Some(new_index) = new_index else {
                self.unmount(prev, true);
                continue;
            };

            if new_index >= max_new_index_so_far {
                max_new_index_so_far = new_index;
            } else {
                moved = true;
            }
            new_index_to_old_index[new_index - s2] = old_index + 1;
            // Untouched old siblings first, then the already patched suffix.
            let anchor = self
                .anchor_at(&c1[..end1], old_index + 1, None)
                .or_else(|| self.anchor_at(c2, end2, parent_anchor));
            self.patch(Some(prev), &c2[new_index], container, parent, anchor)?;
            patched += 1;
        }

        // 6. mount new nodes and move survivors, back to front so every
        // anchor is already in place.
        let stable = if moved {
            longest_increasing_subsequence(&new_index_to_old_index)
        } else {
            Vec::new()
        };
        let mut stable = stable.iter().rev().peekable();

        for offset in (0..to_be_patched).rev() {
            let next_index = s2 + offset;
            let child = &c2[next_index];
            let anchor = self.anchor_at(c2, next_index + 1, parent_anchor);

            if new_index_to_old_index[offset] == 0 {
                self.patch(None, child, container, parent, anchor)?;
            } else if moved {
                if stable.peek() == Some(&&offset) {
                    stable.next();
                } else {
                    self.move_vnode(child, container, anchor);
                }
            }
        }

        Ok(())
    }
}
