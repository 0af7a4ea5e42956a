// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal iterators.

use alloc::vec::Vec;

use super::{ContainerTree, Node, NodeId};

/// Iterator over the direct children of a container, in insertion order.
#[derive(Debug)]
pub struct Children<'a> {
    tree: &'a ContainerTree,
    slots: core::slice::Iter<'a, u32>,
}

impl<'a> Children<'a> {
    pub(crate) fn new(tree: &'a ContainerTree, slots: &'a [u32]) -> Self {
        Self {
            tree,
            slots: slots.iter(),
        }
    }
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.slots.next().map(|&idx| self.tree.id_at(idx))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.slots.size_hint()
    }
}

impl ExactSizeIterator for Children<'_> {}

/// Lazy pre-order walk of a [`ContainerTree`].
///
/// Parents are yielded before their children and siblings in insertion
/// order. The walk is finite and can be restarted by calling
/// [`ContainerTree::pre_order`] again.
#[derive(Debug)]
pub struct PreOrder<'a> {
    tree: &'a ContainerTree,
    stack: Vec<u32>,
}

impl<'a> PreOrder<'a> {
    pub(crate) fn new(tree: &'a ContainerTree) -> Self {
        let mut stack = Vec::new();
        if !tree.nodes.is_empty() {
            stack.push(0);
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.stack.pop()?;
        let node = &self.tree.nodes[idx as usize];
        self.stack.extend(node.children.iter().rev());
        Some((self.tree.id_at(idx), node))
    }
}
