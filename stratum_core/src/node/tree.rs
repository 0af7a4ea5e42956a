// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Arena storage, construction, lookup and mutation of containers.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Size, Vec2};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::event::{Callback, CallbackError, EventContext, EventKind};
use super::id::NodeId;
use super::style::{Overflow, Style};
use super::traverse::{Children, PreOrder};
use crate::dirty;

/// Errors from building or addressing a [`ContainerTree`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// No container has the requested string id.
    #[error("no container with id `{0}`")]
    NotFound(String),
    /// The handle was issued by an earlier generation of the tree.
    #[error("stale container handle {0:?}")]
    StaleNode(NodeId),
    /// Two records share a string id.
    #[error("duplicate container id `{0}`")]
    DuplicateId(String),
    /// A record's parent index does not refer to an earlier record.
    #[error("container `{id}` has invalid parent index {parent}")]
    InvalidParent {
        /// String id of the offending record.
        id: String,
        /// The parent index it named.
        parent: usize,
    },
    /// A record other than the first has no parent.
    #[error("container `{0}` has no parent but is not the first record")]
    MultipleRoots(String),
    /// The record list was empty.
    #[error("a container tree needs at least a root record")]
    Empty,
}

/// Parser output for one container.
///
/// Records are consumed in order by [`ContainerTree::from_records`]. The
/// first record is the root; every later record names the index of an
/// earlier record as its parent.
#[derive(Clone, Debug, PartialEq)]
pub struct ContainerRecord {
    /// Unique string id.
    pub id: String,
    /// Index of the parent record, `None` for the root.
    pub parent: Option<usize>,
    /// Offset from the parent's origin, in pixels.
    pub offset: Vec2,
    /// Width and height in pixels.
    pub size: Size,
    /// Stacking layer. Higher layers draw over and win hit tests against
    /// lower layers regardless of tree order.
    pub layer: u32,
    /// Whether the container (and its subtree) is drawn and hit-testable.
    pub display: bool,
    /// Whether the container clips its descendants.
    pub overflow: Overflow,
    /// Passive containers are drawn but never hit.
    pub passive: bool,
    /// Toggle-kind containers flip a toggle value on every press.
    pub toggleable: bool,
    /// Visual properties.
    pub style: Style,
}

impl ContainerRecord {
    /// Creates a record with default geometry (100x100 at the parent
    /// origin) and default style.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            offset: Vec2::ZERO,
            size: Size::new(100.0, 100.0),
            layer: 0,
            display: true,
            overflow: Overflow::Visible,
            passive: false,
            toggleable: false,
            style: Style::default(),
        }
    }

    /// Sets the parent record index.
    #[must_use]
    pub fn with_parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the offset from the parent origin.
    #[must_use]
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.offset = Vec2::new(x, y);
        self
    }

    /// Sets the size.
    #[must_use]
    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.size = Size::new(width, height);
        self
    }

    /// Sets the stacking layer.
    #[must_use]
    pub fn on_layer(mut self, layer: u32) -> Self {
        self.layer = layer;
        self
    }

    /// Sets the display flag.
    #[must_use]
    pub fn with_display(mut self, display: bool) -> Self {
        self.display = display;
        self
    }

    /// Sets the overflow behavior.
    #[must_use]
    pub fn with_overflow(mut self, overflow: Overflow) -> Self {
        self.overflow = overflow;
        self
    }

    /// Marks the container passive.
    #[must_use]
    pub fn passive(mut self) -> Self {
        self.passive = true;
        self
    }

    /// Marks the container toggle-kind.
    #[must_use]
    pub fn toggleable(mut self) -> Self {
        self.toggleable = true;
        self
    }

    /// Sets the style.
    #[must_use]
    pub fn styled(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

/// Per-container interaction flags.
///
/// The current flags are written by hit detection every tick. The `prev_*`
/// flags hold the values the current flags had at the end of the previous
/// tick and are only ever written by the state synchronizer's commit step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InteractionState {
    /// Topmost hit this tick.
    pub hovered: bool,
    /// `hovered` at the end of the previous tick.
    pub prev_hovered: bool,
    /// Hovered with the pointer button down.
    pub clicked: bool,
    /// `clicked` at the end of the previous tick.
    pub prev_clicked: bool,
    /// Toggle value of a toggle-kind container.
    pub toggled: bool,
    /// `toggled` at the end of the previous tick.
    pub prev_toggled: bool,
    /// Accumulated scroll value.
    pub scroll: f32,
    /// `scroll` at the end of the previous tick.
    pub prev_scroll: f32,
    /// Pointer inside the bounds, whether or not this container is topmost.
    pub contains_pointer: bool,
}

impl InteractionState {
    pub(crate) fn commit(&mut self) {
        self.prev_hovered = self.hovered;
        self.prev_clicked = self.clicked;
        self.prev_toggled = self.toggled;
        self.prev_scroll = self.scroll;
    }
}

/// A single container.
pub struct Node {
    pub(crate) id: String,
    pub(crate) parent: Option<u32>,
    pub(crate) children: Vec<u32>,
    pub(crate) offset: Vec2,
    pub(crate) size: Size,
    pub(crate) layer: u32,
    pub(crate) display: bool,
    pub(crate) overflow: Overflow,
    pub(crate) passive: bool,
    pub(crate) toggleable: bool,
    pub(crate) style: Style,
    pub(crate) state: InteractionState,
    pub(crate) dirty: bool,
    pub(crate) callbacks: [Vec<Callback>; EventKind::COUNT],
}

impl Node {
    fn from_record(record: &ContainerRecord, parent: Option<u32>) -> Self {
        Self {
            id: record.id.clone(),
            parent,
            children: Vec::new(),
            offset: record.offset,
            size: record.size,
            layer: record.layer,
            display: record.display,
            overflow: record.overflow,
            passive: record.passive,
            toggleable: record.toggleable,
            style: record.style.clone(),
            state: InteractionState::default(),
            dirty: true,
            callbacks: core::array::from_fn(|_| Vec::new()),
        }
    }

    /// String id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Offset from the parent origin.
    #[must_use]
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Size in pixels.
    #[must_use]
    pub fn size(&self) -> Size {
        self.size
    }

    /// Stacking layer.
    #[must_use]
    pub fn layer(&self) -> u32 {
        self.layer
    }

    /// Own display flag (ancestors may still hide this container).
    #[must_use]
    pub fn display(&self) -> bool {
        self.display
    }

    /// Overflow behavior.
    #[must_use]
    pub fn overflow(&self) -> Overflow {
        self.overflow
    }

    /// Whether hit testing skips this container.
    #[must_use]
    pub fn is_passive(&self) -> bool {
        self.passive
    }

    /// Whether presses flip the toggle value.
    #[must_use]
    pub fn is_toggleable(&self) -> bool {
        self.toggleable
    }

    /// Visual properties.
    #[must_use]
    pub fn style(&self) -> &Style {
        &self.style
    }

    /// Interaction flags.
    #[must_use]
    pub fn state(&self) -> InteractionState {
        self.state
    }

    /// Whether this container was mutated since the last successful upload.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of callbacks registered for `kind`.
    #[must_use]
    pub fn callback_count(&self, kind: EventKind) -> usize {
        self.callbacks[kind.slot()].len()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let callbacks: [usize; EventKind::COUNT] =
            core::array::from_fn(|i| self.callbacks[i].len());
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("offset", &self.offset)
            .field("size", &self.size)
            .field("layer", &self.layer)
            .field("display", &self.display)
            .field("overflow", &self.overflow)
            .field("passive", &self.passive)
            .field("toggleable", &self.toggleable)
            .field("style", &self.style)
            .field("state", &self.state)
            .field("dirty", &self.dirty)
            .field("callbacks", &callbacks)
            .finish()
    }
}

/// Containers touched since the last [`ContainerTree::commit`], per channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeChanges {
    /// Containers whose style changed.
    pub style: Vec<NodeId>,
    /// Containers whose absolute geometry, clip or visibility changed,
    /// including descendants of the mutated container.
    pub geometry: Vec<NodeId>,
    /// Containers whose interaction flags changed.
    pub state: Vec<NodeId>,
}

impl TreeChanges {
    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.style.is_empty() && self.geometry.is_empty() && self.state.is_empty()
    }
}

/// Arena-backed container tree.
///
/// The first container is the root. Handles are stamped with the tree
/// generation; rebuilding a tree with
/// [`with_generation`](Self::with_generation) invalidates every handle
/// issued before.
#[derive(Debug)]
pub struct ContainerTree {
    pub(crate) nodes: Vec<Node>,
    index: BTreeMap<String, u32>,
    generation: u32,
    dirty: DirtyTracker<u32>,
    pending: u32,
}

impl ContainerTree {
    /// Builds a tree from parser records, generation zero.
    ///
    /// # Errors
    ///
    /// See [`with_generation`](Self::with_generation).
    pub fn from_records(records: &[ContainerRecord]) -> Result<Self, TreeError> {
        Self::with_generation(records, 0)
    }

    /// Builds a tree from parser records, stamping handles with
    /// `generation`.
    ///
    /// Every container starts dirty so the first tick uploads the whole
    /// tree.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Empty`] for an empty list,
    /// [`TreeError::DuplicateId`] if two records share an id,
    /// [`TreeError::MultipleRoots`] if a non-first record has no parent and
    /// [`TreeError::InvalidParent`] if a parent index does not precede its
    /// child.
    pub fn with_generation(
        records: &[ContainerRecord],
        generation: u32,
    ) -> Result<Self, TreeError> {
        if records.is_empty() {
            return Err(TreeError::Empty);
        }

        let mut tree = Self {
            nodes: Vec::with_capacity(records.len()),
            index: BTreeMap::new(),
            generation,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending: 0,
        };

        for (i, record) in records.iter().enumerate() {
            let parent = match (i, record.parent) {
                (0, None) => None,
                (0, Some(parent)) => {
                    return Err(TreeError::InvalidParent {
                        id: record.id.clone(),
                        parent,
                    });
                }
                (_, None) => return Err(TreeError::MultipleRoots(record.id.clone())),
                (_, Some(parent)) if parent >= i => {
                    return Err(TreeError::InvalidParent {
                        id: record.id.clone(),
                        parent,
                    });
                }
                (_, Some(parent)) => Some(slot(parent)),
            };

            let idx = slot(i);
            if tree.index.insert(record.id.clone(), idx).is_some() {
                return Err(TreeError::DuplicateId(record.id.clone()));
            }

            tree.nodes.push(Node::from_record(record, parent));
            if let Some(p) = parent {
                tree.nodes[p as usize].children.push(idx);
                let _ = tree.dirty.add_dependency(idx, p, dirty::GEOMETRY);
            }
        }

        tree.pending = slot(tree.nodes.len());
        tree.dirty.mark_with(0, dirty::GEOMETRY, &EagerPolicy);
        Ok(tree)
    }

    /// Tree generation. Handles from any other generation are stale.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Number of containers.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a tree has at least its root.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Handle of the root container.
    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.id_at(0)
    }

    /// Resolves a string id to a handle.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] if no container has this id.
    pub fn lookup(&self, id: &str) -> Result<NodeId, TreeError> {
        self.index
            .get(id)
            .map(|&idx| self.id_at(idx))
            .ok_or_else(|| TreeError::NotFound(String::from(id)))
    }

    /// Returns the container behind a handle.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a handle from another
    /// generation.
    pub fn node(&self, id: NodeId) -> Result<&Node, TreeError> {
        let idx = self.validate(id)?;
        Ok(&self.nodes[idx])
    }

    /// Returns the parent of a container, `None` for the root.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a stale handle.
    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, TreeError> {
        let idx = self.validate(id)?;
        Ok(self.nodes[idx].parent.map(|p| self.id_at(p)))
    }

    /// Iterates over the direct children of a container.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a stale handle.
    pub fn children(&self, id: NodeId) -> Result<Children<'_>, TreeError> {
        let idx = self.validate(id)?;
        Ok(Children::new(self, &self.nodes[idx].children))
    }

    /// Walks the whole tree in pre-order.
    #[must_use]
    pub fn pre_order(&self) -> PreOrder<'_> {
        PreOrder::new(self)
    }

    /// Returns `true` if any direct, non-passive child of `id` currently
    /// contains the pointer.
    ///
    /// Compound widgets use this to stay highlighted while the pointer is
    /// over one of their parts.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a stale handle.
    pub fn any_children_hovered(&self, id: NodeId) -> Result<bool, TreeError> {
        let idx = self.validate(id)?;
        Ok(self.nodes[idx].children.iter().any(|&c| {
            let child = &self.nodes[c as usize];
            !child.passive && child.state.contains_pointer
        }))
    }

    // -- Mutation API (auto-marks dirty) --

    /// Replaces the style of a container.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a stale handle.
    pub fn set_style(&mut self, id: NodeId, style: Style) -> Result<(), TreeError> {
        let idx = self.validate(id)?;
        self.nodes[idx].style = style;
        self.mark(idx, dirty::STYLE);
        Ok(())
    }

    /// Edits the style of a container in place.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a stale handle.
    pub fn update_style(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut Style),
    ) -> Result<(), TreeError> {
        let idx = self.validate(id)?;
        f(&mut self.nodes[idx].style);
        self.mark(idx, dirty::STYLE);
        Ok(())
    }

    /// Moves a container relative to its parent.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a stale handle.
    pub fn set_position(&mut self, id: NodeId, offset: Vec2) -> Result<(), TreeError> {
        let idx = self.validate(id)?;
        self.nodes[idx].offset = offset;
        self.mark(idx, dirty::GEOMETRY);
        Ok(())
    }

    /// Resizes a container.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a stale handle.
    pub fn set_size(&mut self, id: NodeId, size: Size) -> Result<(), TreeError> {
        let idx = self.validate(id)?;
        self.nodes[idx].size = size;
        self.mark(idx, dirty::GEOMETRY);
        Ok(())
    }

    /// Moves a container to another stacking layer.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a stale handle.
    pub fn set_layer(&mut self, id: NodeId, layer: u32) -> Result<(), TreeError> {
        let idx = self.validate(id)?;
        self.nodes[idx].layer = layer;
        self.mark(idx, dirty::GEOMETRY);
        Ok(())
    }

    /// Shows or hides a container and its subtree.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a stale handle.
    pub fn set_display(&mut self, id: NodeId, display: bool) -> Result<(), TreeError> {
        let idx = self.validate(id)?;
        self.nodes[idx].display = display;
        self.mark(idx, dirty::GEOMETRY);
        Ok(())
    }

    /// Changes whether a container clips its descendants.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a stale handle.
    pub fn set_overflow(&mut self, id: NodeId, overflow: Overflow) -> Result<(), TreeError> {
        let idx = self.validate(id)?;
        self.nodes[idx].overflow = overflow;
        self.mark(idx, dirty::GEOMETRY);
        Ok(())
    }

    /// Makes a container passive (drawn, never hit) or active again.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a stale handle.
    pub fn set_passive(&mut self, id: NodeId, passive: bool) -> Result<(), TreeError> {
        let idx = self.validate(id)?;
        self.nodes[idx].passive = passive;
        self.mark(idx, dirty::STYLE);
        Ok(())
    }

    /// Sets the toggle value of a container directly.
    ///
    /// The change is reported to toggle callbacks on the next tick like a
    /// press-driven flip.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a stale handle.
    pub fn set_toggled(&mut self, id: NodeId, toggled: bool) -> Result<(), TreeError> {
        let idx = self.validate(id)?;
        if self.nodes[idx].state.toggled != toggled {
            self.nodes[idx].state.toggled = toggled;
            self.mark(idx, dirty::STATE);
        }
        Ok(())
    }

    /// Forces a container to be re-uploaded without changing it.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a stale handle.
    pub fn mark_dirty(&mut self, id: NodeId) -> Result<(), TreeError> {
        let idx = self.validate(id)?;
        self.mark(idx, dirty::STYLE);
        Ok(())
    }

    /// Registers a callback for interaction transitions of `kind` on a
    /// container.
    ///
    /// Callbacks run in registration order. A callback registered while
    /// callbacks are being dispatched runs from the next transition on.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::StaleNode`] for a stale handle.
    pub fn on(
        &mut self,
        id: NodeId,
        kind: EventKind,
        callback: impl FnMut(&mut EventContext<'_>) -> Result<(), CallbackError> + 'static,
    ) -> Result<(), TreeError> {
        let idx = self.validate(id)?;
        self.nodes[idx].callbacks[kind.slot()].push(alloc::boxed::Box::new(callback));
        Ok(())
    }

    // -- Dirty bookkeeping --

    /// Returns `true` if any container was mutated since the last
    /// [`commit`](Self::commit).
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.pending > 0
    }

    /// Number of containers with their dirty flag set.
    #[inline]
    #[must_use]
    pub fn dirty_count(&self) -> u32 {
        self.pending
    }

    /// Drains all dirty channels and clears every per-container dirty flag.
    ///
    /// Call this once the flattened tree has been uploaded successfully.
    pub fn commit(&mut self) -> TreeChanges {
        let style = self.drain(dirty::STYLE, false);
        let geometry = self.drain(dirty::GEOMETRY, true);
        let state = self.drain(dirty::STATE, false);
        for node in &mut self.nodes {
            node.dirty = false;
        }
        self.pending = 0;
        TreeChanges {
            style,
            geometry,
            state,
        }
    }

    // -- Crate-internal access --

    #[inline]
    pub(crate) fn id_at(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation,
        }
    }

    pub(crate) fn validate(&self, id: NodeId) -> Result<usize, TreeError> {
        if id.generation == self.generation && (id.idx as usize) < self.nodes.len() {
            Ok(id.idx as usize)
        } else {
            Err(TreeError::StaleNode(id))
        }
    }

    /// Marks a container dirty on `channel`. Geometry propagates to the
    /// subtree.
    pub(crate) fn mark(&mut self, idx: usize, channel: understory_dirty::Channel) {
        let key = slot(idx);
        if channel == dirty::GEOMETRY {
            self.dirty.mark_with(key, channel, &EagerPolicy);
        } else {
            self.dirty.mark(key, channel);
        }
        let node = &mut self.nodes[idx];
        if !node.dirty {
            node.dirty = true;
            self.pending += 1;
        }
    }

    pub(crate) fn take_callbacks(&mut self, idx: usize, kind: EventKind) -> Vec<Callback> {
        core::mem::take(&mut self.nodes[idx].callbacks[kind.slot()])
    }

    /// Puts dispatched callbacks back in front of any registered while they
    /// were out.
    pub(crate) fn restore_callbacks(
        &mut self,
        idx: usize,
        kind: EventKind,
        mut callbacks: Vec<Callback>,
    ) {
        let slot = &mut self.nodes[idx].callbacks[kind.slot()];
        callbacks.append(slot);
        *slot = callbacks;
    }

    fn drain(&mut self, channel: understory_dirty::Channel, affected: bool) -> Vec<NodeId> {
        let drained: Vec<u32> = if affected {
            self.dirty
                .drain(channel)
                .affected()
                .deterministic()
                .run()
                .collect()
        } else {
            self.dirty.drain(channel).deterministic().run().collect()
        };
        drained.into_iter().map(|idx| self.id_at(idx)).collect()
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "container counts are far below u32::MAX"
)]
#[inline]
fn slot(i: usize) -> u32 {
    i as u32
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::node::Fill;

    fn three() -> ContainerTree {
        ContainerTree::from_records(&[
            ContainerRecord::new("root").sized(800.0, 600.0),
            ContainerRecord::new("panel").with_parent(0).at(10.0, 10.0),
            ContainerRecord::new("button").with_parent(1).at(5.0, 5.0).sized(20.0, 20.0),
        ])
        .unwrap()
    }

    #[test]
    fn builds_parent_links() {
        let tree = three();
        let panel = tree.lookup("panel").unwrap();
        let button = tree.lookup("button").unwrap();
        assert_eq!(tree.parent(button).unwrap(), Some(panel));
        assert_eq!(tree.parent(tree.root()).unwrap(), None);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn lookup_unknown_id_fails() {
        let tree = three();
        assert_eq!(
            tree.lookup("nope"),
            Err(TreeError::NotFound(String::from("nope")))
        );
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = ContainerTree::from_records(&[
            ContainerRecord::new("root"),
            ContainerRecord::new("root").with_parent(0),
        ])
        .unwrap_err();
        assert_eq!(err, TreeError::DuplicateId(String::from("root")));
    }

    #[test]
    fn rejects_forward_parent() {
        let err = ContainerTree::from_records(&[
            ContainerRecord::new("root"),
            ContainerRecord::new("a").with_parent(2),
            ContainerRecord::new("b").with_parent(0),
        ])
        .unwrap_err();
        assert!(
            matches!(err, TreeError::InvalidParent { parent: 2, .. }),
            "forward parent reference rejected: {err:?}"
        );
    }

    #[test]
    fn rejects_second_root_and_empty() {
        assert_eq!(
            ContainerTree::from_records(&[ContainerRecord::new("a"), ContainerRecord::new("b")])
                .unwrap_err(),
            TreeError::MultipleRoots(String::from("b"))
        );
        assert_eq!(ContainerTree::from_records(&[]).unwrap_err(), TreeError::Empty);
    }

    #[test]
    fn stale_handles_rejected_after_rebuild() {
        let old = three();
        let button = old.lookup("button").unwrap();
        let records = vec![
            ContainerRecord::new("root"),
            ContainerRecord::new("button").with_parent(0),
        ];
        let mut new = ContainerTree::with_generation(&records, old.generation() + 1).unwrap();
        assert_eq!(new.node(button).unwrap_err(), TreeError::StaleNode(button));
        assert!(new.set_layer(button, 3).is_err(), "stale mutation rejected");
        let fresh = new.lookup("button").unwrap();
        assert_eq!(fresh.generation(), 1);
    }

    #[test]
    fn fresh_tree_is_fully_dirty() {
        let mut tree = three();
        assert!(tree.is_dirty());
        assert_eq!(tree.dirty_count(), 3);
        let changes = tree.commit();
        assert_eq!(changes.geometry.len(), 3, "root mark reaches every descendant");
        assert!(!tree.is_dirty());
        assert!(tree.pre_order().all(|(_, n)| !n.is_dirty()));
    }

    #[test]
    fn style_change_is_local() {
        let mut tree = three();
        let _ = tree.commit();
        let panel = tree.lookup("panel").unwrap();
        tree.update_style(panel, |s| s.fill = Fill::solid([1.0, 0.0, 0.0, 1.0]))
            .unwrap();
        assert!(tree.node(panel).unwrap().is_dirty());
        let changes = tree.commit();
        assert_eq!(changes.style, vec![panel]);
        assert!(changes.geometry.is_empty());
    }

    #[test]
    fn geometry_change_propagates_to_descendants() {
        let mut tree = three();
        let _ = tree.commit();
        let panel = tree.lookup("panel").unwrap();
        let button = tree.lookup("button").unwrap();
        tree.set_position(panel, Vec2::new(50.0, 50.0)).unwrap();
        assert_eq!(tree.dirty_count(), 1, "only the mutated container is flagged");
        let changes = tree.commit();
        assert!(changes.geometry.contains(&panel));
        assert!(
            changes.geometry.contains(&button),
            "descendant reported on the geometry channel"
        );
        assert!(!changes.geometry.contains(&tree.root()));
    }

    #[test]
    fn repeated_marks_count_once() {
        let mut tree = three();
        let _ = tree.commit();
        let root = tree.root();
        tree.mark_dirty(root).unwrap();
        tree.set_layer(root, 2).unwrap();
        assert_eq!(tree.dirty_count(), 1);
    }

    #[test]
    fn set_toggled_only_marks_on_change() {
        let mut tree = three();
        let _ = tree.commit();
        let button = tree.lookup("button").unwrap();
        tree.set_toggled(button, false).unwrap();
        assert!(!tree.is_dirty(), "no-op toggle leaves tree clean");
        tree.set_toggled(button, true).unwrap();
        assert!(tree.node(button).unwrap().state().toggled);
        assert_eq!(tree.commit().state, vec![button]);
    }

    #[test]
    fn any_children_hovered_ignores_passive() {
        let mut tree = three();
        let panel = tree.lookup("panel").unwrap();
        let button = tree.lookup("button").unwrap();
        tree.nodes[button.idx as usize].state.contains_pointer = true;
        assert!(tree.any_children_hovered(panel).unwrap());
        tree.set_passive(button, true).unwrap();
        assert!(!tree.any_children_hovered(panel).unwrap());
        assert!(!tree.any_children_hovered(button).unwrap(), "leaf has no children");
    }

    #[test]
    fn on_counts_callbacks() {
        let mut tree = three();
        let button = tree.lookup("button").unwrap();
        tree.on(button, EventKind::Click, |_| Ok(())).unwrap();
        tree.on(button, EventKind::Click, |_| Ok(())).unwrap();
        let node = tree.node(button).unwrap();
        assert_eq!(node.callback_count(EventKind::Click), 2);
        assert_eq!(node.callback_count(EventKind::HoverIn), 0);
    }
}
