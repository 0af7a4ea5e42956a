// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit detection against the flattened tree.
//!
//! The pointer hits a record when the record is visible (its own and every
//! ancestor's display flag set), not passive, and the pointer lies inside
//! both its bounds and its effective clip rectangle. Bounds are half-open,
//! `x0 <= x < x1`, so a zero-area container can never be hit and adjacent
//! siblings never both claim a shared edge.
//!
//! Among all hits the topmost wins: highest layer first, then highest flat
//! index (later in pre-order draws on top). Only the winner is hovered;
//! its ancestors are not.

use kurbo::{Point, Size};
use tracing::trace;

use crate::dirty;
use crate::flatten::{FLAG_PASSIVE, FLAG_VISIBLE, FlatTree};
use crate::input::PointerState;
use crate::node::{ContainerTree, EventKind, NodeId};

/// What [`HitDetector::apply`] decided this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HitOutcome {
    /// Pointer position in pixels.
    pub pixel: Point,
    /// Topmost hit container.
    pub target: Option<NodeId>,
    /// Container that received this tick's scroll delta.
    pub scroll_target: Option<NodeId>,
    /// Toggle-kind container flipped by a press this tick.
    pub toggled: Option<NodeId>,
    /// Containers whose interaction flags changed.
    pub changed: u32,
}

/// Writes per-container interaction flags from pointer state.
#[derive(Clone, Copy, Debug, Default)]
pub struct HitDetector {
    last_target: Option<NodeId>,
}

impl HitDetector {
    /// Creates a detector with no previous target.
    #[must_use]
    pub const fn new() -> Self {
        Self { last_target: None }
    }

    /// Topmost container at the previous [`apply`](Self::apply).
    #[must_use]
    pub fn last_target(&self) -> Option<NodeId> {
        self.last_target
    }

    /// Returns `true` if record `index` is visible and `point` lies inside
    /// its bounds and clip. Passive records can still contain a point.
    /// Out-of-range indices contain nothing.
    #[must_use]
    pub fn contains(flat: &FlatTree, index: usize, point: Point) -> bool {
        let Some(record) = flat.records.get(index) else {
            return false;
        };
        record.has(FLAG_VISIBLE)
            && record.bounds().contains(point)
            && record.clip_rect().contains(point)
    }

    /// Flat index of the topmost hittable record under `point`.
    #[must_use]
    pub fn hit_test(flat: &FlatTree, point: Point) -> Option<usize> {
        let mut best: Option<(u32, usize)> = None;
        for i in (0..flat.records.len()).rev() {
            let record = &flat.records[i];
            if record.has(FLAG_PASSIVE) || !Self::contains(flat, i, point) {
                continue;
            }
            // Walking backwards, the first hit in a layer has the highest index.
            if best.is_none_or(|(layer, _)| record.layer > layer) {
                best = Some((record.layer, i));
                if record.layer == flat.max_layer {
                    break;
                }
            }
        }
        best.map(|(_, i)| i)
    }

    /// Returns `true` if `point` lies inside any direct, non-passive child
    /// of record `index`. Out-of-range indices have no children.
    #[must_use]
    pub fn any_children_hovered(flat: &FlatTree, index: usize, point: Point) -> bool {
        flat.children(index).any(|j| {
            flat.records
                .get(j)
                .is_some_and(|r| !r.has(FLAG_PASSIVE) && Self::contains(flat, j, point))
        })
    }

    /// Runs hit detection for this tick and writes the results into the
    /// tree.
    ///
    /// For every container this sets `hovered` (topmost hit only),
    /// `clicked` (hovered with the button down) and `contains_pointer`. A
    /// press edge on a toggle-kind container flips its toggle value. The
    /// pointer's scroll delta is added to the nearest ancestor-or-self of
    /// the hit container that has scroll callbacks, or to the hit container
    /// itself.
    ///
    /// Records whose handles no longer resolve (a tree rebuilt since
    /// `flat` was produced) are skipped.
    pub fn apply(
        &mut self,
        tree: &mut ContainerTree,
        flat: &FlatTree,
        pointer: &PointerState,
        viewport: Size,
    ) -> HitOutcome {
        let pixel = pointer.to_pixels(viewport);
        let hit = Self::hit_test(flat, pixel);
        let mut outcome = HitOutcome {
            pixel,
            target: hit.map(|i| flat.node_ids[i]),
            ..HitOutcome::default()
        };

        for (i, &id) in flat.node_ids.iter().enumerate() {
            let Ok(idx) = tree.validate(id) else {
                continue;
            };
            let hovered = hit == Some(i);
            let clicked = hovered && pointer.click();
            let contains = Self::contains(flat, i, pixel);

            let node = &mut tree.nodes[idx];
            let before = node.state;
            node.state.hovered = hovered;
            node.state.clicked = clicked;
            node.state.contains_pointer = contains;
            if clicked && !before.prev_clicked && node.toggleable {
                node.state.toggled = !node.state.toggled;
                outcome.toggled = Some(id);
            }

            let after = node.state;
            if after.hovered != before.hovered
                || after.clicked != before.clicked
                || after.toggled != before.toggled
            {
                tree.mark(idx, dirty::STATE);
                outcome.changed += 1;
            }
        }

        let delta = pointer.scroll_delta();
        if delta != 0.0
            && let Some(target) = outcome.target
            && let Ok(idx) = tree.validate(target)
        {
            let receiver = scroll_receiver(tree, idx);
            tree.nodes[receiver].state.scroll += delta;
            tree.mark(receiver, dirty::STATE);
            outcome.scroll_target = Some(tree.id_at(slot(receiver)));
        }

        if outcome.target != self.last_target {
            trace!(target = ?outcome.target, x = pixel.x, y = pixel.y, "hover target changed");
            self.last_target = outcome.target;
        }
        outcome
    }
}

/// Nearest ancestor-or-self with scroll callbacks, else `idx`.
fn scroll_receiver(tree: &ContainerTree, idx: usize) -> usize {
    let mut cursor = Some(idx);
    while let Some(i) = cursor {
        let node = &tree.nodes[i];
        if node.callback_count(EventKind::Scroll) > 0 {
            return i;
        }
        cursor = node.parent.map(|p| p as usize);
    }
    idx
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "container counts are far below u32::MAX"
)]
fn slot(i: usize) -> u32 {
    i as u32
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use super::*;
    use crate::flatten::flatten;
    use crate::node::{ContainerRecord, Overflow};

    const VIEWPORT: Size = Size::new(800.0, 600.0);

    // root (0,0 800x600)
    // └── panel (100,100 200x200)
    //     └── button (10,10 50x50)
    fn scenario() -> ContainerTree {
        ContainerTree::from_records(&[
            ContainerRecord::new("root").sized(800.0, 600.0),
            ContainerRecord::new("panel")
                .with_parent(0)
                .at(100.0, 100.0)
                .sized(200.0, 200.0),
            ContainerRecord::new("button")
                .with_parent(1)
                .at(10.0, 10.0)
                .sized(50.0, 50.0)
                .toggleable(),
        ])
        .unwrap()
    }

    fn pointer_at(px: f64, py: f64) -> PointerState {
        let mut p = PointerState::new();
        p.set_position(px / VIEWPORT.width, py / VIEWPORT.height);
        p
    }

    #[test]
    fn deepest_child_wins() {
        let flat = flatten(&scenario());
        assert_eq!(HitDetector::hit_test(&flat, Point::new(115.0, 115.0)), Some(2));
        assert_eq!(HitDetector::hit_test(&flat, Point::new(250.0, 250.0)), Some(1));
        assert_eq!(HitDetector::hit_test(&flat, Point::new(5.0, 5.0)), Some(0));
    }

    #[test]
    fn bounds_are_half_open() {
        let flat = flatten(&scenario());
        assert!(HitDetector::contains(&flat, 1, Point::new(100.0, 100.0)), "min edge inside");
        assert!(!HitDetector::contains(&flat, 1, Point::new(300.0, 150.0)), "max edge outside");
    }

    #[test]
    fn out_of_range_index_contains_nothing() {
        let flat = flatten(&scenario());
        let past = flat.len();
        assert!(!HitDetector::contains(&flat, past, Point::new(5.0, 5.0)));
        assert!(!HitDetector::any_children_hovered(&flat, past, Point::new(5.0, 5.0)));
        assert!(!HitDetector::contains(&flat, usize::MAX, Point::new(5.0, 5.0)));
    }

    #[test]
    fn higher_layer_beats_tree_order() {
        let tree = ContainerTree::from_records(&[
            ContainerRecord::new("root").sized(800.0, 600.0),
            ContainerRecord::new("popup").with_parent(0).on_layer(3),
            ContainerRecord::new("late").with_parent(0),
        ])
        .unwrap();
        let flat = flatten(&tree);
        assert_eq!(HitDetector::hit_test(&flat, Point::new(10.0, 10.0)), Some(1));
    }

    #[test]
    fn passive_and_hidden_never_hit() {
        let tree = ContainerTree::from_records(&[
            ContainerRecord::new("root").sized(800.0, 600.0),
            ContainerRecord::new("glass").with_parent(0).passive(),
            ContainerRecord::new("ghost").with_parent(0).at(200.0, 0.0).with_display(false),
            ContainerRecord::new("ghost_child").with_parent(2),
        ])
        .unwrap();
        let flat = flatten(&tree);
        assert_eq!(HitDetector::hit_test(&flat, Point::new(10.0, 10.0)), Some(0));
        assert_eq!(
            HitDetector::hit_test(&flat, Point::new(210.0, 10.0)),
            Some(0),
            "hidden subtree ignored"
        );
    }

    #[test]
    fn overflow_hidden_clips_hits() {
        let tree = ContainerTree::from_records(&[
            ContainerRecord::new("root").sized(800.0, 600.0),
            ContainerRecord::new("viewport")
                .with_parent(0)
                .sized(100.0, 100.0)
                .with_overflow(Overflow::Hidden),
            ContainerRecord::new("content")
                .with_parent(1)
                .sized(100.0, 400.0),
        ])
        .unwrap();
        let flat = flatten(&tree);
        assert_eq!(flat.records[2].clip_rect(), Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(HitDetector::hit_test(&flat, Point::new(50.0, 50.0)), Some(2));
        assert_eq!(
            HitDetector::hit_test(&flat, Point::new(50.0, 250.0)),
            Some(0),
            "content outside the clip falls through to root"
        );
    }

    #[test]
    fn apply_sets_exclusive_hover() {
        let mut tree = scenario();
        let flat = flatten(&tree);
        let mut detector = HitDetector::new();
        let outcome = detector.apply(&mut tree, &flat, &pointer_at(115.0, 115.0), VIEWPORT);
        let button = tree.lookup("button").unwrap();
        let panel = tree.lookup("panel").unwrap();
        assert_eq!(outcome.target, Some(button));
        assert!(tree.node(button).unwrap().state().hovered);
        assert!(!tree.node(panel).unwrap().state().hovered, "ancestor not hovered");
        assert!(tree.node(panel).unwrap().state().contains_pointer);
        assert!(tree.any_children_hovered(panel).unwrap());
        assert!(HitDetector::any_children_hovered(&flat, 1, outcome.pixel));
    }

    #[test]
    fn press_edge_flips_toggle_once() {
        let mut tree = scenario();
        let flat = flatten(&tree);
        let button = tree.lookup("button").unwrap();
        let mut detector = HitDetector::new();
        let mut pointer = pointer_at(115.0, 115.0);
        pointer.set_click(true);

        let outcome = detector.apply(&mut tree, &flat, &pointer, VIEWPORT);
        assert_eq!(outcome.toggled, Some(button));
        assert!(tree.node(button).unwrap().state().toggled);
        tree.nodes[button.index() as usize].state.commit();

        // Holding the button down is not a new press.
        let outcome = detector.apply(&mut tree, &flat, &pointer, VIEWPORT);
        assert_eq!(outcome.toggled, None);
        assert!(tree.node(button).unwrap().state().toggled);
    }

    #[test]
    fn scroll_bubbles_to_handler() {
        let mut tree = scenario();
        let flat = flatten(&tree);
        let panel = tree.lookup("panel").unwrap();
        let button = tree.lookup("button").unwrap();
        tree.on(panel, EventKind::Scroll, |_| Ok(())).unwrap();

        let mut pointer = pointer_at(115.0, 115.0);
        pointer.add_scroll(2.5);
        let outcome = HitDetector::new().apply(&mut tree, &flat, &pointer, VIEWPORT);
        assert_eq!(outcome.scroll_target, Some(panel));
        assert_eq!(tree.node(panel).unwrap().state().scroll, 2.5);
        assert_eq!(tree.node(button).unwrap().state().scroll, 0.0);
    }

    #[test]
    fn scroll_without_handler_stays_on_target() {
        let mut tree = scenario();
        let flat = flatten(&tree);
        let button = tree.lookup("button").unwrap();
        let mut pointer = pointer_at(115.0, 115.0);
        pointer.add_scroll(-1.0);
        let outcome = HitDetector::new().apply(&mut tree, &flat, &pointer, VIEWPORT);
        assert_eq!(outcome.scroll_target, Some(button));
    }

    #[test]
    fn stale_flat_records_are_skipped() {
        let old = scenario();
        let flat = flatten(&old);
        let mut rebuilt = ContainerTree::with_generation(
            &[ContainerRecord::new("root").sized(800.0, 600.0)],
            1,
        )
        .unwrap();
        let outcome = HitDetector::new().apply(&mut rebuilt, &flat, &pointer_at(5.0, 5.0), VIEWPORT);
        assert_eq!(outcome.changed, 0);
        assert!(!rebuilt.node(rebuilt.root()).unwrap().state().hovered);
    }
}
