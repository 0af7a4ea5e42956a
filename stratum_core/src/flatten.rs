// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Flattening the container tree into GPU records.
//!
//! [`flatten`] walks the tree in pre-order and emits one [`FlatRecord`] per
//! container. Records carry absolute pixel bounds (parent origin plus local
//! offset), the effective clip rectangle contributed by ancestors with
//! [`Overflow::Hidden`](crate::node::Overflow::Hidden), resolved fills for
//! every interaction state, and the current interaction bits, so the
//! composite shader never needs the tree.
//!
//! Flattening is pure: the same tree always produces bit-identical records.

use alloc::vec::Vec;
use core::ops::Range;

use bytemuck::{Pod, Zeroable};
use kurbo::{Point, Rect};

use crate::node::{ContainerTree, Fill, NodeId, Overflow};

/// Record flag: the container and all its ancestors are displayed.
pub const FLAG_VISIBLE: u32 = 1 << 0;
/// Record flag: the container clips its descendants.
pub const FLAG_OVERFLOW_HIDDEN: u32 = 1 << 1;
/// Record flag: the container never wins hit tests.
pub const FLAG_PASSIVE: u32 = 1 << 2;
/// Record flag: the container is hovered.
pub const FLAG_HOVERED: u32 = 1 << 3;
/// Record flag: the container is pressed.
pub const FLAG_CLICKED: u32 = 1 << 4;
/// Record flag: the container's toggle value is on.
pub const FLAG_TOGGLED: u32 = 1 << 5;
/// Record flag: the container carries a text payload.
pub const FLAG_HAS_TEXT: u32 = 1 << 6;
/// Record flag: the container carries an image payload.
pub const FLAG_HAS_IMAGE: u32 = 1 << 7;

/// Clip rectangle of a container with no clipping ancestor.
///
/// Finite so the shader never compares against infinities.
pub const NO_CLIP: Rect = Rect::new(-1.0e30, -1.0e30, 1.0e30, 1.0e30);

/// One container as the composite shader sees it.
///
/// Layout matches `ContainerRecord` in the WGSL shader: sixteen `vec4<f32>`
/// followed by four 32-bit scalars, 272 bytes, 16-byte aligned.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FlatRecord {
    /// Absolute `[x, y, width, height]` in pixels.
    pub rect: [f32; 4],
    /// Effective clip `[x0, y0, x1, y1]` in pixels.
    pub clip: [f32; 4],
    /// Base fill stops.
    pub color: [f32; 4],
    /// Second base fill stop.
    pub color_1: [f32; 4],
    /// Hover fill (alpha < 0 when unset).
    pub hover_color: [f32; 4],
    /// Second hover stop.
    pub hover_color_1: [f32; 4],
    /// Click fill (alpha < 0 when unset).
    pub click_color: [f32; 4],
    /// Second click stop.
    pub click_color_1: [f32; 4],
    /// Toggle fill (alpha < 0 when unset).
    pub toggle_color: [f32; 4],
    /// Second toggle stop.
    pub toggle_color_1: [f32; 4],
    /// Border fill.
    pub border_color: [f32; 4],
    /// Second border stop.
    pub border_color_1: [f32; 4],
    /// Shadow color.
    pub shadow_color: [f32; 4],
    /// Shadow `[offset_x, offset_y, spread, blur]`.
    pub shadow: [f32; 4],
    /// Gradient rotations in degrees: base, hover, click, toggle.
    pub rotations: [f32; 4],
    /// `[radius, width, rotation, 0]` of the border.
    pub border: [f32; 4],
    /// Flat index of the parent record, `-1` for the root.
    pub parent: i32,
    /// Stacking layer.
    pub layer: u32,
    /// `FLAG_*` bits.
    pub flags: u32,
    /// Accumulated scroll value.
    pub scroll: f32,
}

impl FlatRecord {
    /// Returns `true` if all bits of `flag` are set.
    #[inline]
    #[must_use]
    pub const fn has(&self, flag: u32) -> bool {
        self.flags & flag == flag
    }

    /// Absolute bounds in pixels.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        let [x, y, w, h] = self.rect.map(f64::from);
        Rect::new(x, y, x + w, y + h)
    }

    /// Effective ancestor clip in pixels.
    #[must_use]
    pub fn clip_rect(&self) -> Rect {
        let [x0, y0, x1, y1] = self.clip.map(f64::from);
        Rect::new(x0, y0, x1, y1)
    }
}

/// The flattened tree: records in pre-order plus bookkeeping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FlatTree {
    /// One record per container, in pre-order.
    pub records: Vec<FlatRecord>,
    /// `node_ids[i]` is the container behind `records[i]`.
    pub node_ids: Vec<NodeId>,
    /// `records[i]`'s descendants are exactly `records[i + 1..subtree_end[i]]`.
    pub subtree_end: Vec<u32>,
    /// Highest layer of any record.
    pub max_layer: u32,
}

impl FlatTree {
    /// Number of records.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if there are no records.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Flat indices of the descendants of record `index`. Empty for an
    /// out-of-range index.
    #[must_use]
    pub fn descendants(&self, index: usize) -> Range<usize> {
        self.subtree_end
            .get(index)
            .map_or(0..0, |&end| index + 1..end as usize)
    }

    /// Flat indices of the direct children of record `index`.
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let parent = i32::try_from(index).unwrap_or(i32::MAX);
        self.descendants(index)
            .filter(move |&j| self.records.get(j).is_some_and(|r| r.parent == parent))
    }

    /// Record bytes, ready for a storage buffer upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }
}

struct Frame {
    idx: u32,
    parent: i32,
    origin: Point,
    clip: Rect,
    visible: bool,
}

/// Flattens `tree` into pre-order GPU records.
///
/// Runs in O(n) with one record allocation; the tree is not modified.
#[must_use]
pub fn flatten(tree: &ContainerTree) -> FlatTree {
    let n = tree.nodes.len();
    let mut flat = FlatTree {
        records: Vec::with_capacity(n),
        node_ids: Vec::with_capacity(n),
        subtree_end: Vec::with_capacity(n),
        max_layer: 0,
    };
    if n == 0 {
        return flat;
    }

    let mut stack = Vec::with_capacity(16);
    stack.push(Frame {
        idx: 0,
        parent: -1,
        origin: Point::ORIGIN,
        clip: NO_CLIP,
        visible: true,
    });

    while let Some(frame) = stack.pop() {
        let node = &tree.nodes[frame.idx as usize];
        let flat_index = flat.records.len();
        let origin = frame.origin + node.offset;
        let bounds = Rect::from_origin_size(origin, node.size);
        let visible = frame.visible && node.display;

        let mut flags = 0;
        if visible {
            flags |= FLAG_VISIBLE;
        }
        if node.overflow == Overflow::Hidden {
            flags |= FLAG_OVERFLOW_HIDDEN;
        }
        if node.passive {
            flags |= FLAG_PASSIVE;
        }
        if node.state.hovered {
            flags |= FLAG_HOVERED;
        }
        if node.state.clicked {
            flags |= FLAG_CLICKED;
        }
        if node.state.toggled {
            flags |= FLAG_TOGGLED;
        }
        if node.style.text.is_some() {
            flags |= FLAG_HAS_TEXT;
        }
        if node.style.image.is_some() {
            flags |= FLAG_HAS_IMAGE;
        }

        let style = &node.style;
        flat.records.push(FlatRecord {
            rect: rect_xywh(bounds),
            clip: rect_corners(frame.clip),
            color: style.fill.color,
            color_1: style.fill.color_1,
            hover_color: style.hover.color,
            hover_color_1: style.hover.color_1,
            click_color: style.click.color,
            click_color_1: style.click.color_1,
            toggle_color: style.toggle.color,
            toggle_color_1: style.toggle.color_1,
            border_color: style.border.fill.color,
            border_color_1: style.border.fill.color_1,
            shadow_color: style.shadow.color,
            shadow: [
                style.shadow.offset[0],
                style.shadow.offset[1],
                style.shadow.offset[2],
                style.shadow.blur,
            ],
            rotations: rotations([&style.fill, &style.hover, &style.click, &style.toggle]),
            border: [
                style.border.radius,
                style.border.width,
                style.border.fill.rotation,
                0.0,
            ],
            parent: frame.parent,
            layer: node.layer,
            flags,
            scroll: node.state.scroll,
        });
        flat.node_ids.push(tree.id_at(frame.idx));
        flat.max_layer = flat.max_layer.max(node.layer);

        let child_clip = match node.overflow {
            Overflow::Hidden => frame.clip.intersect(bounds),
            Overflow::Visible => frame.clip,
        };
        let parent = i32::try_from(flat_index).unwrap_or(i32::MAX);
        stack.extend(node.children.iter().rev().map(|&child| Frame {
            idx: child,
            parent,
            origin,
            clip: child_clip,
            visible,
        }));
    }

    // Pre-order puts every subtree in a contiguous run; widen each parent's
    // run to cover its last descendant.
    flat.subtree_end
        .extend((1..=flat.records.len()).map(|end| u32::try_from(end).unwrap_or(u32::MAX)));
    for j in (1..flat.records.len()).rev() {
        let parent = flat.records[j].parent as usize;
        flat.subtree_end[parent] = flat.subtree_end[parent].max(flat.subtree_end[j]);
    }

    flat
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "pixel coordinates fit comfortably in f32"
)]
fn rect_xywh(r: Rect) -> [f32; 4] {
    [r.x0 as f32, r.y0 as f32, r.width() as f32, r.height() as f32]
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "pixel coordinates fit comfortably in f32"
)]
fn rect_corners(r: Rect) -> [f32; 4] {
    [r.x0 as f32, r.y0 as f32, r.x1 as f32, r.y1 as f32]
}

fn rotations(fills: [&Fill; 4]) -> [f32; 4] {
    fills.map(|f| f.rotation)
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::Vec2;

    use super::*;
    use crate::node::{ContainerRecord, Fill, Style};

    fn sample() -> ContainerTree {
        // root (0,0 800x600)
        // ├── panel (10,10 200x200, clips)
        // │   └── button (5,5 20x20)
        // └── overlay (layer 2, hidden)
        //     └── badge
        ContainerTree::from_records(&[
            ContainerRecord::new("root").sized(800.0, 600.0),
            ContainerRecord::new("panel")
                .with_parent(0)
                .at(10.0, 10.0)
                .sized(200.0, 200.0)
                .with_overflow(Overflow::Hidden),
            ContainerRecord::new("overlay")
                .with_parent(0)
                .on_layer(2)
                .with_display(false),
            ContainerRecord::new("button")
                .with_parent(1)
                .at(5.0, 5.0)
                .sized(20.0, 20.0)
                .styled(Style {
                    fill: Fill::solid([1.0, 0.0, 0.0, 1.0]),
                    ..Style::default()
                }),
            ContainerRecord::new("badge").with_parent(2).at(1.0, 1.0),
        ])
        .unwrap()
    }

    #[test]
    fn record_size_matches_shader_layout() {
        assert_eq!(size_of::<FlatRecord>(), 272);
        assert_eq!(size_of::<FlatRecord>() % 16, 0, "storage array stride");
    }

    #[test]
    fn emits_pre_order_with_parent_indices() {
        let tree = sample();
        let flat = flatten(&tree);
        let ids: Vec<&str> = flat
            .node_ids
            .iter()
            .map(|&id| tree.node(id).unwrap().id())
            .collect();
        assert_eq!(ids, vec!["root", "panel", "button", "overlay", "badge"]);
        let parents: Vec<i32> = flat.records.iter().map(|r| r.parent).collect();
        assert_eq!(parents, vec![-1, 0, 1, 0, 3]);
        for (i, r) in flat.records.iter().enumerate().skip(1) {
            assert!((r.parent as usize) < i, "parent precedes child");
        }
    }

    #[test]
    fn absolute_positions_accumulate() {
        let flat = flatten(&sample());
        assert_eq!(flat.records[2].rect, [15.0, 15.0, 20.0, 20.0]);
        assert_eq!(flat.records[4].rect, [1.0, 1.0, 100.0, 100.0]);
    }

    #[test]
    fn hidden_propagates_to_descendants() {
        let flat = flatten(&sample());
        assert!(flat.records[0].has(FLAG_VISIBLE));
        assert!(!flat.records[3].has(FLAG_VISIBLE), "overlay hidden");
        assert!(!flat.records[4].has(FLAG_VISIBLE), "badge inherits hidden");
    }

    #[test]
    fn overflow_hidden_clips_descendants_only() {
        let flat = flatten(&sample());
        assert_eq!(flat.records[1].clip_rect(), NO_CLIP, "panel itself unclipped");
        assert_eq!(
            flat.records[2].clip_rect(),
            Rect::new(10.0, 10.0, 210.0, 210.0),
            "button clipped to panel"
        );
    }

    #[test]
    fn tracks_max_layer_and_subtrees() {
        let flat = flatten(&sample());
        assert_eq!(flat.max_layer, 2);
        assert_eq!(flat.descendants(0), 1..5);
        assert_eq!(flat.descendants(1), 2..3);
        assert_eq!(flat.descendants(2), 3..3);
        assert_eq!(flat.children(0).collect::<Vec<_>>(), vec![1, 3]);
        assert!(flat.descendants(flat.len()).is_empty());
        assert_eq!(flat.children(usize::MAX).count(), 0);
    }

    #[test]
    fn resolves_style_fields() {
        let flat = flatten(&sample());
        let button = &flat.records[2];
        assert_eq!(button.color, [1.0, 0.0, 0.0, 1.0]);
        assert!(button.hover_color[3] < 0.0, "unset hover carried through");
    }

    #[test]
    fn flatten_is_idempotent() {
        let tree = sample();
        let a = flatten(&tree);
        let b = flatten(&tree);
        assert_eq!(a.as_bytes(), b.as_bytes(), "bit-identical records");
        assert_eq!(a.node_ids, b.node_ids);
    }

    #[test]
    fn reflects_mutations() {
        let mut tree = sample();
        let panel = tree.lookup("panel").unwrap();
        tree.set_position(panel, Vec2::new(100.0, 0.0)).unwrap();
        let flat = flatten(&tree);
        assert_eq!(flat.records[2].rect[0], 105.0, "child follows moved parent");
    }
}
