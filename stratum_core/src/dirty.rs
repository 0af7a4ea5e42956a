// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Container mutations mark one of three [`understory_dirty`] channels. The
//! channels feed two consumers: the per-tick change detector (any pending
//! mark forces a re-flatten and GPU upload) and
//! [`ContainerTree::commit`](crate::node::ContainerTree::commit), which
//! drains them after a successful upload and reports what was touched.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`GEOMETRY`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) over child-to-parent
//!   dependency edges. Moving, resizing, re-layering or hiding a container
//!   changes the absolute bounds, clip rectangle or visibility of its whole
//!   subtree, so every descendant is reported.
//!
//! - **Local-only**: [`STYLE`] and [`STATE`] only report the marked
//!   container. Colors, borders, payloads and interaction flags are not
//!   inherited.

use understory_dirty::Channel;

/// Fill, border, shadow, text or image payload changed.
pub const STYLE: Channel = Channel::new(0);

/// Offset, size, layer, overflow or display changed; propagates to
/// descendants.
pub const GEOMETRY: Channel = Channel::new(1);

/// Hover, click, toggle or scroll state changed.
pub const STATE: Channel = Channel::new(2);
