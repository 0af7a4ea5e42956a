// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Container identity.

use core::fmt;

/// A handle to a container in a [`ContainerTree`](super::ContainerTree).
///
/// The generation is the tree generation the handle was issued under.
/// Rebuilding a tree (hot reload) bumps the generation, so handles captured
/// by callbacks before the rebuild are rejected instead of silently aliasing
/// whatever container now occupies the slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl NodeId {
    /// Rebuilds a handle from its parts, e.g. when decoding a recording.
    ///
    /// Trees still check the generation, so a handle from another tree
    /// generation is rejected as stale.
    #[inline]
    #[must_use]
    pub const fn from_raw(index: u32, generation: u32) -> Self {
        Self {
            idx: index,
            generation,
        }
    }

    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the tree generation this handle belongs to.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}
