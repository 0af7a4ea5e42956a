// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The container tree.
//!
//! A [`ContainerTree`] is built once from a flat list of [`ContainerRecord`]s
//! (the output of an external theme parser) and then lives for the whole
//! session. Containers are stored in an arena and addressed by [`NodeId`]
//! handles; a string id index gives O(log n) lookup by name.
//!
//! Every mutation goes through a setter that marks the container dirty on
//! the appropriate [`dirty`](crate::dirty) channel. Interaction callbacks
//! are attached per container and per [`EventKind`] with
//! [`ContainerTree::on`].

mod event;
mod id;
mod style;
mod traverse;
mod tree;

pub use event::{Callback, CallbackError, Event, EventContext, EventKind};
pub use id::NodeId;
pub use style::{
    Border, BoxShadow, Fill, ImagePayload, Overflow, Rgba, Style, TextPayload,
};
pub use traverse::{Children, PreOrder};
pub use tree::{
    ContainerRecord, ContainerTree, InteractionState, Node, TreeChanges, TreeError,
};
