// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Interaction events and callback registration types.

use alloc::boxed::Box;
use alloc::string::String;

use super::{ContainerTree, NodeId};

/// The kinds of interaction transition a callback can subscribe to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    /// The pointer left the container.
    HoverOut,
    /// The pointer entered the container.
    HoverIn,
    /// The container was pressed.
    Click,
    /// A toggle-kind container flipped its toggle value.
    Toggle,
    /// The container's accumulated scroll value changed.
    Scroll,
}

impl EventKind {
    /// Number of event kinds.
    pub const COUNT: usize = 5;

    /// All kinds in dispatch order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::HoverOut,
        Self::HoverIn,
        Self::Click,
        Self::Toggle,
        Self::Scroll,
    ];

    #[inline]
    pub(crate) const fn slot(self) -> usize {
        self as usize
    }
}

/// A single interaction transition, delivered to callbacks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    /// See [`EventKind::HoverOut`].
    HoverOut,
    /// See [`EventKind::HoverIn`].
    HoverIn,
    /// See [`EventKind::Click`].
    Click,
    /// See [`EventKind::Toggle`]. Carries the new toggle value.
    Toggle(bool),
    /// See [`EventKind::Scroll`].
    Scroll {
        /// Accumulated scroll value after this tick.
        value: f32,
        /// Change since the previous tick.
        delta: f32,
    },
}

impl Event {
    /// Returns the kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::HoverOut => EventKind::HoverOut,
            Self::HoverIn => EventKind::HoverIn,
            Self::Click => EventKind::Click,
            Self::Toggle(_) => EventKind::Toggle,
            Self::Scroll { .. } => EventKind::Scroll,
        }
    }
}

/// Error returned by a failing callback.
///
/// Callback failures are logged and counted; they never abort the tick or
/// prevent the remaining callbacks from running.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CallbackError {
    message: String,
}

impl CallbackError {
    /// Creates a callback error with the given message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// What a callback sees when it runs.
///
/// The tree is borrowed mutably so a callback can restyle or move any
/// container, including the one it is attached to. Mutations mark the tree
/// dirty and are picked up by the same tick's change detection.
#[derive(Debug)]
pub struct EventContext<'a> {
    /// The tree the event fired in.
    pub tree: &'a mut ContainerTree,
    /// The container the event fired on.
    pub node: NodeId,
    /// The transition.
    pub event: Event,
}

/// A boxed interaction callback.
pub type Callback = Box<dyn FnMut(&mut EventContext<'_>) -> Result<(), CallbackError>>;
