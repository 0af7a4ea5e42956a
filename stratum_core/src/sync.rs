// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Edge detection and callback dispatch.
//!
//! Once hit detection has written this tick's interaction flags, the
//! [`StateSynchronizer`] compares them with the previous tick's flags,
//! fires one callback round per transition and then commits the current
//! flags as the new previous flags. Holding a state produces no events;
//! only the edges do.
//!
//! Transitions are dispatched grouped by [`EventKind`] in the order
//! hover-out, hover-in, click, toggle, scroll, and within a kind in tree
//! pre-order. Moving from one container to another therefore always
//! reports leaving the old container before entering the new one.

use alloc::vec::Vec;

use tracing::{debug, warn};

use crate::node::{ContainerTree, Event, EventContext, InteractionState, NodeId};
use crate::trace::{CallbackFaultEvent, Tracer};

/// Counters from one dispatch round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Transitions detected.
    pub transitions: u32,
    /// Callbacks that returned `Ok`.
    pub fired: u32,
    /// Callbacks that returned `Err`.
    pub faults: u32,
}

/// Detects interaction edges and fires callbacks.
///
/// Any change of a container's scroll value is an edge; the epsilon used
/// to gate GPU work does not apply here.
#[derive(Clone, Copy, Debug, Default)]
pub struct StateSynchronizer;

impl StateSynchronizer {
    /// Creates a synchronizer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Transitions of a single container, in dispatch order.
    #[must_use]
    pub fn transitions(&self, state: &InteractionState) -> Vec<Event> {
        let mut events = Vec::new();
        if !state.hovered && state.prev_hovered {
            events.push(Event::HoverOut);
        }
        if state.hovered && !state.prev_hovered {
            events.push(Event::HoverIn);
        }
        if state.clicked && !state.prev_clicked {
            events.push(Event::Click);
        }
        if state.toggled != state.prev_toggled {
            events.push(Event::Toggle(state.toggled));
        }
        let delta = state.scroll - state.prev_scroll;
        if delta != 0.0 {
            events.push(Event::Scroll {
                value: state.scroll,
                delta,
            });
        }
        events
    }

    /// Fires callbacks for every transition, then commits the current
    /// flags as the previous flags.
    ///
    /// A failing callback is logged, reported to the tracer and counted;
    /// the remaining callbacks still run.
    pub fn dispatch(
        &self,
        tree: &mut ContainerTree,
        tracer: &mut Tracer<'_>,
        frame_index: u64,
    ) -> SyncReport {
        let mut pending: Vec<(NodeId, Event)> = tree
            .pre_order()
            .flat_map(|(id, node)| {
                self.transitions(&node.state)
                    .into_iter()
                    .map(move |event| (id, event))
            })
            .collect();
        // Stable, so pre-order survives within a kind.
        pending.sort_by_key(|(_, event)| event.kind());

        let mut report = SyncReport {
            transitions: u32::try_from(pending.len()).unwrap_or(u32::MAX),
            ..SyncReport::default()
        };

        for (id, event) in pending {
            let Ok(idx) = tree.validate(id) else {
                continue;
            };
            let kind = event.kind();
            let mut callbacks = tree.take_callbacks(idx, kind);
            for callback in &mut callbacks {
                let mut cx = EventContext {
                    tree: &mut *tree,
                    node: id,
                    event,
                };
                match callback(&mut cx) {
                    Ok(()) => report.fired += 1,
                    Err(err) => {
                        report.faults += 1;
                        warn!(node = ?id, ?kind, %err, "interaction callback failed");
                        tracer.callback_fault(&CallbackFaultEvent {
                            frame_index,
                            node: id,
                            kind,
                        });
                    }
                }
            }
            tree.restore_callbacks(idx, kind, callbacks);
        }

        Self::commit_previous(tree);
        if report.transitions > 0 {
            debug!(
                transitions = report.transitions,
                fired = report.fired,
                faults = report.faults,
                "dispatched interaction callbacks"
            );
        }
        report
    }

    /// Copies every container's current interaction flags into its
    /// previous flags.
    pub fn commit_previous(tree: &mut ContainerTree) {
        for node in &mut tree.nodes {
            node.state.commit();
        }
    }
}
