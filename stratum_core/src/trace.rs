// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! the [`Session`](crate::scheduler::Session) calls at each stage of a tick.
//! All method bodies default to no-ops, so implementing only the events you
//! care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing. When
//! **on**, each method performs a single `Option` branch before
//! dispatching.
//!
//! These hooks are separate from the `tracing` log output: sinks receive
//! typed, timestamped events suitable for recording and timeline export
//! (see `stratum_debug`).

use crate::node::{EventKind, NodeId};
use crate::time::HostTime;

/// Which stage of a tick is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Hit detection against the cached flat tree.
    Input,
    /// Edge detection and callback dispatch.
    Sync,
    /// Re-flattening the tree.
    Flatten,
    /// Writing pointer, container and viewport records to the GPU.
    Upload,
    /// Encoding and submitting the composite pass.
    Dispatch,
    /// Copying the composited image back to host memory.
    Readback,
}

impl PhaseKind {
    /// All phases in tick order.
    pub const ALL: [Self; 6] = [
        Self::Input,
        Self::Sync,
        Self::Flatten,
        Self::Upload,
        Self::Dispatch,
        Self::Readback,
    ];

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Sync => "sync",
            Self::Flatten => "flatten",
            Self::Upload => "upload",
            Self::Dispatch => "dispatch",
            Self::Readback => "readback",
        }
    }
}

/// Emitted at the start of every tick.
#[derive(Clone, Copy, Debug)]
pub struct TickEvent {
    /// Monotonic tick counter.
    pub frame_index: u64,
    /// Host time at the start of the tick.
    pub now: HostTime,
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
}

/// Marks the beginning of a tick phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Tick counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Host time at the start of the phase.
    pub timestamp: HostTime,
}

/// Marks the end of a tick phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Tick counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Host time at the end of the phase.
    pub timestamp: HostTime,
}

/// Emitted when an interaction callback returns an error.
#[derive(Clone, Copy, Debug)]
pub struct CallbackFaultEvent {
    /// Tick counter.
    pub frame_index: u64,
    /// Container the callback was attached to.
    pub node: NodeId,
    /// Transition that triggered it.
    pub kind: EventKind,
}

/// Per-tick summary.
#[derive(Clone, Copy, Debug, Default)]
pub struct TickSummary {
    /// Tick counter.
    pub frame_index: u64,
    /// Host time at the start of the tick.
    pub now: HostTime,
    /// Host time at the end of the tick.
    pub end: HostTime,
    /// Whether change detection requested GPU work.
    pub dirty: bool,
    /// Whether a new image was read back.
    pub image_changed: bool,
    /// Interaction transitions detected.
    pub transitions: u32,
    /// Callbacks that ran successfully.
    pub callbacks_fired: u32,
    /// Callbacks that failed.
    pub callback_faults: u32,
    /// Records uploaded this tick (zero on clean ticks).
    pub records: u32,
}

/// Receives trace events from the frame loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called at the start of every tick.
    fn on_tick(&mut self, e: &TickEvent) {
        _ = e;
    }

    /// Called at the beginning of a tick phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a tick phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a callback fails.
    fn on_callback_fault(&mut self, e: &CallbackFaultEvent) {
        _ = e;
    }

    /// Called with a per-tick summary.
    fn on_tick_summary(&mut self, s: &TickSummary) {
        _ = s;
    }
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`TickEvent`].
    #[inline]
    pub fn tick(&mut self, e: &TickEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_tick(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CallbackFaultEvent`].
    #[inline]
    pub fn callback_fault(&mut self, e: &CallbackFaultEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_callback_fault(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TickSummary`].
    #[inline]
    pub fn tick_summary(&mut self, s: &TickSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_tick_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits a begin/end pair around `f`, timestamped by `clock`.
    #[inline]
    pub fn phase<R>(
        &mut self,
        frame_index: u64,
        phase: PhaseKind,
        clock: &impl Fn() -> HostTime,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.phase_begin(&PhaseBeginEvent {
            frame_index,
            phase,
            timestamp: clock(),
        });
        let out = f(self);
        self.phase_end(&PhaseEndEvent {
            frame_index,
            phase,
            timestamp: clock(),
        });
        out
    }
}
