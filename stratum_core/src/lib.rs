// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Container tree, flattening, hit testing and frame scheduling for
//! GPU-composited UI.
//!
//! `stratum_core` turns a declarative tree of styled rectangles into a flat
//! array of GPU records once per changed frame, decides which container the
//! pointer is over, fires interaction callbacks on state edges, and drives
//! a [`Compositor`](compositor::Compositor) through a fixed per-tick
//! sequence. It is `no_std` compatible (with `alloc`) and never touches a
//! GPU itself; `stratum_gpu` provides the wgpu compositor.
//!
//! # Architecture
//!
//! ```text
//!   ContainerRecord[] ──► ContainerTree ──► flatten() ──► FlatTree
//!                              ▲                              │
//!            callbacks mutate  │                              ▼
//!   PointerState ──► HitDetector::apply() ──► StateSynchronizer::dispatch()
//!                                                             │
//!   ChangeDetector::check() ──► Compositor::upload/dispatch/readback ──► Host
//! ```
//!
//! **[`node`]**: Arena container tree with generational handles, string id
//! lookup, style and geometry setters that mark dirty channels, and
//! per-container callback lists.
//!
//! **[`dirty`]**: Dirty channels via `understory_dirty`. Geometry
//! propagates to descendants; style and interaction state are local.
//!
//! **[`input`]**: Normalized pointer position, button state and scroll
//! accumulation.
//!
//! **[`flatten`]**: Pre-order flattening into `bytemuck::Pod` records with
//! absolute bounds and effective clip rectangles.
//!
//! **[`hit`]**: Topmost-wins hit detection honoring layers, clipping,
//! visibility and passive containers.
//!
//! **[`sync`]**: Edge detection on interaction flags and callback
//! dispatch.
//!
//! **[`change`]**: The per-tick gate in front of all GPU work.
//!
//! **[`compositor`]**: The [`Compositor`](compositor::Compositor) and
//! [`Host`](compositor::Host) traits and the shared GPU record types.
//!
//! **[`scheduler`]**: [`Session`](scheduler::Session): lifecycle, the
//! tick sequence and hot reload.
//!
//! **[`telemetry`]**: Frame, dispatch and readback counters and a rolling
//! FPS estimate.
//!
//! **[`time`]**: Host timestamps and durations in nanoseconds.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types
//! for tick instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod change;
pub mod compositor;
pub mod dirty;
pub mod flatten;
pub mod hit;
pub mod input;
pub mod node;
pub mod scheduler;
pub mod sync;
pub mod telemetry;
pub mod time;
pub mod trace;
