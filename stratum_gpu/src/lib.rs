// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! wgpu compute compositor for `stratum` container trees.
//!
//! [`WgpuCompositor`] implements [`stratum_core::compositor::Compositor`]:
//!
//! ```text
//!   GpuContext ──► CompositePipeline (composite.wgsl, 16x16 workgroups)
//!                        │
//!   BufferArena ─────────┤  mouse / containers / viewport / debug
//!   OutputTarget ────────┘  rgba8unorm storage texture
//!                        │
//!                        ▼
//!                   Readback ──► CompositedImage
//! ```
//!
//! Device errors are caught with error scopes and mapped onto
//! [`CompositorError`](stratum_core::compositor::CompositorError) variants;
//! errors outside a scope are logged through `tracing`. A lost device turns
//! every later operation into `ResourceLost`.

mod buffers;
mod compositor;
mod config;
mod context;
mod pipeline;
mod readback;

pub use buffers::{BufferArena, DEBUG_LEN, OUTPUT_FORMAT, OutputTarget, grown_capacity};
pub use compositor::WgpuCompositor;
pub use config::GpuConfig;
pub use context::GpuContext;
pub use pipeline::{CompositePipeline, SHADER_SOURCE, WORKGROUP_SIZE, workgroups};
pub use readback::{Readback, padded_bytes_per_row, unpad_rows};
