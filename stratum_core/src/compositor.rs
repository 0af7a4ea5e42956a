// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The compositor and host contracts.
//!
//! A [`Compositor`] owns the GPU side of the pipeline: three input records
//! (pointer, containers, viewport), an output image of viewport size, and a
//! compute program that composites the records into the image. The
//! [`Session`](crate::scheduler::Session) drives it through a fixed
//! sequence each dirty tick:
//!
//! ```text
//!   upload(mouse, records, viewport) ──► dispatch() ──► readback()
//! ```
//!
//! A [`Host`] is the outside world: it reports the viewport size and the
//! current time, receives composited images, and is asked to redraw once
//! per tick.
//!
//! # Example
//!
//! ```rust,ignore
//! impl Compositor for MyCompositor {
//!     fn initialize(&mut self, viewport: Viewport, records: &[FlatRecord])
//!         -> Result<(), CompositorError>
//!     {
//!         // Compile the program, allocate buffers sized for `records`,
//!         // allocate the output image.
//!     }
//!     fn upload(&mut self, mouse: &MouseRecord, records: &[FlatRecord],
//!               viewport: &ViewportRecord) -> Result<(), CompositorError>
//!     {
//!         // Bulk-write all three records; grow the container buffer if
//!         // `records` no longer fits.
//!     }
//!     // ...
//! }
//! ```

use alloc::vec::Vec;

use bytemuck::{Pod, Zeroable};
use kurbo::Size;

use crate::flatten::FlatRecord;
use crate::time::HostTime;

/// Compositor lifecycle, owned by the session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompositorState {
    /// No GPU resources exist.
    #[default]
    Uninitialized,
    /// Resources are being created.
    Initializing,
    /// Ticks run.
    Running,
    /// Resources are being released.
    Cleanup,
}

/// Viewport size in pixels, never smaller than 1x1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Viewport {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Viewport {
    /// Creates a viewport, clamping each side to at least one pixel.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width: if width == 0 { 1 } else { width },
            height: if height == 0 { 1 } else { height },
        }
    }

    /// Size in pixels as floating point.
    #[must_use]
    pub fn size(self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    /// Number of pixels.
    #[must_use]
    pub const fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Pointer record as the shader sees it.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MouseRecord {
    /// Pointer position in pixels.
    pub position: [f32; 2],
    /// Seconds since the session started.
    pub time: f32,
    /// Accumulated scroll value.
    pub scroll: f32,
    /// `1.0` while the button is down.
    pub click: f32,
    /// Padding to a 16-byte multiple.
    pub _pad: [f32; 3],
}

/// Viewport record as the shader sees it.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ViewportRecord {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Number of container records.
    pub count: u32,
    /// Highest container layer.
    pub max_layer: u32,
}

/// An RGBA8 image in host memory, rows tightly packed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompositedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes, row-major, top row first.
    pub pixels: Vec<u8>,
}

impl CompositedImage {
    /// Creates a transparent image.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 4;
        Self {
            width,
            height,
            pixels: alloc::vec![0; len],
        }
    }

    /// The RGBA value at `(x, y)`, or `None` outside the image.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels
            .get(i..i + 4)
            .and_then(|p| <[u8; 4]>::try_from(p).ok())
    }
}

/// Errors from compositor operations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CompositorError {
    /// No usable GPU device.
    #[error("no usable GPU device: {0}")]
    DeviceUnavailable(alloc::string::String),
    /// The composite program failed to compile.
    #[error("composite program failed to compile: {0}")]
    ProgramCompile(alloc::string::String),
    /// A buffer or image could not be allocated.
    #[error("allocation failed: {0}")]
    Allocation(alloc::string::String),
    /// A record write failed.
    #[error("record upload failed: {0}")]
    BufferWrite(alloc::string::String),
    /// The composite pass failed.
    #[error("composite dispatch failed: {0}")]
    Dispatch(alloc::string::String),
    /// Copying the image to host memory failed.
    #[error("image readback failed: {0}")]
    Readback(alloc::string::String),
    /// The device was lost or a resource destroyed underneath us.
    #[error("GPU resources lost: {0}")]
    ResourceLost(alloc::string::String),
    /// An operation was called before [`Compositor::initialize`].
    #[error("compositor is not initialized")]
    NotInitialized,
}

impl CompositorError {
    /// Returns `true` if the session cannot continue without a restart.
    ///
    /// Initialization failures and lost devices are fatal. Per-tick upload,
    /// dispatch and readback failures are not: the tick is dropped and the
    /// previous image is kept.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable(_)
                | Self::ProgramCompile(_)
                | Self::Allocation(_)
                | Self::ResourceLost(_)
                | Self::NotInitialized
        )
    }
}

/// GPU compositing backend.
///
/// The session guarantees the call order: `initialize` once, then any
/// number of `resize` and `upload`/`dispatch`/`readback` rounds, then
/// `cleanup`. `cleanup` may also follow a failed `initialize`.
pub trait Compositor {
    /// Compiles the program and allocates buffers for `records` and an
    /// output image of `viewport` size.
    ///
    /// # Errors
    ///
    /// Any failure is fatal; the session calls [`cleanup`](Self::cleanup)
    /// and stays uninitialized.
    fn initialize(
        &mut self,
        viewport: Viewport,
        records: &[FlatRecord],
    ) -> Result<(), CompositorError>;

    /// Reallocates the output image for a new viewport and discards any
    /// cached image.
    ///
    /// # Errors
    ///
    /// Returns an error if the new image cannot be allocated.
    fn resize(&mut self, viewport: Viewport) -> Result<(), CompositorError>;

    /// Writes the three input records. Grows the container buffer if
    /// `records` no longer fits.
    ///
    /// # Errors
    ///
    /// Returns an error if a write or reallocation fails.
    fn upload(
        &mut self,
        mouse: &MouseRecord,
        records: &[FlatRecord],
        viewport: &ViewportRecord,
    ) -> Result<(), CompositorError>;

    /// Submits the composite pass over the whole viewport.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or submission fails.
    fn dispatch(&mut self) -> Result<(), CompositorError>;

    /// Copies the output image into host memory, waiting for the dispatch
    /// to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if mapping or copying fails.
    fn readback(&mut self) -> Result<&CompositedImage, CompositorError>;

    /// The most recent image read back, if any.
    fn image(&self) -> Option<&CompositedImage>;

    /// Releases every resource. Must tolerate resources that were never
    /// created or are already gone, and must be idempotent.
    fn cleanup(&mut self);
}

/// The embedding application.
pub trait Host {
    /// Current viewport size in pixels. Zero sides are clamped to one.
    fn viewport_size(&self) -> (u32, u32);

    /// Current monotonic time.
    fn now(&self) -> HostTime;

    /// Receives the current image once per tick. `changed` is `true` when
    /// the image was read back this tick.
    fn present(&mut self, image: &CompositedImage, changed: bool);

    /// Asks the display surface to redraw. Called once per tick.
    fn request_redraw(&mut self);
}
