// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Copying the output image into host memory.
//!
//! Texture-to-buffer copies need rows padded to
//! [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`]; the padding is stripped while
//! copying into the [`CompositedImage`].

use std::sync::mpsc;

use stratum_core::compositor::{CompositedImage, CompositorError, Viewport};

use crate::buffers::{OutputTarget, extent};
use crate::context::GpuContext;

/// Row stride of the staging buffer for an RGBA8 image `width` pixels wide.
#[must_use]
pub const fn padded_bytes_per_row(width: u32) -> u32 {
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    (width * 4).div_ceil(align) * align
}

/// Copies `height` rows of `width` RGBA8 pixels out of a buffer whose rows
/// are `stride` bytes apart.
pub fn unpad_rows(padded: &[u8], stride: usize, width: u32, height: u32, out: &mut Vec<u8>) {
    let row = width as usize * 4;
    out.clear();
    out.reserve(row * height as usize);
    for chunk in padded.chunks(stride).take(height as usize) {
        out.extend_from_slice(&chunk[..row.min(chunk.len())]);
    }
}

/// A mappable staging buffer sized for one image.
#[derive(Debug)]
pub struct Readback {
    buffer: wgpu::Buffer,
    stride: u32,
    viewport: Viewport,
}

impl Readback {
    /// Allocates a staging buffer for an image of `viewport` size.
    #[must_use]
    pub fn new(device: &wgpu::Device, viewport: Viewport, label: &'static str) -> Self {
        let stride = padded_bytes_per_row(viewport.width);
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} readback")),
            size: u64::from(stride) * u64::from(viewport.height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        Self {
            buffer,
            stride,
            viewport,
        }
    }

    /// Copies `target` into `image`, blocking until the GPU is done.
    ///
    /// `image` is only written once the mapping succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`CompositorError::Readback`] if the copy or the mapping
    /// fails.
    pub fn read(
        &self,
        ctx: &GpuContext,
        target: &OutputTarget,
        image: &mut CompositedImage,
    ) -> Result<(), CompositorError> {
        ctx.scoped(wgpu::ErrorFilter::Validation, |device| {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("readback"),
            });
            encoder.copy_texture_to_buffer(
                wgpu::TexelCopyTextureInfo {
                    texture: &target.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                wgpu::TexelCopyBufferInfo {
                    buffer: &self.buffer,
                    layout: wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(self.stride),
                        rows_per_image: Some(self.viewport.height),
                    },
                },
                extent(self.viewport),
            );
            ctx.queue.submit(Some(encoder.finish()));
        })
        .map_err(|e| CompositorError::Readback(e.to_string()))?;

        let slice = self.buffer.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = ctx.device.poll(wgpu::Maintain::Wait);
        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(CompositorError::Readback(e.to_string())),
            Err(_) => {
                return Err(CompositorError::Readback(
                    "map callback never ran".to_string(),
                ));
            }
        }

        {
            let data = slice.get_mapped_range();
            unpad_rows(
                &data,
                self.stride as usize,
                self.viewport.width,
                self.viewport.height,
                &mut image.pixels,
            );
        }
        self.buffer.unmap();
        image.width = self.viewport.width;
        image.height = self.viewport.height;
        Ok(())
    }

    /// Destroys the staging buffer.
    pub fn release(self) {
        self.buffer.destroy();
    }
}
