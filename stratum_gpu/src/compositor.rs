// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`Compositor`] implementation on wgpu.

use stratum_core::compositor::{
    CompositedImage, Compositor, CompositorError, MouseRecord, Viewport, ViewportRecord,
};
use stratum_core::flatten::FlatRecord;
use tracing::{debug, info};

use crate::buffers::{BufferArena, OutputTarget};
use crate::config::GpuConfig;
use crate::context::GpuContext;
use crate::pipeline::CompositePipeline;
use crate::readback::Readback;

/// Composites container records with a wgpu compute pass.
///
/// Resources are created by [`initialize`](Compositor::initialize) and
/// released by [`cleanup`](Compositor::cleanup), which also runs on drop.
#[derive(Debug)]
pub struct WgpuCompositor {
    config: GpuConfig,
    context: Option<GpuContext>,
    pipeline: Option<CompositePipeline>,
    buffers: Option<BufferArena>,
    target: Option<OutputTarget>,
    readback: Option<Readback>,
    bind_group: Option<wgpu::BindGroup>,
    image: Option<CompositedImage>,
    release_logged: bool,
}

impl WgpuCompositor {
    /// Creates a compositor that acquires its own device on
    /// initialization.
    #[must_use]
    pub fn new(config: GpuConfig) -> Self {
        Self {
            config,
            context: None,
            pipeline: None,
            buffers: None,
            target: None,
            readback: None,
            bind_group: None,
            image: None,
            release_logged: false,
        }
    }

    /// Creates a compositor on a device the host already owns.
    #[must_use]
    pub fn with_context(config: GpuConfig, context: GpuContext) -> Self {
        Self {
            context: Some(context),
            ..Self::new(config)
        }
    }

    /// The device context, once acquired.
    #[must_use]
    pub fn context(&self) -> Option<&GpuContext> {
        self.context.as_ref()
    }

    /// Container buffer capacity in records, once allocated.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.buffers.as_ref().map(BufferArena::capacity)
    }

    fn holds_resources(&self) -> bool {
        self.context.is_some()
            || self.pipeline.is_some()
            || self.buffers.is_some()
            || self.target.is_some()
            || self.readback.is_some()
    }

    /// Grows the container buffer to hold `records` and rebuilds the bind
    /// group against the new buffer before anything is written to it.
    fn grow_containers(&mut self, records: usize) -> Result<(), CompositorError> {
        let (Some(ctx), Some(buffers)) = (self.context.as_ref(), self.buffers.as_mut()) else {
            return Err(CompositorError::NotInitialized);
        };
        ctx.check()?;
        let grew = ctx
            .scoped(wgpu::ErrorFilter::OutOfMemory, |device| {
                buffers.ensure_capacity(device, records)
            })
            .map_err(|e| CompositorError::Allocation(e.to_string()))?;
        if grew {
            self.rebind();
        }
        Ok(())
    }

    fn rebind(&mut self) {
        if let (Some(ctx), Some(pipeline), Some(buffers), Some(target)) = (
            self.context.as_ref(),
            self.pipeline.as_ref(),
            self.buffers.as_ref(),
            self.target.as_ref(),
        ) {
            self.bind_group = Some(pipeline.bind_group(&ctx.device, buffers, target));
        }
    }
}

/// Keeps a read-back image only if the read succeeded or it already held an
/// earlier frame, so a failed first read never leaves a blank image behind.
fn settle_image(
    slot: &mut Option<CompositedImage>,
    image: CompositedImage,
    had_previous: bool,
    result: Result<(), CompositorError>,
) -> Result<&CompositedImage, CompositorError> {
    match result {
        Ok(()) => Ok(&*slot.insert(image)),
        Err(e) => {
            if had_previous {
                *slot = Some(image);
            }
            Err(e)
        }
    }
}

impl Default for WgpuCompositor {
    fn default() -> Self {
        Self::new(GpuConfig::DEFAULT)
    }
}

impl Compositor for WgpuCompositor {
    fn initialize(
        &mut self,
        viewport: Viewport,
        records: &[FlatRecord],
    ) -> Result<(), CompositorError> {
        if self.context.is_none() {
            self.context = Some(GpuContext::acquire(&self.config)?);
        }
        let ctx = self.context.as_ref().ok_or(CompositorError::NotInitialized)?;
        let label = self.config.label;

        let pipeline = ctx
            .scoped(wgpu::ErrorFilter::Validation, |device| {
                CompositePipeline::new(device, label)
            })
            .map_err(|e| CompositorError::ProgramCompile(e.to_string()))?;

        let (buffers, target, readback) = ctx
            .scoped(wgpu::ErrorFilter::OutOfMemory, |device| {
                (
                    BufferArena::new(device, records.len(), label),
                    OutputTarget::new(device, viewport, label),
                    Readback::new(device, viewport, label),
                )
            })
            .map_err(|e| CompositorError::Allocation(e.to_string()))?;

        info!(
            width = viewport.width,
            height = viewport.height,
            capacity = buffers.capacity(),
            "compositor initialized"
        );
        self.pipeline = Some(pipeline);
        self.buffers = Some(buffers);
        self.target = Some(target);
        self.readback = Some(readback);
        self.image = None;
        self.release_logged = false;
        self.rebind();
        Ok(())
    }

    fn resize(&mut self, viewport: Viewport) -> Result<(), CompositorError> {
        let ctx = self.context.as_ref().ok_or(CompositorError::NotInitialized)?;
        ctx.check()?;
        if self.pipeline.is_none() || self.buffers.is_none() {
            return Err(CompositorError::NotInitialized);
        }
        self.bind_group = None;
        if let Some(old) = self.target.take() {
            old.release();
        }
        if let Some(old) = self.readback.take() {
            old.release();
        }
        self.image = None;

        let label = self.config.label;
        let (target, readback) = ctx
            .scoped(wgpu::ErrorFilter::OutOfMemory, |device| {
                (
                    OutputTarget::new(device, viewport, label),
                    Readback::new(device, viewport, label),
                )
            })
            .map_err(|e| CompositorError::Allocation(e.to_string()))?;
        debug!(
            width = viewport.width,
            height = viewport.height,
            "reallocated output image"
        );
        self.target = Some(target);
        self.readback = Some(readback);
        self.rebind();
        Ok(())
    }

    fn upload(
        &mut self,
        mouse: &MouseRecord,
        records: &[FlatRecord],
        viewport: &ViewportRecord,
    ) -> Result<(), CompositorError> {
        self.grow_containers(records.len())?;

        let (Some(ctx), Some(buffers)) = (self.context.as_ref(), self.buffers.as_ref()) else {
            return Err(CompositorError::NotInitialized);
        };
        ctx.scoped(wgpu::ErrorFilter::Validation, |_| {
            buffers.write(&ctx.queue, mouse, records, viewport);
        })
        .map_err(|e| CompositorError::BufferWrite(e.to_string()))
    }

    fn dispatch(&mut self) -> Result<(), CompositorError> {
        let (Some(ctx), Some(pipeline), Some(bind_group), Some(target)) = (
            self.context.as_ref(),
            self.pipeline.as_ref(),
            self.bind_group.as_ref(),
            self.target.as_ref(),
        ) else {
            return Err(CompositorError::NotInitialized);
        };
        ctx.check()?;

        let label = self.config.label;
        ctx.scoped(wgpu::ErrorFilter::Validation, |device| {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(&format!("{label} composite")),
            });
            pipeline.encode(&mut encoder, bind_group, target.viewport());
            ctx.queue.submit(Some(encoder.finish()));
        })
        .map_err(|e| CompositorError::Dispatch(e.to_string()))
    }

    fn readback(&mut self) -> Result<&CompositedImage, CompositorError> {
        let (Some(ctx), Some(target), Some(readback)) = (
            self.context.as_ref(),
            self.target.as_ref(),
            self.readback.as_ref(),
        ) else {
            return Err(CompositorError::NotInitialized);
        };
        ctx.check()?;

        let viewport = target.viewport();
        let previous = self.image.take();
        let had_previous = previous.is_some();
        let mut image =
            previous.unwrap_or_else(|| CompositedImage::new(viewport.width, viewport.height));
        let result = readback.read(ctx, target, &mut image);
        settle_image(&mut self.image, image, had_previous, result)
    }

    fn image(&self) -> Option<&CompositedImage> {
        self.image.as_ref()
    }

    fn cleanup(&mut self) {
        if !self.holds_resources() {
            if !self.release_logged {
                debug!("compositor resources already released");
                self.release_logged = true;
            }
            return;
        }
        self.bind_group = None;
        if let Some(buffers) = self.buffers.take() {
            buffers.release();
        }
        if let Some(readback) = self.readback.take() {
            readback.release();
        }
        if let Some(target) = self.target.take() {
            target.release();
        }
        self.pipeline = None;
        self.context = None;
        self.image = None;
        info!("compositor resources released");
    }
}

impl Drop for WgpuCompositor {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_before_initialize_fail() {
        let mut c = WgpuCompositor::default();
        let viewport = ViewportRecord::default();
        assert_eq!(
            c.upload(&MouseRecord::default(), &[], &viewport),
            Err(CompositorError::NotInitialized)
        );
        assert_eq!(c.dispatch(), Err(CompositorError::NotInitialized));
        assert_eq!(
            c.readback().map(|_| ()),
            Err(CompositorError::NotInitialized)
        );
        assert_eq!(
            c.resize(Viewport::new(10, 10)),
            Err(CompositorError::NotInitialized)
        );
        assert!(c.image().is_none());
    }

    #[test]
    fn cleanup_without_resources_is_idempotent() {
        let mut c = WgpuCompositor::default();
        c.cleanup();
        assert!(c.release_logged);
        c.cleanup();
        assert!(!c.holds_resources());
        assert!(c.capacity().is_none());
    }

    #[test]
    fn failed_first_readback_leaves_no_image() {
        let mut slot = None;
        let err = CompositorError::Readback("lost".into());
        let out = settle_image(&mut slot, CompositedImage::new(4, 4), false, Err(err.clone()));
        assert_eq!(out.map(|_| ()), Err(err));
        assert!(slot.is_none(), "no blank frame stored");
    }

    #[test]
    fn failed_readback_keeps_previous_image() {
        let mut previous = CompositedImage::new(1, 1);
        previous.pixels.copy_from_slice(&[9, 8, 7, 6]);
        let mut slot = None;
        let out = settle_image(
            &mut slot,
            previous.clone(),
            true,
            Err(CompositorError::Readback("x".into())),
        );
        assert!(out.is_err());
        assert_eq!(slot, Some(previous));
    }

    #[test]
    fn successful_readback_is_stored() {
        let mut slot = None;
        let out = settle_image(&mut slot, CompositedImage::new(2, 3), false, Ok(()));
        assert_eq!(out.map(|img| (img.width, img.height)), Ok((2, 3)));
        assert!(slot.is_some());
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn growth_rebinds_before_any_write() {
        use stratum_core::node::{ContainerRecord, ContainerTree};

        let tree = ContainerTree::from_records(&[ContainerRecord::new("root").sized(8.0, 8.0)])
            .unwrap();
        let flat = stratum_core::flatten::flatten(&tree);
        let mut c = WgpuCompositor::new(GpuConfig::software());
        c.initialize(Viewport::new(8, 8), &flat.records).unwrap();
        assert_eq!(c.capacity(), Some(16));

        // Grow without writing, as when the following write fails.
        c.grow_containers(40).unwrap();
        assert_eq!(c.capacity(), Some(64));
        c.dispatch().unwrap();
        c.readback().unwrap();
        c.cleanup();
    }

    #[test]
    #[ignore = "requires a GPU adapter"]
    fn composites_a_solid_square() {
        use stratum_core::node::{ContainerRecord, ContainerTree, Fill, Style};

        let tree = ContainerTree::from_records(&[ContainerRecord::new("root")
            .sized(32.0, 32.0)
            .styled(Style {
                fill: Fill::solid([1.0, 0.0, 0.0, 1.0]),
                ..Style::default()
            })])
        .unwrap();
        let flat = stratum_core::flatten::flatten(&tree);
        let viewport = Viewport::new(64, 48);

        let mut c = WgpuCompositor::new(GpuConfig::software());
        c.initialize(viewport, &flat.records).unwrap();
        c.upload(
            &MouseRecord::default(),
            &flat.records,
            &ViewportRecord {
                width: 64.0,
                height: 48.0,
                count: 1,
                max_layer: flat.max_layer,
            },
        )
        .unwrap();
        c.dispatch().unwrap();
        let image = c.readback().unwrap();
        assert_eq!((image.width, image.height), (64, 48));
        assert_eq!(image.pixel(10, 10), Some([255, 0, 0, 255]));
        assert_eq!(image.pixel(40, 40), Some([0, 0, 0, 0]));

        c.cleanup();
        c.cleanup();
        assert!(c.image().is_none());
    }
}
