// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input record buffers and the output image.

use stratum_core::compositor::{MouseRecord, Viewport, ViewportRecord};
use stratum_core::flatten::FlatRecord;
use tracing::debug;

/// Format of the composited image.
pub const OUTPUT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Floats in the shader's debug record.
pub const DEBUG_LEN: usize = 32;

/// Smallest container buffer, in records.
const MIN_CAPACITY: usize = 16;

/// Capacity, in records, for a container buffer that must hold `needed`
/// records and currently holds `current`.
#[must_use]
pub fn grown_capacity(current: usize, needed: usize) -> usize {
    let needed = needed.max(1);
    if needed <= current {
        return current;
    }
    needed.next_power_of_two().max(MIN_CAPACITY)
}

fn byte_len(records: usize) -> u64 {
    (records * size_of::<FlatRecord>()) as u64
}

/// The shader's storage inputs.
#[derive(Debug)]
pub struct BufferArena {
    pub(crate) mouse: wgpu::Buffer,
    pub(crate) containers: wgpu::Buffer,
    pub(crate) viewport: wgpu::Buffer,
    pub(crate) debug: wgpu::Buffer,
    capacity: usize,
    label: &'static str,
}

impl BufferArena {
    /// Allocates all four buffers, the container buffer sized for at least
    /// `records` records.
    #[must_use]
    pub fn new(device: &wgpu::Device, records: usize, label: &'static str) -> Self {
        let storage = |name: &str, size: u64, extra: wgpu::BufferUsages| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("{label} {name}")),
                size,
                usage: wgpu::BufferUsages::STORAGE | extra,
                mapped_at_creation: false,
            })
        };
        let capacity = grown_capacity(0, records);
        Self {
            mouse: storage(
                "mouse",
                size_of::<MouseRecord>() as u64,
                wgpu::BufferUsages::COPY_DST,
            ),
            containers: storage(
                "containers",
                byte_len(capacity),
                wgpu::BufferUsages::COPY_DST,
            ),
            viewport: storage(
                "viewport",
                size_of::<ViewportRecord>() as u64,
                wgpu::BufferUsages::COPY_DST,
            ),
            debug: storage(
                "debug",
                (DEBUG_LEN * size_of::<f32>()) as u64,
                wgpu::BufferUsages::COPY_SRC,
            ),
            capacity,
            label,
        }
    }

    /// Container capacity in records.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Reallocates the container buffer if `records` records do not fit.
    /// Returns `true` if it did, in which case bind groups must be rebuilt.
    pub fn ensure_capacity(&mut self, device: &wgpu::Device, records: usize) -> bool {
        let capacity = grown_capacity(self.capacity, records);
        if capacity == self.capacity {
            return false;
        }
        let containers = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} containers", self.label)),
            size: byte_len(capacity),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let old = std::mem::replace(&mut self.containers, containers);
        old.destroy();
        debug!(from = self.capacity, to = capacity, "grew container buffer");
        self.capacity = capacity;
        true
    }

    /// Queues writes of all three input records.
    pub fn write(
        &self,
        queue: &wgpu::Queue,
        mouse: &MouseRecord,
        records: &[FlatRecord],
        viewport: &ViewportRecord,
    ) {
        queue.write_buffer(&self.mouse, 0, bytemuck::bytes_of(mouse));
        if !records.is_empty() {
            queue.write_buffer(&self.containers, 0, bytemuck::cast_slice(records));
        }
        queue.write_buffer(&self.viewport, 0, bytemuck::bytes_of(viewport));
    }

    /// Destroys the buffers: debug, mouse, containers, viewport.
    pub fn release(self) {
        self.debug.destroy();
        self.mouse.destroy();
        self.containers.destroy();
        self.viewport.destroy();
    }
}

/// The storage texture the shader writes.
#[derive(Debug)]
pub struct OutputTarget {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    viewport: Viewport,
}

impl OutputTarget {
    /// Allocates an image of `viewport` size.
    #[must_use]
    pub fn new(device: &wgpu::Device, viewport: Viewport, label: &'static str) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&format!("{label} output")),
            size: extent(viewport),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OUTPUT_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            texture,
            view,
            viewport,
        }
    }

    /// Size of the image.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Destroys the texture.
    pub fn release(self) {
        self.texture.destroy();
    }
}

pub(crate) fn extent(viewport: Viewport) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width: viewport.width,
        height: viewport.height,
        depth_or_array_layers: 1,
    }
}
