// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device and queue ownership.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use stratum_core::compositor::CompositorError;
use tracing::{error, info, warn};

use crate::config::GpuConfig;

/// A device, its queue and a lost-device flag.
///
/// Validation errors that are not caught by an error scope are logged
/// instead of panicking.
#[derive(Debug)]
pub struct GpuContext {
    /// The logical device.
    pub device: wgpu::Device,
    /// The device's submission queue.
    pub queue: wgpu::Queue,
    info: Option<wgpu::AdapterInfo>,
    lost: Arc<AtomicBool>,
}

impl GpuContext {
    /// Requests an adapter and device according to `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CompositorError::DeviceUnavailable`] if no adapter matches
    /// or the device request fails.
    pub fn acquire(config: &GpuConfig) -> Result<Self, CompositorError> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: config.power_preference,
            force_fallback_adapter: config.force_fallback_adapter,
            compatible_surface: None,
        }))
        .ok_or_else(|| CompositorError::DeviceUnavailable("no suitable adapter".to_string()))?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some(config.label),
                ..wgpu::DeviceDescriptor::default()
            },
            None,
        ))
        .map_err(|e| CompositorError::DeviceUnavailable(e.to_string()))?;

        let info = adapter.get_info();
        info!(
            adapter = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "acquired GPU device"
        );
        let mut ctx = Self::from_parts(device, queue);
        ctx.info = Some(info);
        Ok(ctx)
    }

    /// Wraps a device the host already owns.
    #[must_use]
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            if reason != wgpu::DeviceLostReason::Destroyed {
                warn!(?reason, %message, "GPU device lost");
            }
            flag.store(true, Ordering::Release);
        });
        device.on_uncaptured_error(Box::new(|err: wgpu::Error| {
            error!(%err, "uncaptured GPU error");
        }));
        Self {
            device,
            queue,
            info: None,
            lost,
        }
    }

    /// Adapter information, if this context requested its own adapter.
    #[must_use]
    pub fn adapter_info(&self) -> Option<&wgpu::AdapterInfo> {
        self.info.as_ref()
    }

    /// Returns `true` once the device has been lost.
    #[must_use]
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    /// Fails with [`CompositorError::ResourceLost`] if the device is gone.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn check(&self) -> Result<(), CompositorError> {
        if self.is_lost() {
            return Err(CompositorError::ResourceLost("device lost".to_string()));
        }
        Ok(())
    }

    /// Runs `f` inside an error scope and returns the first error it
    /// raised, if any.
    pub(crate) fn scoped<T>(
        &self,
        filter: wgpu::ErrorFilter,
        f: impl FnOnce(&wgpu::Device) -> T,
    ) -> Result<T, wgpu::Error> {
        self.device.push_error_scope(filter);
        let out = f(&self.device);
        match pollster::block_on(self.device.pop_error_scope()) {
            Some(err) => Err(err),
            None => Ok(out),
        }
    }
}
