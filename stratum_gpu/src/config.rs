// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device selection settings.

/// How the compositor picks and labels its GPU device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GpuConfig {
    /// Adapter power preference.
    pub power_preference: wgpu::PowerPreference,
    /// Prefer a software adapter, e.g. for CI machines without a GPU.
    pub force_fallback_adapter: bool,
    /// Prefix for every GPU object label.
    pub label: &'static str,
}

impl GpuConfig {
    /// Default adapter, labels prefixed with `stratum`.
    pub const DEFAULT: Self = Self {
        power_preference: wgpu::PowerPreference::None,
        force_fallback_adapter: false,
        label: "stratum",
    };

    /// Prefers the integrated GPU.
    #[must_use]
    pub const fn low_power() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::LowPower,
            ..Self::DEFAULT
        }
    }

    /// Prefers a software adapter.
    #[must_use]
    pub const fn software() -> Self {
        Self {
            force_fallback_adapter: true,
            ..Self::DEFAULT
        }
    }
}

impl Default for GpuConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
