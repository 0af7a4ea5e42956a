// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Visual properties of a container.

use alloc::string::String;

/// Linear RGBA color, each channel in `0.0..=1.0`.
pub type Rgba = [f32; 4];

/// A two-stop gradient fill.
///
/// When `color_1` has zero alpha the fill is solid `color`. A negative alpha
/// on `color` marks an *absent* override: state fills (hover, click, toggle)
/// default to this so the compositor falls back to the base fill.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fill {
    /// First gradient stop, or the solid color.
    pub color: Rgba,
    /// Second gradient stop.
    pub color_1: Rgba,
    /// Gradient direction in degrees.
    pub rotation: f32,
}

impl Fill {
    /// Opaque black, the default base fill.
    pub const BLACK: Self = Self::solid([0.0, 0.0, 0.0, 1.0]);

    /// No override.
    pub const UNSET: Self = Self::solid([0.0, 0.0, 0.0, -1.0]);

    /// A solid fill.
    #[inline]
    #[must_use]
    pub const fn solid(color: Rgba) -> Self {
        Self {
            color,
            color_1: [0.0; 4],
            rotation: 0.0,
        }
    }

    /// A linear gradient between two stops.
    #[inline]
    #[must_use]
    pub const fn gradient(color: Rgba, color_1: Rgba, rotation: f32) -> Self {
        Self {
            color,
            color_1,
            rotation,
        }
    }

    /// Returns `true` if this fill overrides the base fill.
    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.color[3] >= 0.0
    }
}

impl Default for Fill {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Container border.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Border {
    /// Corner radius in pixels.
    pub radius: f32,
    /// Stroke width in pixels. Zero disables the border.
    pub width: f32,
    /// Stroke fill.
    pub fill: Fill,
}

impl Default for Border {
    fn default() -> Self {
        Self {
            radius: 0.0,
            width: 0.0,
            fill: Fill::BLACK,
        }
    }
}

/// Drop shadow behind a container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxShadow {
    /// Offset `[x, y]` in pixels and spread in the third component.
    pub offset: [f32; 3],
    /// Blur radius in pixels. Zero with a transparent color disables the
    /// shadow.
    pub blur: f32,
    /// Shadow color.
    pub color: Rgba,
}

impl Default for BoxShadow {
    fn default() -> Self {
        Self {
            offset: [0.0; 3],
            blur: 0.0,
            color: [0.0; 4],
        }
    }
}

/// Whether a container clips its descendants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Overflow {
    /// Descendants may draw and receive input outside the container.
    #[default]
    Visible,
    /// Descendants are clipped to the container bounds, for drawing and for
    /// hit testing.
    Hidden,
}

/// A text payload carried through to the compositor's glyph pass.
#[derive(Clone, Debug, PartialEq)]
pub struct TextPayload {
    /// The string to draw.
    pub text: String,
    /// Font family name.
    pub font: String,
    /// Glyph fill.
    pub fill: Fill,
    /// Font size in pixels.
    pub scale: f32,
    /// Offset from the container origin.
    pub offset: [f32; 2],
}

impl Default for TextPayload {
    fn default() -> Self {
        Self {
            text: String::new(),
            font: String::new(),
            fill: Fill::solid([1.0, 1.0, 1.0, 1.0]),
            scale: 12.0,
            offset: [0.0; 2],
        }
    }
}

/// An image payload carried through to the compositor's texture pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ImagePayload {
    /// Host-side image name.
    pub name: String,
    /// Preserve the source aspect ratio when fitting.
    pub keep_aspect: bool,
}

/// Everything about a container that affects its pixels but not its
/// geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Style {
    /// Base fill.
    pub fill: Fill,
    /// Fill while hovered.
    pub hover: Fill,
    /// Fill while pressed.
    pub click: Fill,
    /// Fill while toggled on.
    pub toggle: Fill,
    /// Border.
    pub border: Border,
    /// Drop shadow.
    pub shadow: BoxShadow,
    /// Optional text payload.
    pub text: Option<TextPayload>,
    /// Optional image payload.
    pub image: Option<ImagePayload>,
    /// Free-form user data, ignored by the pipeline.
    pub data: String,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: Fill::BLACK,
            hover: Fill::UNSET,
            click: Fill::UNSET,
            toggle: Fill::UNSET,
            border: Border::default(),
            shadow: BoxShadow::default(),
            text: None,
            image: None,
            data: String::new(),
        }
    }
}
