// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pointer input state.
//!
//! Hosts feed raw input into a [`PointerState`] between ticks; the frame
//! scheduler reads it once per tick.

use kurbo::{Point, Size};

/// Current pointer state.
///
/// The position is normalized to `[0, 1]` on both axes with the origin at
/// the top-left of the viewport. Scroll is tracked both as an accumulated
/// absolute value and as the delta gathered since the last tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerState {
    position: Point,
    click: bool,
    scroll: f32,
    scroll_delta: f32,
}

impl Default for PointerState {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerState {
    /// Pointer at the viewport center, released, no scroll.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            position: Point::new(0.5, 0.5),
            click: false,
            scroll: 0.0,
            scroll_delta: 0.0,
        }
    }

    /// Moves the pointer, clamping each coordinate into `[0, 1]`.
    ///
    /// Non-finite coordinates leave the position unchanged.
    pub fn set_position(&mut self, x: f64, y: f64) {
        if x.is_finite() && y.is_finite() {
            self.position = Point::new(x.clamp(0.0, 1.0), y.clamp(0.0, 1.0));
        }
    }

    /// Sets the primary button state.
    pub fn set_click(&mut self, down: bool) {
        self.click = down;
    }

    /// Adds a scroll step.
    pub fn add_scroll(&mut self, delta: f32) {
        if delta.is_finite() {
            self.scroll += delta;
            self.scroll_delta += delta;
        }
    }

    /// Normalized position.
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    /// Position in pixels for a viewport of `size`.
    #[must_use]
    pub fn to_pixels(&self, size: Size) -> Point {
        Point::new(self.position.x * size.width, self.position.y * size.height)
    }

    /// Whether the primary button is down.
    #[must_use]
    pub fn click(&self) -> bool {
        self.click
    }

    /// Accumulated scroll value.
    #[must_use]
    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    /// Scroll gathered since the last tick.
    #[must_use]
    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }

    /// Consumes the per-tick scroll delta.
    pub(crate) fn end_tick(&mut self) {
        self.scroll_delta = 0.0;
    }
}
