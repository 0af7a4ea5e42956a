// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-tick change detection.
//!
//! The [`ChangeDetector`] is the single gate in front of all GPU work. A
//! tick is dirty when the pointer moved or scrolled by more than the
//! configured epsilon, the button state changed, or an update was
//! explicitly requested (first frame, resize, tree mutation, rebuild).
//! Clean ticks skip flatten, upload, dispatch and readback entirely.

use kurbo::Point;

use crate::input::PointerState;

/// Decides whether a tick needs GPU work.
#[derive(Clone, Copy, Debug)]
pub struct ChangeDetector {
    last_position: Point,
    last_click: bool,
    last_scroll: f32,
    needs_update: bool,
    skips: u64,
    pointer_epsilon: f64,
    scroll_epsilon: f32,
}

impl ChangeDetector {
    /// Creates a detector whose first check is dirty.
    #[must_use]
    pub const fn new(pointer_epsilon: f64, scroll_epsilon: f32) -> Self {
        Self {
            last_position: Point::new(0.5, 0.5),
            last_click: false,
            last_scroll: 0.0,
            needs_update: true,
            skips: 0,
            pointer_epsilon,
            scroll_epsilon,
        }
    }

    /// Forces the next [`check`](Self::check) to report dirty.
    pub fn request_update(&mut self) {
        self.needs_update = true;
    }

    /// Whether an update has been requested and not yet consumed.
    #[must_use]
    pub fn update_requested(&self) -> bool {
        self.needs_update
    }

    /// Number of clean checks so far.
    #[must_use]
    pub fn skips(&self) -> u64 {
        self.skips
    }

    /// Compares `pointer` with the last observed state.
    ///
    /// Returns `true` if the tick is dirty. Consumes any pending update
    /// request. The position and scroll baselines only advance when they
    /// trip their epsilon, so slow drift still adds up to a dirty tick.
    pub fn check(&mut self, pointer: &PointerState) -> bool {
        let position = pointer.position();
        let moved = (position.x - self.last_position.x).abs() > self.pointer_epsilon
            || (position.y - self.last_position.y).abs() > self.pointer_epsilon;
        let scrolled = (pointer.scroll() - self.last_scroll).abs() > self.scroll_epsilon;
        let clicked = pointer.click() != self.last_click;

        let dirty = self.needs_update || moved || scrolled || clicked;
        if moved {
            self.last_position = position;
        }
        if scrolled {
            self.last_scroll = pointer.scroll();
        }
        self.last_click = pointer.click();
        self.needs_update = false;
        if !dirty {
            self.skips += 1;
        }
        dirty
    }

    /// Forgets all observed state and requests an update.
    pub fn reset(&mut self) {
        *self = Self::new(self.pointer_epsilon, self.scroll_epsilon);
    }
}
