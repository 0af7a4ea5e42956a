// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-loop counters and a rolling frame-rate estimate.

use alloc::collections::VecDeque;

use crate::time::{Duration, HostTime};

/// Session counters.
///
/// Frame rate is averaged over the last `window` frame intervals.
#[derive(Clone, Debug)]
pub struct Telemetry {
    frames: u64,
    dispatches: u64,
    dispatch_skips: u64,
    readbacks: u64,
    readback_skips: u64,
    failed_ticks: u64,
    callback_faults: u64,
    window: usize,
    intervals: VecDeque<Duration>,
    window_total: Duration,
    last_frame: Option<HostTime>,
}

/// A point-in-time copy of the counters, for logging and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TelemetrySnapshot {
    /// Ticks processed.
    pub frames: u64,
    /// Compute dispatches issued.
    pub dispatches: u64,
    /// Ticks that skipped the compute dispatch.
    pub dispatch_skips: u64,
    /// Image readbacks performed.
    pub readbacks: u64,
    /// Ticks that skipped the readback.
    pub readback_skips: u64,
    /// Dirty ticks that failed in upload, dispatch or readback.
    pub failed_ticks: u64,
    /// Callbacks that returned an error.
    pub callback_faults: u64,
    /// Rolling frames per second, zero until two frames were seen.
    pub fps: f64,
}

impl TelemetrySnapshot {
    /// Share of ticks that skipped the dispatch, in percent.
    #[must_use]
    pub fn dispatch_skip_percent(&self) -> f64 {
        percent(self.dispatch_skips, self.frames)
    }

    /// Share of ticks that skipped the readback, in percent.
    #[must_use]
    pub fn readback_skip_percent(&self) -> f64 {
        percent(self.readback_skips, self.frames)
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

impl Telemetry {
    /// Creates empty counters with a frame-rate window of `window` frames.
    #[must_use]
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            frames: 0,
            dispatches: 0,
            dispatch_skips: 0,
            readbacks: 0,
            readback_skips: 0,
            failed_ticks: 0,
            callback_faults: 0,
            window,
            intervals: VecDeque::with_capacity(window),
            window_total: Duration::ZERO,
            last_frame: None,
        }
    }

    /// Records the start of a tick.
    pub fn record_frame(&mut self, now: HostTime) {
        self.frames += 1;
        if let Some(last) = self.last_frame {
            let interval = now.saturating_duration_since(last);
            if self.intervals.len() == self.window
                && let Some(old) = self.intervals.pop_front()
            {
                self.window_total = Duration(self.window_total.0 - old.0);
            }
            self.intervals.push_back(interval);
            self.window_total = self.window_total + interval;
        }
        self.last_frame = Some(now);
    }

    /// Records a compute dispatch.
    pub fn record_dispatch(&mut self) {
        self.dispatches += 1;
    }

    /// Records a readback.
    pub fn record_readback(&mut self) {
        self.readbacks += 1;
    }

    /// Records a clean tick: both dispatch and readback were skipped.
    pub fn record_skip(&mut self) {
        self.dispatch_skips += 1;
        self.readback_skips += 1;
    }

    /// Records a dirty tick whose GPU work failed.
    pub fn record_failure(&mut self) {
        self.failed_ticks += 1;
    }

    /// Adds callback faults.
    pub fn record_callback_faults(&mut self, faults: u32) {
        self.callback_faults += u64::from(faults);
    }

    /// Ticks processed so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Rolling frames per second.
    #[must_use]
    pub fn fps(&self) -> f64 {
        if self.intervals.is_empty() || self.window_total == Duration::ZERO {
            return 0.0;
        }
        let mean = self.window_total.as_secs_f64() / self.intervals.len() as f64;
        1.0 / mean
    }

    /// Copies the counters.
    #[must_use]
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            frames: self.frames,
            dispatches: self.dispatches,
            dispatch_skips: self.dispatch_skips,
            readbacks: self.readbacks,
            readback_skips: self.readback_skips,
            failed_ticks: self.failed_ticks,
            callback_faults: self.callback_faults,
            fps: self.fps(),
        }
    }

    /// Clears every counter.
    pub fn reset(&mut self) {
        *self = Self::new(self.window);
    }
}
