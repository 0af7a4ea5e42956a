// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use stratum_core::time::HostTime;
use stratum_core::trace::{
    CallbackFaultEvent, PhaseBeginEvent, PhaseEndEvent, TickEvent, TickSummary, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    summaries_only: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("summaries_only", &self.summaries_only)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            summaries_only: false,
        }
    }

    /// Only print tick summaries and callback faults.
    #[must_use]
    pub fn summaries_only(mut self) -> Self {
        self.summaries_only = true;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn us(t: HostTime) -> f64 {
    t.nanos() as f64 / 1000.0
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_tick(&mut self, e: &TickEvent) {
        if self.summaries_only {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[tick] frame={} now={:.1}µs viewport={}x{}",
            e.frame_index,
            us(e.now),
            e.width,
            e.height,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        if self.summaries_only {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}µs",
            e.frame_index,
            e.phase.name(),
            us(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        if self.summaries_only {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}µs",
            e.frame_index,
            e.phase.name(),
            us(e.timestamp),
        );
    }

    fn on_callback_fault(&mut self, e: &CallbackFaultEvent) {
        let _ = writeln!(
            self.writer,
            "[fault] frame={} node={:?} kind={:?}",
            e.frame_index, e.node, e.kind,
        );
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        let work = if s.dirty { "dirty" } else { "skip" };
        let image = if s.image_changed { "new" } else { "kept" };
        let _ = writeln!(
            self.writer,
            "[summary] frame={} {work} image={image} records={} transitions={} \
             fired={} faults={} took={:.1}µs",
            s.frame_index,
            s.records,
            s.transitions,
            s.callbacks_fired,
            s.callback_faults,
            s.end.saturating_duration_since(s.now).nanos() as f64 / 1000.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::trace::PhaseKind;

    #[test]
    fn pretty_print_tick() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_tick(&TickEvent {
            frame_index: 1,
            now: HostTime(1_000_000),
            width: 640,
            height: 480,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("[tick]"), "got: {output}");
        assert!(output.contains("frame=1"), "got: {output}");
        assert!(output.contains("640x480"), "got: {output}");
    }

    #[test]
    fn summaries_only_skips_phases() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new()).summaries_only();
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 2,
            phase: PhaseKind::Dispatch,
            timestamp: HostTime(0),
        });
        sink.on_tick_summary(&TickSummary {
            frame_index: 2,
            end: HostTime(2_500),
            dirty: true,
            records: 4,
            ..TickSummary::default()
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(!output.contains("[phase"), "got: {output}");
        assert!(output.contains("frame=2 dirty"), "got: {output}");
        assert!(output.contains("took=2.5µs"), "got: {output}");
    }
}
