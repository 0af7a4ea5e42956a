// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use stratum_core::time::HostTime;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Phases become duration slices; ticks, faults and summaries are instants.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        events.push(match recorded {
            RecordedEvent::Tick(e) => json!({
                "ph": "i",
                "name": "Tick",
                "cat": "Scheduler",
                "ts": us(e.now),
                "pid": 0,
                "tid": 0,
                "s": "g",
                "args": {
                    "frame_index": e.frame_index,
                    "width": e.width,
                    "height": e.height,
                }
            }),
            RecordedEvent::PhaseBegin(e) => json!({
                "ph": "B",
                "name": e.phase.name(),
                "cat": "Tick",
                "ts": us(e.timestamp),
                "pid": 0,
                "tid": 0,
                "args": {
                    "frame_index": e.frame_index,
                }
            }),
            RecordedEvent::PhaseEnd(e) => json!({
                "ph": "E",
                "name": e.phase.name(),
                "cat": "Tick",
                "ts": us(e.timestamp),
                "pid": 0,
                "tid": 0,
                "args": {
                    "frame_index": e.frame_index,
                }
            }),
            RecordedEvent::CallbackFault(e) => json!({
                "ph": "i",
                "name": "CallbackFault",
                "cat": "Interaction",
                "ts": 0,
                "pid": 0,
                "tid": 0,
                "s": "t",
                "args": {
                    "frame_index": e.frame_index,
                    "node": format!("{:?}", e.node),
                    "kind": format!("{:?}", e.kind),
                }
            }),
            RecordedEvent::TickSummary(s) => json!({
                "ph": "i",
                "name": "TickSummary",
                "cat": "Summary",
                "ts": us(s.end),
                "pid": 0,
                "tid": 0,
                "s": "g",
                "args": {
                    "frame_index": s.frame_index,
                    "dirty": s.dirty,
                    "image_changed": s.image_changed,
                    "records": s.records,
                    "transitions": s.transitions,
                    "callbacks_fired": s.callbacks_fired,
                    "callback_faults": s.callback_faults,
                    "tick_us": us(s.end) - us(s.now),
                }
            }),
        });
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn us(t: HostTime) -> f64 {
    t.nanos() as f64 / 1000.0
}
