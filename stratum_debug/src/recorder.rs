// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].

use stratum_core::node::{EventKind, NodeId};
use stratum_core::time::HostTime;
use stratum_core::trace::{
    CallbackFaultEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TickEvent, TickSummary,
    TraceSink,
};

const TAG_TICK: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_CALLBACK_FAULT: u8 = 4;
const TAG_TICK_SUMMARY: u8 = 5;

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Input => 0,
            PhaseKind::Sync => 1,
            PhaseKind::Flatten => 2,
            PhaseKind::Upload => 3,
            PhaseKind::Dispatch => 4,
            PhaseKind::Readback => 5,
        });
    }

    fn write_kind(&mut self, k: EventKind) {
        self.write_u8(match k {
            EventKind::HoverOut => 0,
            EventKind::HoverIn => 1,
            EventKind::Click => 2,
            EventKind::Toggle => 3,
            EventKind::Scroll => 4,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_tick(&mut self, e: &TickEvent) {
        self.write_u8(TAG_TICK);
        self.write_u64(e.frame_index);
        self.write_u64(e.now.nanos());
        self.write_u32(e.width);
        self.write_u32(e.height);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.nanos());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.nanos());
    }

    fn on_callback_fault(&mut self, e: &CallbackFaultEvent) {
        self.write_u8(TAG_CALLBACK_FAULT);
        self.write_u64(e.frame_index);
        self.write_u32(e.node.index());
        self.write_u32(e.node.generation());
        self.write_kind(e.kind);
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        self.write_u8(TAG_TICK_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_u64(s.now.nanos());
        self.write_u64(s.end.nanos());
        self.write_bool(s.dirty);
        self.write_bool(s.image_changed);
        self.write_u32(s.transitions);
        self.write_u32(s.callbacks_fired);
        self.write_u32(s.callback_faults);
        self.write_u32(s.records);
    }
}

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`TickEvent`].
    Tick(TickEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`CallbackFaultEvent`].
    CallbackFault(CallbackFaultEvent),
    /// A [`TickSummary`].
    TickSummary(TickSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first truncated record or unknown tag.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_bool(&mut self) -> Option<bool> {
        self.read_u8().map(|b| b != 0)
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        PhaseKind::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_kind(&mut self) -> Option<EventKind> {
        EventKind::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn decode_tick(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Tick(TickEvent {
            frame_index: self.read_u64()?,
            now: self.read_time()?,
            width: self.read_u32()?,
            height: self.read_u32()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_callback_fault(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let index = self.read_u32()?;
        let generation = self.read_u32()?;
        Some(RecordedEvent::CallbackFault(CallbackFaultEvent {
            frame_index,
            node: NodeId::from_raw(index, generation),
            kind: self.read_kind()?,
        }))
    }

    fn decode_tick_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TickSummary(TickSummary {
            frame_index: self.read_u64()?,
            now: self.read_time()?,
            end: self.read_time()?,
            dirty: self.read_bool()?,
            image_changed: self.read_bool()?,
            transitions: self.read_u32()?,
            callbacks_fired: self.read_u32()?,
            callback_faults: self.read_u32()?,
            records: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_u8()? {
            TAG_TICK => self.decode_tick(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_CALLBACK_FAULT => self.decode_callback_fault(),
            TAG_TICK_SUMMARY => self.decode_tick_summary(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary() -> TickSummary {
        TickSummary {
            frame_index: 7,
            now: HostTime(1_000_000),
            end: HostTime(1_400_000),
            dirty: true,
            image_changed: true,
            transitions: 2,
            callbacks_fired: 1,
            callback_faults: 1,
            records: 12,
        }
    }

    #[test]
    fn recorded_tick_decodes() {
        let mut rec = RecorderSink::new();
        rec.on_tick(&TickEvent {
            frame_index: 3,
            now: HostTime(5_000),
            width: 800,
            height: 600,
        });
        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 1);
        match &events[0] {
            RecordedEvent::Tick(e) => {
                assert_eq!(e.frame_index, 3);
                assert_eq!(e.now, HostTime(5_000));
                assert_eq!((e.width, e.height), (800, 600));
            }
            other => panic!("expected Tick, got {other:?}"),
        }
    }

    #[test]
    fn callback_fault_keeps_node_and_kind() {
        let mut rec = RecorderSink::new();
        rec.on_callback_fault(&CallbackFaultEvent {
            frame_index: 9,
            node: NodeId::from_raw(4, 2),
            kind: EventKind::Toggle,
        });
        let events: Vec<_> = decode(rec.as_bytes()).collect();
        match &events[..] {
            [RecordedEvent::CallbackFault(e)] => {
                assert_eq!(e.node, NodeId::from_raw(4, 2));
                assert_eq!(e.kind, EventKind::Toggle);
            }
            other => panic!("expected one CallbackFault, got {other:?}"),
        }
    }

    #[test]
    fn mixed_stream_preserves_order() {
        let mut rec = RecorderSink::new();
        rec.on_phase_begin(&PhaseBeginEvent {
            frame_index: 7,
            phase: PhaseKind::Readback,
            timestamp: HostTime(10),
        });
        rec.on_phase_end(&PhaseEndEvent {
            frame_index: 7,
            phase: PhaseKind::Readback,
            timestamp: HostTime(20),
        });
        rec.on_tick_summary(&summary());

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(
            events[0],
            RecordedEvent::PhaseBegin(PhaseBeginEvent {
                phase: PhaseKind::Readback,
                ..
            })
        ));
        assert!(matches!(events[1], RecordedEvent::PhaseEnd(_)));
        match &events[2] {
            RecordedEvent::TickSummary(s) => {
                assert!(s.dirty && s.image_changed);
                assert_eq!(s.records, 12);
                assert_eq!(s.end, HostTime(1_400_000));
            }
            other => panic!("expected TickSummary, got {other:?}"),
        }
    }

    #[test]
    fn truncated_record_stops_decoding() {
        let mut rec = RecorderSink::new();
        rec.on_tick_summary(&summary());
        rec.on_tick_summary(&summary());
        let bytes = rec.into_bytes();
        let cut = &bytes[..bytes.len() - 3];
        assert_eq!(decode(cut).count(), 1);
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        assert_eq!(decode(&[]).count(), 0);
    }
}
