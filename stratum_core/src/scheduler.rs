// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-tick frame scheduler.
//!
//! A [`Session`] owns everything one running UI needs: the container tree,
//! its flattened cache, the pointer state, the change detector, telemetry
//! and the [`Compositor`]. It is also the only place that moves the
//! compositor through its [`CompositorState`] lifecycle.
//!
//! Each [`tick`](Session::tick) runs the same fixed sequence:
//!
//! ```text
//!   viewport poll ──► telemetry ──► hit detection ──► callback dispatch
//!                                                          │
//!        ┌─────────────────────────────────────────────────┘
//!        ▼
//!   change detection ──► dirty?  flatten ──► upload ──► dispatch ──► readback
//!                          │
//!                          └──► clean: skip counters only
//!        ──► present ──► request redraw
//! ```
//!
//! Callbacks run before change detection, so styles they change are
//! flattened and uploaded in the same tick.

use tracing::{debug, error, info, trace, warn};

use crate::change::ChangeDetector;
use crate::compositor::{
    CompositedImage, Compositor, CompositorError, CompositorState, Host, MouseRecord, Viewport,
    ViewportRecord,
};
use crate::flatten::{FlatTree, flatten};
use crate::hit::{HitDetector, HitOutcome};
use crate::input::PointerState;
use crate::node::{ContainerRecord, ContainerTree, TreeError};
use crate::sync::{StateSynchronizer, SyncReport};
use crate::telemetry::{Telemetry, TelemetrySnapshot};
use crate::time::{Duration, HostTime};
use crate::trace::{PhaseBeginEvent, PhaseEndEvent, PhaseKind, TickEvent, TickSummary, Tracer};

/// Frame scheduler configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerConfig {
    /// Target interval between ticks. The host's timer uses this; the
    /// session itself runs whenever [`Session::tick`] is called.
    pub tick_interval: Duration,
    /// Number of frame intervals averaged for the FPS estimate.
    pub fps_window: usize,
    /// Pointer movement, in normalized units, below which a tick is clean.
    pub pointer_epsilon: f64,
    /// Scroll change below which a tick is clean. Scroll callbacks fire on
    /// any change.
    pub scroll_epsilon: f32,
    /// Ticks between `info!` performance summaries. Zero disables them.
    pub telemetry_log_interval: u64,
}

impl SchedulerConfig {
    /// 60 Hz ticks, 60-frame FPS window, 0.001 epsilons, a performance
    /// summary every 120 ticks.
    pub const DEFAULT: Self = Self {
        tick_interval: Duration::from_millis(16),
        fps_window: 60,
        pointer_epsilon: 0.001,
        scroll_epsilon: 0.001,
        telemetry_log_interval: 120,
    };

    /// 30 Hz ticks for battery-constrained hosts.
    #[must_use]
    pub const fn low_power() -> Self {
        Self {
            tick_interval: Duration::from_millis(33),
            fps_window: 30,
            ..Self::DEFAULT
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Errors surfaced by [`Session`] lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `start` was called on a running session.
    #[error("session is already running")]
    AlreadyRunning,
    /// `tick` was called on a session that is not running.
    #[error("session is not running")]
    NotRunning,
    /// The compositor failed to initialize; the session stays stopped.
    #[error("compositor initialization failed")]
    Init(#[source] CompositorError),
    /// The compositor failed fatally mid-session; the session was stopped.
    #[error("compositor failed")]
    Compositor(#[source] CompositorError),
    /// A rebuilt tree was rejected; the old tree stays in place.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickOutcome {
    /// Tick counter.
    pub frame_index: u64,
    /// The viewport changed size this tick.
    pub resized: bool,
    /// Change detection requested GPU work.
    pub dirty: bool,
    /// A new image was read back.
    pub image_changed: bool,
    /// Hit detection results.
    pub hit: HitOutcome,
    /// Callback dispatch results.
    pub sync: SyncReport,
    /// Phase that failed on a dirty tick, if any.
    pub failed_phase: Option<PhaseKind>,
}

/// An owned UI session.
#[derive(Debug)]
pub struct Session<C: Compositor> {
    config: SchedulerConfig,
    compositor: C,
    state: CompositorState,
    tree: ContainerTree,
    flat: FlatTree,
    pointer: PointerState,
    hit: HitDetector,
    sync: StateSynchronizer,
    change: ChangeDetector,
    telemetry: Telemetry,
    viewport: Viewport,
    started_at: HostTime,
    frame_index: u64,
}

impl<C: Compositor> Session<C> {
    /// Creates a stopped session.
    #[must_use]
    pub fn new(tree: ContainerTree, compositor: C, config: SchedulerConfig) -> Self {
        let flat = flatten(&tree);
        Self {
            compositor,
            state: CompositorState::Uninitialized,
            tree,
            flat,
            pointer: PointerState::new(),
            hit: HitDetector::new(),
            sync: StateSynchronizer::new(),
            change: ChangeDetector::new(config.pointer_epsilon, config.scroll_epsilon),
            telemetry: Telemetry::new(config.fps_window),
            viewport: Viewport::new(1, 1),
            started_at: HostTime::default(),
            frame_index: 0,
            config,
        }
    }

    // -- Accessors --

    /// Compositor lifecycle state.
    #[must_use]
    pub fn state(&self) -> CompositorState {
        self.state
    }

    /// Whether ticks run.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == CompositorState::Running
    }

    /// Scheduler configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The container tree.
    #[must_use]
    pub fn tree(&self) -> &ContainerTree {
        &self.tree
    }

    /// The container tree, for mutation and callback registration between
    /// ticks.
    pub fn tree_mut(&mut self) -> &mut ContainerTree {
        &mut self.tree
    }

    /// The flat records from the most recent flatten.
    #[must_use]
    pub fn flat(&self) -> &FlatTree {
        &self.flat
    }

    /// Current pointer state.
    #[must_use]
    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    /// Current viewport.
    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The compositor.
    #[must_use]
    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    /// The most recent composited image.
    #[must_use]
    pub fn image(&self) -> Option<&CompositedImage> {
        self.compositor.image()
    }

    /// Telemetry counters.
    #[must_use]
    pub fn telemetry(&self) -> TelemetrySnapshot {
        self.telemetry.snapshot()
    }

    // -- Input --

    /// Moves the pointer (normalized, clamped to `[0, 1]`).
    pub fn set_pointer(&mut self, x: f64, y: f64) {
        self.pointer.set_position(x, y);
    }

    /// Sets the primary button state.
    pub fn set_click(&mut self, down: bool) {
        self.pointer.set_click(down);
    }

    /// Adds a scroll step.
    pub fn add_scroll(&mut self, delta: f32) {
        self.pointer.add_scroll(delta);
    }

    // -- Lifecycle --

    /// Initializes the compositor and starts the session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyRunning`] if the session is running,
    /// or [`SessionError::Init`] if the compositor could not be
    /// initialized. In the latter case every partially created resource is
    /// released and the session stays uninitialized.
    pub fn start(&mut self, host: &impl Host) -> Result<(), SessionError> {
        if matches!(
            self.state,
            CompositorState::Running | CompositorState::Initializing
        ) {
            warn!("session start rejected: already running");
            return Err(SessionError::AlreadyRunning);
        }

        self.state = CompositorState::Initializing;
        let (width, height) = host.viewport_size();
        self.viewport = Viewport::new(width, height);
        self.flat = flatten(&self.tree);

        if let Err(err) = self.compositor.initialize(self.viewport, &self.flat.records) {
            error!(%err, "compositor initialization failed");
            self.state = CompositorState::Cleanup;
            self.compositor.cleanup();
            self.state = CompositorState::Uninitialized;
            return Err(SessionError::Init(err));
        }

        self.started_at = host.now();
        self.frame_index = 0;
        self.telemetry.reset();
        self.change.reset();
        self.state = CompositorState::Running;
        info!(
            width = self.viewport.width,
            height = self.viewport.height,
            containers = self.flat.len(),
            "session started"
        );
        Ok(())
    }

    /// Stops the session and releases every compositor resource.
    ///
    /// Safe to call at any point between ticks, and on a stopped session.
    pub fn stop(&mut self) {
        if self.state == CompositorState::Uninitialized {
            debug!("session stop ignored: not running");
            return;
        }
        self.state = CompositorState::Cleanup;
        self.compositor.cleanup();
        self.state = CompositorState::Uninitialized;
        info!(frames = self.telemetry.frames(), "session stopped");
    }

    /// Replaces the container tree (hot reload).
    ///
    /// Every [`NodeId`](crate::node::NodeId) issued by the old tree becomes
    /// stale. The next tick is forced dirty and uploads the new records,
    /// growing the container buffer as needed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Tree`] if the records do not form a valid
    /// tree; the old tree stays in place.
    pub fn rebuild_tree(&mut self, records: &[ContainerRecord]) -> Result<(), SessionError> {
        let generation = self.tree.generation().wrapping_add(1);
        self.tree = ContainerTree::with_generation(records, generation)?;
        self.flat = flatten(&self.tree);
        self.hit = HitDetector::new();
        self.change.request_update();
        info!(containers = self.tree.len(), generation, "container tree rebuilt");
        Ok(())
    }

    // -- Frame loop --

    /// Runs one tick.
    ///
    /// Recoverable GPU failures are logged and reported through
    /// [`TickOutcome::failed_phase`]; the previous image stays on screen
    /// and the next tick retries.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotRunning`] if the session is not running,
    /// or [`SessionError::Compositor`] after a fatal compositor failure, in
    /// which case the session has been stopped.
    pub fn tick<H: Host>(
        &mut self,
        host: &mut H,
        tracer: &mut Tracer<'_>,
    ) -> Result<TickOutcome, SessionError> {
        if self.state != CompositorState::Running {
            return Err(SessionError::NotRunning);
        }

        let now = host.now();
        let frame_index = self.frame_index;
        self.frame_index += 1;
        let mut outcome = TickOutcome {
            frame_index,
            ..TickOutcome::default()
        };

        // 1. Viewport.
        let (width, height) = host.viewport_size();
        let viewport = Viewport::new(width, height);
        if viewport != self.viewport {
            match self.compositor.resize(viewport) {
                Ok(()) => {
                    debug!(
                        from_width = self.viewport.width,
                        from_height = self.viewport.height,
                        width = viewport.width,
                        height = viewport.height,
                        "viewport resized"
                    );
                    self.viewport = viewport;
                    outcome.resized = true;
                    self.change.request_update();
                }
                Err(err) if err.is_fatal() => return Err(self.fail(err)),
                Err(err) => warn!(%err, "viewport resize failed; keeping previous size"),
            }
        }
        tracer.tick(&TickEvent {
            frame_index,
            now,
            width: self.viewport.width,
            height: self.viewport.height,
        });

        // 2. Telemetry.
        self.telemetry.record_frame(now);

        // Input and callbacks, so their mutations land in this tick's upload.
        begin(tracer, frame_index, PhaseKind::Input, host.now());
        outcome.hit = self
            .hit
            .apply(&mut self.tree, &self.flat, &self.pointer, self.viewport.size());
        end(tracer, frame_index, PhaseKind::Input, host.now());

        begin(tracer, frame_index, PhaseKind::Sync, host.now());
        outcome.sync = self.sync.dispatch(&mut self.tree, tracer, frame_index);
        end(tracer, frame_index, PhaseKind::Sync, host.now());
        self.telemetry.record_callback_faults(outcome.sync.faults);

        // 3. Change detection. Per-node dirt only raises the request; the
        // detector alone decides.
        if self.tree.is_dirty() {
            self.change.request_update();
        }
        outcome.dirty = self.change.check(&self.pointer);

        // 4. GPU work.
        if outcome.dirty {
            match self.render(&*host, tracer, frame_index, now) {
                Ok(()) => outcome.image_changed = true,
                Err((_, err)) if err.is_fatal() => return Err(self.fail(err)),
                Err((phase, err)) => {
                    warn!(%err, phase = phase.name(), "tick dropped; keeping previous image");
                    self.telemetry.record_failure();
                    self.change.request_update();
                    outcome.failed_phase = Some(phase);
                }
            }
        } else {
            self.telemetry.record_skip();
        }
        self.pointer.end_tick();

        // 5. Present and redraw.
        if let Some(image) = self.compositor.image() {
            host.present(image, outcome.image_changed);
        }
        host.request_redraw();

        self.log_performance();
        tracer.tick_summary(&TickSummary {
            frame_index,
            now,
            end: host.now(),
            dirty: outcome.dirty,
            image_changed: outcome.image_changed,
            transitions: outcome.sync.transitions,
            callbacks_fired: outcome.sync.fired,
            callback_faults: outcome.sync.faults,
            records: if outcome.dirty {
                u32::try_from(self.flat.len()).unwrap_or(u32::MAX)
            } else {
                0
            },
        });
        Ok(outcome)
    }

    /// Flatten, upload, dispatch, readback.
    fn render(
        &mut self,
        host: &impl Host,
        tracer: &mut Tracer<'_>,
        frame_index: u64,
        now: HostTime,
    ) -> Result<(), (PhaseKind, CompositorError)> {
        begin(tracer, frame_index, PhaseKind::Flatten, host.now());
        self.flat = flatten(&self.tree);
        end(tracer, frame_index, PhaseKind::Flatten, host.now());

        let mouse = self.mouse_record(now);
        let viewport = ViewportRecord {
            width: self.viewport.width as f32,
            height: self.viewport.height as f32,
            count: u32::try_from(self.flat.len()).unwrap_or(u32::MAX),
            max_layer: self.flat.max_layer,
        };

        begin(tracer, frame_index, PhaseKind::Upload, host.now());
        let uploaded = self
            .compositor
            .upload(&mouse, &self.flat.records, &viewport);
        end(tracer, frame_index, PhaseKind::Upload, host.now());
        uploaded.map_err(|err| (PhaseKind::Upload, err))?;

        let changes = self.tree.commit();
        trace!(
            style = changes.style.len(),
            geometry = changes.geometry.len(),
            state = changes.state.len(),
            "uploaded container changes"
        );

        begin(tracer, frame_index, PhaseKind::Dispatch, host.now());
        let dispatched = self.compositor.dispatch();
        end(tracer, frame_index, PhaseKind::Dispatch, host.now());
        dispatched.map_err(|err| (PhaseKind::Dispatch, err))?;
        self.telemetry.record_dispatch();

        begin(tracer, frame_index, PhaseKind::Readback, host.now());
        let read = self.compositor.readback().map(|_| ());
        end(tracer, frame_index, PhaseKind::Readback, host.now());
        read.map_err(|err| (PhaseKind::Readback, err))?;
        self.telemetry.record_readback();
        Ok(())
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "shader-side pointer and time values are f32"
    )]
    fn mouse_record(&self, now: HostTime) -> MouseRecord {
        let pixel = self.pointer.to_pixels(self.viewport.size());
        MouseRecord {
            position: [pixel.x as f32, pixel.y as f32],
            time: now.saturating_duration_since(self.started_at).as_secs_f64() as f32,
            scroll: self.pointer.scroll(),
            click: if self.pointer.click() { 1.0 } else { 0.0 },
            _pad: [0.0; 3],
        }
    }

    /// Stops the session after a fatal compositor error.
    fn fail(&mut self, err: CompositorError) -> SessionError {
        error!(%err, "fatal compositor failure; stopping session");
        self.stop();
        SessionError::Compositor(err)
    }

    fn log_performance(&self) {
        let interval = self.config.telemetry_log_interval;
        let frames = self.telemetry.frames();
        if interval == 0 || frames % interval != 0 {
            return;
        }
        let s = self.telemetry.snapshot();
        info!(
            frames = s.frames,
            fps = s.fps,
            dispatch_skips = s.dispatch_skips,
            dispatch_skip_percent = s.dispatch_skip_percent(),
            readback_skips = s.readback_skips,
            readback_skip_percent = s.readback_skip_percent(),
            failed_ticks = s.failed_ticks,
            "frame loop performance"
        );
    }
}

#[inline]
fn begin(tracer: &mut Tracer<'_>, frame_index: u64, phase: PhaseKind, timestamp: HostTime) {
    tracer.phase_begin(&PhaseBeginEvent {
        frame_index,
        phase,
        timestamp,
    });
}

#[inline]
fn end(tracer: &mut Tracer<'_>, frame_index: u64, phase: PhaseKind, timestamp: HostTime) {
    tracer.phase_end(&PhaseEndEvent {
        frame_index,
        phase,
        timestamp,
    });
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::{Cell, RefCell};

    use super::*;
    use crate::flatten::FlatRecord;
    use crate::node::{Event, EventKind, Fill};

    /// Records every call; can be told to fail.
    #[derive(Debug, Default)]
    struct MockCompositor {
        calls: Vec<&'static str>,
        fail_init: bool,
        fail_dispatch: u32,
        lose_device_on_dispatch: bool,
        viewport: Option<Viewport>,
        uploaded: Vec<FlatRecord>,
        image: Option<CompositedImage>,
        cleanups: u32,
    }

    impl MockCompositor {
        fn count(&self, call: &str) -> usize {
            self.calls.iter().filter(|c| **c == call).count()
        }
    }

    impl Compositor for MockCompositor {
        fn initialize(
            &mut self,
            viewport: Viewport,
            records: &[FlatRecord],
        ) -> Result<(), CompositorError> {
            self.calls.push("initialize");
            if self.fail_init {
                return Err(CompositorError::ProgramCompile(String::from("bad shader")));
            }
            self.viewport = Some(viewport);
            self.uploaded = records.to_vec();
            Ok(())
        }

        fn resize(&mut self, viewport: Viewport) -> Result<(), CompositorError> {
            self.calls.push("resize");
            self.viewport = Some(viewport);
            self.image = None;
            Ok(())
        }

        fn upload(
            &mut self,
            _mouse: &MouseRecord,
            records: &[FlatRecord],
            _viewport: &ViewportRecord,
        ) -> Result<(), CompositorError> {
            self.calls.push("upload");
            self.uploaded = records.to_vec();
            Ok(())
        }

        fn dispatch(&mut self) -> Result<(), CompositorError> {
            self.calls.push("dispatch");
            if self.lose_device_on_dispatch {
                return Err(CompositorError::ResourceLost(String::from("device lost")));
            }
            if self.fail_dispatch > 0 {
                self.fail_dispatch -= 1;
                return Err(CompositorError::Dispatch(String::from("queue full")));
            }
            Ok(())
        }

        fn readback(&mut self) -> Result<&CompositedImage, CompositorError> {
            self.calls.push("readback");
            let vp = self.viewport.ok_or(CompositorError::NotInitialized)?;
            Ok(self.image.insert(CompositedImage::new(vp.width, vp.height)))
        }

        fn image(&self) -> Option<&CompositedImage> {
            self.image.as_ref()
        }

        fn cleanup(&mut self) {
            self.calls.push("cleanup");
            self.cleanups += 1;
            self.image = None;
            self.viewport = None;
        }
    }

    struct MockHost {
        size: (u32, u32),
        clock: Cell<u64>,
        presented: Vec<bool>,
        redraws: u32,
    }

    impl MockHost {
        fn new(width: u32, height: u32) -> Self {
            Self {
                size: (width, height),
                clock: Cell::new(0),
                presented: Vec::new(),
                redraws: 0,
            }
        }
    }

    impl Host for MockHost {
        fn viewport_size(&self) -> (u32, u32) {
            self.size
        }

        fn now(&self) -> HostTime {
            let t = self.clock.get();
            self.clock.set(t + 1_000_000);
            HostTime(t)
        }

        fn present(&mut self, _image: &CompositedImage, changed: bool) {
            self.presented.push(changed);
        }

        fn request_redraw(&mut self) {
            self.redraws += 1;
        }
    }

    // root (800x600) → panel (100,100 200x200) → button (10,10 50x50)
    fn records() -> Vec<ContainerRecord> {
        vec![
            ContainerRecord::new("root").sized(800.0, 600.0),
            ContainerRecord::new("panel")
                .with_parent(0)
                .at(100.0, 100.0)
                .sized(200.0, 200.0),
            ContainerRecord::new("button")
                .with_parent(1)
                .at(10.0, 10.0)
                .sized(50.0, 50.0),
        ]
    }

    fn running(host: &MockHost) -> Session<MockCompositor> {
        let tree = ContainerTree::from_records(&records()).unwrap();
        let mut session = Session::new(tree, MockCompositor::default(), SchedulerConfig::DEFAULT);
        session.start(host).unwrap();
        session
    }

    fn dispatches(session: &Session<MockCompositor>) -> usize {
        session.compositor().count("dispatch")
    }

    #[test]
    fn start_stop_lifecycle() {
        let host = MockHost::new(800, 600);
        let mut session = running(&host);
        assert_eq!(session.state(), CompositorState::Running);
        assert!(matches!(session.start(&host), Err(SessionError::AlreadyRunning)));
        assert_eq!(session.compositor().count("initialize"), 1, "second start not queued");

        session.stop();
        assert_eq!(session.state(), CompositorState::Uninitialized);
        session.stop();
        assert_eq!(session.compositor().cleanups, 1, "stop on stopped session is a no-op");
        session.start(&host).unwrap();
        assert!(session.is_running(), "restart after stop");
    }

    #[test]
    fn failed_init_leaves_session_uninitialized() {
        let host = MockHost::new(800, 600);
        let tree = ContainerTree::from_records(&records()).unwrap();
        let compositor = MockCompositor {
            fail_init: true,
            ..MockCompositor::default()
        };
        let mut session = Session::new(tree, compositor, SchedulerConfig::DEFAULT);
        let err = session.start(&host).unwrap_err();
        assert!(matches!(err, SessionError::Init(CompositorError::ProgramCompile(_))));
        assert_eq!(session.state(), CompositorState::Uninitialized);
        assert_eq!(session.compositor().calls, vec!["initialize", "cleanup"]);
    }

    #[test]
    fn tick_requires_running_session() {
        let mut host = MockHost::new(800, 600);
        let tree = ContainerTree::from_records(&records()).unwrap();
        let mut session = Session::new(tree, MockCompositor::default(), SchedulerConfig::DEFAULT);
        assert!(matches!(
            session.tick(&mut host, &mut Tracer::none()),
            Err(SessionError::NotRunning)
        ));
    }

    #[test]
    fn idle_ticks_skip_gpu_work() {
        let mut host = MockHost::new(800, 600);
        let mut session = running(&host);
        let first = session.tick(&mut host, &mut Tracer::none()).unwrap();
        assert!(first.dirty && first.image_changed, "first tick forced dirty");
        for _ in 0..5 {
            let out = session.tick(&mut host, &mut Tracer::none()).unwrap();
            assert!(!out.dirty);
        }
        assert_eq!(dispatches(&session), 1);
        assert_eq!(session.compositor().count("readback"), 1);
        let t = session.telemetry();
        assert_eq!(t.frames, 6);
        assert_eq!(t.dispatch_skips, 5);
        assert_eq!(t.readback_skips, 5);
        assert_eq!(host.redraws, 6, "redraw requested every tick");
        assert_eq!(host.presented, vec![true, false, false, false, false, false]);
    }

    #[test]
    fn hover_then_click_end_to_end() {
        let mut host = MockHost::new(800, 600);
        let mut session = running(&host);
        let button = session.tree().lookup("button").unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventKind::HoverIn, EventKind::Click] {
            let log = log.clone();
            session
                .tree_mut()
                .on(button, kind, move |cx| {
                    log.borrow_mut().push(cx.event);
                    Ok(())
                })
                .unwrap();
        }

        // Outside every container but the root.
        session.set_pointer(0.9, 0.9);
        let _ = session.tick(&mut host, &mut Tracer::none()).unwrap();
        let _ = session.tick(&mut host, &mut Tracer::none()).unwrap();
        let base = dispatches(&session);
        assert!(log.borrow().is_empty());

        // Inside the button: pixel (125, 125).
        session.set_pointer(125.0 / 800.0, 125.0 / 600.0);
        let out = session.tick(&mut host, &mut Tracer::none()).unwrap();
        assert_eq!(out.hit.target, Some(button));
        assert_eq!(dispatches(&session), base + 1, "one dispatch on entering");
        assert_eq!(*log.borrow(), vec![Event::HoverIn]);

        let _ = session.tick(&mut host, &mut Tracer::none()).unwrap();
        assert_eq!(dispatches(&session), base + 1, "repeated input dispatches nothing");

        session.set_click(true);
        let _ = session.tick(&mut host, &mut Tracer::none()).unwrap();
        assert_eq!(dispatches(&session), base + 2, "one dispatch on press");
        assert_eq!(*log.borrow(), vec![Event::HoverIn, Event::Click]);

        let _ = session.tick(&mut host, &mut Tracer::none()).unwrap();
        assert_eq!(dispatches(&session), base + 2);
        assert_eq!(log.borrow().len(), 2, "held button fires nothing");
    }

    #[test]
    fn resize_reallocates_and_forces_dirty() {
        let mut host = MockHost::new(800, 600);
        let mut session = running(&host);
        let _ = session.tick(&mut host, &mut Tracer::none()).unwrap();
        let _ = session.tick(&mut host, &mut Tracer::none()).unwrap();

        host.size = (1024, 768);
        let out = session.tick(&mut host, &mut Tracer::none()).unwrap();
        assert!(out.resized);
        assert!(out.dirty, "resize forces a dirty tick");
        assert_eq!(session.viewport(), Viewport::new(1024, 768));
        let image = session.image().unwrap();
        assert_eq!((image.width, image.height), (1024, 768));
        assert_eq!(session.compositor().count("resize"), 1);
    }

    #[test]
    fn zero_viewport_is_clamped() {
        let mut host = MockHost::new(0, 0);
        let mut session = running(&host);
        assert_eq!(session.viewport(), Viewport::new(1, 1));
        let _ = session.tick(&mut host, &mut Tracer::none()).unwrap();
        assert_eq!(session.compositor().count("resize"), 0);
    }

    #[test]
    fn callback_mutation_lands_in_same_tick() {
        let mut host = MockHost::new(800, 600);
        let mut session = running(&host);
        let button = session.tree().lookup("button").unwrap();
        let panel = session.tree().lookup("panel").unwrap();
        session
            .tree_mut()
            .on(button, EventKind::HoverIn, move |cx| {
                cx.tree
                    .update_style(panel, |s| s.fill = Fill::solid([0.0, 0.0, 1.0, 1.0]))
                    .map_err(|e| crate::node::CallbackError::new(alloc::format!("{e}")))
            })
            .unwrap();
        let _ = session.tick(&mut host, &mut Tracer::none()).unwrap();

        session.set_pointer(125.0 / 800.0, 125.0 / 600.0);
        let _ = session.tick(&mut host, &mut Tracer::none()).unwrap();
        let uploaded_panel = session.compositor().uploaded[1];
        assert_eq!(uploaded_panel.color, [0.0, 0.0, 1.0, 1.0]);
        assert!(!session.tree().is_dirty(), "committed after upload");
    }

    #[test]
    fn tree_mutation_between_ticks_forces_upload() {
        let mut host = MockHost::new(800, 600);
        let mut session = running(&host);
        let _ = session.tick(&mut host, &mut Tracer::none()).unwrap();
        let root = session.tree().root();
        session.tree_mut().mark_dirty(root).unwrap();
        let out = session.tick(&mut host, &mut Tracer::none()).unwrap();
        assert!(out.dirty, "per-node dirt raises the update request");
    }

    #[test]
    fn recoverable_dispatch_failure_keeps_running() {
        let mut host = MockHost::new(800, 600);
        let mut session = running(&host);
        session.compositor.fail_dispatch = 1;
        let out = session.tick(&mut host, &mut Tracer::none()).unwrap();
        assert_eq!(out.failed_phase, Some(PhaseKind::Dispatch));
        assert!(!out.image_changed);
        assert!(session.is_running());
        assert_eq!(session.telemetry().failed_ticks, 1);

        let out = session.tick(&mut host, &mut Tracer::none()).unwrap();
        assert!(out.dirty && out.image_changed, "next tick retries");
    }

    #[test]
    fn fatal_failure_stops_session() {
        let mut host = MockHost::new(800, 600);
        let mut session = running(&host);
        session.compositor.lose_device_on_dispatch = true;
        let err = session.tick(&mut host, &mut Tracer::none()).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Compositor(CompositorError::ResourceLost(_))
        ));
        assert_eq!(session.state(), CompositorState::Uninitialized);
        assert_eq!(session.compositor().cleanups, 1);
    }

    #[test]
    fn rebuild_invalidates_handles_and_grows_upload() {
        let mut host = MockHost::new(800, 600);
        let mut session = running(&host);
        let _ = session.tick(&mut host, &mut Tracer::none()).unwrap();
        let old_button = session.tree().lookup("button").unwrap();

        let mut bigger = records();
        bigger.push(ContainerRecord::new("extra").with_parent(0).at(400.0, 0.0));
        session.rebuild_tree(&bigger).unwrap();
        assert!(session.tree().node(old_button).is_err(), "old handle stale");

        let out = session.tick(&mut host, &mut Tracer::none()).unwrap();
        assert!(out.dirty);
        assert_eq!(session.compositor().uploaded.len(), 4);
    }

    #[test]
    fn rebuild_with_bad_records_keeps_old_tree() {
        let host = MockHost::new(800, 600);
        let mut session = running(&host);
        let err = session.rebuild_tree(&[]).unwrap_err();
        assert!(matches!(err, SessionError::Tree(TreeError::Empty)));
        assert_eq!(session.tree().len(), 3);
    }

    #[test]
    fn scroll_reaches_target_and_fires() {
        let mut host = MockHost::new(800, 600);
        let mut session = running(&host);
        let panel = session.tree().lookup("panel").unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        session
            .tree_mut()
            .on(panel, EventKind::Scroll, move |cx| {
                s.borrow_mut().push(cx.event);
                Ok(())
            })
            .unwrap();
        session.set_pointer(250.0 / 800.0, 250.0 / 600.0);
        let _ = session.tick(&mut host, &mut Tracer::none()).unwrap();
        session.add_scroll(3.0);
        let out = session.tick(&mut host, &mut Tracer::none()).unwrap();
        assert!(out.dirty);
        assert_eq!(
            *seen.borrow(),
            vec![Event::Scroll {
                value: 3.0,
                delta: 3.0
            }]
        );
        assert_eq!(session.pointer().scroll_delta(), 0.0, "delta consumed");
    }

    #[test]
    fn toggle_twice_round_trips() {
        let mut host = MockHost::new(800, 600);
        let mut recs = records();
        recs[2].toggleable = true;
        let tree = ContainerTree::from_records(&recs).unwrap();
        let mut session = Session::new(tree, MockCompositor::default(), SchedulerConfig::DEFAULT);
        session.start(&host).unwrap();
        let button = session.tree().lookup("button").unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = seen.clone();
        session
            .tree_mut()
            .on(button, EventKind::Toggle, move |cx| {
                if let Event::Toggle(on) = cx.event {
                    s.borrow_mut().push(on);
                }
                Ok(())
            })
            .unwrap();

        let original = session.tree().node(button).unwrap().state().toggled;
        session.set_pointer(125.0 / 800.0, 125.0 / 600.0);
        for _ in 0..2 {
            session.set_click(true);
            let _ = session.tick(&mut host, &mut Tracer::none()).unwrap();
            session.set_click(false);
            let _ = session.tick(&mut host, &mut Tracer::none()).unwrap();
        }
        assert_eq!(session.tree().node(button).unwrap().state().toggled, original);
        assert_eq!(*seen.borrow(), vec![!original, original]);
    }

    #[test]
    fn mouse_record_uses_pixels_and_session_time() {
        let host = MockHost::new(800, 600);
        let mut session = running(&host);
        session.set_pointer(0.5, 0.25);
        session.set_click(true);
        let start = session.started_at;
        let record = session.mouse_record(HostTime(start.0 + 2_000_000_000));
        assert_eq!(record.position, [400.0, 150.0]);
        assert_eq!(record.click, 1.0);
        assert!((record.time - 2.0).abs() < 1e-6);
    }
}
