// Copyright 2026 the Stratum Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless demo: a small container tree driven by scripted pointer input.
//!
//! Runs a fixed script of pointer moves, presses and scroll steps through a
//! [`Session`] backed by the wgpu compositor, then prints telemetry.
//!
//! ```text
//! headless_compose [--frames N] [--trace out.json] [--ppm out.ppm] [--software]
//! ```
//!
//! Set `RUST_LOG=debug` for per-tick logging.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Parser;
use kurbo::Vec2;
use stratum_core::compositor::{CompositedImage, Host};
use stratum_core::node::{
    Border, BoxShadow, CallbackError, ContainerRecord, ContainerTree, EventKind, Fill, Overflow,
    Style,
};
use stratum_core::scheduler::{SchedulerConfig, Session};
use stratum_core::time::HostTime;
use stratum_core::trace::Tracer;
use stratum_debug::recorder::RecorderSink;
use stratum_gpu::{GpuConfig, WgpuCompositor};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;

/// Scripted pointer input composited on the GPU without a window.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Number of ticks to run
    #[arg(long, default_value_t = 120)]
    frames: u64,

    /// Write a Chrome trace of every tick to this path
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Write the last composited image as a binary PPM to this path
    #[arg(long)]
    ppm: Option<PathBuf>,

    /// Request a software (fallback) adapter
    #[arg(long)]
    software: bool,
}

/// A window-less host: fixed viewport, wall-clock time, keeps the last
/// presented image.
struct HeadlessHost {
    start: Instant,
    last: Option<CompositedImage>,
    presented: u64,
    changed: u64,
}

impl Host for HeadlessHost {
    fn viewport_size(&self) -> (u32, u32) {
        (WIDTH, HEIGHT)
    }

    fn now(&self) -> HostTime {
        let nanos = self.start.elapsed().as_nanos();
        HostTime(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn present(&mut self, image: &CompositedImage, changed: bool) {
        self.presented += 1;
        if changed {
            self.changed += 1;
            self.last = Some(image.clone());
        }
    }

    fn request_redraw(&mut self) {}
}

fn records() -> Vec<ContainerRecord> {
    vec![
        ContainerRecord::new("root")
            .sized(f64::from(WIDTH), f64::from(HEIGHT))
            .passive()
            .styled(Style {
                fill: Fill::gradient([0.08, 0.09, 0.12, 1.0], [0.15, 0.16, 0.22, 1.0], 90.0),
                ..Style::default()
            }),
        ContainerRecord::new("toggle")
            .with_parent(0)
            .at(40.0, 40.0)
            .sized(160.0, 48.0)
            .toggleable()
            .styled(Style {
                fill: Fill::solid([0.25, 0.27, 0.33, 1.0]),
                hover: Fill::solid([0.32, 0.35, 0.43, 1.0]),
                click: Fill::solid([0.18, 0.19, 0.24, 1.0]),
                toggle: Fill::solid([0.20, 0.55, 0.35, 1.0]),
                border: Border {
                    radius: 10.0,
                    width: 2.0,
                    fill: Fill::solid([0.9, 0.9, 0.95, 0.6]),
                },
                shadow: BoxShadow {
                    offset: [0.0, 4.0, 0.0],
                    blur: 8.0,
                    color: [0.0, 0.0, 0.0, 0.5],
                },
                ..Style::default()
            }),
        ContainerRecord::new("panel")
            .with_parent(0)
            .at(40.0, 120.0)
            .sized(360.0, 300.0)
            .with_overflow(Overflow::Hidden)
            .styled(Style {
                fill: Fill::solid([0.12, 0.13, 0.17, 1.0]),
                border: Border {
                    radius: 12.0,
                    width: 1.0,
                    fill: Fill::solid([0.4, 0.4, 0.5, 1.0]),
                },
                ..Style::default()
            }),
        ContainerRecord::new("list")
            .with_parent(2)
            .at(12.0, 12.0)
            .sized(336.0, 600.0)
            .passive()
            .styled(Style {
                fill: Fill::gradient([0.3, 0.2, 0.5, 1.0], [0.1, 0.4, 0.6, 1.0], 90.0),
                ..Style::default()
            }),
        ContainerRecord::new("tooltip")
            .with_parent(0)
            .at(210.0, 44.0)
            .sized(140.0, 40.0)
            .on_layer(1)
            .with_display(false)
            .styled(Style {
                fill: Fill::solid([0.95, 0.85, 0.3, 0.95]),
                border: Border {
                    radius: 6.0,
                    ..Border::default()
                },
                ..Style::default()
            }),
    ]
}

fn wire_callbacks(tree: &mut ContainerTree) -> Result<(), stratum_core::node::TreeError> {
    let toggle = tree.lookup("toggle")?;
    let tooltip = tree.lookup("tooltip")?;
    let panel = tree.lookup("panel")?;
    let list = tree.lookup("list")?;

    let fail = |e: stratum_core::node::TreeError| CallbackError::new(e.to_string());

    tree.on(toggle, EventKind::HoverIn, move |cx| {
        cx.tree.set_display(tooltip, true).map_err(fail)
    })?;
    tree.on(toggle, EventKind::HoverOut, move |cx| {
        cx.tree.set_display(tooltip, false).map_err(fail)
    })?;
    tree.on(toggle, EventKind::Toggle, move |cx| {
        let on = matches!(cx.event, stratum_core::node::Event::Toggle(true));
        info!(on, "toggle flipped");
        let color = if on {
            [0.3, 0.8, 0.5, 1.0]
        } else {
            [0.4, 0.4, 0.5, 1.0]
        };
        cx.tree
            .update_style(panel, |s| s.border.fill = Fill::solid(color))
            .map_err(fail)
    })?;
    tree.on(panel, EventKind::Scroll, move |cx| {
        let stratum_core::node::Event::Scroll { value, .. } = cx.event else {
            return Ok(());
        };
        let offset = (f64::from(value) * 20.0).clamp(-288.0, 0.0);
        cx.tree
            .set_position(list, Vec2::new(12.0, 12.0 + offset))
            .map_err(fail)
    })?;
    Ok(())
}

/// Pointer script: returns `(x, y, pressed, scroll)` in normalized
/// coordinates for a frame.
fn script(frame: u64) -> (f64, f64, bool, f32) {
    let button = (120.0 / f64::from(WIDTH), 64.0 / f64::from(HEIGHT));
    let panel = (220.0 / f64::from(WIDTH), 270.0 / f64::from(HEIGHT));
    match frame % 60 {
        0..10 => (0.9, 0.9, false, 0.0),
        10..20 => (button.0, button.1, false, 0.0),
        20..24 => (button.0, button.1, true, 0.0),
        24..34 => (button.0, button.1, false, 0.0),
        34..44 => (panel.0, panel.1, false, -1.0),
        _ => (0.9, 0.9, false, 0.0),
    }
}

fn write_ppm(path: &Path, image: &CompositedImage) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "P6\n{} {}\n255", image.width, image.height)?;
    for px in image.pixels.chunks_exact(4) {
        out.write_all(&px[..3])?;
    }
    out.flush()
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut tree = match ContainerTree::from_records(&records()) {
        Ok(tree) => tree,
        Err(e) => {
            error!(%e, "invalid container records");
            return;
        }
    };
    if let Err(e) = wire_callbacks(&mut tree) {
        error!(%e, "failed to register callbacks");
        return;
    }

    let gpu = if args.software {
        GpuConfig::software()
    } else {
        GpuConfig::default()
    };
    let config = SchedulerConfig::default();
    let mut session = Session::new(tree, WgpuCompositor::new(gpu), config);
    let mut host = HeadlessHost {
        start: Instant::now(),
        last: None,
        presented: 0,
        changed: 0,
    };

    if let Err(e) = session.start(&host) {
        error!(%e, "could not start the compositor");
        return;
    }

    let mut recorder = RecorderSink::new();
    let interval = std::time::Duration::from_nanos(config.tick_interval.nanos());
    for frame in 0..args.frames {
        let started = Instant::now();
        let (x, y, pressed, scroll) = script(frame);
        session.set_pointer(x, y);
        session.set_click(pressed);
        if scroll != 0.0 {
            session.add_scroll(scroll);
        }

        let mut tracer = if args.trace.is_some() {
            Tracer::new(&mut recorder)
        } else {
            Tracer::none()
        };
        if let Err(e) = session.tick(&mut host, &mut tracer) {
            error!(%e, frame, "tick failed; stopping");
            break;
        }

        if let Some(rest) = interval.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    let t = session.telemetry();
    info!(
        frames = t.frames,
        fps = format_args!("{:.1}", t.fps),
        dispatches = t.dispatches,
        dispatch_skips = format_args!("{:.1}%", t.dispatch_skip_percent()),
        readback_skips = format_args!("{:.1}%", t.readback_skip_percent()),
        failed = t.failed_ticks,
        callback_faults = t.callback_faults,
        presented = host.presented,
        new_images = host.changed,
        "session finished"
    );
    session.stop();

    if let (Some(path), Some(image)) = (&args.ppm, &host.last) {
        match write_ppm(path, image) {
            Ok(()) => info!(path = %path.display(), "wrote final image"),
            Err(e) => error!(%e, path = %path.display(), "could not write image"),
        }
    }
    if let Some(path) = &args.trace {
        let written = File::create(path).and_then(|f| {
            let mut w = BufWriter::new(f);
            stratum_debug::chrome::export(recorder.as_bytes(), &mut w)?;
            w.flush()
        });
        match written {
            Ok(()) => info!(path = %path.display(), "wrote Chrome trace"),
            Err(e) => error!(%e, path = %path.display(), "could not write trace"),
        }
    }
}
