mod presentation;
mod scenario;
mod snapshot;

use anyhow::Context;
use futures::TryFutureExt;
use presentation::RingPresentation;
use ring_slots::{
    frame_queue, FrameCoordinator, FrameReceiver, FrameSender, LifecycleEvent, TickReport, Transition,
};
use scenario::{Scenario, Step};
use snapshot::SnapshotWriter;
use std::env;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Ticks allowed after the producer finishes for the ring to wind down.
const WIND_DOWN_SECONDS: f64 = 30.0;

#[derive(Debug, Default)]
struct RunSummary {
    ticks: u64,
    frames: u64,
    malformed: u64,
    teardowns: u64,
    stuck_reports: u64,
    snapshots: u64,
}

impl RunSummary {
    fn absorb(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.frames += report.frames_processed as u64;
        self.malformed += report.malformed_frames as u64;
        self.teardowns += u64::from(report.teardown.is_some());
        self.stuck_reports += report
            .events
            .iter()
            .filter(|e| matches!(e, LifecycleEvent::Transition { transition: Transition::Stuck(_), .. }))
            .count() as u64;
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- 1. Logging ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- 2. Argument Parsing ---
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        println!("Usage: ring_simulator <scenario.json> [snapshot_dir]");
        return Ok(());
    }
    let scenario = Scenario::load(&args[1])?;
    let snapshots = args
        .get(2)
        .map(|dir| SnapshotWriter::new(dir, scenario.config.slots()))
        .transpose()?;

    // --- 3. Engine Initialization ---
    let presentation = RingPresentation::new(scenario.variant_names());
    let mut coordinator = FrameCoordinator::new(scenario.config.clone(), presentation)
        .context("scenario ring configuration was refused")?;
    let (sender, receiver) = frame_queue();

    // --- 4. Producer and Tick Loop ---
    let producer = tokio::spawn(feed_frames(sender, scenario.steps.clone(), scenario.frame_hz))
        .map_err(anyhow::Error::from);
    let consumer = run_ticks(&mut coordinator, receiver, &scenario, snapshots.as_ref());
    let (sent, summary) = futures::future::try_join(producer, consumer).await?;
    let sent = sent?;

    tracing::info!(
        frames_sent = sent,
        frames_processed = summary.frames,
        malformed = summary.malformed,
        ticks = summary.ticks,
        teardowns = summary.teardowns,
        stuck_reports = summary.stuck_reports,
        snapshots = summary.snapshots,
        figures_created = coordinator.presentation().created_total(),
        figures_left = coordinator.presentation().live(),
        "simulation complete"
    );
    Ok(())
}

/// Plays the scripted steps into the frame queue at `frame_hz`, then hangs up.
async fn feed_frames(sender: FrameSender, steps: Vec<Step>, frame_hz: f64) -> anyhow::Result<u64> {
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / frame_hz));
    let mut sent = 0;
    for step in steps {
        let frames = step.frame_count(frame_hz);
        tracing::info!(step = step.label.as_deref().unwrap_or("-"), frames, silent = step.silent, "scenario step");
        let frame = step.frame();
        for _ in 0..frames {
            interval.tick().await;
            if step.silent {
                continue;
            }
            sender.send(frame.clone())?;
            sent += 1;
        }
    }
    Ok(sent)
}

async fn run_ticks(
    coordinator: &mut FrameCoordinator<RingPresentation>,
    mut receiver: FrameReceiver,
    scenario: &Scenario,
    snapshots: Option<&SnapshotWriter>,
) -> anyhow::Result<RunSummary> {
    let dt = Duration::from_secs_f64(1.0 / scenario.tick_hz);
    let ease_step = scenario.ease_per_second * dt.as_secs_f32();
    let wind_down_ticks = (WIND_DOWN_SECONDS * scenario.tick_hz).ceil() as u64;
    let mut interval = tokio::time::interval(dt);
    let mut summary = RunSummary::default();
    let mut ticks_since_close = 0u64;

    loop {
        interval.tick().await;

        // --- 5. Drain and Tick ---
        let frames = receiver.drain(coordinator.config().drain_policy);
        let report = coordinator.tick(&frames, dt);
        summary.absorb(&report);
        log_report(&report);

        // --- 6. Renderer Easing ---
        for (_, figure) in coordinator.entities_mut() {
            figure.ease(ease_step);
        }

        // --- 7. Snapshots ---
        if let Some(writer) = snapshots {
            if scenario.snapshot_every > 0 && summary.ticks % scenario.snapshot_every == 0 {
                let figures = coordinator.live_entities().filter_map(|key| coordinator.entity(key));
                let path = writer.write(summary.snapshots, figures)?;
                tracing::debug!(path = %path.display(), "snapshot written");
                summary.snapshots += 1;
            }
        }

        // --- 8. Termination ---
        if receiver.is_closed() {
            if coordinator.live_entities().next().is_none() {
                break;
            }
            ticks_since_close += 1;
            if ticks_since_close > wind_down_ticks {
                let stuck: Vec<String> = coordinator.stuck_entities().map(|key| key.to_string()).collect();
                tracing::warn!(?stuck, "ring did not wind down, giving up");
                break;
            }
        }
    }
    Ok(summary)
}

fn log_report(report: &TickReport) {
    if let Some(cause) = report.teardown {
        tracing::info!(?cause, "ring torn down");
    }
    for event in &report.events {
        match event {
            LifecycleEvent::Spawned { key, token } => tracing::debug!(%key, %token, "spawned"),
            LifecycleEvent::PoolExhausted { key } => tracing::debug!(%key, "waiting for a free variant"),
            LifecycleEvent::Transition { key, transition } => match transition {
                Transition::RiseStarted | Transition::FullyRisen | Transition::Resumed => {
                    tracing::info!(%key, ?transition, "figure")
                }
                _ => tracing::debug!(%key, ?transition, "figure"),
            },
        }
    }
}
