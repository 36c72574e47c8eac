// SPDX-License-Identifier: MIT OR Apache-2.0
//! Render worker and playback ticker.
//!
//! The ticker only moves the shared playback position and raises the render
//! signal. The worker renders whatever the position is when it wakes, so any
//! number of requests raised while it is busy collapse into one render.

use crate::error::Result;
use crate::snapshot::{frame_file_name, SnapshotWriter};
use parking_lot::Mutex;
use rewind_cache::TICKS_PER_SECOND;
use rewind_sequencer::{PlaybackController, Project, RenderReport, Renderer, Surface};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Notify};

/// A finished render
#[derive(Debug)]
pub struct RenderedFrame {
    /// Playback time that was rendered, in ticks
    pub timestamp_ticks: i64,
    /// The rendered canvas
    pub surface: Surface,
    /// Per-sequence outcome
    pub report: RenderReport,
}

/// State shared by the worker, the ticker and whoever drives them
#[derive(Clone)]
pub struct RenderContext {
    /// Project being played
    pub project: Arc<Project>,
    /// Shared playback position
    pub playback: Arc<Mutex<PlaybackController>>,
    /// Raised to request a render
    pub signal: Arc<Notify>,
    /// Renderer settings
    pub renderer: Renderer,
}

impl RenderContext {
    /// Create a context with a stopped controller at time zero
    pub fn new(project: Project, renderer: Renderer) -> Self {
        Self {
            project: Arc::new(project),
            playback: Arc::new(Mutex::new(PlaybackController::new())),
            signal: Arc::new(Notify::new()),
            renderer,
        }
    }

    /// Ask the worker to render the current state
    pub fn request_render(&self) {
        self.signal.notify_one();
    }
}

/// Render on request until shutdown or until nobody takes frames.
///
/// A request pending when shutdown arrives is still rendered. Returns the
/// number of renders done.
pub async fn run_render_worker(
    context: RenderContext,
    frame_tx: mpsc::UnboundedSender<RenderedFrame>,
    mut shutdown: watch::Receiver<bool>,
) -> usize {
    let mut renders = 0;
    loop {
        tokio::select! {
            biased;
            _ = context.signal.notified() => {}
            _ = shutdown.changed() => break,
        }

        let timestamp = context.playback.lock().time;
        let project = Arc::clone(&context.project);
        let renderer = context.renderer;
        let rendered = tokio::task::spawn_blocking(move || {
            let mut surface = Renderer::surface_for(&project);
            let report = renderer.render_at(&project, &mut surface, timestamp);
            RenderedFrame {
                timestamp_ticks: timestamp,
                surface,
                report,
            }
        })
        .await;

        let frame = match rendered {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Render at tick {} failed: {}", timestamp, e);
                continue;
            }
        };

        renders += 1;
        if frame_tx.send(frame).is_err() {
            tracing::debug!("Frame receiver closed, stopping render worker");
            break;
        }
    }

    tracing::debug!("Render worker stopped after {} renders", renders);
    renders
}

/// Advance playback `fps` times per second until it stops or shutdown.
///
/// Each tick moves time by exactly one period, so output does not depend on
/// scheduling jitter.
pub async fn run_playback_ticker(context: RenderContext, fps: u32, mut shutdown: watch::Receiver<bool>) {
    let fps = fps.max(1);
    let delta_ticks = TICKS_PER_SECOND / fps as i64;
    let mut interval = tokio::time::interval(Duration::from_secs(1) / fps);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => break,
        }

        let (changed, playing, keys) = {
            let mut playback = context.playback.lock();
            let changed = playback.update(delta_ticks, &context.project);
            (changed, playback.is_playing(), playback.take_keys())
        };

        for event in keys {
            tracing::info!(
                "Key {} at {} ms",
                event.key.key_code,
                rewind_cache::millis_from_ticks(event.timestamp_ticks)
            );
        }

        if changed {
            context.request_render();
        }
        if !playing {
            tracing::debug!("Playback stopped at tick {}", context.playback.lock().time);
            break;
        }
    }
}

/// Outcome of a playback run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlaySummary {
    /// Frames handed to the snapshot writer
    pub frames: usize,
    /// Time of the last frame, in ticks
    pub last_timestamp: Option<i64>,
    /// Sequence failures summed over all frames
    pub sequence_failures: usize,
}

/// Play from the current position to the end, snapshotting every render.
///
/// Stops when playback stops or after `max_frames` frames.
pub async fn play_to_snapshots(
    context: RenderContext,
    fps: u32,
    max_frames: usize,
    out_dir: &Path,
    snapshots: &SnapshotWriter,
) -> Result<PlaySummary> {
    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    context.playback.lock().play();
    context.request_render();
    let worker = tokio::spawn(run_render_worker(context.clone(), frame_tx, shutdown_rx.clone()));
    let mut ticker = tokio::spawn(run_playback_ticker(context.clone(), fps, shutdown_rx));
    let mut ticker_done = false;

    let mut summary = PlaySummary::default();
    while summary.frames < max_frames {
        tokio::select! {
            frame = frame_rx.recv() => {
                let Some(frame) = frame else { break };
                snapshots.submit(&frame.surface, frame_file_name(out_dir, summary.frames))?;
                summary.frames += 1;
                summary.last_timestamp = Some(frame.timestamp_ticks);
                summary.sequence_failures += frame.report.failures.len();
            }
            result = &mut ticker, if !ticker_done => {
                result?;
                ticker_done = true;
                // Lets the worker finish the last request, then close the channel
                let _ = shutdown_tx.send(true);
            }
        }
    }

    let _ = shutdown_tx.send(true);
    let renders = worker.await?;
    if !ticker_done {
        ticker.await?;
    }
    tracing::info!("Played {} frames ({} renders)", summary.frames, renders);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewind_sequencer::Track;

    fn context() -> RenderContext {
        RenderContext::new(Project::new("Loop", 2, 2), Renderer::default())
    }

    #[tokio::test]
    async fn test_requests_coalesce() {
        let context = context();
        for _ in 0..3 {
            context.request_render();
        }

        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(run_render_worker(context.clone(), frame_tx, shutdown_rx));

        let frame = tokio::time::timeout(Duration::from_secs(5), frame_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.timestamp_ticks, 0);
        assert_eq!(frame.surface.width(), 2);
        assert!(tokio::time::timeout(Duration::from_millis(200), frame_rx.recv()).await.is_err());

        shutdown_tx.send(true).unwrap();
        assert_eq!(worker.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_renders_current_time() {
        let context = context();
        context.playback.lock().seek(1234);
        context.request_render();

        let (frame_tx, mut frame_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = tokio::spawn(run_render_worker(context.clone(), frame_tx, shutdown_rx));

        let frame = frame_rx.recv().await.unwrap();
        assert_eq!(frame.timestamp_ticks, 1234);
        drop(shutdown_tx);
        assert_eq!(worker.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ticker_stops_with_playback() {
        let mut project = Project::new("Short", 1, 1);
        let mut track = Track::new("Empty");
        track.add_sequence(rewind_sequencer::Sequence::new(
            "Nothing",
            rewind_cache::SubSequenceKind::Frame,
            "none.cache",
        ));
        project.add_track(track);
        let context = RenderContext::new(project, Renderer::default());
        context.playback.lock().play();

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::time::timeout(Duration::from_secs(5), run_playback_ticker(context.clone(), 100, shutdown_rx))
            .await
            .unwrap();
        assert!(!context.playback.lock().is_playing());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_play_demo_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let (project, _) = crate::demo::write_demo(&dir.path().join("project")).unwrap();
        let duration = project.duration();
        let context = RenderContext::new(project, Renderer::default());
        context.playback.lock().speed = 20.0;

        let out_dir = dir.path().join("frames");
        let snapshots = SnapshotWriter::new();
        let summary = tokio::time::timeout(
            Duration::from_secs(30),
            play_to_snapshots(context, 50, 1_000, &out_dir, &snapshots),
        )
        .await
        .unwrap()
        .unwrap();

        assert!(summary.frames >= 2);
        assert_eq!(summary.last_timestamp, Some(duration));
        assert_eq!(summary.sequence_failures, 0);
        let written = snapshots.finish();
        assert_eq!(written.written.len(), summary.frames);
        assert!(frame_file_name(&out_dir, 0).is_file());
    }

    #[tokio::test]
    async fn test_play_respects_max_frames() {
        let context = context();
        context.playback.lock().set_loop_range(0, TICKS_PER_SECOND);

        let dir = tempfile::tempdir().unwrap();
        let snapshots = SnapshotWriter::new();
        let summary = play_to_snapshots(context, 100, 3, dir.path(), &snapshots).await.unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!(snapshots.finish().written.len(), 3);
    }

    #[tokio::test]
    async fn test_ticker_advances_and_requests() {
        let context = context();
        {
            let mut playback = context.playback.lock();
            playback.set_loop_range(0, TICKS_PER_SECOND);
            playback.play();
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ticker = tokio::spawn(run_playback_ticker(context.clone(), 50, shutdown_rx));
        tokio::time::timeout(Duration::from_secs(5), context.signal.notified())
            .await
            .unwrap();
        shutdown_tx.send(true).unwrap();
        ticker.await.unwrap();
        assert!(context.playback.lock().time > 0);
    }
}
