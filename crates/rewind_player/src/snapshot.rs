// SPDX-License-Identifier: MIT OR Apache-2.0
//! PNG snapshots of rendered surfaces.
//!
//! Encoding runs on a dedicated worker thread so the render loop only hands
//! over pixels and moves on.

use image::{ImageFormat, RgbaImage};
use rewind_sequencer::Surface;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from writing snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Encoding or writing the PNG failed
    #[error("Failed to write {}: {source}", .path.display())]
    Image {
        /// Target file
        path: PathBuf,
        /// Underlying error
        source: image::ImageError,
    },

    /// Pixel buffer does not match its dimensions
    #[error("Pixel buffer does not fit {width}x{height}")]
    BadBuffer {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },

    /// The worker thread is gone
    #[error("Snapshot worker stopped")]
    WorkerStopped,
}

/// Snapshot request for the worker
#[derive(Debug)]
struct SnapshotRequest {
    path: PathBuf,
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// Result of one snapshot
pub type SnapshotResult = Result<PathBuf, SnapshotError>;

/// What the worker did before it was finished
#[derive(Debug, Default)]
pub struct SnapshotSummary {
    /// Files written, in submission order
    pub written: Vec<PathBuf>,
    /// Snapshots that failed
    pub failures: Vec<SnapshotError>,
}

/// Queues surfaces for PNG encoding on a worker thread
pub struct SnapshotWriter {
    request_tx: mpsc::UnboundedSender<SnapshotRequest>,
    result_rx: mpsc::UnboundedReceiver<SnapshotResult>,
    worker: JoinHandle<()>,
}

impl SnapshotWriter {
    /// Start the worker thread
    pub fn new() -> Self {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = mpsc::unbounded_channel();

        let worker = std::thread::spawn(move || {
            snapshot_worker(request_rx, result_tx);
        });

        Self {
            request_tx,
            result_rx,
            worker,
        }
    }

    /// Queue a surface to be written as PNG
    pub fn submit(&self, surface: &Surface, path: impl Into<PathBuf>) -> Result<(), SnapshotError> {
        self.request_tx
            .send(SnapshotRequest {
                path: path.into(),
                width: surface.width(),
                height: surface.height(),
                rgba: surface.to_rgba(),
            })
            .map_err(|_| SnapshotError::WorkerStopped)
    }

    /// Wait for every queued snapshot and stop the worker
    pub fn finish(self) -> SnapshotSummary {
        let Self {
            request_tx,
            mut result_rx,
            worker,
        } = self;
        drop(request_tx);

        if worker.join().is_err() {
            tracing::error!("Snapshot worker panicked");
        }

        let mut summary = SnapshotSummary::default();
        while let Ok(result) = result_rx.try_recv() {
            match result {
                Ok(path) => summary.written.push(path),
                Err(e) => summary.failures.push(e),
            }
        }
        summary
    }
}

impl Default for SnapshotWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot_worker(
    mut request_rx: mpsc::UnboundedReceiver<SnapshotRequest>,
    result_tx: mpsc::UnboundedSender<SnapshotResult>,
) {
    while let Some(request) = request_rx.blocking_recv() {
        let result = write_png(request);
        if let Err(e) = &result {
            tracing::warn!("{e}");
        }
        if result_tx.send(result).is_err() {
            break; // Channel closed
        }
    }
}

fn write_png(request: SnapshotRequest) -> SnapshotResult {
    let SnapshotRequest {
        path,
        width,
        height,
        rgba,
    } = request;
    let image = RgbaImage::from_raw(width, height, rgba).ok_or(SnapshotError::BadBuffer { width, height })?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SnapshotError::Image {
            path: path.clone(),
            source: image::ImageError::IoError(e),
        })?;
    }

    image
        .save_with_format(&path, ImageFormat::Png)
        .map_err(|source| SnapshotError::Image {
            path: path.clone(),
            source,
        })?;
    tracing::debug!("Wrote snapshot {:?}", path);
    Ok(path)
}

/// File name of the `index`-th playback snapshot
pub fn frame_file_name(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("frame_{index:05}.png"))
}
