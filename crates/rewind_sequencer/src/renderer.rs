// SPDX-License-Identifier: MIT OR Apache-2.0
//! Renders a whole project at one point in time.

use crate::compositor::{CompositeStats, RenderQuality};
use crate::error::RenderError;
use crate::project::Project;
use crate::sequence::{Sequence, SequenceId};
use crate::surface::Surface;
use crate::track::{Track, TrackId};
use rewind_cache::SubSequence;
use std::path::PathBuf;
use std::thread;

/// Payload reads per scoped thread
const FETCHES_PER_THREAD: usize = 4;

/// A sequence that could not be drawn
#[derive(Debug)]
pub struct SequenceFailure {
    /// Track of the sequence
    pub track: TrackId,
    /// The sequence
    pub sequence: SequenceId,
    /// Sequence name, for messages
    pub name: String,
    /// What went wrong
    pub error: RenderError,
}

/// Outcome of one render pass
#[derive(Debug, Default)]
pub struct RenderReport {
    /// Render timestamp, in ticks
    pub timestamp_ticks: i64,
    /// Sequences with an active frame or cursor record that was drawn
    pub drawn_sequences: usize,
    /// Pixel counts summed over all sequences
    pub stats: CompositeStats,
    /// Sequences that failed; the rest of the pass still ran
    pub failures: Vec<SequenceFailure>,
}

impl RenderReport {
    /// Whether every sequence rendered
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// One sequence to draw in this pass
struct DrawJob<'a> {
    track: &'a Track,
    sequence: &'a Sequence,
    record: Option<&'a SubSequence>,
    cache_file: PathBuf,
}

/// Project renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    /// Resampling quality
    pub quality: RenderQuality,
}

impl Renderer {
    /// Create a renderer
    pub fn new(quality: RenderQuality) -> Self {
        Self { quality }
    }

    /// Surface matching the project canvas
    pub fn surface_for(project: &Project) -> Surface {
        Surface::new(project.width as u32, project.height as u32)
    }

    /// Render `project` at `timestamp` onto `surface`.
    ///
    /// Payloads of all sequences are read concurrently, each from its own
    /// read-only handle, then composited in track and sequence order.
    pub fn render_at(&self, project: &Project, surface: &mut Surface, timestamp: i64) -> RenderReport {
        let mut report = RenderReport {
            timestamp_ticks: timestamp,
            ..Default::default()
        };
        surface.fill(project.background);

        let jobs: Vec<DrawJob<'_>> = project
            .visible_tracks()
            .flat_map(|track| {
                track.sequences().iter().map(move |sequence| DrawJob {
                    track,
                    sequence,
                    record: sequence.active_record_at(timestamp),
                    cache_file: sequence.cache_file(project.directory()),
                })
            })
            .collect();

        let payloads = fetch_payloads(&jobs);

        for (job, payload) in jobs.iter().zip(payloads) {
            let result = payload.and_then(|payload| job.sequence.draw(surface, job.record, &payload, self.quality));
            match result {
                Ok(stats) => {
                    if job.record.is_some_and(|r| r.raster().is_some()) {
                        report.drawn_sequences += 1;
                    }
                    report.stats.drawn += stats.drawn;
                    report.stats.skipped += stats.skipped;
                }
                Err(error) => {
                    tracing::warn!(
                        "Track '{}', sequence '{}' not drawn at tick {}: {}",
                        job.track.name,
                        job.sequence.name,
                        timestamp,
                        error
                    );
                    report.failures.push(SequenceFailure {
                        track: job.track.id,
                        sequence: job.sequence.id,
                        name: job.sequence.name.clone(),
                        error,
                    });
                }
            }
        }

        tracing::trace!(
            "Rendered tick {}: {} sequences drawn, {} failed",
            timestamp,
            report.drawn_sequences,
            report.failures.len()
        );
        report
    }
}

fn fetch_payload(job: &DrawJob<'_>) -> Result<Vec<u8>, RenderError> {
    match job.record {
        Some(record) => Ok(job.sequence.read_payload(record, &job.cache_file)?),
        None => Ok(Vec::new()),
    }
}

/// Read every job's payload, preserving job order
fn fetch_payloads(jobs: &[DrawJob<'_>]) -> Vec<Result<Vec<u8>, RenderError>> {
    if jobs.len() <= 1 {
        return jobs.iter().map(fetch_payload).collect();
    }

    thread::scope(|scope| {
        let handles: Vec<_> = jobs
            .chunks(FETCHES_PER_THREAD)
            .map(|chunk| scope.spawn(move || chunk.iter().map(fetch_payload).collect::<Vec<_>>()))
            .collect();

        handles
            .into_iter()
            .zip(jobs.chunks(FETCHES_PER_THREAD))
            .flat_map(|(handle, chunk)| match handle.join() {
                Ok(results) => results,
                // A panicking read loses only its own chunk
                Err(_) => chunk.iter().map(|_| Err(RenderError::FetchPanicked)).collect(),
            })
            .collect()
    })
}
