// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequencing and compositing for Rewind projects.
//!
//! This crate turns cached recordings into pictures:
//! - Sequences with "latest record before" lookup
//! - Tracks and projects with a binary manifest
//! - Cursor and frame compositing onto BGRA surfaces
//! - Project rendering and playback control
//!
//! ## Architecture
//!
//! A [`Project`] owns ordered [`Track`]s, each owning [`Sequence`]s whose
//! records point into a per-sequence cache file. The [`Renderer`] picks the
//! active record of every visible sequence, reads the payloads concurrently,
//! and composites them in order onto a [`Surface`] it was handed for that
//! call.

pub mod compositor;
pub mod error;
pub mod playback;
pub mod project;
pub mod project_file;
pub mod renderer;
pub mod sequence;
pub mod surface;
pub mod track;

pub use compositor::{
    composite_cursor, composite_frame, composite_record, CompositeStats, Placement, RenderQuality,
};
pub use error::{ProjectError, RenderError, SequenceError};
pub use playback::{LoopRange, PlaybackController, PlaybackState};
pub use project::{KeyEvent, Project, MANIFEST_FILE_NAME};
pub use renderer::{RenderReport, Renderer, SequenceFailure};
pub use sequence::{LoadReport, Sequence, SequenceId};
pub use surface::{Bgra, ClipRect, Surface, BLACK};
pub use track::{Track, TrackId};
