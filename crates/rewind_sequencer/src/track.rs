// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tracks group sequences that are drawn together.

use crate::sequence::{Sequence, SequenceId};
use rewind_cache::SubSequence;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub Uuid);

impl TrackId {
    /// Create a new random track ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

/// A track in the project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Unique track ID
    pub id: TrackId,
    /// Track name
    pub name: String,
    /// Whether the track is drawn
    pub visible: bool,
    /// Whether the track is locked against edits
    pub locked: bool,
    /// Sequences in draw order
    sequences: Vec<Sequence>,
}

impl Track {
    /// Create a new, visible track
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: TrackId::new(),
            name: name.into(),
            visible: true,
            locked: false,
            sequences: Vec::new(),
        }
    }

    /// Add a sequence on top of the existing ones
    pub fn add_sequence(&mut self, sequence: Sequence) -> SequenceId {
        let id = sequence.id;
        self.sequences.push(sequence);
        id
    }

    /// Remove a sequence
    pub fn remove_sequence(&mut self, sequence_id: SequenceId) -> Option<Sequence> {
        let index = self.sequences.iter().position(|s| s.id == sequence_id)?;
        Some(self.sequences.remove(index))
    }

    /// Get a sequence
    pub fn sequence(&self, sequence_id: SequenceId) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.id == sequence_id)
    }

    /// Get a mutable sequence
    pub fn sequence_mut(&mut self, sequence_id: SequenceId) -> Option<&mut Sequence> {
        self.sequences.iter_mut().find(|s| s.id == sequence_id)
    }

    /// Sequences in draw order
    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Mutable sequences in draw order
    pub fn sequences_mut(&mut self) -> impl Iterator<Item = &mut Sequence> {
        self.sequences.iter_mut()
    }

    /// Latest timestamp of any sequence
    pub fn duration(&self) -> i64 {
        self.sequences.iter().map(Sequence::duration).max().unwrap_or(0)
    }

    /// Active record of every sequence at `timestamp`
    pub fn active_records_at(&self, timestamp: i64) -> impl Iterator<Item = (&Sequence, &SubSequence)> {
        self.sequences
            .iter()
            .filter_map(move |s| s.active_record_at(timestamp).map(|r| (s, r)))
    }
}
