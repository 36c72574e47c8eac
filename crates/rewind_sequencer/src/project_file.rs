// SPDX-License-Identifier: MIT OR Apache-2.0
//! Binary project manifest.
//!
//! The manifest stores the project structure only; records live in each
//! sequence's cache file. Layout (little-endian):
//!
//! ```text
//! "RWPJ" version:u16 name:pstr16 width:u16 height:u16 background:[u8;4] tracks:u16
//!   track:    uuid:[u8;16] name:pstr8 flags:u8 sequences:u16
//!   sequence: uuid:[u8;16] kind:u8 name:pstr8 left:i32 top:i32 width:u16 height:u16
//!             opacity:f64 has_background:u8 background:[u8;4] cache_path:pstr32 (aligned to 4)
//! ```

use crate::error::{ProjectError, Result};
use crate::project::Project;
use crate::sequence::{Sequence, SequenceId};
use crate::surface::Bgra;
use crate::track::{Track, TrackId};
use rewind_cache::{CacheError, LengthPrefix, StreamReader, StreamWriter, SubSequenceKind};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File signature
pub const MANIFEST_MAGIC: [u8; 4] = *b"RWPJ";

/// Current manifest format version
pub const MANIFEST_VERSION: u16 = 1;

const TRACK_VISIBLE: u8 = 0b01;
const TRACK_LOCKED: u8 = 0b10;

fn count_u16(what: &'static str, count: usize) -> Result<u16> {
    u16::try_from(count).map_err(|_| ProjectError::TooMany { what, count })
}

/// Write the manifest of `project`
pub fn write_manifest<W: Write>(project: &Project, writer: W) -> Result<u64> {
    let mut out = StreamWriter::new(writer);
    out.write_bytes(&MANIFEST_MAGIC)?;
    out.write_u16(MANIFEST_VERSION)?;
    out.write_pascal_string(&project.name, LengthPrefix::U16, false)?;
    out.write_u16(project.width)?;
    out.write_u16(project.height)?;
    out.write_bytes(&project.background)?;

    let tracks: Vec<&Track> = project.tracks().collect();
    out.write_u16(count_u16("tracks", tracks.len())?)?;
    for track in tracks {
        out.write_bytes(track.id.0.as_bytes())?;
        out.write_pascal_string(&track.name, LengthPrefix::U8, false)?;
        let mut flags = 0;
        if track.visible {
            flags |= TRACK_VISIBLE;
        }
        if track.locked {
            flags |= TRACK_LOCKED;
        }
        out.write_u8(flags)?;

        out.write_u16(count_u16("sequences", track.sequences().len())?)?;
        for sequence in track.sequences() {
            write_sequence(&mut out, sequence)?;
        }
    }

    out.flush()?;
    Ok(out.position())
}

fn write_sequence<W: Write>(out: &mut StreamWriter<W>, sequence: &Sequence) -> Result<()> {
    out.write_bytes(sequence.id.0.as_bytes())?;
    out.write_u8(sequence.kind.to_byte())?;
    out.write_pascal_string(&sequence.name, LengthPrefix::U8, false)?;
    out.write_i32(sequence.left)?;
    out.write_i32(sequence.top)?;
    out.write_u16(sequence.width)?;
    out.write_u16(sequence.height)?;
    out.write_f64(sequence.opacity)?;
    out.write_u8(sequence.background.is_some() as u8)?;
    out.write_bytes(&sequence.background.unwrap_or_default())?;
    let cache_path = sequence.cache_path.to_string_lossy().replace('\\', "/");
    out.write_pascal_string(&cache_path, LengthPrefix::U32, true)?;
    Ok(())
}

/// Read a manifest. Sequences come back without records.
pub fn read_manifest<R: Read>(reader: R, path: &Path) -> Result<Project> {
    let mut input = StreamReader::new(reader);

    match input.read_bytes(MANIFEST_MAGIC.len() as u64) {
        Ok(magic) if magic == MANIFEST_MAGIC => {}
        Ok(_) => return Err(ProjectError::BadMagic(path.to_path_buf())),
        Err(e) if e.is_truncation() => return Err(ProjectError::BadMagic(path.to_path_buf())),
        Err(e) => return Err(e.into()),
    }

    let version = input.read_u16()?;
    if version > MANIFEST_VERSION {
        return Err(ProjectError::UnsupportedVersion {
            found: version,
            supported: MANIFEST_VERSION,
        });
    }

    let name = input.read_pascal_string(LengthPrefix::U16, false)?;
    let width = input.read_u16()?;
    let height = input.read_u16()?;
    let background = read_color(&mut input)?;
    let mut project = Project::new(name, width, height).with_background(background);

    let track_count = input.read_u16()?;
    for _ in 0..track_count {
        let id = TrackId(read_uuid(&mut input)?);
        let mut track = Track::new(input.read_pascal_string(LengthPrefix::U8, false)?);
        track.id = id;
        let flags = input.read_u8()?;
        track.visible = flags & TRACK_VISIBLE != 0;
        track.locked = flags & TRACK_LOCKED != 0;

        let sequence_count = input.read_u16()?;
        for _ in 0..sequence_count {
            track.add_sequence(read_sequence(&mut input)?);
        }
        project.add_track(track);
    }

    tracing::debug!(
        "Read manifest {:?}: '{}' with {} tracks",
        path,
        project.name,
        project.track_count()
    );
    Ok(project)
}

fn read_sequence<R: Read>(input: &mut StreamReader<R>) -> Result<Sequence> {
    let id = SequenceId(read_uuid(input)?);

    let position = input.position();
    let kind_byte = input.read_u8()?;
    let kind = SubSequenceKind::from_byte(kind_byte)
        .ok_or_else(|| CacheError::malformed(position, format!("unknown sequence kind {kind_byte}")))?;

    let name = input.read_pascal_string(LengthPrefix::U8, false)?;
    let left = input.read_i32()?;
    let top = input.read_i32()?;
    let width = input.read_u16()?;
    let height = input.read_u16()?;

    let position = input.position();
    let opacity = input.read_f64()?;
    if !(0.0..=1.0).contains(&opacity) {
        return Err(CacheError::malformed(position, format!("opacity {opacity} outside 0..=1")).into());
    }

    let has_background = input.read_u8()? != 0;
    let background = read_color(input)?;
    let cache_path = PathBuf::from(input.read_pascal_string(LengthPrefix::U32, true)?);

    let mut sequence = Sequence::new(name, kind, cache_path)
        .placed(left, top, width, height)
        .with_opacity(opacity);
    sequence.id = id;
    sequence.background = has_background.then_some(background);
    Ok(sequence)
}

fn read_uuid<R: Read>(input: &mut StreamReader<R>) -> Result<Uuid> {
    let position = input.position();
    let bytes = input.read_bytes(16)?;
    Uuid::from_slice(&bytes).map_err(|e| CacheError::malformed(position, e.to_string()).into())
}

fn read_color<R: Read>(input: &mut StreamReader<R>) -> Result<Bgra> {
    let bytes = input.read_bytes(4)?;
    let mut color = [0; 4];
    color.copy_from_slice(&bytes);
    Ok(color)
}
