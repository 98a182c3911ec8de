//! Versioned snapshot container for the GE display-list engine.
//!
//! A snapshot is a fixed file header followed by length-prefixed sections. Unknown sections and
//! trailing bytes inside known sections are skipped, so newer writers can append fields without
//! breaking older readers.
#![forbid(unsafe_code)]

mod error;
mod format;
mod io;
mod types;

pub use crate::error::{Result, SnapshotError};
pub use crate::format::{
    SectionId, SNAPSHOT_ENDIANNESS_LITTLE, SNAPSHOT_MAGIC, SNAPSHOT_VERSION_V1,
};
pub use crate::io::{ReadLeExt, WriteLeExt};
pub use crate::types::{
    CommandCacheState, DisplayListRecord, EngineState, InterruptRecord, COMMAND_CACHE_LEN,
};

use std::io::{Read, Seek, SeekFrom, Write};

pub trait SnapshotSource {
    fn engine_state(&self) -> EngineState;
    fn display_lists(&self) -> Vec<DisplayListRecord>;
    fn command_cache(&self) -> CommandCacheState;
}

pub trait SnapshotTarget {
    fn restore_engine_state(&mut self, state: EngineState);
    fn restore_display_lists(&mut self, lists: Vec<DisplayListRecord>);
    fn restore_command_cache(&mut self, cache: CommandCacheState);

    fn post_restore(&mut self) -> Result<()> {
        Ok(())
    }
}

pub fn save_snapshot<W: Write + Seek, S: SnapshotSource + ?Sized>(
    w: &mut W,
    source: &S,
) -> Result<()> {
    write_file_header(w)?;

    write_section(w, SectionId::ENGINE, 1, 0, |w| source.engine_state().encode(w))?;

    write_section(w, SectionId::LISTS, 1, 0, |w| {
        let lists = source.display_lists();
        let count: u32 = lists
            .len()
            .try_into()
            .map_err(|_| SnapshotError::Corrupt("too many display lists"))?;
        w.write_u32_le(count)?;
        for list in &lists {
            list.encode(w)?;
        }
        Ok(())
    })?;

    write_section(w, SectionId::CMD_CACHE, 1, 0, |w| source.command_cache().encode(w))?;

    Ok(())
}

pub fn restore_snapshot<R: Read, T: SnapshotTarget + ?Sized>(r: &mut R, target: &mut T) -> Result<()> {
    read_file_header(r)?;

    const MAX_LISTS_SECTION_LEN: u64 = 64 * 1024 * 1024;
    const MAX_LIST_COUNT: usize = 4096;

    let mut seen_engine = false;
    let mut seen_lists = false;
    let mut seen_cache = false;

    while let Some(header) = read_section_header(r)? {
        if header.id == SectionId::LISTS && header.len > MAX_LISTS_SECTION_LEN {
            return Err(SnapshotError::Corrupt("lists section too large"));
        }

        let mut section_reader = r.take(header.len);
        match header.id {
            id if id == SectionId::ENGINE => {
                if header.version == 1 {
                    let state = EngineState::decode(&mut section_reader)?;
                    target.restore_engine_state(state);
                    seen_engine = true;
                }
            }
            id if id == SectionId::LISTS => {
                if header.version == 1 {
                    let count = section_reader.read_u32_le()? as usize;
                    if count > MAX_LIST_COUNT {
                        return Err(SnapshotError::Corrupt("too many display lists"));
                    }
                    let mut lists = Vec::with_capacity(count.min(64));
                    for _ in 0..count {
                        lists.push(DisplayListRecord::decode(&mut section_reader)?);
                    }
                    target.restore_display_lists(lists);
                    seen_lists = true;
                }
            }
            id if id == SectionId::CMD_CACHE => {
                if header.version == 1 {
                    let cache = CommandCacheState::decode(&mut section_reader)?;
                    target.restore_command_cache(cache);
                    seen_cache = true;
                }
            }
            _ => {
                // Unknown section; skip.
            }
        }

        // Consume any trailing bytes (forward-compatible additions inside known sections).
        std::io::copy(&mut section_reader, &mut std::io::sink())?;
        if section_reader.limit() != 0 {
            return Err(SnapshotError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "truncated section payload",
            )));
        }
    }

    if !seen_engine {
        return Err(SnapshotError::Corrupt("missing ENGINE section"));
    }
    if !seen_lists {
        return Err(SnapshotError::Corrupt("missing LISTS section"));
    }
    if !seen_cache {
        target.restore_command_cache(CommandCacheState::default());
    }
    target.post_restore()?;
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct SectionHeader {
    id: SectionId,
    version: u16,
    len: u64,
}

fn write_file_header<W: Write>(w: &mut W) -> Result<()> {
    w.write_bytes(SNAPSHOT_MAGIC)?;
    w.write_u16_le(SNAPSHOT_VERSION_V1)?;
    w.write_u8(SNAPSHOT_ENDIANNESS_LITTLE)?;
    w.write_u8(0)?; // reserved
    w.write_u32_le(0)?; // flags/reserved
    Ok(())
}

fn read_file_header<R: Read>(r: &mut R) -> Result<()> {
    let mut magic = [0u8; 8];
    r.read_exact(&mut magic)?;
    if &magic != SNAPSHOT_MAGIC {
        return Err(SnapshotError::InvalidMagic);
    }
    let version = r.read_u16_le()?;
    if version != SNAPSHOT_VERSION_V1 {
        return Err(SnapshotError::UnsupportedVersion(version));
    }
    let endianness = r.read_u8()?;
    if endianness != SNAPSHOT_ENDIANNESS_LITTLE {
        return Err(SnapshotError::InvalidEndianness(endianness));
    }
    let _reserved = r.read_u8()?;
    let _flags = r.read_u32_le()?;
    Ok(())
}

fn write_section<W: Write + Seek>(
    w: &mut W,
    id: SectionId,
    version: u16,
    flags: u16,
    f: impl FnOnce(&mut W) -> Result<()>,
) -> Result<()> {
    let header_pos = w.stream_position()?;
    w.write_u32_le(id.0)?;
    w.write_u16_le(version)?;
    w.write_u16_le(flags)?;
    w.write_u64_le(0)?; // placeholder len

    let payload_start = w.stream_position()?;
    f(w)?;
    let payload_end = w.stream_position()?;

    let len = payload_end
        .checked_sub(payload_start)
        .ok_or(SnapshotError::Corrupt("stream position underflow"))?;

    w.seek(SeekFrom::Start(header_pos + 8))?;
    w.write_u64_le(len)?;
    w.seek(SeekFrom::Start(payload_end))?;
    Ok(())
}

fn read_section_header<R: Read>(r: &mut R) -> Result<Option<SectionHeader>> {
    let mut first = [0u8; 1];
    if r.read(&mut first)? == 0 {
        return Ok(None);
    }
    let mut tag_bytes = [0u8; 4];
    tag_bytes[0] = first[0];
    r.read_exact(&mut tag_bytes[1..])?;
    let id = SectionId(u32::from_le_bytes(tag_bytes));
    let version = r.read_u16_le()?;
    let _flags = r.read_u16_le()?;
    let len = r.read_u64_le()?;
    Ok(Some(SectionHeader { id, version, len }))
}
