use std::io::{Read, Write};

use crate::error::{Result, SnapshotError};
use crate::io::{ReadLeExt, WriteLeExt};

/// Number of opcode slots in the command cache.
pub const COMMAND_CACHE_LEN: usize = 256;

const MAX_PENDING_INTERRUPTS: usize = 4096;
const MAX_STACK_ENTRIES: usize = 1024;

/// An interrupt that was raised but not yet handed to the interrupt sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptRecord {
    pub list_id: u32,
    pub pc: u32,
    pub sub_intr_base: i32,
    pub token: u32,
}

impl InterruptRecord {
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32_le(self.list_id)?;
        w.write_u32_le(self.pc)?;
        w.write_i32_le(self.sub_intr_base)?;
        w.write_u32_le(self.token)?;
        Ok(())
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            list_id: r.read_u32_le()?,
            pc: r.read_u32_le()?,
            sub_intr_base: r.read_i32_le()?,
            token: r.read_u32_le()?,
        })
    }
}

/// Engine-wide registers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineState {
    pub next_list_id: u32,
    /// Id of the list being interpreted, `0` if none.
    pub current_list_id: u32,
    pub interrupt_running: bool,
    pub interrupts_enabled: bool,
    pub prev: u32,
    pub finished: bool,
    pub offset_addr: u32,
    pub cycles_executed: u64,
    pub cycle_last_pc: u32,
    pub starting_ticks: u64,
    pub pending_interrupts: Vec<InterruptRecord>,
}

impl EngineState {
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32_le(self.next_list_id)?;
        w.write_u32_le(self.current_list_id)?;
        w.write_bool(self.interrupt_running)?;
        w.write_bool(self.interrupts_enabled)?;
        w.write_u32_le(self.prev)?;
        w.write_bool(self.finished)?;
        w.write_u32_le(self.offset_addr)?;
        w.write_u64_le(self.cycles_executed)?;
        w.write_u32_le(self.cycle_last_pc)?;
        w.write_u64_le(self.starting_ticks)?;

        let count: u32 = self
            .pending_interrupts
            .len()
            .try_into()
            .map_err(|_| SnapshotError::Corrupt("too many pending interrupts"))?;
        w.write_u32_le(count)?;
        for intr in &self.pending_interrupts {
            intr.encode(w)?;
        }
        Ok(())
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let next_list_id = r.read_u32_le()?;
        let current_list_id = r.read_u32_le()?;
        let interrupt_running = r.read_bool()?;
        let interrupts_enabled = r.read_bool()?;
        let prev = r.read_u32_le()?;
        let finished = r.read_bool()?;
        let offset_addr = r.read_u32_le()?;
        let cycles_executed = r.read_u64_le()?;
        let cycle_last_pc = r.read_u32_le()?;
        let starting_ticks = r.read_u64_le()?;

        let count = r.read_u32_le()? as usize;
        if count > MAX_PENDING_INTERRUPTS {
            return Err(SnapshotError::Corrupt("too many pending interrupts"));
        }
        let mut pending_interrupts = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            pending_interrupts.push(InterruptRecord::decode(r)?);
        }

        Ok(Self {
            next_list_id,
            current_list_id,
            interrupt_running,
            interrupts_enabled,
            prev,
            finished,
            offset_addr,
            cycles_executed,
            cycle_last_pc,
            starting_ticks,
            pending_interrupts,
        })
    }
}

/// One queued display list with every field needed to resume it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayListRecord {
    pub id: u32,
    pub start_pc: u32,
    pub pc: u32,
    pub stall: u32,
    /// Hardware state code (queued=1, running=2, completed=3, paused=4).
    pub state: u8,
    pub sub_intr_base: i32,
    pub sub_intr_token: u32,
    pub signal: u8,
    /// Return addresses, bottom of the stack first.
    pub stack: Vec<u32>,
}

impl DisplayListRecord {
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32_le(self.id)?;
        w.write_u32_le(self.start_pc)?;
        w.write_u32_le(self.pc)?;
        w.write_u32_le(self.stall)?;
        w.write_u8(self.state)?;
        w.write_i32_le(self.sub_intr_base)?;
        w.write_u32_le(self.sub_intr_token)?;
        w.write_u8(self.signal)?;
        w.write_u32_slice_le(&self.stack)?;
        Ok(())
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            id: r.read_u32_le()?,
            start_pc: r.read_u32_le()?,
            pc: r.read_u32_le()?,
            stall: r.read_u32_le()?,
            state: r.read_u8()?,
            sub_intr_base: r.read_i32_le()?,
            sub_intr_token: r.read_u32_le()?,
            signal: r.read_u8()?,
            stack: r.read_u32_vec_le(MAX_STACK_ENTRIES)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCacheState {
    pub words: Box<[u32; COMMAND_CACHE_LEN]>,
}

impl Default for CommandCacheState {
    fn default() -> Self {
        Self {
            words: Box::new([0; COMMAND_CACHE_LEN]),
        }
    }
}

impl CommandCacheState {
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        for &word in self.words.iter() {
            w.write_u32_le(word)?;
        }
        Ok(())
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<Self> {
        let mut state = Self::default();
        for slot in state.words.iter_mut() {
            *slot = r.read_u32_le()?;
        }
        Ok(state)
    }
}
