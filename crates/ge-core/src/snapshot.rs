use std::collections::HashSet;
use std::io::{Cursor, Read, Seek, Write};

use ge_snapshot::{
    CommandCacheState, DisplayListRecord, EngineState, Result, SnapshotError, SnapshotSource,
    SnapshotTarget,
};
use tracing::debug;

use crate::cache::CommandCache;
use crate::engine::{GeEngine, GeRegisters, InterruptState};
use crate::interrupt::GeInterrupt;
use crate::list::{DisplayList, DisplayListId};
use crate::queue::DisplayListQueue;

impl SnapshotSource for GeEngine {
    fn engine_state(&self) -> EngineState {
        EngineState {
            next_list_id: self.next_list_id,
            current_list_id: self.current.map_or(0, |id| id.0),
            interrupt_running: self.interrupts.running,
            interrupts_enabled: self.interrupts.enabled,
            prev: self.regs.prev,
            finished: self.regs.finished,
            offset_addr: self.regs.offset_addr,
            cycles_executed: self.regs.cycles_executed,
            cycle_last_pc: self.regs.cycle_last_pc,
            starting_ticks: self.regs.starting_ticks,
            pending_interrupts: self
                .interrupts
                .pending
                .iter()
                .map(|interrupt| interrupt.to_record())
                .collect(),
        }
    }

    fn display_lists(&self) -> Vec<DisplayListRecord> {
        self.queue.iter().map(DisplayList::to_record).collect()
    }

    fn command_cache(&self) -> CommandCacheState {
        self.cache.to_state()
    }
}

/// Collects decoded sections so they can be checked before the engine is touched.
#[derive(Default)]
struct StagedRestore {
    engine: Option<EngineState>,
    lists: Vec<DisplayListRecord>,
    cache: CommandCacheState,
    validated: Option<DisplayListQueue>,
}

impl SnapshotTarget for StagedRestore {
    fn restore_engine_state(&mut self, state: EngineState) {
        self.engine = Some(state);
    }

    fn restore_display_lists(&mut self, lists: Vec<DisplayListRecord>) {
        self.lists = lists;
    }

    fn restore_command_cache(&mut self, cache: CommandCacheState) {
        self.cache = cache;
    }

    fn post_restore(&mut self) -> Result<()> {
        let engine = self
            .engine
            .as_ref()
            .ok_or(SnapshotError::Corrupt("missing ENGINE section"))?;

        let mut ids = HashSet::with_capacity(self.lists.len());
        let mut queue = DisplayListQueue::new();
        for record in &self.lists {
            if !ids.insert(record.id) {
                return Err(SnapshotError::DuplicateListId(record.id));
            }
            if record.id >= engine.next_list_id {
                return Err(SnapshotError::Corrupt("list id generator behind a live list"));
            }
            queue.push_back(DisplayList::from_record(record)?);
        }
        if engine.next_list_id == 0 {
            return Err(SnapshotError::Corrupt("list id generator is zero"));
        }

        self.validated = Some(queue);
        Ok(())
    }
}

impl GeEngine {
    pub fn save_snapshot<W: Write + Seek>(&self, w: &mut W) -> Result<()> {
        ge_snapshot::save_snapshot(w, self)
    }

    /// Replaces the engine state with a snapshot. On error the engine is left as it was.
    ///
    /// Collaborators and [`crate::GeStats`] are not part of the snapshot and are kept.
    pub fn restore_snapshot<R: Read>(&mut self, r: &mut R) -> Result<()> {
        let mut staged = StagedRestore::default();
        ge_snapshot::restore_snapshot(r, &mut staged)?;

        let (Some(engine), Some(queue)) = (staged.engine, staged.validated) else {
            return Err(SnapshotError::Corrupt("snapshot was not validated"));
        };
        self.apply(engine, queue, staged.cache);
        Ok(())
    }

    pub fn save_state(&self) -> Result<Vec<u8>> {
        let mut w = Cursor::new(Vec::new());
        self.save_snapshot(&mut w)?;
        Ok(w.into_inner())
    }

    pub fn load_state(&mut self, bytes: &[u8]) -> Result<()> {
        self.restore_snapshot(&mut Cursor::new(bytes))
    }

    fn apply(&mut self, engine: EngineState, queue: DisplayListQueue, cache: CommandCacheState) {
        let current = match engine.current_list_id {
            0 => None,
            id => queue.position(DisplayListId(id)).map(|_| DisplayListId(id)),
        };
        if current.is_none() && engine.current_list_id != 0 {
            debug!(
                list_id = engine.current_list_id,
                "current display list is not in the restored queue"
            );
        }

        self.queue = queue;
        self.current = current;
        self.next_list_id = engine.next_list_id;
        self.cache = CommandCache::from_state(cache);
        self.regs = GeRegisters {
            offset_addr: engine.offset_addr,
            prev: engine.prev,
            finished: engine.finished,
            cycles_executed: engine.cycles_executed,
            cycle_last_pc: engine.cycle_last_pc,
            starting_ticks: engine.starting_ticks,
        };
        self.interrupts = InterruptState {
            enabled: engine.interrupts_enabled,
            running: engine.interrupt_running,
            pending: engine
                .pending_interrupts
                .iter()
                .map(GeInterrupt::from_record)
                .collect(),
        };
    }
}
