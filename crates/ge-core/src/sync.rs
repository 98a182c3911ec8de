//! Guest-facing queue and sync operations.

use ge_memory::GuestMemory;
use tracing::{debug, warn};

use crate::engine::GeEngine;
use crate::list::{DisplayList, DisplayListId};
use crate::status::{DisplayListState, GeListStatus, GeSyncError, SyncMode};

impl GeEngine {
    /// Adds a list to the queue and immediately drains it as far as possible.
    ///
    /// `head` puts the list in front of everything already queued. `sub_intr_base` below `-1` is
    /// treated as `-1` (no interrupts).
    pub fn enqueue_list(
        &mut self,
        mem: &dyn GuestMemory,
        list_addr: u32,
        stall_addr: u32,
        sub_intr_base: i32,
        head: bool,
    ) -> DisplayListId {
        let id = self.allocate_list_id();
        let list = DisplayList::new(id, list_addr, stall_addr, sub_intr_base);
        debug!(
            list_id = id.0,
            pc = format_args!("{:#010x}", list.start_pc()),
            stall = format_args!("{:#010x}", list.stall()),
            sub_intr_base = list.sub_intr_base(),
            head,
            "enqueue display list"
        );
        if head {
            self.queue.push_front(list);
        } else {
            self.queue.push_back(list);
        }
        self.process_queue(mem);
        id
    }

    /// Moves the stall address of list `id` and resumes draining.
    ///
    /// An unknown id only triggers the drain.
    pub fn update_stall(&mut self, mem: &dyn GuestMemory, id: DisplayListId, new_stall: u32) {
        for list in self.queue.iter_mut().filter(|list| list.id == id) {
            list.set_stall(new_stall);
        }
        self.process_queue(mem);
    }

    pub fn dequeue_list(&mut self, id: DisplayListId) -> Result<(), GeSyncError> {
        warn!(list_id = id.0, "dequeue_list is not implemented");
        Ok(())
    }

    pub fn continue_list(&mut self) -> Result<(), GeSyncError> {
        warn!("continue_list is not implemented");
        Ok(())
    }

    pub fn break_list(&mut self, mode: u32) -> Result<(), GeSyncError> {
        SyncMode::try_from(mode)?;
        warn!(mode, "break_list is not implemented");
        Ok(())
    }

    /// Reports the progress of the whole queue.
    pub fn draw_sync(&self, mode: u32) -> Result<GeListStatus, GeSyncError> {
        match SyncMode::try_from(mode)? {
            SyncMode::Wait => {
                warn!("draw_sync wait mode is not implemented, reporting completion");
                Ok(GeListStatus::Completed)
            }
            SyncMode::Peek => Ok(match self.current_list() {
                None => GeListStatus::Completed,
                Some(list) if list.is_stalled() => GeListStatus::Stalling,
                Some(_) => GeListStatus::Drawing,
            }),
        }
    }

    /// Reports the progress of one list.
    pub fn list_sync(&self, id: DisplayListId, mode: u32) -> Result<GeListStatus, GeSyncError> {
        match SyncMode::try_from(mode)? {
            SyncMode::Wait => {
                warn!(list_id = id.0, "list_sync wait mode is not implemented, reporting completion");
                Ok(GeListStatus::Completed)
            }
            SyncMode::Peek => {
                let list = self.queue.get(id).ok_or(GeSyncError::InvalidId(id.0))?;
                Ok(match list.state() {
                    DisplayListState::Queued => GeListStatus::Queued,
                    DisplayListState::Running if list.is_stalled() => GeListStatus::Stalling,
                    DisplayListState::Running => GeListStatus::Drawing,
                    DisplayListState::Completed => GeListStatus::Completed,
                    DisplayListState::Paused => GeListStatus::Paused,
                })
            }
        }
    }

    /// Marks the start of interrupt servicing. Interrupts raised until
    /// [`GeEngine::interrupt_service_end`] are held back.
    pub fn interrupt_service_begin(&mut self) {
        self.interrupts.running = true;
    }

    /// Ends interrupt servicing, delivers any held-back interrupts in order, and resumes draining.
    pub fn interrupt_service_end(&mut self, mem: &dyn GuestMemory) -> bool {
        self.interrupts.running = false;
        for interrupt in std::mem::take(&mut self.interrupts.pending) {
            self.deliver(interrupt);
        }
        self.process_queue(mem)
    }
}
