use core::fmt;

use ge_memory::mask_address;
use ge_snapshot::{DisplayListRecord, SnapshotError};

use crate::cmd::SignalBehavior;
use crate::status::DisplayListState;

/// Capacity of a display list's return-address stack.
pub const DISPLAY_LIST_STACK_DEPTH: usize = 32;

/// Engine-unique display list identifier. Never reused while the engine lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DisplayListId(pub u32);

impl fmt::Display for DisplayListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayList {
    pub(crate) id: DisplayListId,
    pub(crate) start_pc: u32,
    pub(crate) pc: u32,
    pub(crate) stall: u32,
    pub(crate) state: DisplayListState,
    pub(crate) sub_intr_base: i32,
    pub(crate) sub_intr_token: u32,
    pub(crate) signal: u8,
    stack: [u32; DISPLAY_LIST_STACK_DEPTH],
    stack_ptr: usize,
}

impl DisplayList {
    pub(crate) fn new(id: DisplayListId, list_addr: u32, stall_addr: u32, sub_intr_base: i32) -> Self {
        let start_pc = mask_address(list_addr);
        Self {
            id,
            start_pc,
            pc: start_pc,
            stall: mask_address(stall_addr),
            state: DisplayListState::Queued,
            sub_intr_base: sub_intr_base.max(-1),
            sub_intr_token: 0,
            signal: SignalBehavior::NONE,
            stack: [0; DISPLAY_LIST_STACK_DEPTH],
            stack_ptr: 0,
        }
    }

    pub fn id(&self) -> DisplayListId {
        self.id
    }

    pub fn start_pc(&self) -> u32 {
        self.start_pc
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn stall(&self) -> u32 {
        self.stall
    }

    pub fn state(&self) -> DisplayListState {
        self.state
    }

    /// Interrupt channel, `-1` when the list raises no interrupts.
    pub fn sub_intr_base(&self) -> i32 {
        self.sub_intr_base
    }

    pub fn sub_intr_token(&self) -> u32 {
        self.sub_intr_token
    }

    /// Behaviour code of the last SIGNAL consumed by an END.
    pub fn signal(&self) -> u8 {
        self.signal
    }

    pub fn return_stack(&self) -> &[u32] {
        &self.stack[..self.stack_ptr]
    }

    pub fn stack_depth(&self) -> usize {
        self.stack_ptr
    }

    /// A running list whose PC has caught up with its stall address.
    pub fn is_stalled(&self) -> bool {
        self.pc == self.stall
    }

    pub(crate) fn set_stall(&mut self, stall_addr: u32) {
        self.stall = mask_address(stall_addr);
    }

    /// Returns `false` when the stack is full.
    pub(crate) fn push_return(&mut self, addr: u32) -> bool {
        if self.stack_ptr == DISPLAY_LIST_STACK_DEPTH {
            return false;
        }
        self.stack[self.stack_ptr] = mask_address(addr);
        self.stack_ptr += 1;
        true
    }

    pub(crate) fn pop_return(&mut self) -> Option<u32> {
        self.stack_ptr = self.stack_ptr.checked_sub(1)?;
        Some(self.stack[self.stack_ptr])
    }

    pub(crate) fn to_record(&self) -> DisplayListRecord {
        DisplayListRecord {
            id: self.id.0,
            start_pc: self.start_pc,
            pc: self.pc,
            stall: self.stall,
            state: self.state.code(),
            sub_intr_base: self.sub_intr_base,
            sub_intr_token: self.sub_intr_token,
            signal: self.signal,
            stack: self.return_stack().to_vec(),
        }
    }

    pub(crate) fn from_record(record: &DisplayListRecord) -> Result<Self, SnapshotError> {
        let state = DisplayListState::from_code(record.state)
            .ok_or(SnapshotError::Corrupt("unknown display list state"))?;
        if record.id == 0 {
            return Err(SnapshotError::Corrupt("display list id 0 is reserved"));
        }
        if record.stack.len() > DISPLAY_LIST_STACK_DEPTH {
            return Err(SnapshotError::StackTooDeep {
                id: record.id,
                depth: record.stack.len(),
                capacity: DISPLAY_LIST_STACK_DEPTH,
            });
        }
        let masked = |addr: u32| mask_address(addr) == addr;
        if !masked(record.start_pc)
            || !masked(record.pc)
            || !masked(record.stall)
            || !record.stack.iter().copied().all(masked)
        {
            return Err(SnapshotError::Corrupt("display list address outside the GE range"));
        }
        if record.sub_intr_base < -1 {
            return Err(SnapshotError::Corrupt("invalid interrupt channel"));
        }

        let mut stack = [0; DISPLAY_LIST_STACK_DEPTH];
        stack[..record.stack.len()].copy_from_slice(&record.stack);
        Ok(Self {
            id: DisplayListId(record.id),
            start_pc: record.start_pc,
            pc: record.pc,
            stall: record.stall,
            state,
            sub_intr_base: record.sub_intr_base,
            sub_intr_token: record.sub_intr_token,
            signal: record.signal,
            stack,
            stack_ptr: record.stack.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_list_masks_addresses_and_clamps_channel() {
        let list = DisplayList::new(DisplayListId(3), 0x4880_0000, 0xF880_0040, -7);
        assert_eq!(list.start_pc(), 0x0880_0000);
        assert_eq!(list.pc(), 0x0880_0000);
        assert_eq!(list.stall(), 0x0880_0040);
        assert_eq!(list.sub_intr_base(), -1);
        assert_eq!(list.state(), DisplayListState::Queued);
        assert_eq!(list.signal(), SignalBehavior::NONE);
        assert_eq!(list.stack_depth(), 0);
    }

    #[test]
    fn stack_overflow_and_underflow_are_reported() {
        let mut list = DisplayList::new(DisplayListId(1), 0x0880_0000, 0x0880_0000, -1);
        assert_eq!(list.pop_return(), None);
        for i in 0..DISPLAY_LIST_STACK_DEPTH as u32 {
            assert!(list.push_return(0x0880_0000 + i * 4));
        }
        assert!(!list.push_return(0x0890_0000));
        assert_eq!(list.stack_depth(), DISPLAY_LIST_STACK_DEPTH);
        assert_eq!(list.pop_return(), Some(0x0880_0000 + 31 * 4));
        assert_eq!(list.stack_depth(), DISPLAY_LIST_STACK_DEPTH - 1);
    }

    #[test]
    fn record_with_oversized_stack_is_rejected() {
        let record = DisplayListRecord {
            id: 9,
            state: DisplayListState::Running.code(),
            sub_intr_base: -1,
            stack: vec![0x0880_0000; DISPLAY_LIST_STACK_DEPTH + 1],
            ..DisplayListRecord::default()
        };
        let err = DisplayList::from_record(&record).unwrap_err();
        assert!(matches!(err, SnapshotError::StackTooDeep { id: 9, depth: 33, .. }));
    }

    #[test]
    fn record_round_trip_keeps_stack() {
        let mut list = DisplayList::new(DisplayListId(2), 0x0880_0000, 0x0880_0100, 4);
        list.push_return(0x0880_0010);
        list.push_return(0x0880_0020);
        list.state = DisplayListState::Running;
        let restored = DisplayList::from_record(&list.to_record()).unwrap();
        assert_eq!(restored, list);
    }
}
