use std::cell::RefCell;
use std::rc::Rc;

use ge_snapshot::InterruptRecord;

use crate::list::DisplayListId;

/// A display-list interrupt raised by SIGNAL+END or FINISH+END.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeInterrupt {
    pub list_id: DisplayListId,
    pub pc: u32,
    pub sub_intr_base: i32,
    pub token: u32,
}

impl GeInterrupt {
    pub(crate) fn to_record(self) -> InterruptRecord {
        InterruptRecord {
            list_id: self.list_id.0,
            pc: self.pc,
            sub_intr_base: self.sub_intr_base,
            token: self.token,
        }
    }

    pub(crate) fn from_record(record: &InterruptRecord) -> Self {
        Self {
            list_id: DisplayListId(record.list_id),
            pc: record.pc,
            sub_intr_base: record.sub_intr_base,
            token: record.token,
        }
    }
}

pub trait GeInterruptSink {
    fn trigger(&mut self, interrupt: GeInterrupt);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullInterruptSink;

impl GeInterruptSink for NullInterruptSink {
    fn trigger(&mut self, _interrupt: GeInterrupt) {}
}

/// Sink that keeps every interrupt it receives. Clones share the log.
#[derive(Debug, Default, Clone)]
pub struct RecordingInterruptSink {
    raised: Rc<RefCell<Vec<GeInterrupt>>>,
}

impl RecordingInterruptSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raised(&self) -> Vec<GeInterrupt> {
        self.raised.borrow().clone()
    }

    pub fn take(&self) -> Vec<GeInterrupt> {
        std::mem::take(&mut *self.raised.borrow_mut())
    }
}

impl GeInterruptSink for RecordingInterruptSink {
    fn trigger(&mut self, interrupt: GeInterrupt) {
        self.raised.borrow_mut().push(interrupt);
    }
}
