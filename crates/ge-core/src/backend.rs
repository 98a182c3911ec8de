use std::cell::RefCell;
use std::rc::Rc;

/// Receiver for everything the display-list interpreter does not handle itself.
///
/// Rendering commands arrive through [`GeBackend::execute`] unchanged. The control-flow hooks
/// are notifications only: the interpreter has already applied the transfer by the time they
/// run, and their default bodies do nothing.
pub trait GeBackend {
    /// Called for every fetched word before it is dispatched.
    fn pre_execute(&mut self, _word: u32, _diff: u32) {}

    /// A non-control command. `diff` holds the bits that changed since the last command with
    /// the same opcode.
    fn execute(&mut self, opcode: u8, data: u32, diff: u32);

    fn jump(&mut self, _target: u32) {}

    fn call(&mut self, _target: u32, _return_addr: u32) {}

    fn ret(&mut self, _target: u32) {}

    /// An END consumed a preceding SIGNAL.
    fn signal(&mut self, _behavior: u8, _signal: u16, _end_data: u16) {}

    /// An END consumed a preceding FINISH.
    fn finish(&mut self, _token: u16) {}

    fn reset(&mut self) {}
}

/// Backend that discards every command.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullGeBackend;

impl NullGeBackend {
    pub fn new() -> Self {
        Self
    }
}

impl GeBackend for NullGeBackend {
    fn execute(&mut self, _opcode: u8, _data: u32, _diff: u32) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    Execute { opcode: u8, data: u32, diff: u32 },
    Jump { target: u32 },
    Call { target: u32, return_addr: u32 },
    Ret { target: u32 },
    Signal { behavior: u8, signal: u16, end_data: u16 },
    Finish { token: u16 },
    Reset,
}

/// Backend that logs every callback. Clones share the same log, so a handle kept by the caller
/// still sees events after the engine takes ownership of another clone.
#[derive(Debug, Default, Clone)]
pub struct RecordingGeBackend {
    events: Rc<RefCell<Vec<BackendEvent>>>,
    pre_executed: Rc<RefCell<Vec<u32>>>,
}

impl RecordingGeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BackendEvent> {
        self.events.borrow().clone()
    }

    /// `(opcode, data, diff)` of every forwarded command, in order.
    pub fn executed(&self) -> Vec<(u8, u32, u32)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match *event {
                BackendEvent::Execute { opcode, data, diff } => Some((opcode, data, diff)),
                _ => None,
            })
            .collect()
    }

    /// Every word the interpreter fetched, control commands included.
    pub fn fetched_words(&self) -> Vec<u32> {
        self.pre_executed.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
        self.pre_executed.borrow_mut().clear();
    }

    fn push(&self, event: BackendEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl GeBackend for RecordingGeBackend {
    fn pre_execute(&mut self, word: u32, _diff: u32) {
        self.pre_executed.borrow_mut().push(word);
    }

    fn execute(&mut self, opcode: u8, data: u32, diff: u32) {
        self.push(BackendEvent::Execute { opcode, data, diff });
    }

    fn jump(&mut self, target: u32) {
        self.push(BackendEvent::Jump { target });
    }

    fn call(&mut self, target: u32, return_addr: u32) {
        self.push(BackendEvent::Call {
            target,
            return_addr,
        });
    }

    fn ret(&mut self, target: u32) {
        self.push(BackendEvent::Ret { target });
    }

    fn signal(&mut self, behavior: u8, signal: u16, end_data: u16) {
        self.push(BackendEvent::Signal {
            behavior,
            signal,
            end_data,
        });
    }

    fn finish(&mut self, token: u16) {
        self.push(BackendEvent::Finish { token });
    }

    fn reset(&mut self) {
        self.push(BackendEvent::Reset);
    }
}
