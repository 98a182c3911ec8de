use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Monotonic tick counter sampled when the queue starts draining.
pub trait TickSource {
    fn ticks(&self) -> u64;
}

/// Nanoseconds since the source was created.
#[derive(Debug, Clone, Copy)]
pub struct StdTickSource {
    start: Instant,
}

impl StdTickSource {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for StdTickSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for StdTickSource {
    fn ticks(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }
}

/// Manually advanced tick source for deterministic tests. Clones share the counter.
#[derive(Debug, Default, Clone)]
pub struct FakeTickSource {
    now: Rc<Cell<u64>>,
}

impl FakeTickSource {
    pub fn new(start: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, ticks: u64) {
        self.now.set(ticks);
    }

    pub fn advance(&self, delta: u64) {
        self.now.set(self.now.get().saturating_add(delta));
    }
}

impl TickSource for FakeTickSource {
    fn ticks(&self) -> u64 {
        self.now.get()
    }
}
