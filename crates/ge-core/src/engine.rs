use std::time::Instant;

use ge_memory::GuestMemory;
use tracing::{debug, error, trace};

use crate::backend::{GeBackend, NullGeBackend};
use crate::cache::CommandCache;
use crate::clock::{StdTickSource, TickSource};
use crate::config::GeEngineConfig;
use crate::dispatch::ListExecutor;
use crate::interrupt::{GeInterrupt, GeInterruptSink, NullInterruptSink};
use crate::list::{DisplayList, DisplayListId};
use crate::queue::DisplayListQueue;
use crate::stats::GeStats;
use crate::status::DisplayListState;

/// How a call into the interpreter loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListRun {
    /// The list completed or was aborted and can be removed from the queue.
    Done,
    /// The list reached its stall address. Nothing behind it may run.
    Stalled,
}

/// Engine-wide interpreter registers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct GeRegisters {
    pub offset_addr: u32,
    /// Word executed immediately before the current one. END inspects it.
    pub prev: u32,
    pub finished: bool,
    /// Cycles counted since the current drain pass started.
    pub cycles_executed: u64,
    pub cycle_last_pc: u32,
    pub starting_ticks: u64,
}

impl GeRegisters {
    /// Charges one cycle per word between the last checkpoint and `pc`, then moves the checkpoint
    /// to `new_pc` (or `pc`).
    pub fn update_cycles(&mut self, pc: u32, new_pc: Option<u32>) {
        let words = pc.wrapping_sub(self.cycle_last_pc) / 4;
        self.cycles_executed = self.cycles_executed.wrapping_add(u64::from(words));
        self.cycle_last_pc = new_pc.unwrap_or(pc);
    }
}

/// Interrupt delivery bookkeeping.
#[derive(Debug, Default)]
pub(crate) struct InterruptState {
    pub enabled: bool,
    /// Set between `interrupt_service_begin` and `interrupt_service_end`.
    pub running: bool,
    /// Raised while `running` was set; delivered when servicing ends.
    pub pending: Vec<GeInterrupt>,
}

impl InterruptState {
    pub fn raise(&mut self, sink: &mut dyn GeInterruptSink, stats: &mut GeStats, interrupt: GeInterrupt) {
        stats.interrupts_raised += 1;
        if self.running {
            debug!(
                list_id = interrupt.list_id.0,
                token = interrupt.token,
                "deferring GE interrupt until the current one is serviced"
            );
            self.pending.push(interrupt);
        } else {
            sink.trigger(interrupt);
        }
    }
}

/// The display-list interpreter.
///
/// Owns the queue, the command cache and every interpreter register. Memory is borrowed per call
/// so the engine never holds on to guest RAM.
pub struct GeEngine {
    pub(crate) config: GeEngineConfig,
    pub(crate) queue: DisplayListQueue,
    pub(crate) current: Option<DisplayListId>,
    pub(crate) next_list_id: u32,
    pub(crate) cache: CommandCache,
    pub(crate) regs: GeRegisters,
    pub(crate) interrupts: InterruptState,
    pub(crate) stats: GeStats,
    backend: Box<dyn GeBackend>,
    sink: Box<dyn GeInterruptSink>,
    clock: Box<dyn TickSource>,
}

impl Default for GeEngine {
    fn default() -> Self {
        Self::new(GeEngineConfig::default())
    }
}

impl GeEngine {
    pub fn new(config: GeEngineConfig) -> Self {
        Self {
            config,
            queue: DisplayListQueue::new(),
            current: None,
            next_list_id: 1,
            cache: CommandCache::new(),
            regs: GeRegisters::default(),
            interrupts: InterruptState {
                enabled: config.interrupts_enabled,
                ..InterruptState::default()
            },
            stats: GeStats::default(),
            backend: Box::new(NullGeBackend::new()),
            sink: Box::new(NullInterruptSink),
            clock: Box::new(StdTickSource::new()),
        }
    }

    pub fn set_backend(&mut self, backend: Box<dyn GeBackend>) {
        self.backend = backend;
    }

    pub fn set_interrupt_sink(&mut self, sink: Box<dyn GeInterruptSink>) {
        self.sink = sink;
    }

    pub fn set_tick_source(&mut self, clock: Box<dyn TickSource>) {
        self.clock = clock;
    }

    pub fn config(&self) -> GeEngineConfig {
        self.config
    }

    pub fn set_interrupts_enabled(&mut self, enabled: bool) {
        self.interrupts.enabled = enabled;
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.interrupts.enabled
    }

    pub fn interrupt_running(&self) -> bool {
        self.interrupts.running
    }

    /// Drops every list and returns to the power-on state. Collaborators are kept, and the
    /// backend is told to reset as well.
    pub fn reset(&mut self) {
        self.queue.clear();
        self.current = None;
        self.next_list_id = 1;
        self.cache.clear();
        self.regs = GeRegisters::default();
        self.interrupts = InterruptState {
            enabled: self.config.interrupts_enabled,
            ..InterruptState::default()
        };
        self.stats = GeStats::default();
        self.backend.reset();
    }

    pub fn current_list(&self) -> Option<&DisplayList> {
        self.current.and_then(|id| self.queue.get(id))
    }

    pub fn current_list_id(&self) -> Option<DisplayListId> {
        self.current
    }

    pub fn display_list(&self, id: DisplayListId) -> Option<&DisplayList> {
        self.queue.get(id)
    }

    pub fn display_lists(&self) -> impl Iterator<Item = &DisplayList> + '_ {
        self.queue.iter()
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn stats(&self) -> &GeStats {
        &self.stats
    }

    /// Cycles counted by the most recent drain pass.
    pub fn cycles_executed(&self) -> u64 {
        self.regs.cycles_executed
    }

    pub fn command_cache(&self) -> &CommandCache {
        &self.cache
    }

    /// Interrupts raised while one was being serviced and not yet delivered.
    pub fn pending_interrupts(&self) -> &[GeInterrupt] {
        &self.interrupts.pending
    }

    pub(crate) fn deliver(&mut self, interrupt: GeInterrupt) {
        self.sink.trigger(interrupt);
    }

    pub(crate) fn allocate_list_id(&mut self) -> DisplayListId {
        let id = DisplayListId(self.next_list_id);
        self.next_list_id = self.next_list_id.wrapping_add(1).max(1);
        id
    }

    /// Runs lists from the front of the queue until one stalls or the queue is empty.
    ///
    /// Returns `true` once the queue has fully drained.
    pub fn process_queue(&mut self, mem: &dyn GuestMemory) -> bool {
        self.regs.starting_ticks = self.clock.ticks();
        self.regs.cycles_executed = 0;

        let drained = loop {
            let Some(front) = self.queue.front() else {
                break true;
            };
            let id = front.id();
            debug!(
                list_id = id.0,
                pc = format_args!("{:#010x}", front.pc()),
                stall = format_args!("{:#010x}", front.stall()),
                "starting display list execution"
            );
            match self.interpret_list(mem, id) {
                ListRun::Stalled => break false,
                ListRun::Done => {
                    self.queue.remove(id);
                }
            }
        };

        if drained {
            self.current = None;
        }
        self.stats.total_cycles = self.stats.total_cycles.wrapping_add(self.regs.cycles_executed);
        drained
    }

    /// Runs one list until it stalls, finishes, or is aborted.
    pub(crate) fn interpret_list(&mut self, mem: &dyn GuestMemory, id: DisplayListId) -> ListRun {
        let started = Instant::now();
        self.current = Some(id);
        self.regs.prev = 0;
        self.regs.finished = false;
        self.regs.offset_addr = 0;

        let Self {
            config,
            queue,
            cache,
            regs,
            interrupts,
            stats,
            backend,
            sink,
            ..
        } = self;
        let Some(list) = queue.get_mut(id) else {
            return ListRun::Done;
        };
        if list.state == DisplayListState::Completed {
            return ListRun::Done;
        }

        if !mem.is_valid_address(list.pc) {
            error!(list_id = id.0, pc = format_args!("{:#010x}", list.pc), "display list PC is invalid");
            stats.lists_aborted += 1;
            return ListRun::Done;
        }

        regs.cycle_last_pc = list.pc;
        if list.state == DisplayListState::Queued {
            stats.lists_started += 1;
        }
        list.state = DisplayListState::Running;

        let mut exec = ListExecutor {
            list,
            regs,
            cache,
            interrupts,
            stats,
            backend: backend.as_mut(),
            sink: sink.as_mut(),
            mem,
            trace_commands: config.trace_commands,
            aborted: false,
        };
        let run = exec.run();
        let aborted = exec.aborted;
        let completed = exec.list.state == DisplayListState::Completed;

        self.stats.processing_time += started.elapsed();
        match run {
            ListRun::Stalled => {
                trace!(list_id = id.0, "display list stalled");
                self.stats.stalls += 1;
            }
            ListRun::Done if completed => self.stats.lists_completed += 1,
            ListRun::Done => {
                if !aborted {
                    debug!(list_id = id.0, "display list finished without completing");
                }
                self.stats.lists_aborted += 1;
            }
        }
        run
    }
}
