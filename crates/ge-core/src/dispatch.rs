//! Command fetch and control-flow dispatch for the list being interpreted.

use ge_memory::{mask_address, GuestMemory};
use tracing::{debug, error, info, trace, warn};

use crate::backend::GeBackend;
use crate::cache::CommandCache;
use crate::cmd::{self, SignalBehavior};
use crate::engine::{GeRegisters, InterruptState, ListRun};
use crate::interrupt::{GeInterrupt, GeInterruptSink};
use crate::list::DisplayList;
use crate::stats::GeStats;
use crate::status::DisplayListState;

/// Disjoint borrows of everything a running list touches.
pub(crate) struct ListExecutor<'a> {
    pub list: &'a mut DisplayList,
    pub regs: &'a mut GeRegisters,
    pub cache: &'a mut CommandCache,
    pub interrupts: &'a mut InterruptState,
    pub stats: &'a mut GeStats,
    pub backend: &'a mut dyn GeBackend,
    pub sink: &'a mut dyn GeInterruptSink,
    pub mem: &'a dyn GuestMemory,
    pub trace_commands: bool,
    /// Set when the list was stopped by an error rather than by FINISH+END.
    pub aborted: bool,
}

impl ListExecutor<'_> {
    pub fn run(&mut self) -> ListRun {
        while !self.regs.finished {
            if self.list.is_stalled() {
                self.regs.update_cycles(self.list.pc, None);
                return ListRun::Stalled;
            }

            let pc = self.list.pc;
            let word = match self.mem.read_u32(pc) {
                Ok(word) => word,
                Err(err) => {
                    error!(list_id = self.list.id.0, pc = format_args!("{pc:#010x}"), %err, "failed to fetch GE command");
                    self.abort();
                    break;
                }
            };

            let diff = self.cache.record(word);
            self.backend.pre_execute(word, diff);
            if self.trace_commands {
                trace!(
                    list_id = self.list.id.0,
                    pc = format_args!("{pc:#010x}"),
                    word = format_args!("{word:#010x}"),
                    op = cmd::name(cmd::opcode(word)).unwrap_or("?"),
                    "GE command"
                );
            }
            self.stats.commands_executed += 1;

            self.execute_op(word, diff);

            self.list.pc = mask_address(self.list.pc.wrapping_add(4));
            self.regs.prev = word;
        }

        self.regs.update_cycles(self.list.pc, None);
        ListRun::Done
    }

    fn abort(&mut self) {
        self.regs.finished = true;
        self.aborted = true;
    }

    /// Resolves a 24-bit immediate against the offset register and the BASE command.
    fn relative_address(&self, data: u32) -> u32 {
        mask_address(
            self.regs
                .offset_addr
                .wrapping_add(self.cache.base_address() | data),
        )
    }

    /// Moves the PC so that the loop's post-increment lands on `target`.
    fn transfer_to(&mut self, target: u32) {
        let new_pc = target.wrapping_sub(4);
        self.regs.update_cycles(self.list.pc, Some(new_pc));
        self.list.pc = new_pc;
    }

    fn execute_op(&mut self, word: u32, diff: u32) {
        let opcode = cmd::opcode(word);
        let data = cmd::data(word);

        match opcode {
            cmd::NOP => {}

            cmd::OFFSETADDR => self.regs.offset_addr = data << 8,

            cmd::ORIGIN => self.regs.offset_addr = self.list.pc,

            cmd::JUMP => {
                let target = self.relative_address(data);
                if self.mem.is_valid_address(target) {
                    self.transfer_to(target);
                    self.backend.jump(target);
                } else {
                    error!(
                        list_id = self.list.id.0,
                        target = format_args!("{target:#010x}"),
                        data = format_args!("{data:#08x}"),
                        "JUMP to invalid address, ignoring"
                    );
                }
            }

            cmd::CALL => {
                let return_addr = mask_address(self.list.pc.wrapping_add(4));
                let target = self.relative_address(data);
                if !self.mem.is_valid_address(target) {
                    error!(
                        list_id = self.list.id.0,
                        target = format_args!("{target:#010x}"),
                        data = format_args!("{data:#08x}"),
                        "CALL to invalid address, ignoring"
                    );
                } else if !self.list.push_return(return_addr) {
                    error!(list_id = self.list.id.0, "CALL with a full return stack, ignoring");
                } else {
                    self.transfer_to(target);
                    self.backend.call(target, return_addr);
                }
            }

            cmd::RET => match self.list.pop_return() {
                None => error!(list_id = self.list.id.0, "RET with an empty return stack, ignoring"),
                Some(return_addr) => {
                    let target = (self.list.pc & 0xF000_0000) | mask_address(return_addr);
                    self.transfer_to(target);
                    if self.mem.is_valid_address(target) {
                        self.backend.ret(target);
                    } else {
                        error!(
                            list_id = self.list.id.0,
                            target = format_args!("{target:#010x}"),
                            "RET to invalid address, aborting list"
                        );
                        self.abort();
                    }
                }
            },

            // Both take effect when the following END executes.
            cmd::SIGNAL | cmd::FINISH => {}

            cmd::END => {
                self.regs.update_cycles(self.list.pc, None);
                self.end(data);
            }

            _ => self.backend.execute(opcode, data, diff),
        }
    }

    fn end(&mut self, data: u32) {
        let prev = self.regs.prev;
        let list_id = self.list.id.0;

        match cmd::opcode(prev) {
            cmd::SIGNAL => {
                let behavior = ((prev >> 16) & 0xFF) as u8;
                let signal = (prev & 0xFFFF) as u16;
                let end_data = (data & 0xFFFF) as u16;
                self.list.sub_intr_token = u32::from(signal);
                self.list.signal = behavior;

                match SignalBehavior::from_code(behavior) {
                    Some(SignalBehavior::Continue) => {
                        info!(list_id, signal, end_data, "GE signal without wait");
                    }
                    Some(other) => {
                        warn!(list_id, ?other, signal, end_data, "GE signal behaviour not implemented");
                    }
                    None => {
                        warn!(list_id, behavior, signal, end_data, "unknown GE signal behaviour");
                    }
                }

                self.backend.signal(behavior, signal, end_data);
                self.raise_list_interrupt();
            }

            cmd::FINISH => {
                let token = (prev & 0xFFFF) as u16;
                self.list.state = DisplayListState::Completed;
                self.list.sub_intr_token = u32::from(token);
                self.regs.finished = true;

                self.backend.finish(token);
                self.raise_list_interrupt();
            }

            _ => debug!(list_id, prev = format_args!("{:#08x}", cmd::data(prev)), "END without SIGNAL or FINISH"),
        }
    }

    fn raise_list_interrupt(&mut self) {
        if self.list.sub_intr_base < 0 || !self.interrupts.enabled {
            return;
        }
        let interrupt = GeInterrupt {
            list_id: self.list.id,
            pc: self.list.pc,
            sub_intr_base: self.list.sub_intr_base,
            token: self.list.sub_intr_token,
        };
        self.interrupts.raise(&mut *self.sink, &mut *self.stats, interrupt);
    }
}
