use std::collections::BTreeMap;

use ge_core::{
    cmd, DisplayList, DisplayListId, GeEngine, GeStats, RecordingGeBackend,
    RecordingInterruptSink,
};
use serde::Serialize;

/// JSON printed to stdout once the run is over.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub list_id: Option<u32>,
    /// `list_sync` peek for `list_id`; `None` once the list has left the queue.
    pub list_status: Option<String>,
    pub draw_status: String,
    pub current_list_id: Option<u32>,
    pub queue: Vec<ListSummary>,
    pub interrupts: Vec<InterruptSummary>,
    /// Forwarded (non-control) commands per opcode name.
    pub forwarded: BTreeMap<String, u64>,
    pub cycles_executed: u64,
    pub stats: StatsSummary,
}

#[derive(Debug, Serialize)]
pub struct ListSummary {
    pub id: u32,
    pub state: String,
    pub pc: String,
    pub stall: String,
    pub stack_depth: usize,
}

#[derive(Debug, Serialize)]
pub struct InterruptSummary {
    pub list_id: u32,
    pub pc: String,
    pub sub_intr_base: i32,
    pub token: u32,
}

#[derive(Debug, Serialize)]
pub struct StatsSummary {
    pub lists_started: u64,
    pub lists_completed: u64,
    pub lists_aborted: u64,
    pub stalls: u64,
    pub commands_executed: u64,
    pub interrupts_raised: u64,
    pub total_cycles: u64,
    pub processing_time_us: u128,
}

impl From<&GeStats> for StatsSummary {
    fn from(stats: &GeStats) -> Self {
        Self {
            lists_started: stats.lists_started,
            lists_completed: stats.lists_completed,
            lists_aborted: stats.lists_aborted,
            stalls: stats.stalls,
            commands_executed: stats.commands_executed,
            interrupts_raised: stats.interrupts_raised,
            total_cycles: stats.total_cycles,
            processing_time_us: stats.processing_time.as_micros(),
        }
    }
}

impl From<&DisplayList> for ListSummary {
    fn from(list: &DisplayList) -> Self {
        Self {
            id: list.id().0,
            state: format!("{:?}", list.state()).to_lowercase(),
            pc: hex(list.pc()),
            stall: hex(list.stall()),
            stack_depth: list.stack_depth(),
        }
    }
}

impl RunSummary {
    pub fn collect(
        engine: &GeEngine,
        id: Option<DisplayListId>,
        backend: &RecordingGeBackend,
        sink: &RecordingInterruptSink,
    ) -> Self {
        let list_status = id
            .and_then(|id| engine.list_sync(id, 1).ok())
            .map(|status| status.to_string());
        let draw_status = match engine.draw_sync(1) {
            Ok(status) => status.to_string(),
            Err(err) => err.to_string(),
        };

        let mut forwarded = BTreeMap::new();
        for (opcode, _, _) in backend.executed() {
            let name = cmd::name(opcode)
                .map(str::to_owned)
                .unwrap_or_else(|| format!("{opcode:#04x}"));
            *forwarded.entry(name).or_insert(0) += 1;
        }

        Self {
            list_id: id.map(|id| id.0),
            list_status,
            draw_status,
            current_list_id: engine.current_list_id().map(|id| id.0),
            queue: engine.display_lists().map(ListSummary::from).collect(),
            interrupts: sink
                .raised()
                .into_iter()
                .map(|i| InterruptSummary {
                    list_id: i.list_id.0,
                    pc: hex(i.pc),
                    sub_intr_base: i.sub_intr_base,
                    token: i.token,
                })
                .collect(),
            forwarded,
            cycles_executed: engine.cycles_executed(),
            stats: StatsSummary::from(engine.stats()),
        }
    }
}

fn hex(addr: u32) -> String {
    format!("{addr:#010x}")
}
