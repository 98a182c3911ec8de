use std::time::Duration;

/// Lifetime counters for the host side. Not saved in snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeStats {
    pub lists_started: u64,
    pub lists_completed: u64,
    /// Lists removed without completing (bad entry PC, failed fetch, bad return address).
    pub lists_aborted: u64,
    pub stalls: u64,
    pub commands_executed: u64,
    pub interrupts_raised: u64,
    /// Sum of every drain pass's cycle count.
    pub total_cycles: u64,
    /// Wall time spent inside the interpreter loop.
    pub processing_time: Duration,
}
