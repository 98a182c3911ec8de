#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeEngineConfig {
    /// Whether SIGNAL/FINISH interrupts are raised at all.
    pub interrupts_enabled: bool,
    /// Emit a `trace!` event for every fetched command.
    pub trace_commands: bool,
}

impl Default for GeEngineConfig {
    fn default() -> Self {
        Self {
            interrupts_enabled: true,
            trace_commands: false,
        }
    }
}
