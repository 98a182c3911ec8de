use ge_snapshot::{CommandCacheState, COMMAND_CACHE_LEN};

use crate::cmd;

/// Last command word seen for every opcode.
///
/// Shared by all lists for the lifetime of the engine, so a list inherits the state left behind
/// by the one before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCache {
    words: Box<[u32; COMMAND_CACHE_LEN]>,
}

impl Default for CommandCache {
    fn default() -> Self {
        Self {
            words: Box::new([0; COMMAND_CACHE_LEN]),
        }
    }
}

impl CommandCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `word` in its opcode slot and returns the bits that changed.
    pub fn record(&mut self, word: u32) -> u32 {
        let slot = &mut self.words[usize::from(cmd::opcode(word))];
        let diff = word ^ *slot;
        *slot = word;
        diff
    }

    pub fn get(&self, opcode: u8) -> u32 {
        self.words[usize::from(opcode)]
    }

    /// Upper address bits selected by the last BASE command, already shifted into place.
    pub fn base_address(&self) -> u32 {
        (self.get(cmd::BASE) & 0x000F_0000) << 8
    }

    pub fn words(&self) -> &[u32; COMMAND_CACHE_LEN] {
        &self.words
    }

    pub fn clear(&mut self) {
        self.words.fill(0);
    }

    pub(crate) fn to_state(&self) -> CommandCacheState {
        CommandCacheState {
            words: self.words.clone(),
        }
    }

    pub(crate) fn from_state(state: CommandCacheState) -> Self {
        Self { words: state.words }
    }
}
