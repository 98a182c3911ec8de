use core::fmt;

/// Lifecycle state of a single display list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayListState {
    Queued,
    Running,
    Completed,
    /// Never entered by the interpreter; kept so saved states and status queries stay stable.
    Paused,
}

impl DisplayListState {
    pub fn code(self) -> u8 {
        match self {
            Self::Queued => 1,
            Self::Running => 2,
            Self::Completed => 3,
            Self::Paused => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Queued),
            2 => Some(Self::Running),
            3 => Some(Self::Completed),
            4 => Some(Self::Paused),
            _ => None,
        }
    }
}

/// Result of a `draw_sync`/`list_sync` peek.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeListStatus {
    Completed,
    Queued,
    Drawing,
    Stalling,
    Paused,
}

impl GeListStatus {
    /// Value reported to the guest.
    pub fn code(self) -> u32 {
        match self {
            Self::Completed => 0,
            Self::Queued => 1,
            Self::Drawing => 2,
            Self::Stalling => 3,
            Self::Paused => 4,
        }
    }
}

impl fmt::Display for GeListStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Completed => "completed",
            Self::Queued => "queued",
            Self::Drawing => "drawing",
            Self::Stalling => "stalling",
            Self::Paused => "paused",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GeSyncError {
    #[error("no display list with id {0}")]
    InvalidId(u32),
    #[error("invalid sync mode {0}")]
    InvalidMode(u32),
}

impl GeSyncError {
    pub const SCE_INVALID_ID: u32 = 0x8000_0100;
    pub const SCE_INVALID_MODE: u32 = 0x8000_0107;

    /// Error code returned to the guest.
    pub fn sce_code(self) -> u32 {
        match self {
            Self::InvalidId(_) => Self::SCE_INVALID_ID,
            Self::InvalidMode(_) => Self::SCE_INVALID_MODE,
        }
    }
}

/// `draw_sync`/`list_sync` mode argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Block until done. Not implemented; callers must poll with [`SyncMode::Peek`].
    Wait,
    Peek,
}

impl TryFrom<u32> for SyncMode {
    type Error = GeSyncError;

    fn try_from(mode: u32) -> Result<Self, Self::Error> {
        match mode {
            0 => Ok(Self::Wait),
            1 => Ok(Self::Peek),
            other => Err(GeSyncError::InvalidMode(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes_round_trip() {
        for state in [
            DisplayListState::Queued,
            DisplayListState::Running,
            DisplayListState::Completed,
            DisplayListState::Paused,
        ] {
            assert_eq!(DisplayListState::from_code(state.code()), Some(state));
        }
        assert_eq!(DisplayListState::from_code(0), None);
        assert_eq!(DisplayListState::from_code(5), None);
    }

    #[test]
    fn sync_errors_carry_hardware_codes() {
        assert_eq!(GeSyncError::InvalidId(7).sce_code(), 0x8000_0100);
        assert_eq!(GeSyncError::InvalidMode(2).sce_code(), 0x8000_0107);
        assert_eq!(SyncMode::try_from(2), Err(GeSyncError::InvalidMode(2)));
    }
}
