//! GE command encoding.
//!
//! Every command is one little-endian 32-bit word: the top byte selects the command and the low
//! 24 bits carry its immediate operand.

pub const NOP: u8 = 0x00;
pub const VADDR: u8 = 0x01;
pub const IADDR: u8 = 0x02;
pub const PRIM: u8 = 0x04;
pub const BEZIER: u8 = 0x05;
pub const SPLINE: u8 = 0x06;
pub const BOUNDINGBOX: u8 = 0x07;
pub const JUMP: u8 = 0x08;
pub const BJUMP: u8 = 0x09;
pub const CALL: u8 = 0x0A;
pub const RET: u8 = 0x0B;
pub const END: u8 = 0x0C;
pub const SIGNAL: u8 = 0x0E;
pub const FINISH: u8 = 0x0F;
pub const BASE: u8 = 0x10;
pub const VERTEXTYPE: u8 = 0x12;
pub const OFFSETADDR: u8 = 0x13;
pub const ORIGIN: u8 = 0x14;

pub const DATA_MASK: u32 = 0x00FF_FFFF;

#[inline]
pub fn opcode(word: u32) -> u8 {
    (word >> 24) as u8
}

#[inline]
pub fn data(word: u32) -> u32 {
    word & DATA_MASK
}

/// Builds a command word. `data` is truncated to 24 bits.
#[inline]
pub fn encode(opcode: u8, data: u32) -> u32 {
    (u32::from(opcode) << 24) | (data & DATA_MASK)
}

/// Returns `true` for commands handled by the dispatcher rather than the rendering backend.
pub fn is_control(opcode: u8) -> bool {
    matches!(
        opcode,
        NOP | JUMP | CALL | RET | END | SIGNAL | FINISH | OFFSETADDR | ORIGIN
    )
}

pub fn name(opcode: u8) -> Option<&'static str> {
    Some(match opcode {
        NOP => "NOP",
        VADDR => "VADDR",
        IADDR => "IADDR",
        PRIM => "PRIM",
        BEZIER => "BEZIER",
        SPLINE => "SPLINE",
        BOUNDINGBOX => "BOUNDINGBOX",
        JUMP => "JUMP",
        BJUMP => "BJUMP",
        CALL => "CALL",
        RET => "RET",
        END => "END",
        SIGNAL => "SIGNAL",
        FINISH => "FINISH",
        BASE => "BASE",
        VERTEXTYPE => "VERTEXTYPE",
        OFFSETADDR => "OFFSETADDR",
        ORIGIN => "ORIGIN",
        _ => return None,
    })
}

/// Behaviour selected by the SIGNAL word that precedes an END.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalBehavior {
    /// Raise the interrupt and suspend the list until the handler returns.
    Suspend,
    /// Raise the interrupt without waiting.
    Continue,
    Pause,
    Sync,
    Jump,
    Call,
    Return,
}

impl SignalBehavior {
    pub const NONE: u8 = 0x00;

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::Suspend),
            0x02 => Some(Self::Continue),
            0x03 => Some(Self::Pause),
            0x08 => Some(Self::Sync),
            0x10 => Some(Self::Jump),
            0x11 => Some(Self::Call),
            0x12 => Some(Self::Return),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Suspend => 0x01,
            Self::Continue => 0x02,
            Self::Pause => 0x03,
            Self::Sync => 0x08,
            Self::Jump => 0x10,
            Self::Call => 0x11,
            Self::Return => 0x12,
        }
    }
}
