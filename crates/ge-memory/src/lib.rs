//! Guest memory access for the GE display-list engine.
//!
//! The engine never owns emulated memory. It validates and reads command words through the
//! [`GuestMemory`] gate, which the surrounding emulator implements over its real memory map.
//! [`PspMemory`] is a self-contained implementation of the PSP address map used by tests and the
//! `ge-run` tool.
#![forbid(unsafe_code)]

mod psp;

pub use psp::{
    MemoryRegion, PspMemory, PspMemoryConfig, DEFAULT_RAM_SIZE, MAX_RAM_SIZE, RAM_BASE,
    SCRATCHPAD_BASE, SCRATCHPAD_SIZE, VRAM_BASE, VRAM_SIZE,
};

use thiserror::Error;

/// The GE only decodes the low 28 bits of an address; the top nibble selects a cache segment.
pub const GE_ADDRESS_MASK: u32 = 0x0FFF_FFFF;

#[inline]
pub fn mask_address(addr: u32) -> u32 {
    addr & GE_ADDRESS_MASK
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuestMemoryError {
    #[error("guest memory access out of bounds (addr=0x{addr:08x}, len={len})")]
    OutOfBounds { addr: u32, len: usize },

    #[error("guest memory access at 0x{addr:08x} crosses a region boundary (len={len})")]
    CrossesRegion { addr: u32, len: usize },
}

/// Memory Access Gate consumed by the interpreter.
///
/// Reads take `&self`: fetching display-list words has no side effects on the emulated machine.
pub trait GuestMemory {
    /// Returns `true` if `addr` maps to readable guest memory.
    fn is_valid_address(&self, addr: u32) -> bool;

    fn read(&self, addr: u32, dst: &mut [u8]) -> Result<(), GuestMemoryError>;

    fn read_u32(&self, addr: u32) -> Result<u32, GuestMemoryError> {
        let mut buf = [0u8; 4];
        self.read(addr, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
}

impl<T: GuestMemory + ?Sized> GuestMemory for &T {
    fn is_valid_address(&self, addr: u32) -> bool {
        (**self).is_valid_address(addr)
    }

    fn read(&self, addr: u32, dst: &mut [u8]) -> Result<(), GuestMemoryError> {
        (**self).read(addr, dst)
    }
}
