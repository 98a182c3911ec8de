use crate::{mask_address, GuestMemory, GuestMemoryError};

pub const SCRATCHPAD_BASE: u32 = 0x0001_0000;
pub const SCRATCHPAD_SIZE: u32 = 0x0000_4000;
pub const VRAM_BASE: u32 = 0x0400_0000;
pub const VRAM_SIZE: u32 = 0x0020_0000;
pub const RAM_BASE: u32 = 0x0800_0000;
pub const DEFAULT_RAM_SIZE: u32 = 0x0200_0000; // 32 MiB
pub const MAX_RAM_SIZE: u32 = 0x0400_0000; // 64 MiB

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PspMemoryConfig {
    /// Main RAM size in bytes. Clamped to `(0, MAX_RAM_SIZE]`.
    pub ram_size_bytes: u32,
}

impl Default for PspMemoryConfig {
    fn default() -> Self {
        Self {
            ram_size_bytes: DEFAULT_RAM_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MemoryRegion {
    pub name: &'static str,
    pub base: u32,
    data: Vec<u8>,
}

impl MemoryRegion {
    fn new(name: &'static str, base: u32, size: u32) -> Self {
        Self {
            name,
            base,
            data: vec![0u8; size as usize],
        }
    }

    pub fn len(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr - self.base < self.len()
    }

    fn range(&self, addr: u32, len: usize) -> Result<core::ops::Range<usize>, GuestMemoryError> {
        let start = (addr - self.base) as usize;
        let end = start
            .checked_add(len)
            .ok_or(GuestMemoryError::OutOfBounds { addr, len })?;
        if end > self.data.len() {
            return Err(GuestMemoryError::CrossesRegion { addr, len });
        }
        Ok(start..end)
    }
}

/// Flat model of the PSP physical map as seen by the GE: scratchpad, VRAM and main RAM.
///
/// Addresses are masked to 28 bits before lookup, so uncached/kernel mirrors resolve to the same
/// backing store.
#[derive(Debug, Clone)]
pub struct PspMemory {
    regions: Vec<MemoryRegion>,
}

impl Default for PspMemory {
    fn default() -> Self {
        Self::new(PspMemoryConfig::default())
    }
}

impl PspMemory {
    pub fn new(config: PspMemoryConfig) -> Self {
        let ram_size = config.ram_size_bytes.clamp(4, MAX_RAM_SIZE);
        Self {
            regions: vec![
                MemoryRegion::new("scratchpad", SCRATCHPAD_BASE, SCRATCHPAD_SIZE),
                MemoryRegion::new("vram", VRAM_BASE, VRAM_SIZE),
                MemoryRegion::new("ram", RAM_BASE, ram_size),
            ],
        }
    }

    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }

    fn region(&self, addr: u32) -> Option<&MemoryRegion> {
        self.regions.iter().find(|r| r.contains(addr))
    }

    fn region_mut(&mut self, addr: u32) -> Option<&mut MemoryRegion> {
        self.regions.iter_mut().find(|r| r.contains(addr))
    }

    pub fn write(&mut self, addr: u32, src: &[u8]) -> Result<(), GuestMemoryError> {
        let addr = mask_address(addr);
        let region = self
            .region_mut(addr)
            .ok_or(GuestMemoryError::OutOfBounds {
                addr,
                len: src.len(),
            })?;
        let range = region.range(addr, src.len())?;
        region.data[range].copy_from_slice(src);
        Ok(())
    }

    pub fn write_u32(&mut self, addr: u32, value: u32) -> Result<(), GuestMemoryError> {
        self.write(addr, &value.to_le_bytes())
    }

    /// Writes consecutive little-endian words starting at `addr`.
    pub fn write_words(&mut self, addr: u32, words: &[u32]) -> Result<(), GuestMemoryError> {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        self.write(addr, &bytes)
    }
}

impl GuestMemory for PspMemory {
    fn is_valid_address(&self, addr: u32) -> bool {
        self.region(mask_address(addr)).is_some()
    }

    fn read(&self, addr: u32, dst: &mut [u8]) -> Result<(), GuestMemoryError> {
        let addr = mask_address(addr);
        let region = self.region(addr).ok_or(GuestMemoryError::OutOfBounds {
            addr,
            len: dst.len(),
        })?;
        let range = region.range(addr, dst.len())?;
        dst.copy_from_slice(&region.data[range]);
        Ok(())
    }
}
