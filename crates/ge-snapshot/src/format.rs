pub const SNAPSHOT_MAGIC: &[u8; 8] = b"GESNAP\0\0";
pub const SNAPSHOT_VERSION_V1: u16 = 1;
pub const SNAPSHOT_ENDIANNESS_LITTLE: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectionId(pub u32);

impl SectionId {
    /// Engine registers, id generator, current list and interrupt bookkeeping.
    pub const ENGINE: SectionId = SectionId(1);
    /// Every display list still in the queue.
    pub const LISTS: SectionId = SectionId(2);
    /// Per-opcode last-seen command words.
    pub const CMD_CACHE: SectionId = SectionId(3);

    pub fn name(self) -> Option<&'static str> {
        match self {
            SectionId::ENGINE => Some("ENGINE"),
            SectionId::LISTS => Some("LISTS"),
            SectionId::CMD_CACHE => Some("CMD_CACHE"),
            _ => None,
        }
    }
}

impl core::fmt::Display for SectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(name) = self.name() {
            write!(f, "{name}({})", self.0)
        } else {
            write!(f, "SectionId({})", self.0)
        }
    }
}
