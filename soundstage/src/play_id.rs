//! Play-id codec: slot index plus reuse generation in one u32.

/// Handle to one playback instance.
///
/// Low 16 bits are the source-slot index, high 16 bits the slot's play
/// generation at the time the instance started. A command carrying a
/// `PlayId` only affects the slot while the generation still matches; after
/// the slot is recycled the command is a silent no-op. The first play on a
/// fresh slot carries generation 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayId(u32);

impl PlayId {
    pub fn new(slot: u16, generation: u16) -> Self {
        Self(((generation as u32) << 16) | slot as u32)
    }

    pub fn slot(self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    pub fn generation(self) -> u16 {
        (self.0 >> 16) as u16
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn to_raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for PlayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.slot(), self.generation())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let id = PlayId::new(42, 7);
        assert_eq!(id.slot(), 42);
        assert_eq!(id.generation(), 7);
        assert_eq!(PlayId::from_raw(id.to_raw()), id);
    }

    #[test]
    fn test_halves_do_not_bleed() {
        let id = PlayId::new(u16::MAX, u16::MAX);
        assert_eq!(id.slot(), u16::MAX);
        assert_eq!(id.generation(), u16::MAX);

        let id = PlayId::new(0, 1);
        assert_eq!(id.to_raw(), 0x0001_0000);
        assert_eq!(id.slot(), 0);
        assert_eq!(id.generation(), 1);
    }

    #[test]
    fn test_same_slot_different_generation_differs() {
        assert_ne!(PlayId::new(3, 1), PlayId::new(3, 2));
    }

    #[test]
    fn test_display() {
        assert_eq!(PlayId::new(5, 2).to_string(), "5#2");
    }
}
