//! Capability word and remote model table.
//!
//! A 32-bit capability word in the header selects the binary layout of
//! every record type in the file: color depth, timer support, Marantz
//! variants, and the free-layout "custom" mode. Each node type consults
//! the shared capabilities when picking its field table.

/// Capability bit: base feature set, present on every known model.
pub const CA_DEFAULT: u32 = 1 << 0;
/// Capability bit: color display.
pub const CA_HAS_COLOR: u32 = 1 << 8;
/// Capability bit: newer Marantz (x200) family.
pub const CA_IS_NEW_MARANTZ: u32 = 1 << 11;
/// Capability bit: scheduled timers.
pub const CA_HAS_TIMERS: u32 = 1 << 17;
/// Capability bit: user-database prefix on IR codes.
pub const CA_HAS_UDB: u32 = 1 << 18;
/// Full capability word of the custom-layout mode.
pub const CA_CUSTOM: u32 = 0x0102_0301;

/// Decoded view of the header capability word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(pub u32);

impl Capabilities {
    pub fn has_color(self) -> bool {
        self.0 & CA_HAS_COLOR == CA_HAS_COLOR
    }

    pub fn has_timers(self) -> bool {
        self.0 & CA_HAS_TIMERS == CA_HAS_TIMERS
    }

    pub fn has_udb(self) -> bool {
        self.0 & CA_HAS_UDB == CA_HAS_UDB || self.is_custom()
    }

    pub fn is_custom(self) -> bool {
        self.0 == CA_CUSTOM
    }

    pub fn is_new_marantz(self) -> bool {
        self.0 & CA_IS_NEW_MARANTZ == CA_IS_NEW_MARANTZ
    }

    pub fn is_old_marantz(self) -> bool {
        self.0 == 0x1
    }

    pub fn is_marantz(self) -> bool {
        self.is_new_marantz() || self.is_old_marantz()
    }
}

/// A known remote model: capability word plus physical constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProntoModel {
    pub name: &'static str,
    pub capability: u32,
    /// Configuration memory in KiB; encoded images larger than this will
    /// not download.
    pub memory_kb: u32,
    pub screen_width: u16,
    pub screen_height: u16,
}

/// Known remote models and their capability words.
pub const MODELS: &[ProntoModel] = &[
    ProntoModel { name: "RC5000", capability: 0x0000001, memory_kb: 380, screen_width: 240, screen_height: 220 },
    ProntoModel { name: "RC5000i", capability: 0x0000001, memory_kb: 1404, screen_width: 240, screen_height: 220 },
    ProntoModel { name: "RC5200", capability: 0x0000a01, memory_kb: 1220, screen_width: 240, screen_height: 270 },
    ProntoModel { name: "RC9200", capability: 0x0000b01, memory_kb: 6900, screen_width: 240, screen_height: 270 },
    ProntoModel { name: "TS1000", capability: 0x0020001, memory_kb: 380, screen_width: 240, screen_height: 220 },
    ProntoModel { name: "TSU2000", capability: 0x0060001, memory_kb: 960, screen_width: 240, screen_height: 220 },
    ProntoModel { name: "TSU6000", capability: 0x0060301, memory_kb: 5952, screen_width: 240, screen_height: 220 },
    ProntoModel { name: "RU890", capability: 0x0020001, memory_kb: 380, screen_width: 240, screen_height: 220 },
    ProntoModel { name: "RU940", capability: 0x0020001, memory_kb: 1404, screen_width: 240, screen_height: 220 },
    ProntoModel { name: "RU970", capability: 0x0060301, memory_kb: 5667, screen_width: 240, screen_height: 220 },
    ProntoModel { name: "USR5", capability: 0x0060201, memory_kb: 697, screen_width: 240, screen_height: 220 },
    ProntoModel { name: "RAV2000", capability: 0x0060001, memory_kb: 444, screen_width: 240, screen_height: 220 },
    ProntoModel { name: "RAV2000Z", capability: 0x0060001, memory_kb: 772, screen_width: 240, screen_height: 220 },
    ProntoModel { name: "CUSTOM", capability: CA_CUSTOM, memory_kb: 99999, screen_width: 240, screen_height: 320 },
];

/// Look up a model by name (case-insensitive).
pub fn model_by_name(name: &str) -> Option<&'static ProntoModel> {
    MODELS.iter().find(|m| m.name.eq_ignore_ascii_case(name))
}

/// All models whose capability word matches exactly.
pub fn models_by_capability(capability: u32) -> Vec<&'static ProntoModel> {
    MODELS.iter().filter(|m| m.capability == capability).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_bits() {
        let tsu6000 = Capabilities(0x0060301);
        assert!(tsu6000.has_color());
        assert!(tsu6000.has_timers());
        assert!(tsu6000.has_udb());
        assert!(!tsu6000.is_custom());
        assert!(!tsu6000.is_marantz());

        let ts1000 = Capabilities(0x0020001);
        assert!(!ts1000.has_color());
        assert!(ts1000.has_timers());
        assert!(!ts1000.has_udb());
    }

    #[test]
    fn test_custom_implies_udb() {
        let custom = Capabilities(CA_CUSTOM);
        assert!(custom.is_custom());
        assert!(custom.has_udb());
    }

    #[test]
    fn test_old_marantz() {
        assert!(Capabilities(0x1).is_old_marantz());
        assert!(Capabilities(0x1).is_marantz());
        assert!(!Capabilities(0x0020001).is_old_marantz());
    }

    #[test]
    fn test_model_lookup() {
        assert_eq!(model_by_name("tsu6000").unwrap().capability, 0x0060301);
        let matches = models_by_capability(0x0020001);
        assert_eq!(matches.len(), 3);
    }
}
