//! The file header.
//!
//! The header is the first record in the file and fixes the layout of
//! everything after it: its capability word selects which field-table
//! variant every other record type uses for the rest of the session.

use crate::caps::Capabilities;
use crate::graph::NodeId;
use crate::schema::{
    int, nptr, sptr, strf, uint, Field, FieldDef, FieldValue, NodeType,
};

/// Attribute bit: configuration came from the factory image.
pub const AT_FACTORY_CCF: u32 = 1 << 0;
/// Attribute bit: configuration is read-only.
pub const AT_CONFIG_READONLY: u32 = 1 << 1;
/// Attribute bit: home device list is read-only.
pub const AT_HOME_READONLY: u32 = 1 << 2;
const AT_MASK: u32 = AT_FACTORY_CCF | AT_CONFIG_READONLY | AT_HOME_READONLY;

/// Byte offset where the capability word sits, for the pre-decode peek.
pub const CAPABILITY_OFFSET: usize = 36;
/// Attribute-position value that indicates the with-timers layouts.
pub const ATTR_POS_TIMERS: u32 = 64;

/// The four header layout variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderLayout {
    Gray,
    #[default]
    GrayTimers,
    Color,
    ColorTimers,
}

static GRAY_NOTIMERS: &[FieldDef] = &[
    sptr(Field::Version),
    int(4, Field::Reserve1),
    strf(8, Field::Id1),
    uint(4, Field::Crc1Pos),
    uint(2, Field::Year),
    uint(1, Field::Month),
    uint(1, Field::Day),
    uint(1, Field::Reserve2),
    uint(1, Field::Hour),
    uint(1, Field::Minute),
    uint(1, Field::Seconds),
    int(4, Field::Reserve3),
    strf(4, Field::Id2),
    uint(4, Field::Capability),
    uint(4, Field::Crc2Pos),
    uint(4, Field::AttrPos),
    nptr(NodeType::Device, Field::FirstHome),
    nptr(NodeType::Device, Field::FirstDevice),
    nptr(NodeType::Device, Field::FirstMacro),
    uint(4, Field::Attr),
    nptr(NodeType::Panel, Field::MacroPanel),
    int(4, Field::Reserve4),
];

static GRAY_TIMERS: &[FieldDef] = &[
    sptr(Field::Version),
    int(4, Field::Reserve1),
    strf(8, Field::Id1),
    uint(4, Field::Crc1Pos),
    uint(2, Field::Year),
    uint(1, Field::Month),
    uint(1, Field::Day),
    uint(1, Field::Reserve2),
    uint(1, Field::Hour),
    uint(1, Field::Minute),
    uint(1, Field::Seconds),
    int(4, Field::Reserve3),
    strf(4, Field::Id2),
    uint(4, Field::Capability),
    uint(4, Field::Crc2Pos),
    uint(4, Field::AttrPos),
    nptr(NodeType::Device, Field::FirstHome),
    nptr(NodeType::Device, Field::FirstDevice),
    nptr(NodeType::Device, Field::FirstMacro),
    nptr(NodeType::Timer, Field::FirstTimer),
    uint(4, Field::Attr),
    nptr(NodeType::Panel, Field::MacroPanel),
    int(4, Field::Reserve4),
];

static COLOR_NOTIMERS: &[FieldDef] = &[
    sptr(Field::Version),
    int(4, Field::Reserve1),
    strf(8, Field::Id1),
    uint(4, Field::Crc1Pos),
    uint(2, Field::Year),
    uint(1, Field::Month),
    uint(1, Field::Day),
    uint(1, Field::Reserve2),
    uint(1, Field::Hour),
    uint(1, Field::Minute),
    uint(1, Field::Seconds),
    int(4, Field::Reserve3),
    strf(4, Field::Id2),
    uint(4, Field::Capability),
    uint(4, Field::Crc2Pos),
    uint(4, Field::AttrPos),
    nptr(NodeType::Device, Field::FirstHome),
    nptr(NodeType::Device, Field::FirstDevice),
    nptr(NodeType::Device, Field::FirstMacro),
    uint(4, Field::Attr),
    nptr(NodeType::Panel, Field::MacroPanel),
    uint(1, Field::ChannelId),
];

static COLOR_TIMERS: &[FieldDef] = &[
    sptr(Field::Version),
    int(4, Field::Reserve1),
    strf(8, Field::Id1),
    uint(4, Field::Crc1Pos),
    uint(2, Field::Year),
    uint(1, Field::Month),
    uint(1, Field::Day),
    // reused by custom layouts for the transparent color index
    uint(1, Field::Reserve2),
    uint(1, Field::Hour),
    uint(1, Field::Minute),
    uint(1, Field::Seconds),
    // reused by custom layouts for the packed screen size
    int(4, Field::Reserve3),
    strf(4, Field::Id2),
    uint(4, Field::Capability),
    uint(4, Field::Crc2Pos),
    uint(4, Field::AttrPos),
    nptr(NodeType::Device, Field::FirstHome),
    nptr(NodeType::Device, Field::FirstDevice),
    nptr(NodeType::Device, Field::FirstMacro),
    nptr(NodeType::Timer, Field::FirstTimer),
    uint(4, Field::Attr),
    nptr(NodeType::Panel, Field::MacroPanel),
    int(4, Field::Reserve4),
    int(3, Field::Reserve5),
    uint(1, Field::ChannelId),
];

impl HeaderLayout {
    pub fn table(self) -> &'static [FieldDef] {
        match self {
            HeaderLayout::Gray => GRAY_NOTIMERS,
            HeaderLayout::GrayTimers => GRAY_TIMERS,
            HeaderLayout::Color => COLOR_NOTIMERS,
            HeaderLayout::ColorTimers => COLOR_TIMERS,
        }
    }

    /// Pick the layout for a decoded capability word and attribute
    /// position. Returns the layout plus whether the attribute position
    /// contradicted the claimed timers layout (recoverable fallback).
    pub fn detect(caps: Capabilities, attr_pos: u32) -> (Self, bool) {
        let timers = attr_pos == ATTR_POS_TIMERS;
        let layout = match (caps.has_color(), timers) {
            (true, true) => HeaderLayout::ColorTimers,
            (true, false) => HeaderLayout::Color,
            (false, true) => HeaderLayout::GrayTimers,
            (false, false) => HeaderLayout::Gray,
        };
        (layout, !timers)
    }
}

/// File-level metadata: identity strings, modification timestamp,
/// capability word, checksum positions, and the roots of the three
/// device lists.
#[derive(Debug)]
pub struct Header {
    pub version: Option<String>,
    pub id1: String,
    pub id2: String,
    /// Checksum offset; always the file length minus two.
    pub crc1_pos: u32,
    /// Duplicate of `crc1_pos`.
    pub crc2_pos: u32,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub seconds: u8,
    pub capability: u32,
    /// Offset of the `attr` field; 64 on with-timers layouts.
    pub attr_pos: u32,
    pub attr: u32,
    pub first_home: Option<NodeId>,
    pub first_device: Option<NodeId>,
    pub first_macro: Option<NodeId>,
    pub first_timer: Option<NodeId>,
    /// Template panel chain for macro editing.
    pub macro_panel: Option<NodeId>,
    pub channel_id: u8,
    pub layout: HeaderLayout,
    pub reserve_1: u32,
    pub reserve_2: u8,
    pub reserve_3: u32,
    pub reserve_4: u32,
    pub reserve_5: u32,
}

impl Default for Header {
    fn default() -> Self {
        Header {
            version: None,
            id1: "@\u{a5}Z@_CCF".to_string(),
            id2: "CCF\0".to_string(),
            crc1_pos: 0,
            crc2_pos: 0,
            year: 0,
            month: 0,
            day: 0,
            hour: 0,
            minute: 0,
            seconds: 0,
            capability: 0,
            attr_pos: ATTR_POS_TIMERS,
            attr: AT_HOME_READONLY,
            first_home: None,
            first_device: None,
            first_macro: None,
            first_timer: None,
            macro_panel: None,
            channel_id: 0,
            layout: HeaderLayout::GrayTimers,
            reserve_1: 0,
            reserve_2: 0,
            reserve_3: 0,
            reserve_4: 0,
            reserve_5: 0,
        }
    }
}

impl Header {
    pub fn caps(&self) -> Capabilities {
        Capabilities(self.capability)
    }

    /// Install a new capability word, normalizing the layout the way the
    /// device firmware expects: re-encoded files always use the
    /// with-timers layout of their color depth.
    pub fn set_capability(&mut self, capability: u32) {
        self.capability = capability;
        self.attr &= AT_MASK;
        if Capabilities(capability).is_new_marantz() {
            self.capability &= 0xffff;
        }
        self.layout = if self.caps().has_color() {
            HeaderLayout::ColorTimers
        } else {
            HeaderLayout::GrayTimers
        };
        self.attr_pos = ATTR_POS_TIMERS;
        self.reserve_4 = 0;
    }

    pub fn is_factory(&self) -> bool {
        self.attr & AT_FACTORY_CCF == AT_FACTORY_CCF
    }

    pub fn is_config_read_only(&self) -> bool {
        self.attr & AT_CONFIG_READONLY == AT_CONFIG_READONLY
    }

    pub fn is_home_read_only(&self) -> bool {
        self.attr & AT_HOME_READONLY == AT_HOME_READONLY
    }

    pub fn set_attr_flag(&mut self, flag: u32, set: bool) {
        if set {
            self.attr |= flag;
        } else {
            self.attr &= !flag;
        }
    }

    /// Transparent color index (custom layouts reuse a reserved byte).
    pub fn transparent_color(&self) -> u8 {
        self.reserve_2
    }

    pub fn set_transparent_color(&mut self, index: u8) {
        self.reserve_2 = index;
    }

    /// Screen size override (custom layouts pack it into a reserved
    /// word); `None` when unset.
    pub fn screen_size(&self) -> Option<(u16, u16)> {
        let w = (self.reserve_3 >> 16) as u16;
        let h = self.reserve_3 as u16;
        (w > 0 && h > 0).then_some((w, h))
    }

    pub fn set_screen_size(&mut self, width: u16, height: u16) {
        self.reserve_3 = (u32::from(width) << 16) | u32::from(height);
    }

    pub fn decode_table(&self, _caps: Capabilities) -> &'static [FieldDef] {
        self.layout.table()
    }

    pub fn encode_table(&self, _caps: Capabilities) -> &'static [FieldDef] {
        self.layout.table()
    }

    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Version => FieldValue::Str(self.version.clone()),
            Field::Id1 => FieldValue::Str(Some(self.id1.clone())),
            Field::Id2 => FieldValue::Str(Some(self.id2.clone())),
            Field::Crc1Pos => FieldValue::Int(self.crc1_pos.into()),
            Field::Crc2Pos => FieldValue::Int(self.crc2_pos.into()),
            Field::Year => FieldValue::Int(self.year.into()),
            Field::Month => FieldValue::Int(self.month.into()),
            Field::Day => FieldValue::Int(self.day.into()),
            Field::Hour => FieldValue::Int(self.hour.into()),
            Field::Minute => FieldValue::Int(self.minute.into()),
            Field::Seconds => FieldValue::Int(self.seconds.into()),
            Field::Capability => FieldValue::Int(self.capability.into()),
            Field::AttrPos => FieldValue::Int(self.attr_pos.into()),
            Field::Attr => FieldValue::Int(self.attr.into()),
            Field::FirstHome => FieldValue::Node(self.first_home),
            Field::FirstDevice => FieldValue::Node(self.first_device),
            Field::FirstMacro => FieldValue::Node(self.first_macro),
            Field::FirstTimer => FieldValue::Node(self.first_timer),
            Field::MacroPanel => FieldValue::Node(self.macro_panel),
            Field::ChannelId => FieldValue::Int(self.channel_id.into()),
            Field::Reserve1 => FieldValue::Int(self.reserve_1.into()),
            Field::Reserve2 => FieldValue::Int(self.reserve_2.into()),
            Field::Reserve3 => FieldValue::Int(self.reserve_3.into()),
            Field::Reserve4 => FieldValue::Int(self.reserve_4.into()),
            Field::Reserve5 => FieldValue::Int(self.reserve_5.into()),
            _ => unreachable!("header has no field {field:?}"),
        }
    }

    pub fn put(&mut self, field: Field, value: FieldValue) {
        match field {
            Field::Version => self.version = value.into_str(),
            Field::Id1 => {
                if let Some(s) = value.into_str() {
                    self.id1 = s;
                }
            }
            Field::Id2 => {
                if let Some(s) = value.into_str() {
                    self.id2 = s;
                }
            }
            Field::Crc1Pos => self.crc1_pos = value.as_int() as u32,
            Field::Crc2Pos => self.crc2_pos = value.as_int() as u32,
            Field::Year => self.year = value.as_int() as u16,
            Field::Month => self.month = value.as_int() as u8,
            Field::Day => self.day = value.as_int() as u8,
            Field::Hour => self.hour = value.as_int() as u8,
            Field::Minute => self.minute = value.as_int() as u8,
            Field::Seconds => self.seconds = value.as_int() as u8,
            Field::Capability => self.capability = value.as_int() as u32,
            Field::AttrPos => self.attr_pos = value.as_int() as u32,
            Field::Attr => self.attr = value.as_int() as u32,
            Field::FirstHome => self.first_home = value.as_node(),
            Field::FirstDevice => self.first_device = value.as_node(),
            Field::FirstMacro => self.first_macro = value.as_node(),
            Field::FirstTimer => self.first_timer = value.as_node(),
            Field::MacroPanel => self.macro_panel = value.as_node(),
            Field::ChannelId => self.channel_id = value.as_int() as u8,
            Field::Reserve1 => self.reserve_1 = value.as_int() as u32,
            Field::Reserve2 => self.reserve_2 = value.as_int() as u8,
            Field::Reserve3 => self.reserve_3 = value.as_int() as u32,
            Field::Reserve4 => self.reserve_4 = value.as_int() as u32,
            Field::Reserve5 => self.reserve_5 = value.as_int() as u32,
            _ => unreachable!("header has no field {field:?}"),
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "{},{}-{}-{},{}:{:02}:{:02}",
            self.version.as_deref().unwrap_or("?"),
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.seconds
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_layouts() {
        let color = Capabilities(0x0060301);
        assert_eq!(
            HeaderLayout::detect(color, 64),
            (HeaderLayout::ColorTimers, false)
        );
        assert_eq!(
            HeaderLayout::detect(color, 60),
            (HeaderLayout::Color, true)
        );
        let gray = Capabilities(0x0020001);
        assert_eq!(
            HeaderLayout::detect(gray, 64),
            (HeaderLayout::GrayTimers, false)
        );
        assert_eq!(HeaderLayout::detect(gray, 60), (HeaderLayout::Gray, true));
    }

    #[test]
    fn test_attr_field_offset() {
        // The attribute position recorded in the header must match the
        // actual byte offset of the attr field in the timers layouts.
        let mut offset = 0usize;
        for def in GRAY_TIMERS {
            if def.field == Field::Attr {
                break;
            }
            offset += def.fixed_width().unwrap_or(0);
        }
        assert_eq!(offset as u32, ATTR_POS_TIMERS);
    }

    #[test]
    fn test_capability_offset() {
        let mut offset = 0usize;
        for def in GRAY_TIMERS {
            if def.field == Field::Capability {
                break;
            }
            offset += def.fixed_width().unwrap_or(0);
        }
        assert_eq!(offset, CAPABILITY_OFFSET);
    }

    #[test]
    fn test_set_capability_normalizes_marantz() {
        let mut h = Header::default();
        h.attr = 0xff;
        h.set_capability(0x0020001);
        assert_eq!(h.attr, 0x07);
        assert_eq!(h.layout, HeaderLayout::GrayTimers);
        // marantz words are masked to their low 16 bits
        let mut m = Header::default();
        m.set_capability(0x0020801);
        assert_eq!(m.capability, 0x0801);
    }

    #[test]
    fn test_screen_size_pack() {
        let mut h = Header::default();
        assert_eq!(h.screen_size(), None);
        h.set_screen_size(240, 320);
        assert_eq!(h.screen_size(), Some((240, 320)));
    }
}
