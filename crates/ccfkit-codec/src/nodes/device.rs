//! Devices: named collections of panels plus hard-key action slots.
//!
//! Devices form three singly linked lists rooted at the header (home,
//! normal, macro). The set of hard-key slots varies by capability, so the
//! device has four layout variants and a matching hard-key table per
//! variant mapping key labels to typed slots.

use crate::caps::Capabilities;
use crate::graph::NodeId;
use crate::schema::{int, nptr, sptr, uint, Field, FieldDef, FieldValue, NodeType};

/// Device flag: read-only in the device browser.
pub const DEV_READ_ONLY: u8 = 0x01;
/// Device flag: groups timer macros.
pub const DEV_IS_TIMER_GROUP: u8 = 0x02;
/// Device flag: needs programming before use.
pub const DEV_NEEDS_PROGRAMMING: u8 = 0x10;
/// Device flag: draws a separator above itself.
pub const DEV_HAS_SEPARATOR: u8 = 0x20;
/// Device flag: template device.
pub const DEV_IS_TEMPLATE: u8 = 0x40;

static NOCOLOR: &[FieldDef] = &[
    nptr(NodeType::Device, Field::Next),
    sptr(Field::Name),
    nptr(NodeType::Icon, Field::IconUnselected),
    nptr(NodeType::Icon, Field::IconSelected),
    nptr(NodeType::ActionList, Field::ActionSlot),
    nptr(NodeType::ActionList, Field::KeyLt),
    nptr(NodeType::ActionList, Field::KeyRt),
    nptr(NodeType::ActionList, Field::KeyVolDn),
    nptr(NodeType::ActionList, Field::KeyVolUp),
    nptr(NodeType::ActionList, Field::KeyChanDn),
    nptr(NodeType::ActionList, Field::KeyChanUp),
    nptr(NodeType::ActionList, Field::KeyMute),
    int(4, Field::Reserve1),
    sptr(Field::KeyNameLt),
    sptr(Field::KeyNameRt),
    nptr(NodeType::Panel, Field::FirstPanel),
    uint(1, Field::Attr),
];

static COLOR: &[FieldDef] = &[
    nptr(NodeType::Device, Field::Next),
    sptr(Field::Name),
    nptr(NodeType::Icon, Field::IconUnselected),
    nptr(NodeType::Icon, Field::IconSelected),
    nptr(NodeType::ActionList, Field::ActionSlot),
    nptr(NodeType::ActionList, Field::KeyLt),
    nptr(NodeType::ActionList, Field::KeyRt),
    nptr(NodeType::ActionList, Field::KeyVolDn),
    nptr(NodeType::ActionList, Field::KeyVolUp),
    nptr(NodeType::ActionList, Field::KeyChanDn),
    nptr(NodeType::ActionList, Field::KeyChanUp),
    nptr(NodeType::ActionList, Field::KeyMute),
    nptr(NodeType::ActionList, Field::KeyFarLt),
    nptr(NodeType::ActionList, Field::KeyFarRt),
    int(4, Field::Reserve1),
    sptr(Field::KeyNameLt),
    sptr(Field::KeyNameRt),
    sptr(Field::KeyNameFarLt),
    sptr(Field::KeyNameFarRt),
    nptr(NodeType::Panel, Field::FirstPanel),
    uint(1, Field::Attr),
    uint(1, Field::RfExtender),
    int(4, Field::Reserve2),
];

static MARANTZ: &[FieldDef] = &[
    nptr(NodeType::Device, Field::Next),
    sptr(Field::Name),
    nptr(NodeType::Icon, Field::IconUnselected),
    nptr(NodeType::Icon, Field::IconSelected),
    nptr(NodeType::ActionList, Field::ActionSlot),
    nptr(NodeType::ActionList, Field::KeyLt),
    nptr(NodeType::ActionList, Field::KeyRt),
    nptr(NodeType::ActionList, Field::KeyMute),
    nptr(NodeType::ActionList, Field::KeyChanDn),
    nptr(NodeType::ActionList, Field::KeyChanUp),
    nptr(NodeType::ActionList, Field::KeyVolDn),
    nptr(NodeType::ActionList, Field::KeyVolUp),
    nptr(NodeType::ActionList, Field::KeyM),
    nptr(NodeType::ActionList, Field::KeyReturn),
    nptr(NodeType::ActionList, Field::KeyEx),
    nptr(NodeType::ActionList, Field::ArrowUp),
    nptr(NodeType::ActionList, Field::ArrowLt),
    nptr(NodeType::ActionList, Field::ArrowRt),
    nptr(NodeType::ActionList, Field::ArrowDn),
    int(4, Field::Reserve1),
    int(4, Field::Reserve2),
    sptr(Field::KeyNameLt),
    sptr(Field::KeyNameRt),
    nptr(NodeType::Panel, Field::FirstPanel),
    uint(1, Field::Attr),
    uint(1, Field::RfExtender),
    int(2, Field::Reserve3),
];

static CUSTOM: &[FieldDef] = &[
    nptr(NodeType::Device, Field::Next),
    sptr(Field::Name),
    nptr(NodeType::Icon, Field::IconUnselected),
    nptr(NodeType::Icon, Field::IconSelected),
    nptr(NodeType::ActionList, Field::ActionSlot),
    nptr(NodeType::ActionList, Field::KeyLt),
    nptr(NodeType::ActionList, Field::KeyRt),
    nptr(NodeType::ActionList, Field::KeyVolDn),
    nptr(NodeType::ActionList, Field::KeyVolUp),
    nptr(NodeType::ActionList, Field::KeyChanDn),
    nptr(NodeType::ActionList, Field::KeyChanUp),
    nptr(NodeType::ActionList, Field::KeyMute),
    nptr(NodeType::ActionList, Field::KeyFarLt),
    nptr(NodeType::ActionList, Field::KeyFarRt),
    nptr(NodeType::ActionList, Field::KeyReturn),
    sptr(Field::KeyNameLt),
    sptr(Field::KeyNameRt),
    sptr(Field::KeyNameFarLt),
    sptr(Field::KeyNameFarRt),
    nptr(NodeType::Panel, Field::FirstPanel),
    uint(1, Field::Attr),
    uint(1, Field::RfExtender),
    nptr(NodeType::ActionList, Field::ArrowUp),
    nptr(NodeType::ActionList, Field::ArrowLt),
    nptr(NodeType::ActionList, Field::ArrowRt),
    nptr(NodeType::ActionList, Field::ArrowDn),
];

/// One hard key: its label, the device field holding its display name
/// (only some keys are namable), and the field holding its action list.
#[derive(Debug, Clone, Copy)]
pub struct HardKeyDef {
    pub label: &'static str,
    pub name_slot: Option<Field>,
    pub list_slot: Field,
}

const fn key(label: &'static str, name_slot: Option<Field>, list_slot: Field) -> HardKeyDef {
    HardKeyDef { label, name_slot, list_slot }
}

static NOCOLOR_KEYS: &[HardKeyDef] = &[
    key("Left", Some(Field::KeyNameLt), Field::KeyLt),
    key("Right", Some(Field::KeyNameRt), Field::KeyRt),
    key("Vol-", None, Field::KeyVolDn),
    key("Vol+", None, Field::KeyVolUp),
    key("Chan-", None, Field::KeyChanDn),
    key("Chan+", None, Field::KeyChanUp),
    key("Mute", None, Field::KeyMute),
];

static COLOR_KEYS: &[HardKeyDef] = &[
    key("Left", Some(Field::KeyNameLt), Field::KeyLt),
    key("Right", Some(Field::KeyNameRt), Field::KeyRt),
    key("Vol-", None, Field::KeyVolDn),
    key("Vol+", None, Field::KeyVolUp),
    key("Chan-", None, Field::KeyChanDn),
    key("Chan+", None, Field::KeyChanUp),
    key("Mute", None, Field::KeyMute),
    key("Far Left", Some(Field::KeyNameFarLt), Field::KeyFarLt),
    key("Far Right", Some(Field::KeyNameFarRt), Field::KeyFarRt),
];

static MARANTZ_KEYS: &[HardKeyDef] = &[
    key("Left", Some(Field::KeyNameLt), Field::KeyLt),
    key("Right", Some(Field::KeyNameRt), Field::KeyRt),
    key("Vol-", None, Field::KeyVolDn),
    key("Vol+", None, Field::KeyVolUp),
    key("Chan-", None, Field::KeyChanDn),
    key("Chan+", None, Field::KeyChanUp),
    key("Mute", None, Field::KeyMute),
    key("M", None, Field::KeyM),
    key("Return", None, Field::KeyReturn),
    key("Ex", None, Field::KeyEx),
    key("UpArrow", None, Field::ArrowUp),
    key("LeftArrow", None, Field::ArrowLt),
    key("RightArrow", None, Field::ArrowRt),
    key("DownArrow", None, Field::ArrowDn),
];

static CUSTOM_KEYS: &[HardKeyDef] = &[
    key("Far Left", Some(Field::KeyNameFarLt), Field::KeyFarLt),
    key("Left", Some(Field::KeyNameLt), Field::KeyLt),
    key("Right", Some(Field::KeyNameRt), Field::KeyRt),
    key("Far Right", Some(Field::KeyNameFarRt), Field::KeyFarRt),
    key("Vol-", None, Field::KeyVolDn),
    key("Vol+", None, Field::KeyVolUp),
    key("Chan-", None, Field::KeyChanDn),
    key("Chan+", None, Field::KeyChanUp),
    key("Mute", None, Field::KeyMute),
    key("UpArrow", None, Field::ArrowUp),
    key("LeftArrow", None, Field::ArrowLt),
    key("RightArrow", None, Field::ArrowRt),
    key("DownArrow", None, Field::ArrowDn),
    key("Click", None, Field::KeyReturn),
];

/// The hard-key table for a capability variant.
pub fn hard_keys(caps: Capabilities) -> &'static [HardKeyDef] {
    if caps.is_custom() {
        CUSTOM_KEYS
    } else if caps.is_new_marantz() {
        MARANTZ_KEYS
    } else if caps.has_color() {
        COLOR_KEYS
    } else {
        NOCOLOR_KEYS
    }
}

/// A named collection of panels plus per-key action lists.
#[derive(Debug, Default)]
pub struct Device {
    pub next: Option<NodeId>,
    pub name: Option<String>,
    pub icon_unselected: Option<NodeId>,
    pub icon_selected: Option<NodeId>,
    /// Actions run when the device is selected.
    pub action: Option<NodeId>,
    pub key_lt: Option<NodeId>,
    pub key_rt: Option<NodeId>,
    pub key_far_lt: Option<NodeId>,
    pub key_far_rt: Option<NodeId>,
    pub key_vol_dn: Option<NodeId>,
    pub key_vol_up: Option<NodeId>,
    pub key_chan_dn: Option<NodeId>,
    pub key_chan_up: Option<NodeId>,
    pub key_mute: Option<NodeId>,
    pub key_m: Option<NodeId>,
    pub key_return: Option<NodeId>,
    pub key_ex: Option<NodeId>,
    pub arrow_up: Option<NodeId>,
    pub arrow_lt: Option<NodeId>,
    pub arrow_rt: Option<NodeId>,
    pub arrow_dn: Option<NodeId>,
    pub key_name_lt: Option<String>,
    pub key_name_rt: Option<String>,
    pub key_name_far_lt: Option<String>,
    pub key_name_far_rt: Option<String>,
    pub first_panel: Option<NodeId>,
    pub attr: u8,
    pub rf_extender: u8,
    pub reserve_1: u32,
    pub reserve_2: u32,
    pub reserve_3: u16,
}

impl Device {
    pub fn get_flag(&self, flag: u8) -> bool {
        self.attr & flag == flag
    }

    pub fn set_flag(&mut self, flag: u8, set: bool) {
        if set {
            self.attr |= flag;
        } else {
            self.attr &= !flag;
        }
    }

    /// All hard-key action-list slots of this variant, in table order.
    pub fn key_lists(&self, caps: Capabilities) -> Vec<Option<NodeId>> {
        hard_keys(caps)
            .iter()
            .map(|k| self.get(k.list_slot).as_node())
            .collect()
    }

    pub fn decode_table(&self, caps: Capabilities) -> &'static [FieldDef] {
        layout(caps)
    }

    pub fn encode_table(&self, caps: Capabilities) -> &'static [FieldDef] {
        layout(caps)
    }

    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Next => FieldValue::Node(self.next),
            Field::Name => FieldValue::Str(self.name.clone()),
            Field::IconUnselected => FieldValue::Node(self.icon_unselected),
            Field::IconSelected => FieldValue::Node(self.icon_selected),
            Field::ActionSlot => FieldValue::Node(self.action),
            Field::KeyLt => FieldValue::Node(self.key_lt),
            Field::KeyRt => FieldValue::Node(self.key_rt),
            Field::KeyFarLt => FieldValue::Node(self.key_far_lt),
            Field::KeyFarRt => FieldValue::Node(self.key_far_rt),
            Field::KeyVolDn => FieldValue::Node(self.key_vol_dn),
            Field::KeyVolUp => FieldValue::Node(self.key_vol_up),
            Field::KeyChanDn => FieldValue::Node(self.key_chan_dn),
            Field::KeyChanUp => FieldValue::Node(self.key_chan_up),
            Field::KeyMute => FieldValue::Node(self.key_mute),
            Field::KeyM => FieldValue::Node(self.key_m),
            Field::KeyReturn => FieldValue::Node(self.key_return),
            Field::KeyEx => FieldValue::Node(self.key_ex),
            Field::ArrowUp => FieldValue::Node(self.arrow_up),
            Field::ArrowLt => FieldValue::Node(self.arrow_lt),
            Field::ArrowRt => FieldValue::Node(self.arrow_rt),
            Field::ArrowDn => FieldValue::Node(self.arrow_dn),
            Field::KeyNameLt => FieldValue::Str(self.key_name_lt.clone()),
            Field::KeyNameRt => FieldValue::Str(self.key_name_rt.clone()),
            Field::KeyNameFarLt => FieldValue::Str(self.key_name_far_lt.clone()),
            Field::KeyNameFarRt => FieldValue::Str(self.key_name_far_rt.clone()),
            Field::FirstPanel => FieldValue::Node(self.first_panel),
            Field::Attr => FieldValue::Int(self.attr.into()),
            Field::RfExtender => FieldValue::Int(self.rf_extender.into()),
            Field::Reserve1 => FieldValue::Int(self.reserve_1.into()),
            Field::Reserve2 => FieldValue::Int(self.reserve_2.into()),
            Field::Reserve3 => FieldValue::Int(self.reserve_3.into()),
            _ => unreachable!("device has no field {field:?}"),
        }
    }

    pub fn put(&mut self, field: Field, value: FieldValue) {
        match field {
            Field::Next => self.next = value.as_node(),
            Field::Name => self.name = value.into_str(),
            Field::IconUnselected => self.icon_unselected = value.as_node(),
            Field::IconSelected => self.icon_selected = value.as_node(),
            Field::ActionSlot => self.action = value.as_node(),
            Field::KeyLt => self.key_lt = value.as_node(),
            Field::KeyRt => self.key_rt = value.as_node(),
            Field::KeyFarLt => self.key_far_lt = value.as_node(),
            Field::KeyFarRt => self.key_far_rt = value.as_node(),
            Field::KeyVolDn => self.key_vol_dn = value.as_node(),
            Field::KeyVolUp => self.key_vol_up = value.as_node(),
            Field::KeyChanDn => self.key_chan_dn = value.as_node(),
            Field::KeyChanUp => self.key_chan_up = value.as_node(),
            Field::KeyMute => self.key_mute = value.as_node(),
            Field::KeyM => self.key_m = value.as_node(),
            Field::KeyReturn => self.key_return = value.as_node(),
            Field::KeyEx => self.key_ex = value.as_node(),
            Field::ArrowUp => self.arrow_up = value.as_node(),
            Field::ArrowLt => self.arrow_lt = value.as_node(),
            Field::ArrowRt => self.arrow_rt = value.as_node(),
            Field::ArrowDn => self.arrow_dn = value.as_node(),
            Field::KeyNameLt => self.key_name_lt = value.into_str(),
            Field::KeyNameRt => self.key_name_rt = value.into_str(),
            Field::KeyNameFarLt => self.key_name_far_lt = value.into_str(),
            Field::KeyNameFarRt => self.key_name_far_rt = value.into_str(),
            Field::FirstPanel => self.first_panel = value.as_node(),
            Field::Attr => self.attr = value.as_int() as u8,
            Field::RfExtender => self.rf_extender = value.as_int() as u8,
            Field::Reserve1 => self.reserve_1 = value.as_int() as u32,
            Field::Reserve2 => self.reserve_2 = value.as_int() as u32,
            Field::Reserve3 => self.reserve_3 = value.as_int() as u16,
            _ => unreachable!("device has no field {field:?}"),
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "device,{},{:#04x}",
            self.name.as_deref().unwrap_or("<unnamed>"),
            self.attr
        )
    }
}

fn layout(caps: Capabilities) -> &'static [FieldDef] {
    if caps.is_custom() {
        CUSTOM
    } else if caps.is_new_marantz() {
        MARANTZ
    } else if caps.has_color() {
        COLOR
    } else {
        NOCOLOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caps::CA_CUSTOM;

    #[test]
    fn test_hard_key_counts_per_variant() {
        assert_eq!(hard_keys(Capabilities(0x0020001)).len(), 7);
        assert_eq!(hard_keys(Capabilities(0x0060301)).len(), 9);
        assert_eq!(hard_keys(Capabilities(0x0000801)).len(), 14);
        assert_eq!(hard_keys(Capabilities(CA_CUSTOM)).len(), 14);
    }

    #[test]
    fn test_flags() {
        let mut d = Device::default();
        d.set_flag(DEV_HAS_SEPARATOR, true);
        assert!(d.get_flag(DEV_HAS_SEPARATOR));
        assert!(!d.get_flag(DEV_READ_ONLY));
        d.set_flag(DEV_HAS_SEPARATOR, false);
        assert_eq!(d.attr, 0);
    }

    #[test]
    fn test_key_slot_routing() {
        let mut d = Device::default();
        let caps = Capabilities(0x0020001);
        let keys = hard_keys(caps);
        d.put(keys[6].list_slot, FieldValue::Node(Some(crate::graph::NodeId(5))));
        assert_eq!(d.key_mute, Some(crate::graph::NodeId(5)));
        assert_eq!(d.key_lists(caps)[6], Some(crate::graph::NodeId(5)));
    }
}
