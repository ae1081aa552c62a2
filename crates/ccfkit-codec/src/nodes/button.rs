//! Buttons: clickable widgets with a 2x2 state icon matrix.
//!
//! A button keeps one icon and one color composite for each of the four
//! active/selected states. Whether the button is "active" is never
//! stored: it is derived from its action list being non-empty. When the
//! state icon exists, its size overrides the stored width and height at
//! encode time.

use crate::caps::Capabilities;
use crate::graph::NodeId;
use crate::schema::{nptr, sptr, uint, Field, FieldDef, FieldValue, NodeType};

/// Default gray composite: white text on dark gray.
pub const DEFAULT_GRAY_COLORS: u32 = 0x07;
/// Default color composite: white text on dark gray, 8-bit indexes.
pub const DEFAULT_COLOR_COLORS: u32 = 0xfcff;

static NOCOLOR: &[FieldDef] = &[
    uint(2, Field::Width),
    uint(2, Field::Height),
    nptr(NodeType::ActionList, Field::Actions),
    sptr(Field::Name),
    sptr(Field::IdTag),
    uint(1, Field::FontSize),
    uint(1, Field::Reserve1),
    nptr(NodeType::Icon, Field::IconIu),
    nptr(NodeType::Icon, Field::IconIs),
    nptr(NodeType::Icon, Field::IconAu),
    nptr(NodeType::Icon, Field::IconAs),
    uint(1, Field::ColorIu),
    uint(1, Field::ColorIs),
    uint(1, Field::ColorAu),
    uint(1, Field::ColorAs),
];

static COLOR: &[FieldDef] = &[
    uint(2, Field::Width),
    uint(2, Field::Height),
    nptr(NodeType::ActionList, Field::Actions),
    sptr(Field::Name),
    sptr(Field::IdTag),
    uint(1, Field::FontSize),
    uint(1, Field::TextOpt),
    nptr(NodeType::Icon, Field::IconIu),
    nptr(NodeType::Icon, Field::IconIs),
    nptr(NodeType::Icon, Field::IconAu),
    nptr(NodeType::Icon, Field::IconAs),
    uint(4, Field::ColorIu),
    uint(4, Field::ColorIs),
    uint(4, Field::ColorAu),
    uint(4, Field::ColorAs),
];

/// A clickable widget.
#[derive(Debug, Default)]
pub struct Button {
    pub width: u16,
    pub height: u16,
    pub actions: Option<NodeId>,
    pub name: Option<String>,
    pub id_tag: Option<String>,
    pub font_size: u8,
    pub text_opt: u8,
    /// State icons: inactive/active x unselected/selected.
    pub icon_iu: Option<NodeId>,
    pub icon_is: Option<NodeId>,
    pub icon_au: Option<NodeId>,
    pub icon_as: Option<NodeId>,
    pub color_iu: u32,
    pub color_is: u32,
    pub color_au: u32,
    pub color_as: u32,
    pub reserve_1: u8,
}

impl Button {
    pub fn named(name: &str, color: bool) -> Self {
        let colors = if color { DEFAULT_COLOR_COLORS } else { DEFAULT_GRAY_COLORS };
        Button {
            name: Some(name.to_string()),
            width: 50,
            height: 25,
            font_size: 4,
            color_iu: colors,
            color_is: colors,
            color_au: colors,
            color_as: colors,
            ..Button::default()
        }
    }

    /// Resizable iff the icon for the current state is absent.
    pub fn is_resizable(&self, active: bool) -> bool {
        if active {
            self.icon_au.is_none()
        } else {
            self.icon_iu.is_none()
        }
    }

    /// The state icon consulted for display size.
    pub fn size_icon(&self, active: bool) -> Option<NodeId> {
        if active {
            self.icon_au
        } else {
            self.icon_iu
        }
    }

    pub fn text_alignment(&self) -> u8 {
        self.text_opt & 0x3
    }

    pub fn set_text_alignment(&mut self, align: u8) {
        self.text_opt = (self.text_opt & 0xfc) | (align & 0x3);
    }

    pub fn text_wrap(&self) -> bool {
        self.text_opt & 0x80 == 0x80
    }

    pub fn set_text_wrap(&mut self, wrap: bool) {
        self.text_opt = (self.text_opt & 0x7f) | if wrap { 0x80 } else { 0 };
    }

    pub fn decode_table(&self, caps: Capabilities) -> &'static [FieldDef] {
        layout(caps)
    }

    pub fn encode_table(&self, caps: Capabilities) -> &'static [FieldDef] {
        layout(caps)
    }

    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Width => FieldValue::Int(self.width.into()),
            Field::Height => FieldValue::Int(self.height.into()),
            Field::Actions => FieldValue::Node(self.actions),
            Field::Name => FieldValue::Str(self.name.clone()),
            Field::IdTag => FieldValue::Str(self.id_tag.clone()),
            Field::FontSize => FieldValue::Int(self.font_size.into()),
            Field::TextOpt => FieldValue::Int(self.text_opt.into()),
            Field::IconIu => FieldValue::Node(self.icon_iu),
            Field::IconIs => FieldValue::Node(self.icon_is),
            Field::IconAu => FieldValue::Node(self.icon_au),
            Field::IconAs => FieldValue::Node(self.icon_as),
            Field::ColorIu => FieldValue::Int(self.color_iu.into()),
            Field::ColorIs => FieldValue::Int(self.color_is.into()),
            Field::ColorAu => FieldValue::Int(self.color_au.into()),
            Field::ColorAs => FieldValue::Int(self.color_as.into()),
            Field::Reserve1 => FieldValue::Int(self.reserve_1.into()),
            _ => unreachable!("button has no field {field:?}"),
        }
    }

    pub fn put(&mut self, field: Field, value: FieldValue) {
        match field {
            Field::Width => self.width = value.as_int() as u16,
            Field::Height => self.height = value.as_int() as u16,
            Field::Actions => self.actions = value.as_node(),
            Field::Name => self.name = value.into_str(),
            Field::IdTag => self.id_tag = value.into_str(),
            Field::FontSize => self.font_size = value.as_int() as u8,
            Field::TextOpt => self.text_opt = value.as_int() as u8,
            Field::IconIu => self.icon_iu = value.as_node(),
            Field::IconIs => self.icon_is = value.as_node(),
            Field::IconAu => self.icon_au = value.as_node(),
            Field::IconAs => self.icon_as = value.as_node(),
            Field::ColorIu => self.color_iu = value.as_int() as u32,
            Field::ColorIs => self.color_is = value.as_int() as u32,
            Field::ColorAu => self.color_au = value.as_int() as u32,
            Field::ColorAs => self.color_as = value.as_int() as u32,
            Field::Reserve1 => self.reserve_1 = value.as_int() as u8,
            _ => unreachable!("button has no field {field:?}"),
        }
    }

    pub fn describe(&self) -> String {
        format!("button,{}", self.name.as_deref().unwrap_or(""))
    }
}

fn layout(caps: Capabilities) -> &'static [FieldDef] {
    if caps.has_color() {
        COLOR
    } else {
        NOCOLOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_defaults() {
        let b = Button::named("power", false);
        assert_eq!(b.width, 50);
        assert_eq!(b.height, 25);
        assert_eq!(b.color_au, DEFAULT_GRAY_COLORS);
        assert!(b.actions.is_none());
    }

    #[test]
    fn test_resizable_per_state() {
        let mut b = Button::named("power", false);
        assert!(b.is_resizable(true));
        b.icon_au = Some(NodeId(9));
        assert!(!b.is_resizable(true));
        assert!(b.is_resizable(false));
    }
}
