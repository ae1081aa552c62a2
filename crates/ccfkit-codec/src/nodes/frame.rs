//! Frames: nested containers for child slots.
//!
//! Panels cannot nest, frames can. A frame carries its own icon and
//! colors; when it has a background icon the icon size overrides the
//! stored width and height, so the frame only counts as resizable
//! without one.

use crate::caps::Capabilities;
use crate::graph::NodeId;
use crate::schema::{int, narr, nptr, sptr, uint, Field, FieldDef, FieldValue, NodeType};

static NOCOLOR: &[FieldDef] = &[
    uint(2, Field::Width),
    uint(2, Field::Height),
    sptr(Field::Name),
    nptr(NodeType::Icon, Field::Icon),
    int(4, Field::Reserve1),
    uint(1, Field::FontSize),
    uint(1, Field::Colors),
    uint(1, Field::Count1),
    uint(1, Field::Count2),
    narr(NodeType::Child, Field::Count1, Field::Children),
];

static COLOR: &[FieldDef] = &[
    uint(2, Field::Width),
    uint(2, Field::Height),
    sptr(Field::Name),
    nptr(NodeType::Icon, Field::Icon),
    int(3, Field::Reserve1),
    uint(1, Field::TextOpt),
    uint(1, Field::FontSize),
    uint(4, Field::Colors),
    uint(1, Field::Count1),
    uint(1, Field::Count2),
    narr(NodeType::Child, Field::Count1, Field::Children),
];

/// A container for further child slots, with its own icon and colors.
#[derive(Debug, Default)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    pub name: Option<String>,
    pub icon: Option<NodeId>,
    pub text_opt: u8,
    pub font_size: u8,
    pub colors: u32,
    pub count1: u8,
    pub count2: u8,
    pub children: Vec<NodeId>,
    pub reserve_1: u32,
}

impl Frame {
    pub fn named(name: &str) -> Self {
        Frame {
            name: Some(name.to_string()),
            width: 90,
            height: 60,
            ..Frame::default()
        }
    }

    /// Resizable iff there is no background icon.
    pub fn is_resizable(&self) -> bool {
        self.icon.is_none()
    }

    pub fn set_children(&mut self, children: Vec<NodeId>) {
        self.count1 = children.len() as u8;
        self.count2 = self.count1;
        self.children = children;
    }

    pub fn add_child(&mut self, child: NodeId) {
        self.children.push(child);
        self.count1 = self.children.len() as u8;
        self.count2 = self.count1;
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
            Field::Name => FieldValue::Str(self.name.clone()),
            Field::Icon => FieldValue::Node(self.icon),
            Field::TextOpt => FieldValue::Int(self.text_opt.into()),
            Field::FontSize => FieldValue::Int(self.font_size.into()),
            Field::Colors => FieldValue::Int(self.colors.into()),
            Field::Count1 => FieldValue::Int(self.count1.into()),
            Field::Count2 => FieldValue::Int(self.count2.into()),
            Field::Children => FieldValue::Nodes(self.children.clone()),
            Field::Reserve1 => FieldValue::Int(self.reserve_1.into()),
            _ => unreachable!("frame has no field {field:?}"),
        }
    }

    pub fn put(&mut self, field: Field, value: FieldValue) {
        match field {
            Field::Width => self.width = value.as_int() as u16,
            Field::Height => self.height = value.as_int() as u16,
            Field::Name => self.name = value.into_str(),
            Field::Icon => self.icon = value.as_node(),
            Field::TextOpt => self.text_opt = value.as_int() as u8,
            Field::FontSize => self.font_size = value.as_int() as u8,
            Field::Colors => self.colors = value.as_int() as u32,
            Field::Count1 => self.count1 = value.as_int() as u8,
            Field::Count2 => self.count2 = value.as_int() as u8,
            Field::Children => self.children = value.into_nodes(),
            Field::Reserve1 => self.reserve_1 = value.as_int() as u32,
            _ => unreachable!("frame has no field {field:?}"),
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "frame,{},{}x{},{}",
            self.name.as_deref().unwrap_or(""),
            self.width,
            self.height,
            self.children.len()
        )
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
    fn test_resizable_without_icon() {
        let mut f = Frame::named("grid");
        assert!(f.is_resizable());
        f.icon = Some(NodeId(1));
        assert!(!f.is_resizable());
    }

    #[test]
    fn test_text_opt_bits() {
        let mut f = Frame::default();
        f.set_text_alignment(2);
        f.set_text_wrap(true);
        assert_eq!(f.text_alignment(), 2);
        assert!(f.text_wrap());
        f.set_text_wrap(false);
        assert_eq!(f.text_alignment(), 2);
    }
}
