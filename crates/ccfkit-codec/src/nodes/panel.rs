//! Panels: one screen of widgets.
//!
//! A panel owns an ordered array of child slots and a name stored
//! out-of-line in the string section. The sign bit of the encoded name
//! offset flags the panel as hidden, so the name offset is decoded as a
//! raw word and resolved in the post hook rather than through the table.

use crate::caps::Capabilities;
use crate::graph::NodeId;
use crate::schema::{narr, nptr, sref, uint, Field, FieldDef, FieldValue, NodeType};

/// Sign bit of the name offset: panel is hidden.
pub const NAME_HIDDEN: u32 = 0x8000_0000;
/// The real string offset within the name word.
pub const NAME_MASK: u32 = 0x7fff_ffff;

static DECODE: &[FieldDef] = &[
    nptr(NodeType::Panel, Field::Next),
    uint(4, Field::NamePos),
    uint(1, Field::Count1),
    uint(1, Field::Count2),
    narr(NodeType::Child, Field::Count1, Field::Children),
];

static ENCODE: &[FieldDef] = &[
    nptr(NodeType::Panel, Field::Next),
    uint(4, Field::NamePos),
    uint(1, Field::Count1),
    uint(1, Field::Count2),
    narr(NodeType::Child, Field::Count1, Field::Children),
    // written out-of-line through the name word above
    sref(Field::Name),
];

/// One screen of buttons and frames.
#[derive(Debug, Default)]
pub struct Panel {
    pub next: Option<NodeId>,
    /// Raw encoded name word: string offset plus hidden flag.
    pub name_pos: u32,
    pub count1: u8,
    /// Duplicate of `count1`.
    pub count2: u8,
    pub children: Vec<NodeId>,
    pub hidden: bool,
    pub name: Option<String>,
}

impl Panel {
    pub fn named(name: &str) -> Self {
        Panel { name: Some(name.to_string()), ..Panel::default() }
    }

    /// Replace the child array, keeping both counts in step.
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

    pub fn remove_child(&mut self, child: NodeId) {
        self.children.retain(|&c| c != child);
        self.count1 = self.children.len() as u8;
        self.count2 = self.count1;
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn decode_table(&self, _caps: Capabilities) -> &'static [FieldDef] {
        DECODE
    }

    pub fn encode_table(&self, _caps: Capabilities) -> &'static [FieldDef] {
        ENCODE
    }

    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Next => FieldValue::Node(self.next),
            Field::NamePos => FieldValue::Int(self.name_pos.into()),
            Field::Count1 => FieldValue::Int(self.count1.into()),
            Field::Count2 => FieldValue::Int(self.count2.into()),
            Field::Children => FieldValue::Nodes(self.children.clone()),
            Field::Name => FieldValue::Str(self.name.clone()),
            _ => unreachable!("panel has no field {field:?}"),
        }
    }

    pub fn put(&mut self, field: Field, value: FieldValue) {
        match field {
            Field::Next => self.next = value.as_node(),
            Field::NamePos => self.name_pos = value.as_int() as u32,
            Field::Count1 => self.count1 = value.as_int() as u8,
            Field::Count2 => self.count2 = value.as_int() as u8,
            Field::Children => self.children = value.into_nodes(),
            Field::Name => self.name = value.into_str(),
            _ => unreachable!("panel has no field {field:?}"),
        }
    }

    pub fn describe(&self) -> String {
        let name = self.name.as_deref().unwrap_or("");
        format!(
            "panel,{},{}",
            if self.hidden { format!("({name})") } else { name.to_string() },
            self.children.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_children_updates_counts() {
        let mut p = Panel::default();
        p.set_children(vec![NodeId(1), NodeId(2), NodeId(3)]);
        assert_eq!(p.count1, 3);
        assert_eq!(p.count2, 3);
        p.remove_child(NodeId(2));
        assert_eq!(p.count1, 2);
        assert_eq!(p.children, vec![NodeId(1), NodeId(3)]);
    }

    #[test]
    fn test_hidden_flag_constants() {
        assert_eq!(NAME_HIDDEN & NAME_MASK, 0);
        assert_eq!(NAME_HIDDEN | NAME_MASK, u32::MAX);
    }
}
