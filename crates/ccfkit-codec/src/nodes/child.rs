//! Child slots: positioned holders for exactly one button or frame.
//!
//! A child is a pure indirection layer carrying a screen position, a
//! discriminant, and the payload pointer. The payload type depends on the
//! discriminant byte that follows the pointer, so resolution happens in
//! the post hook, not the table. A payload that fails to resolve is
//! replaced with an empty default of the expected type so the tree stays
//! walkable.

use crate::caps::Capabilities;
use crate::graph::NodeId;
use crate::schema::{ptr_raw, uint, Field, FieldDef, FieldValue, NodeType};

/// Payload discriminant of a child slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChildKind {
    #[default]
    Frame,
    Button,
}

impl ChildKind {
    pub fn from_raw(value: u8) -> Option<Self> {
        match value {
            0 => Some(ChildKind::Frame),
            1 => Some(ChildKind::Button),
            _ => None,
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            ChildKind::Frame => 0,
            ChildKind::Button => 1,
        }
    }

    pub fn node_type(self) -> NodeType {
        match self {
            ChildKind::Frame => NodeType::Frame,
            ChildKind::Button => NodeType::Button,
        }
    }
}

static DECODE: &[FieldDef] = &[
    uint(2, Field::X),
    uint(2, Field::Y),
    uint(4, Field::ChildPos),
    uint(1, Field::ChildKind),
];

static ENCODE: &[FieldDef] = &[
    uint(2, Field::X),
    uint(2, Field::Y),
    ptr_raw(Field::Payload),
    uint(1, Field::ChildKind),
];

/// A positioned slot holding one button or one frame.
#[derive(Debug, Default)]
pub struct Child {
    pub x: u16,
    pub y: u16,
    /// File offset of the payload, valid only during decode.
    pub child_pos: u32,
    pub kind: ChildKind,
    pub payload: Option<NodeId>,
}

impl Child {
    pub fn button(payload: NodeId) -> Self {
        Child { x: 10, y: 10, kind: ChildKind::Button, payload: Some(payload), ..Child::default() }
    }

    pub fn frame(payload: NodeId) -> Self {
        Child { x: 10, y: 10, kind: ChildKind::Frame, payload: Some(payload), ..Child::default() }
    }

    pub fn is_button(&self) -> bool {
        self.kind == ChildKind::Button
    }

    pub fn is_frame(&self) -> bool {
        self.kind == ChildKind::Frame
    }

    pub fn decode_table(&self, _caps: Capabilities) -> &'static [FieldDef] {
        DECODE
    }

    pub fn encode_table(&self, _caps: Capabilities) -> &'static [FieldDef] {
        ENCODE
    }

    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::X => FieldValue::Int(self.x.into()),
            Field::Y => FieldValue::Int(self.y.into()),
            Field::ChildPos => FieldValue::Int(self.child_pos.into()),
            Field::ChildKind => FieldValue::Int(self.kind.raw().into()),
            Field::Payload => FieldValue::Node(self.payload),
            _ => unreachable!("child has no field {field:?}"),
        }
    }

    pub fn put(&mut self, field: Field, value: FieldValue) {
        match field {
            Field::X => self.x = value.as_int() as u16,
            Field::Y => self.y = value.as_int() as u16,
            Field::ChildPos => self.child_pos = value.as_int() as u32,
            Field::ChildKind => {
                if let Some(kind) = ChildKind::from_raw(value.as_int() as u8) {
                    self.kind = kind;
                } else {
                    log::warn!("invalid child discriminant {}", value.as_int());
                }
            }
            Field::Payload => self.payload = value.as_node(),
            _ => unreachable!("child has no field {field:?}"),
        }
    }

    pub fn describe(&self) -> String {
        format!("child,{}x{},{:?}", self.x, self.y, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        assert_eq!(ChildKind::from_raw(0), Some(ChildKind::Frame));
        assert_eq!(ChildKind::from_raw(1), Some(ChildKind::Button));
        assert_eq!(ChildKind::from_raw(7), None);
        assert_eq!(ChildKind::Button.raw(), 1);
    }

    #[test]
    fn test_invalid_discriminant_keeps_previous() {
        let mut c = Child::button(NodeId(3));
        c.put(Field::ChildKind, FieldValue::Int(9));
        assert_eq!(c.kind, ChildKind::Button);
    }
}
