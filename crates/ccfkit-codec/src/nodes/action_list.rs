//! Action lists: ordered, shareable sequences of actions.
//!
//! Multiple buttons and hard keys may point at the same list; sharing is
//! by offset, so the pointer cache keeps one arena entry per list. The
//! duplicate count byte is clamped on mismatch rather than trusted.

use crate::caps::Capabilities;
use crate::graph::NodeId;
use crate::schema::{narr, uint, Field, FieldDef, FieldValue, NodeType};

static TABLE: &[FieldDef] = &[
    uint(1, Field::Count1),
    uint(1, Field::Count2),
    narr(NodeType::Action, Field::Count1, Field::Actions),
];

/// An ordered sequence of actions.
#[derive(Debug, Default)]
pub struct ActionList {
    pub count1: u8,
    /// Duplicate of `count1`.
    pub count2: u8,
    pub actions: Vec<NodeId>,
}

impl ActionList {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Replace the actions, keeping both counts in step.
    pub fn set_actions(&mut self, actions: Vec<NodeId>) {
        self.count1 = actions.len() as u8;
        self.count2 = self.count1;
        self.actions = actions;
    }

    pub fn append(&mut self, action: NodeId) {
        self.actions.push(action);
        self.count1 = self.actions.len() as u8;
        self.count2 = self.count1;
    }

    /// Drop entries for which `keep` is false, preserving relative order.
    pub fn retain(&mut self, mut keep: impl FnMut(NodeId) -> bool) {
        self.actions.retain(|&a| keep(a));
        self.count1 = self.actions.len() as u8;
        self.count2 = self.count1;
    }

    pub fn decode_table(&self, _caps: Capabilities) -> &'static [FieldDef] {
        TABLE
    }

    pub fn encode_table(&self, _caps: Capabilities) -> &'static [FieldDef] {
        TABLE
    }

    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Count1 => FieldValue::Int(self.count1.into()),
            Field::Count2 => FieldValue::Int(self.count2.into()),
            Field::Actions => FieldValue::Nodes(self.actions.clone()),
            _ => unreachable!("action list has no field {field:?}"),
        }
    }

    pub fn put(&mut self, field: Field, value: FieldValue) {
        match field {
            Field::Count1 => self.count1 = value.as_int() as u8,
            Field::Count2 => self.count2 = value.as_int() as u8,
            Field::Actions => self.actions = value.into_nodes(),
            _ => unreachable!("action list has no field {field:?}"),
        }
    }

    pub fn describe(&self) -> String {
        format!("action-list,{}", self.actions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retain_preserves_order() {
        let mut list = ActionList::default();
        list.set_actions((0..5).map(NodeId).collect());
        list.retain(|id| id.0 != 1 && id.0 != 3);
        assert_eq!(list.actions, vec![NodeId(0), NodeId(2), NodeId(4)]);
        assert_eq!(list.count1, 3);
        assert_eq!(list.count2, 3);
    }

    #[test]
    fn test_append_updates_counts() {
        let mut list = ActionList::default();
        list.append(NodeId(7));
        assert_eq!(list.count1, 1);
        assert!(!list.is_empty());
    }
}
