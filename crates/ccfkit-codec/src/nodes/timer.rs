//! Timers: scheduled start/end action pairs.
//!
//! The only record type whose actions are embedded in fixed slots rather
//! than referenced through a list. Times are minutes past midnight; days
//! are a weekday bitmask.

use crate::caps::Capabilities;
use crate::graph::NodeId;
use crate::schema::{embed, nptr, uint, Field, FieldDef, FieldValue, NodeType};

static TABLE: &[FieldDef] = &[
    nptr(NodeType::Timer, Field::Next),
    uint(1, Field::StartDays),
    uint(1, Field::Reserve1),
    uint(2, Field::StartTime),
    uint(1, Field::EndDays),
    uint(1, Field::Reserve2),
    uint(2, Field::EndTime),
    embed(NodeType::Action, Field::StartAction),
    embed(NodeType::Action, Field::EndAction),
];

/// A scheduled action pair.
#[derive(Debug, Default)]
pub struct Timer {
    pub next: Option<NodeId>,
    /// Weekday bitmask for the start event.
    pub start_days: u8,
    /// Minutes past midnight for the start event.
    pub start_time: u16,
    pub end_days: u8,
    pub end_time: u16,
    pub start_action: Option<NodeId>,
    pub end_action: Option<NodeId>,
    pub reserve_1: u8,
    pub reserve_2: u8,
}

impl Timer {
    fn clock(minutes: u16) -> String {
        format!("{}:{:02}", minutes / 60, minutes % 60)
    }

    pub fn decode_table(&self, _caps: Capabilities) -> &'static [FieldDef] {
        TABLE
    }

    pub fn encode_table(&self, _caps: Capabilities) -> &'static [FieldDef] {
        TABLE
    }

    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Next => FieldValue::Node(self.next),
            Field::StartDays => FieldValue::Int(self.start_days.into()),
            Field::StartTime => FieldValue::Int(self.start_time.into()),
            Field::EndDays => FieldValue::Int(self.end_days.into()),
            Field::EndTime => FieldValue::Int(self.end_time.into()),
            Field::StartAction => FieldValue::Node(self.start_action),
            Field::EndAction => FieldValue::Node(self.end_action),
            Field::Reserve1 => FieldValue::Int(self.reserve_1.into()),
            Field::Reserve2 => FieldValue::Int(self.reserve_2.into()),
            _ => unreachable!("timer has no field {field:?}"),
        }
    }

    pub fn put(&mut self, field: Field, value: FieldValue) {
        match field {
            Field::Next => self.next = value.as_node(),
            Field::StartDays => self.start_days = value.as_int() as u8,
            Field::StartTime => self.start_time = value.as_int() as u16,
            Field::EndDays => self.end_days = value.as_int() as u8,
            Field::EndTime => self.end_time = value.as_int() as u16,
            Field::StartAction => self.start_action = value.as_node(),
            Field::EndAction => self.end_action = value.as_node(),
            Field::Reserve1 => self.reserve_1 = value.as_int() as u8,
            Field::Reserve2 => self.reserve_2 = value.as_int() as u8,
            _ => unreachable!("timer has no field {field:?}"),
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "timer,{} to {}",
            Timer::clock(self.start_time),
            Timer::clock(self.end_time)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_format() {
        let timer = Timer { start_time: 8 * 60 + 5, end_time: 23 * 60, ..Timer::default() };
        assert_eq!(timer.describe(), "timer,8:05 to 23:00");
    }
}
