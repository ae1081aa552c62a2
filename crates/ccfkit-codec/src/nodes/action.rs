//! Actions: single side-effecting instructions.
//!
//! All nine action kinds share one physical record: a discriminant byte
//! and two generic words. What the words mean depends on the kind - raw
//! parameters (delay, packed beep) or file offsets resolved into node
//! references after decode. The typed views over the shared record are
//! produced by [`Action::view`] instead of subclassing.

use crate::caps::Capabilities;
use crate::graph::NodeId;
use crate::schema::{uint, Field, FieldDef, FieldValue};

static TABLE: &[FieldDef] = &[
    uint(1, Field::ActionType),
    uint(4, Field::P1),
    uint(4, Field::P2),
];

/// The action discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionKind {
    #[default]
    Dummy = 0,
    /// p2 = IR code offset.
    IrCode = 1,
    /// p1 = device offset, p2 = button offset.
    AliasButton = 2,
    /// p1 = device offset, p2 = panel offset or special-jump sentinel.
    JumpPanel = 3,
    /// p2 = delay in milliseconds.
    Delay = 4,
    /// p1 = device offset, p2 = hard key code.
    AliasKey = 5,
    /// p1 = device offset.
    AliasDevice = 6,
    /// p2 = timer offset.
    Timer = 7,
    /// p2 = packed beep parameters.
    Beep = 8,
    /// Positional variant of [`ActionKind::JumpPanel`] on Marantz x200.
    MarantzJump = 9,
}

impl ActionKind {
    pub fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            0 => ActionKind::Dummy,
            1 => ActionKind::IrCode,
            2 => ActionKind::AliasButton,
            3 => ActionKind::JumpPanel,
            4 => ActionKind::Delay,
            5 => ActionKind::AliasKey,
            6 => ActionKind::AliasDevice,
            7 => ActionKind::Timer,
            8 => ActionKind::Beep,
            9 => ActionKind::MarantzJump,
            _ => return None,
        })
    }

    pub fn raw(self) -> u8 {
        self as u8
    }
}

/// Special jump targets encoded in the panel word instead of an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialJump {
    Forward,
    Back,
    ScrollDown,
    ScrollUp,
    MouseMode,
}

impl SpecialJump {
    pub fn code(self) -> u32 {
        match self {
            SpecialJump::Forward => 0xbbbb_bbbb,
            SpecialJump::Back => 0xcccc_cccc,
            SpecialJump::ScrollDown => 0xdddd_dddd,
            SpecialJump::ScrollUp => 0xeeee_eeee,
            SpecialJump::MouseMode => 0xffff_ffff,
        }
    }

    /// Recover the sentinel from the panel word, if it carries one. The
    /// high nibble runs 0xb..=0xf for the five targets.
    pub fn from_code(value: u32) -> Option<Self> {
        match ((value >> 24) & 0xf).checked_sub(0xb)? {
            0 => Some(SpecialJump::Forward),
            1 => Some(SpecialJump::Back),
            2 => Some(SpecialJump::ScrollDown),
            3 => Some(SpecialJump::ScrollUp),
            4 => Some(SpecialJump::MouseMode),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SpecialJump::Forward => "Forward",
            SpecialJump::Back => "Back",
            SpecialJump::ScrollDown => "Scroll Down",
            SpecialJump::ScrollUp => "Scroll Up",
            SpecialJump::MouseMode => "Mouse Mode",
        }
    }
}

/// Hard key labels on gray remotes.
pub static KEYS_GRAY: &[&str] = &["Left", "Right", "Vol-", "Vol+", "CH-", "CH+", "Mute"];
/// Hard key labels on color remotes.
pub static KEYS_PRONTO_PRO: &[&str] =
    &["Left", "Right", "Vol-", "Vol+", "CH-", "CH+", "Mute", "Far Left", "Far Right"];
/// Hard key labels on Marantz x200 remotes.
pub static KEYS_MARANTZ: &[&str] = &[
    "Left", "Right", "Mute", "CH-", "CH+", "Vol-", "Vol+", "Menu", "End", "Exit", "Up Arrow",
    "Left Arrow", "Right Arrow", "Down Arrow", "Home", "Light", "Back", "Ahead",
];
/// Hard key labels in custom-layout mode.
pub static KEYS_CUSTOM: &[&str] = &[
    "Left", "Right", "Vol-", "Vol+", "CH-", "CH+", "Mute", "Far Left", "Far Right", "Enter",
    "ArrowUp", "ArrowLeft", "ArrowRight", "ArrowDown",
];

/// The hard-key label set for a capability variant.
pub fn key_labels(caps: Capabilities) -> &'static [&'static str] {
    if caps.is_custom() {
        KEYS_CUSTOM
    } else if caps.is_new_marantz() {
        KEYS_MARANTZ
    } else if caps.has_color() {
        KEYS_PRONTO_PRO
    } else {
        KEYS_GRAY
    }
}

/// Pack beep parameters into one word: bits 31-24 duration/10, bits 23-8
/// frequency, bits 7-0 duty cycle.
pub fn pack_beep(duration_ms: u32, frequency_hz: u32, duty_cycle: u32) -> u32 {
    (((duration_ms / 10).min(255) & 0xff) << 24)
        | ((frequency_hz & 0xffff) << 8)
        | (duty_cycle.min(100) & 0xff)
}

/// Unpack a beep word into (duration ms, frequency Hz, duty cycle %).
pub fn unpack_beep(word: u32) -> (u32, u32, u32) {
    (
        (((word >> 24) & 0xff) * 10).min(2550),
        (word >> 8) & 0xffff,
        (word & 0xff).min(100),
    )
}

/// A typed reading of one action record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionView {
    Dummy,
    /// Send the referenced IR code.
    IrCode { code: Option<NodeId> },
    /// Virtually push another button.
    AliasButton { device: Option<NodeId>, button: Option<NodeId> },
    /// Switch the displayed panel.
    JumpPanel { device: Option<NodeId>, panel: Option<NodeId>, marantz: bool },
    /// Jump to a special pseudo-panel.
    SpecialJump(SpecialJump),
    /// Wait the given milliseconds.
    Delay { millis: u32 },
    /// Virtually press a hard key of a device.
    AliasKey { device: Option<NodeId>, key: u32 },
    /// Switch the active device.
    AliasDevice { device: Option<NodeId> },
    /// Arm the referenced timer.
    Timer { timer: Option<NodeId> },
    /// Emit a beep.
    Beep { duration_ms: u32, frequency_hz: u32, duty_cycle: u32 },
}

/// One instruction in an action list.
#[derive(Debug, Default)]
pub struct Action {
    pub kind: ActionKind,
    pub p1: u32,
    pub p2: u32,
    /// Resolved device reference, when the kind carries one.
    pub ref1: Option<NodeId>,
    /// Resolved target reference (button, panel, IR code, timer).
    pub ref2: Option<NodeId>,
    /// Cleared when a referenced target fails to resolve; invalid
    /// actions stay in the tree but are culled at encode time.
    pub invalid: bool,
}

impl Action {
    pub fn delay(millis: u32) -> Self {
        Action { kind: ActionKind::Delay, p2: millis, ..Action::default() }
    }

    pub fn beep(duration_ms: u32, frequency_hz: u32, duty_cycle: u32) -> Self {
        Action {
            kind: ActionKind::Beep,
            p2: pack_beep(duration_ms, frequency_hz, duty_cycle),
            ..Action::default()
        }
    }

    pub fn ir_code(code: NodeId) -> Self {
        Action { kind: ActionKind::IrCode, ref2: Some(code), ..Action::default() }
    }

    pub fn alias_button(device: Option<NodeId>, button: NodeId) -> Self {
        Action {
            kind: ActionKind::AliasButton,
            ref1: device,
            ref2: Some(button),
            ..Action::default()
        }
    }

    pub fn jump_panel(device: Option<NodeId>, panel: NodeId, marantz: bool) -> Self {
        Action {
            kind: if marantz { ActionKind::MarantzJump } else { ActionKind::JumpPanel },
            ref1: device,
            ref2: Some(panel),
            ..Action::default()
        }
    }

    pub fn special_jump(target: SpecialJump) -> Self {
        Action { kind: ActionKind::JumpPanel, p2: target.code(), ..Action::default() }
    }

    pub fn alias_key(device: NodeId, key: u32) -> Self {
        Action { kind: ActionKind::AliasKey, ref1: Some(device), p2: key, ..Action::default() }
    }

    pub fn alias_device(device: NodeId) -> Self {
        Action { kind: ActionKind::AliasDevice, ref1: Some(device), ..Action::default() }
    }

    pub fn timer_trigger(timer: NodeId) -> Self {
        Action { kind: ActionKind::Timer, ref2: Some(timer), ..Action::default() }
    }

    pub fn is_valid(&self) -> bool {
        !self.invalid
    }

    pub fn is_jump(&self) -> bool {
        matches!(self.kind, ActionKind::JumpPanel | ActionKind::MarantzJump)
    }

    /// Whether the panel word encodes a special target instead of an
    /// offset. Must be checked before resolving the panel pointer.
    pub fn is_special_jump(&self) -> bool {
        SpecialJump::from_code(self.p2).is_some()
    }

    /// The typed view of this record.
    pub fn view(&self) -> ActionView {
        match self.kind {
            ActionKind::Dummy => ActionView::Dummy,
            ActionKind::IrCode => ActionView::IrCode { code: self.ref2 },
            ActionKind::AliasButton => {
                ActionView::AliasButton { device: self.ref1, button: self.ref2 }
            }
            ActionKind::JumpPanel | ActionKind::MarantzJump => {
                if let Some(special) = SpecialJump::from_code(self.p2) {
                    ActionView::SpecialJump(special)
                } else {
                    ActionView::JumpPanel {
                        device: self.ref1,
                        panel: self.ref2,
                        marantz: self.kind == ActionKind::MarantzJump,
                    }
                }
            }
            ActionKind::Delay => ActionView::Delay { millis: self.p2 },
            ActionKind::AliasKey => ActionView::AliasKey { device: self.ref1, key: self.p2 },
            ActionKind::AliasDevice => ActionView::AliasDevice { device: self.ref1 },
            ActionKind::Timer => ActionView::Timer { timer: self.ref2 },
            ActionKind::Beep => {
                let (duration_ms, frequency_hz, duty_cycle) = unpack_beep(self.p2);
                ActionView::Beep { duration_ms, frequency_hz, duty_cycle }
            }
        }
    }

    pub fn decode_table(&self, _caps: Capabilities) -> &'static [FieldDef] {
        TABLE
    }

    pub fn encode_table(&self, _caps: Capabilities) -> &'static [FieldDef] {
        TABLE
    }

    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::ActionType => FieldValue::Int(self.kind.raw().into()),
            Field::P1 => FieldValue::Int(self.p1.into()),
            Field::P2 => FieldValue::Int(self.p2.into()),
            _ => unreachable!("action has no field {field:?}"),
        }
    }

    pub fn put(&mut self, field: Field, value: FieldValue) {
        match field {
            Field::ActionType => {
                if let Some(kind) = ActionKind::from_raw(value.as_int() as u8) {
                    self.kind = kind;
                } else {
                    log::warn!("unknown action type {}", value.as_int());
                    self.kind = ActionKind::Dummy;
                    self.invalid = true;
                }
            }
            Field::P1 => self.p1 = value.as_int() as u32,
            Field::P2 => self.p2 = value.as_int() as u32,
            _ => unreachable!("action has no field {field:?}"),
        }
    }

    pub fn describe(&self) -> String {
        format!("action,{:?},{:#x},{:#x}", self.kind, self.p1, self.p2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_beep_pack_round_trip() {
        for dur in (0..=2550).step_by(10) {
            for &freq in &[0u32, 440, 8000, 65535] {
                for &cycle in &[0u32, 1, 50, 100] {
                    let word = pack_beep(dur, freq, cycle);
                    assert_eq!(unpack_beep(word), (dur, freq, cycle));
                }
            }
        }
    }

    #[test]
    fn test_beep_clamps() {
        let word = pack_beep(99999, 70000, 150);
        let (dur, freq, cycle) = unpack_beep(word);
        assert_eq!(dur, 2550);
        assert_eq!(freq, 70000 & 0xffff);
        assert_eq!(cycle, 100);
    }

    #[test]
    fn test_special_jump_sentinels() {
        assert_eq!(SpecialJump::from_code(0xbbbb_bbbb), Some(SpecialJump::Forward));
        assert_eq!(SpecialJump::from_code(0xffff_ffff), Some(SpecialJump::MouseMode));
        // a plausible file offset never reads as a special jump
        assert_eq!(SpecialJump::from_code(0x0001_2345), None);
    }

    #[test]
    fn test_jump_forward_never_resolves_panel() {
        let mut a = Action::default();
        a.kind = ActionKind::JumpPanel;
        a.p2 = 0xbbbb_bbbb;
        assert!(a.is_special_jump());
        assert_eq!(a.view(), ActionView::SpecialJump(SpecialJump::Forward));
    }

    #[test]
    fn test_unknown_discriminant_marks_invalid() {
        let mut a = Action::default();
        a.put(Field::ActionType, FieldValue::Int(42));
        assert!(!a.is_valid());
    }

    #[test]
    fn test_view_delay() {
        let a = Action::delay(750);
        assert_eq!(a.view(), ActionView::Delay { millis: 750 });
    }
}
