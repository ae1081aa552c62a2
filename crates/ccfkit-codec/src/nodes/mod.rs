//! The CCF record types.
//!
//! Each type supplies its field tables (one per capability variant where
//! the layout differs), typed storage, and the generic `get`/`put`
//! accessors the table-driven passes route through. Type-specific decode
//! and encode behavior beyond the tables lives in the session hooks.

pub mod action;
pub mod action_list;
pub mod button;
pub mod child;
pub mod device;
pub mod frame;
pub mod header;
pub mod icon;
pub mod ircode;
pub mod panel;
pub mod timer;

pub use action::{
    key_labels, pack_beep, unpack_beep, Action, ActionKind, ActionView, SpecialJump, KEYS_CUSTOM,
    KEYS_GRAY, KEYS_MARANTZ, KEYS_PRONTO_PRO,
};
pub use action_list::ActionList;
pub use button::Button;
pub use child::{Child, ChildKind};
pub use device::{hard_keys, Device, HardKeyDef};
pub use frame::Frame;
pub use header::{Header, HeaderLayout, AT_CONFIG_READONLY, AT_FACTORY_CCF, AT_HOME_READONLY};
pub use icon::Icon;
pub use ircode::IrCode;
pub use panel::Panel;
pub use timer::Timer;
