//! Field descriptor tables.
//!
//! Every record type describes its binary layout as a static ordered list
//! of [`FieldDef`] entries. The decode and encode passes are generic over
//! these tables; the per-type structs only supply typed storage, accessors
//! keyed by [`Field`], and pre/post hooks. A type may expose several
//! alternate tables selected by the header capabilities.

use crate::graph::NodeId;

/// The closed set of record types in a CCF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Header,
    Device,
    Panel,
    Child,
    Frame,
    Button,
    ActionList,
    Action,
    IrCode,
    Timer,
    Icon,
}

impl NodeType {
    /// Short name for log messages.
    pub fn name(self) -> &'static str {
        match self {
            NodeType::Header => "header",
            NodeType::Device => "device",
            NodeType::Panel => "panel",
            NodeType::Child => "child",
            NodeType::Frame => "frame",
            NodeType::Button => "button",
            NodeType::ActionList => "action-list",
            NodeType::Action => "action",
            NodeType::IrCode => "ir-code",
            NodeType::Timer => "timer",
            NodeType::Icon => "icon",
        }
    }
}

/// Logical field tags, shared by all record types.
///
/// A tag only has meaning for the types whose tables reference it; the
/// generic passes never interpret tags beyond routing them to the typed
/// `get`/`put` accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    // header
    Version,
    Id1,
    Id2,
    Crc1Pos,
    Crc2Pos,
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Seconds,
    Capability,
    AttrPos,
    Attr,
    FirstHome,
    FirstDevice,
    FirstMacro,
    FirstTimer,
    MacroPanel,
    ChannelId,
    // shared containment / naming
    Next,
    Name,
    NamePos,
    FirstPanel,
    Children,
    Count1,
    Count2,
    // device
    IconUnselected,
    IconSelected,
    ActionSlot,
    KeyLt,
    KeyRt,
    KeyFarLt,
    KeyFarRt,
    KeyVolDn,
    KeyVolUp,
    KeyChanDn,
    KeyChanUp,
    KeyMute,
    KeyM,
    KeyReturn,
    KeyEx,
    ArrowUp,
    ArrowLt,
    ArrowRt,
    ArrowDn,
    KeyNameLt,
    KeyNameRt,
    KeyNameFarLt,
    KeyNameFarRt,
    RfExtender,
    // child
    X,
    Y,
    ChildPos,
    ChildKind,
    Payload,
    // frame / button
    Width,
    Height,
    Icon,
    FontSize,
    TextOpt,
    Colors,
    Actions,
    IdTag,
    IconIu,
    IconIs,
    IconAu,
    IconAs,
    ColorIu,
    ColorIs,
    ColorAu,
    ColorAs,
    // action
    ActionType,
    P1,
    P2,
    // ir code / icon
    Size,
    Data,
    IconType,
    // timer
    StartDays,
    StartTime,
    EndDays,
    EndTime,
    StartAction,
    EndAction,
    // reserved slots
    Reserve1,
    Reserve2,
    Reserve3,
    Reserve4,
    Reserve5,
}

/// How one field is read from and written to the byte stream.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Big-endian integer of 1..=4 bytes. `unsigned` selects zero
    /// extension instead of sign extension on decode.
    Int { width: u8, unsigned: bool },
    /// Fixed-length string of raw bytes, one character per byte.
    StrFixed(u8),
    /// 4-byte offset to a length-prefixed string, interned by offset.
    StrPtr,
    /// 4-byte offset to another record; 0 is null. Resolution is deferred
    /// to a worklist drained after the main pass.
    NodePtr(NodeType),
    /// 4-byte offset to a record whose type is determined by a sibling
    /// field rather than the table (child payloads).
    PtrRaw,
    /// Record decoded in place, no indirection.
    NodeEmbed(NodeType),
    /// Counted array of in-place records; the count is taken from an
    /// already-decoded sibling field.
    NodeArray { ty: NodeType, count: Field },
    /// Raw byte blob whose length is a sibling field value plus a fixed
    /// variance.
    Blob { len: Field, variance: i32 },
    /// Zero-width marker: the string participates in reachability and
    /// interning but its bytes are written out-of-line (panel names).
    StrRef,
}

/// One table entry: wire representation plus the logical field it fills.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub kind: FieldKind,
    pub field: Field,
}

impl FieldDef {
    /// The fixed wire width of this entry, if it has one.
    pub fn fixed_width(&self) -> Option<usize> {
        match self.kind {
            FieldKind::Int { width, .. } => Some(width as usize),
            FieldKind::StrFixed(n) => Some(n as usize),
            FieldKind::StrPtr | FieldKind::NodePtr(_) | FieldKind::PtrRaw => Some(4),
            FieldKind::StrRef => Some(0),
            FieldKind::NodeEmbed(_) | FieldKind::NodeArray { .. } | FieldKind::Blob { .. } => None,
        }
    }
}

// Table construction helpers, const so tables can be statics.

pub const fn int(width: u8, field: Field) -> FieldDef {
    FieldDef { kind: FieldKind::Int { width, unsigned: false }, field }
}

pub const fn uint(width: u8, field: Field) -> FieldDef {
    FieldDef { kind: FieldKind::Int { width, unsigned: true }, field }
}

pub const fn strf(len: u8, field: Field) -> FieldDef {
    FieldDef { kind: FieldKind::StrFixed(len), field }
}

pub const fn sptr(field: Field) -> FieldDef {
    FieldDef { kind: FieldKind::StrPtr, field }
}

pub const fn nptr(ty: NodeType, field: Field) -> FieldDef {
    FieldDef { kind: FieldKind::NodePtr(ty), field }
}

pub const fn ptr_raw(field: Field) -> FieldDef {
    FieldDef { kind: FieldKind::PtrRaw, field }
}

pub const fn embed(ty: NodeType, field: Field) -> FieldDef {
    FieldDef { kind: FieldKind::NodeEmbed(ty), field }
}

pub const fn narr(ty: NodeType, count: Field, field: Field) -> FieldDef {
    FieldDef { kind: FieldKind::NodeArray { ty, count }, field }
}

pub const fn blob(len: Field, variance: i32, field: Field) -> FieldDef {
    FieldDef { kind: FieldKind::Blob { len, variance }, field }
}

pub const fn sref(field: Field) -> FieldDef {
    FieldDef { kind: FieldKind::StrRef, field }
}

/// A value moving between the byte stream and a typed record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Str(Option<String>),
    Node(Option<NodeId>),
    Nodes(Vec<NodeId>),
    Blob(Vec<u8>),
}

impl FieldValue {
    pub fn as_int(&self) -> i64 {
        match self {
            FieldValue::Int(v) => *v,
            _ => 0,
        }
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            FieldValue::Node(id) => *id,
            _ => None,
        }
    }

    pub fn into_str(self) -> Option<String> {
        match self {
            FieldValue::Str(s) => s,
            _ => None,
        }
    }

    pub fn into_nodes(self) -> Vec<NodeId> {
        match self {
            FieldValue::Nodes(ids) => ids,
            _ => Vec::new(),
        }
    }

    pub fn into_blob(self) -> Vec<u8> {
        match self {
            FieldValue::Blob(b) => b,
            _ => Vec::new(),
        }
    }
}
