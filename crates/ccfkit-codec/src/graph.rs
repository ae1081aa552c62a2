//! The decoded object graph.
//!
//! All records live in one arena and refer to each other by [`NodeId`].
//! Decode order follows pointer discovery, not topology, so parent links
//! are absent until the explicit tree-build pass assigns them. Cross
//! references (an action naming a target button) are non-owning ids
//! resolved through the session's offset cache, which guarantees one
//! arena entry per distinct file offset.

use crate::caps::Capabilities;
use crate::nodes::{
    Action, ActionList, Button, Child, Device, Frame, Header, Icon, IrCode, Panel, Timer,
};
use crate::schema::{Field, FieldDef, FieldValue, NodeType};

/// Index of a record in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One record plus its arena metadata.
#[derive(Debug)]
pub struct Slot {
    pub node: Node,
    /// Containment parent, assigned by the tree-build pass.
    pub parent: Option<NodeId>,
}

/// A typed CCF record.
#[derive(Debug)]
pub enum Node {
    Header(Header),
    Device(Device),
    Panel(Panel),
    Child(Child),
    Frame(Frame),
    Button(Button),
    ActionList(ActionList),
    Action(Action),
    IrCode(IrCode),
    Timer(Timer),
    Icon(Icon),
}

macro_rules! dispatch {
    ($self:expr, $node:pat => $body:expr) => {
        match $self {
            Node::Header($node) => $body,
            Node::Device($node) => $body,
            Node::Panel($node) => $body,
            Node::Child($node) => $body,
            Node::Frame($node) => $body,
            Node::Button($node) => $body,
            Node::ActionList($node) => $body,
            Node::Action($node) => $body,
            Node::IrCode($node) => $body,
            Node::Timer($node) => $body,
            Node::Icon($node) => $body,
        }
    };
}

impl Node {
    /// Construct an empty record of the given type, to be filled by the
    /// descriptor-table walk or by the editor.
    pub fn new(ty: NodeType) -> Self {
        match ty {
            NodeType::Header => Node::Header(Header::default()),
            NodeType::Device => Node::Device(Device::default()),
            NodeType::Panel => Node::Panel(Panel::default()),
            NodeType::Child => Node::Child(Child::default()),
            NodeType::Frame => Node::Frame(Frame::default()),
            NodeType::Button => Node::Button(Button::default()),
            NodeType::ActionList => Node::ActionList(ActionList::default()),
            NodeType::Action => Node::Action(Action::default()),
            NodeType::IrCode => Node::IrCode(IrCode::default()),
            NodeType::Timer => Node::Timer(Timer::default()),
            NodeType::Icon => Node::Icon(Icon::default()),
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Header(_) => NodeType::Header,
            Node::Device(_) => NodeType::Device,
            Node::Panel(_) => NodeType::Panel,
            Node::Child(_) => NodeType::Child,
            Node::Frame(_) => NodeType::Frame,
            Node::Button(_) => NodeType::Button,
            Node::ActionList(_) => NodeType::ActionList,
            Node::Action(_) => NodeType::Action,
            Node::IrCode(_) => NodeType::IrCode,
            Node::Timer(_) => NodeType::Timer,
            Node::Icon(_) => NodeType::Icon,
        }
    }

    /// The field table used to decode this record.
    pub fn decode_table(&self, caps: Capabilities) -> &'static [FieldDef] {
        dispatch!(self, n => n.decode_table(caps))
    }

    /// The field table used to measure and encode this record.
    pub fn encode_table(&self, caps: Capabilities) -> &'static [FieldDef] {
        dispatch!(self, n => n.encode_table(caps))
    }

    /// Read a logical field.
    pub fn get(&self, field: Field) -> FieldValue {
        dispatch!(self, n => n.get(field))
    }

    /// Write a logical field.
    pub fn put(&mut self, field: Field, value: FieldValue) {
        dispatch!(self, n => n.put(field, value))
    }

    pub fn as_header(&self) -> Option<&Header> {
        match self {
            Node::Header(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_device(&self) -> Option<&Device> {
        match self {
            Node::Device(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_panel(&self) -> Option<&Panel> {
        match self {
            Node::Panel(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_child(&self) -> Option<&Child> {
        match self {
            Node::Child(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_frame(&self) -> Option<&Frame> {
        match self {
            Node::Frame(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_button(&self) -> Option<&Button> {
        match self {
            Node::Button(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_action_list(&self) -> Option<&ActionList> {
        match self {
            Node::ActionList(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_action(&self) -> Option<&Action> {
        match self {
            Node::Action(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_ir_code(&self) -> Option<&IrCode> {
        match self {
            Node::IrCode(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_timer(&self) -> Option<&Timer> {
        match self {
            Node::Timer(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_icon(&self) -> Option<&Icon> {
        match self {
            Node::Icon(i) => Some(i),
            _ => None,
        }
    }

    /// Position/type context for log messages.
    pub fn describe(&self) -> String {
        dispatch!(self, n => n.describe())
    }
}

/// The arena of all records plus the header root.
#[derive(Debug)]
pub struct Graph {
    slots: Vec<Slot>,
    root: NodeId,
}

impl Graph {
    /// Create a graph holding only an empty header.
    pub fn new() -> Self {
        let mut graph = Graph { slots: Vec::new(), root: NodeId(0) };
        let root = graph.alloc(Node::Header(Header::default()));
        graph.root = root;
        graph
    }

    /// The header record id (always the first arena entry).
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of arena entries, including unreachable ones.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Add a record, returning its id.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Slot { node, parent: None });
        id
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.slots[id.index()].node
    }

    #[inline]
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.slots[id.index()].node
    }

    /// Swap a record out of the arena, leaving an empty record of the
    /// same type in its place. Used by the passes that need the record
    /// and the graph mutably at once; callers must restore it.
    pub(crate) fn take(&mut self, id: NodeId) -> Node {
        let ty = self.slots[id.index()].node.node_type();
        std::mem::replace(&mut self.slots[id.index()].node, Node::new(ty))
    }

    pub(crate) fn restore(&mut self, id: NodeId, node: Node) {
        self.slots[id.index()].node = node;
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.index()].parent
    }

    #[inline]
    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.slots[id.index()].parent = parent;
    }

    pub fn header(&self) -> &Header {
        match self.node(self.root) {
            Node::Header(h) => h,
            _ => unreachable!("graph root is not a header"),
        }
    }

    pub fn header_mut(&mut self) -> &mut Header {
        match self.node_mut(self.root) {
            Node::Header(h) => h,
            _ => unreachable!("graph root is not a header"),
        }
    }

    /// Capability view of the header word.
    pub fn caps(&self) -> Capabilities {
        Capabilities(self.header().capability)
    }

    /// Iterate over every arena id.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.slots.len() as u32).map(NodeId)
    }

    /// Walk parent links to the nearest enclosing device.
    pub fn parent_device(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if self.node(c).node_type() == NodeType::Device {
                return Some(c);
            }
            cur = self.parent(c);
        }
        None
    }

    /// Walk parent links to the nearest enclosing panel.
    pub fn parent_panel(&self, id: NodeId) -> Option<NodeId> {
        let mut cur = Some(id);
        while let Some(c) = cur {
            if self.node(c).node_type() == NodeType::Panel {
                return Some(c);
            }
            cur = self.parent(c);
        }
        None
    }

    /// A button is active iff its action list holds at least one action.
    pub fn button_is_active(&self, button: NodeId) -> bool {
        let Some(b) = self.node(button).as_button() else {
            return false;
        };
        b.actions
            .and_then(|l| self.node(l).as_action_list())
            .map(|l| !l.actions.is_empty())
            .unwrap_or(false)
    }

    /// The ids in a device linked list, starting at `first`. A corrupt
    /// chain that cycles back on itself is truncated at the repeat.
    pub fn device_chain(&self, first: Option<NodeId>) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = first;
        while let Some(id) = cur {
            if out.contains(&id) {
                break;
            }
            out.push(id);
            cur = self.node(id).as_device().and_then(|d| d.next);
        }
        out
    }

    /// The ids in a panel linked list, starting at `first`; cycles are
    /// truncated at the repeat.
    pub fn panel_chain(&self, first: Option<NodeId>) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = first;
        while let Some(id) = cur {
            if out.contains(&id) {
                break;
            }
            out.push(id);
            cur = self.node(id).as_panel().and_then(|p| p.next);
        }
        out
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
