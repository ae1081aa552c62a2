//! The encode session.
//!
//! Re-linearizing a mutated graph runs in two passes over an ordered
//! list of reachable records: a placement pass that groups records by
//! type and assigns cumulative file offsets, then a write pass that
//! serializes each record at its assigned offset through the same field
//! tables used for decode. Before placement, actions whose targets are
//! no longer reachable from the header are culled, Marantz jump
//! discriminants are rewritten, and IR codes are normalized to the
//! header's UDB capability (their record length depends on it). The
//! image ends with a CRC-16 over everything before the checksum field.

use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use ccfkit_common::{crc, BinaryWriter};

use crate::caps::Capabilities;
use crate::error::Result;
use crate::graph::{Graph, Node, NodeId};
use crate::nodes::ActionKind;
use crate::progress::ProgressSink;
use crate::schema::{FieldKind, NodeType};
use crate::tree;

/// Placement priority: records are grouped by type in this order, with
/// the interned strings placed between icons and IR codes.
const GROUPS: &[NodeType] = &[
    NodeType::IrCode,
    NodeType::ActionList,
    NodeType::Button,
    NodeType::Frame,
    NodeType::Panel,
    NodeType::Device,
    NodeType::Timer,
];

/// Encode a graph into a CCF image.
pub fn encode(graph: &mut Graph, mut sink: Option<&mut dyn ProgressSink>) -> Result<Vec<u8>> {
    if let Some(s) = sink.as_deref_mut() {
        s.on_message("encoding configuration");
        s.on_percent(0);
    }

    tree::build(graph);
    let caps = graph.caps();

    prepare(graph, caps);
    let reach = collect(graph, caps);
    normalize_ir_codes(graph, caps, &reach);
    cull_actions(graph, &reach);
    if caps.is_new_marantz() {
        rewrite_marantz_jumps(graph, &reach);
    }
    // culling can orphan records, so placement works from a fresh sweep
    let reach = collect(graph, caps);

    let ordered = order(graph, &reach);

    // placement pass
    let mut positions = vec![0u32; graph.len()];
    let mut string_pos: FxHashMap<String, u32> = FxHashMap::default();
    let mut end = 0u32;
    for item in &ordered {
        match item {
            Item::Node(id) => {
                positions[id.index()] = end;
                end += measure(graph, caps, *id) as u32;
            }
            Item::Str(i) => {
                let s = &reach.strings[*i];
                string_pos.insert(s.clone(), end);
                end += s.chars().count() as u32 + 1;
            }
        }
    }
    end += end % 2;
    {
        let header = graph.header_mut();
        header.crc1_pos = end;
        header.crc2_pos = end;
    }

    // write pass
    let mut ctx = WriteCtx {
        graph,
        caps,
        positions: &positions,
        string_pos: &string_pos,
        writer: BinaryWriter::new(),
    };
    let total = ordered.len().max(1);
    let mut last_pct = 0u8;
    for (i, item) in ordered.iter().enumerate() {
        match item {
            Item::Node(id) => {
                ctx.writer.seek(positions[id.index()] as usize);
                ctx.write_in_place(*id);
            }
            Item::Str(s) => {
                let s = &reach.strings[*s];
                ctx.writer.seek(string_pos[s] as usize);
                ctx.writer.write_latin1_prefixed(s);
            }
        }
        let pct = (i * 100 / total) as u8;
        if pct != last_pct {
            last_pct = pct;
            if let Some(s) = sink.as_deref_mut() {
                s.on_percent(pct);
            }
        }
    }

    // checksum trailer
    let crc_pos = end as usize;
    ctx.writer.pad_to(crc_pos);
    let checksum = crc::checksum(&ctx.writer.as_bytes()[..crc_pos]);
    ctx.writer.seek(crc_pos);
    ctx.writer.write_u16(checksum);

    if let Some(s) = sink.as_deref_mut() {
        s.on_percent(100);
    }
    Ok(ctx.writer.into_bytes())
}

/// Serialized length of a record, embedded children included.
pub(crate) fn measure(graph: &Graph, caps: Capabilities, id: NodeId) -> usize {
    let node = graph.node(id);
    let mut len = 0;
    for def in node.encode_table(caps) {
        if let Some(width) = def.fixed_width() {
            len += width;
            continue;
        }
        match def.kind {
            FieldKind::NodeEmbed(_) => {
                if let Some(child) = node.get(def.field).as_node() {
                    len += measure(graph, caps, child);
                }
            }
            FieldKind::NodeArray { .. } => {
                for child in node.get(def.field).into_nodes() {
                    len += measure(graph, caps, child);
                }
            }
            FieldKind::Blob { .. } => {
                len += node.get(def.field).into_blob().len();
            }
            _ => {}
        }
    }
    len
}

/// Graph fixes that must land before reachability is computed: the
/// macro template chain only persists in custom mode, and timers must
/// carry both embedded action slots.
fn prepare(graph: &mut Graph, caps: Capabilities) {
    if !caps.is_custom() {
        if let Some(mp) = graph.header().macro_panel {
            if let Node::Panel(panel) = graph.node_mut(mp) {
                panel.next = None;
            }
        }
    }
    let ids: Vec<NodeId> = graph.ids().collect();
    for id in ids {
        if graph.node(id).node_type() != NodeType::Timer {
            continue;
        }
        let (need_start, need_end) = match graph.node(id).as_timer() {
            Some(t) => (t.start_action.is_none(), t.end_action.is_none()),
            None => continue,
        };
        if need_start {
            let a = graph.alloc(Node::new(NodeType::Action));
            if let Node::Timer(t) = graph.node_mut(id) {
                t.start_action = Some(a);
            }
        }
        if need_end {
            let a = graph.alloc(Node::new(NodeType::Action));
            if let Node::Timer(t) = graph.node_mut(id) {
                t.end_action = Some(a);
            }
        }
    }
}

/// The set of records and strings reachable from the header.
pub(crate) struct Reach {
    in_set: Vec<bool>,
    /// Reachable records eligible for top-level placement (embedded
    /// actions and child slots are serialized inside their parents).
    nodes: Vec<NodeId>,
    strings: Vec<String>,
    string_set: FxHashSet<String>,
}

impl Reach {
    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.in_set[id.index()]
    }

    fn add_string(&mut self, s: String) {
        if self.string_set.insert(s.clone()) {
            self.strings.push(s);
        }
    }
}

/// Sweep the graph from the header, following the encode tables.
///
/// Actions deliberately contribute only their IR-code or timer target:
/// a jump or alias action must not resurrect a panel, button, or device
/// the editor has deleted.
pub(crate) fn collect(graph: &Graph, caps: Capabilities) -> Reach {
    let mut reach = Reach {
        in_set: vec![false; graph.len()],
        nodes: Vec::new(),
        strings: Vec::new(),
        string_set: FxHashSet::default(),
    };
    visit(graph, caps, graph.root(), &mut reach);
    reach
}

fn visit(graph: &Graph, caps: Capabilities, id: NodeId, reach: &mut Reach) {
    if reach.in_set[id.index()] {
        return;
    }
    reach.in_set[id.index()] = true;

    let node = graph.node(id);
    let ty = node.node_type();
    if !matches!(ty, NodeType::Action | NodeType::Child) {
        reach.nodes.push(id);
    }

    if let Some(action) = node.as_action() {
        if let Some(target) = action.ref2 {
            let target_ty = graph.node(target).node_type();
            if matches!(target_ty, NodeType::IrCode | NodeType::Timer) {
                visit(graph, caps, target, reach);
            }
        }
        return;
    }

    for def in node.encode_table(caps) {
        match def.kind {
            FieldKind::StrPtr | FieldKind::StrRef => {
                if let Some(s) = node.get(def.field).into_str() {
                    reach.add_string(s);
                }
            }
            FieldKind::NodePtr(_) | FieldKind::PtrRaw | FieldKind::NodeEmbed(_) => {
                if let Some(child) = node.get(def.field).as_node() {
                    visit(graph, caps, child, reach);
                }
            }
            FieldKind::NodeArray { .. } => {
                for child in node.get(def.field).into_nodes() {
                    visit(graph, caps, child, reach);
                }
            }
            _ => {}
        }
    }
}

/// IR code record length depends on the header's UDB capability, so
/// every reachable code is converted before offsets are assigned.
fn normalize_ir_codes(graph: &mut Graph, caps: Capabilities, reach: &Reach) {
    let udb = caps.has_udb();
    let ids: Vec<NodeId> = reach
        .nodes
        .iter()
        .copied()
        .filter(|&id| graph.node(id).node_type() == NodeType::IrCode)
        .collect();
    for id in ids {
        if let Node::IrCode(code) = graph.node_mut(id) {
            code.set_udb(udb);
        }
    }
}

/// Drop invalid actions and actions whose targets fell out of the tree,
/// compacting each list while preserving relative order.
fn cull_actions(graph: &mut Graph, reach: &Reach) {
    let lists: Vec<NodeId> = reach
        .nodes
        .iter()
        .copied()
        .filter(|&id| graph.node(id).node_type() == NodeType::ActionList)
        .collect();
    for list_id in lists {
        let kept: Vec<NodeId> = {
            let Some(list) = graph.node(list_id).as_action_list() else {
                continue;
            };
            list.actions
                .iter()
                .copied()
                .filter(|&aid| action_survives(graph, reach, aid))
                .collect()
        };
        let list = match graph.node_mut(list_id) {
            Node::ActionList(l) => l,
            _ => continue,
        };
        if kept.len() != list.actions.len() {
            debug!(
                "culling {} of {} actions from list {list_id}",
                list.actions.len() - kept.len(),
                list.actions.len()
            );
            list.set_actions(kept);
        }
    }
}

fn action_survives(graph: &Graph, reach: &Reach, aid: NodeId) -> bool {
    let Some(action) = graph.node(aid).as_action() else {
        return false;
    };
    if !action.is_valid() {
        return false;
    }
    let alive = |r: Option<NodeId>| r.map(|id| reach.contains(id)).unwrap_or(false);
    match action.kind {
        ActionKind::AliasButton => alive(action.ref1) && alive(action.ref2),
        ActionKind::JumpPanel | ActionKind::MarantzJump => {
            action.is_special_jump() || (alive(action.ref1) && alive(action.ref2))
        }
        ActionKind::AliasKey | ActionKind::AliasDevice => alive(action.ref1),
        _ => true,
    }
}

/// Positional rewrite of jump discriminants on the newer Marantz
/// family: scanning from the tail of each list, a jump in the final
/// position keeps the plain discriminant and every other jump becomes
/// the Marantz variant. The firmware reads position out of the
/// discriminants this way.
fn rewrite_marantz_jumps(graph: &mut Graph, reach: &Reach) {
    let lists: Vec<NodeId> = reach
        .nodes
        .iter()
        .copied()
        .filter(|&id| graph.node(id).node_type() == NodeType::ActionList)
        .collect();
    for list_id in lists {
        let actions = match graph.node(list_id).as_action_list() {
            Some(l) => l.actions.clone(),
            None => continue,
        };
        let mut next_kind = ActionKind::JumpPanel;
        for &aid in actions.iter().rev() {
            let is_jump = graph.node(aid).as_action().map(|a| a.is_jump()).unwrap_or(false);
            if is_jump {
                if let Node::Action(a) = graph.node_mut(aid) {
                    a.kind = next_kind;
                }
            }
            next_kind = ActionKind::MarantzJump;
        }
    }
}

enum Item {
    Node(NodeId),
    Str(usize),
}

/// Build the ordered placement list: header, icons, strings, then the
/// remaining groups in fixed priority order.
fn order(graph: &Graph, reach: &Reach) -> Vec<Item> {
    let root = graph.root();
    let mut ordered = vec![Item::Node(root)];
    for &id in &reach.nodes {
        if id != root && graph.node(id).node_type() == NodeType::Icon {
            ordered.push(Item::Node(id));
        }
    }
    for i in 0..reach.strings.len() {
        ordered.push(Item::Str(i));
    }
    for &ty in GROUPS {
        for &id in &reach.nodes {
            if id != root && graph.node(id).node_type() == ty {
                ordered.push(Item::Node(id));
            }
        }
    }
    ordered
}

struct WriteCtx<'g> {
    graph: &'g mut Graph,
    caps: Capabilities,
    positions: &'g [u32],
    string_pos: &'g FxHashMap<String, u32>,
    writer: BinaryWriter,
}

impl WriteCtx<'_> {
    /// Serialize one record at the current writer position, embedded
    /// children inline.
    fn write_in_place(&mut self, id: NodeId) {
        let mut node = self.graph.take(id);
        self.pre_encode(&mut node);
        for def in node.encode_table(self.caps) {
            match def.kind {
                FieldKind::Int { width, .. } => {
                    self.writer
                        .write_uint(node.get(def.field).as_int() as u32, width as usize);
                }
                FieldKind::StrFixed(len) => {
                    let s = node.get(def.field).into_str().unwrap_or_default();
                    let len = len as usize;
                    let mut written = 0;
                    for c in s.chars().take(len) {
                        self.writer.write_u8(c as u32 as u8);
                        written += 1;
                    }
                    for _ in written..len {
                        self.writer.write_u8(0);
                    }
                }
                FieldKind::StrPtr => {
                    let pos = node
                        .get(def.field)
                        .into_str()
                        .and_then(|s| self.string_pos.get(&s).copied())
                        .unwrap_or(0);
                    self.writer.write_u32(pos);
                }
                FieldKind::NodePtr(_) | FieldKind::PtrRaw => {
                    let pos = node
                        .get(def.field)
                        .as_node()
                        .map(|c| self.positions[c.index()])
                        .unwrap_or(0);
                    self.writer.write_u32(pos);
                }
                FieldKind::NodeEmbed(_) => match node.get(def.field).as_node() {
                    Some(child) => self.write_in_place(child),
                    None => warn!("missing embedded record in {}", node.describe()),
                },
                FieldKind::NodeArray { .. } => {
                    for child in node.get(def.field).into_nodes() {
                        self.write_in_place(child);
                    }
                }
                FieldKind::Blob { .. } => {
                    self.writer.write_bytes(&node.get(def.field).into_blob());
                }
                FieldKind::StrRef => {}
            }
        }
        self.graph.restore(id, node);
    }

    fn pre_encode(&mut self, node: &mut Node) {
        match node {
            Node::Device(device) => {
                device.reserve_1 = 0;
                device.reserve_2 = 0;
                device.reserve_3 = 0;
            }
            Node::Panel(panel) => {
                let mut pos = panel
                    .name
                    .as_ref()
                    .and_then(|s| self.string_pos.get(s).copied())
                    .unwrap_or(0);
                if panel.hidden {
                    pos |= crate::nodes::panel::NAME_HIDDEN;
                }
                panel.name_pos = pos;
            }
            Node::Button(button) => {
                // the state icon's size wins over the stored one
                let active = button
                    .actions
                    .and_then(|l| self.graph.node(l).as_action_list())
                    .map(|l| !l.actions.is_empty())
                    .unwrap_or(false);
                if let Some(icon_id) = button.size_icon(active) {
                    if let Some(icon) = self.graph.node(icon_id).as_icon() {
                        button.width = icon.width;
                        button.height = icon.height;
                    }
                }
            }
            Node::Action(action) => {
                if let Some(r1) = action.ref1 {
                    action.p1 = self.positions[r1.index()];
                }
                if let Some(r2) = action.ref2 {
                    action.p2 = self.positions[r2.index()];
                }
                self.fix_device_pointer(action);
            }
            _ => {}
        }
    }

    /// After a cross-device copy, the stored device of an alias-button
    /// or jump action can disagree with the target's actual owner;
    /// re-point it at the target's true parent device.
    fn fix_device_pointer(&self, action: &mut crate::nodes::Action) {
        if action.kind == ActionKind::JumpPanel && action.is_special_jump() {
            return;
        }
        if !matches!(action.kind, ActionKind::AliasButton | ActionKind::JumpPanel) {
            return;
        }
        let Some(target) = action.ref2 else {
            warn!("jump target missing in {}", action.describe());
            return;
        };
        match self.graph.parent_device(target) {
            None => warn!("target of {} has no parent device", action.describe()),
            Some(owner) if action.ref1 != Some(owner) => {
                debug!("relinking device pointer in {}", action.describe());
                action.ref1 = Some(owner);
                action.p1 = self.positions[owner.index()];
            }
            _ => {}
        }
    }
}
