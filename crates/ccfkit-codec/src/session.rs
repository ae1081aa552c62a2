//! The decode session.
//!
//! One session drives one decode pass: it owns the byte store, the
//! offset-keyed pointer cache, the string pool, and the deferred
//! pointer-resolution worklist. Records are filled by walking their
//! field tables; pointer fields push worklist entries instead of
//! resolving immediately, because the target may not have been visited
//! yet and may itself point back (device lists form cycles). Draining
//! the worklist after the main pass resolves forward references without
//! any dependence on recursion order.

use log::{debug, warn};
use rustc_hash::FxHashMap;

use ccfkit_common::BinaryReader;

use crate::caps::Capabilities;
use crate::encode::measure;
use crate::error::{Error, Result};
use crate::graph::{Graph, Node, NodeId};
use crate::nodes::{ActionKind, HeaderLayout};
use crate::progress::ProgressSink;
use crate::schema::{Field, FieldKind, FieldValue, NodeType};
use crate::tree;

/// Magic word of the optional compressed outer container.
pub const CONTAINER_MAGIC: u32 = 0x4d4c_5a4f;
/// Offset of the magic word within the container.
pub const CONTAINER_MAGIC_OFFSET: usize = 8;

/// External decompressor for the outer container. Invoked once on the
/// whole buffer when the magic is present; returns the inflated image.
pub type InflateFn<'a> = &'a dyn Fn(&[u8]) -> std::io::Result<Vec<u8>>;

/// Decode a CCF image into a graph.
pub fn decode(bytes: &[u8]) -> Result<Graph> {
    decode_with(bytes.to_vec(), None, None)
}

/// Decode with optional progress reporting and container inflater.
pub fn decode_with(
    bytes: Vec<u8>,
    sink: Option<&mut dyn ProgressSink>,
    inflate: Option<InflateFn>,
) -> Result<Graph> {
    let bytes = inflate_container(bytes, inflate)?;
    let mut session = DecodeSession::new(bytes, sink);
    session.notify("decoding configuration");
    session.sniff_header()?;
    session.decode_root()?;
    session.drain_deferred();
    let mut graph = session.finish();
    tree::build(&mut graph);
    Ok(graph)
}

/// Replace a compressed container with its inflated payload. The codec
/// only detects the magic; block decompression itself is the external
/// collaborator's job.
fn inflate_container(bytes: Vec<u8>, inflate: Option<InflateFn>) -> Result<Vec<u8>> {
    if bytes.len() >= CONTAINER_MAGIC_OFFSET + 4 {
        let reader = BinaryReader::new(&bytes);
        if reader.peek_u32_at(CONTAINER_MAGIC_OFFSET)? == CONTAINER_MAGIC {
            debug!("detected compressed configuration container");
            let inflate = inflate.ok_or(Error::CompressedInput)?;
            return inflate(&bytes).map_err(|e| Error::Inflate(e.to_string()));
        }
    }
    Ok(bytes)
}

struct Deferred {
    owner: NodeId,
    field: Field,
    pos: u32,
    ty: NodeType,
}

struct DecodeSession<'a> {
    data: Vec<u8>,
    pos: usize,
    graph: Graph,
    cache: FxHashMap<u32, NodeId>,
    strings: FxHashMap<u32, String>,
    deferred: Vec<Deferred>,
    caps: Capabilities,
    attr_pos: u32,
    consumed: u64,
    last_pct: i16,
    sink: Option<&'a mut dyn ProgressSink>,
}

impl<'a> DecodeSession<'a> {
    fn new(data: Vec<u8>, sink: Option<&'a mut dyn ProgressSink>) -> Self {
        DecodeSession {
            data,
            pos: 0,
            graph: Graph::new(),
            cache: FxHashMap::default(),
            strings: FxHashMap::default(),
            deferred: Vec::new(),
            caps: Capabilities::default(),
            attr_pos: 0,
            consumed: 0,
            last_pct: -1,
            sink,
        }
    }

    fn finish(mut self) -> Graph {
        self.set_pct(100);
        self.graph
    }

    // ---- progress ----

    fn notify(&mut self, message: &str) {
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.on_message(message);
        }
    }

    fn set_pct(&mut self, pct: u8) {
        if i16::from(pct) != self.last_pct {
            if let Some(sink) = self.sink.as_deref_mut() {
                sink.on_percent(pct);
            }
            self.last_pct = i16::from(pct);
        }
    }

    fn bump_meter(&mut self, delta: usize) {
        self.consumed += delta as u64;
        if !self.data.is_empty() {
            let pct = (self.consumed * 100 / self.data.len() as u64).min(100) as u8;
            self.set_pct(pct);
        }
    }

    // ---- cursor ----

    fn reader(&self) -> BinaryReader<'_> {
        let mut r = BinaryReader::new(&self.data);
        r.seek(self.pos);
        r
    }

    fn read_number(&mut self, width: usize, unsigned: bool) -> Result<i64> {
        let mut r = self.reader();
        let value = if unsigned {
            i64::from(r.read_uint(width)?)
        } else {
            i64::from(r.read_int(width)?)
        };
        self.pos = r.position();
        Ok(value)
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut r = self.reader();
        let value = r.read_u32()?;
        self.pos = r.position();
        Ok(value)
    }

    fn read_latin1(&mut self, len: usize) -> Result<String> {
        let mut r = self.reader();
        let value = r.read_latin1(len)?;
        self.pos = r.position();
        Ok(value)
    }

    fn read_blob(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut r = self.reader();
        let value = r.read_bytes(len)?.to_vec();
        self.pos = r.position();
        Ok(value)
    }

    // ---- header pre-decode ----

    /// Peek the capability word and attribute position without moving
    /// the cursor, and select the header layout for the session. An
    /// attribute position that contradicts the claimed timers layout
    /// falls back to the no-timers layout of the same color depth.
    fn sniff_header(&mut self) -> Result<()> {
        if self.data.len() < 48 {
            return Err(Error::HeaderTruncated(self.data.len()));
        }
        let reader = BinaryReader::new(&self.data);
        let capability = reader.peek_u32_at(crate::nodes::header::CAPABILITY_OFFSET)?;
        let attr_pos = reader.peek_u32_at(crate::nodes::header::CAPABILITY_OFFSET + 8)?;
        self.caps = Capabilities(capability);
        self.attr_pos = attr_pos;
        let (layout, fallback) = HeaderLayout::detect(self.caps, attr_pos);
        if fallback {
            warn!("header claims timers but attribute position is {attr_pos}; using the no-timers layout");
        }
        self.graph.header_mut().layout = layout;
        debug!(
            "capability {capability:#010x}: color={} timers={} udb={} marantz={} custom={}",
            self.caps.has_color(),
            self.caps.has_timers(),
            self.caps.has_udb(),
            self.caps.is_marantz(),
            self.caps.is_custom()
        );
        Ok(())
    }

    fn decode_root(&mut self) -> Result<()> {
        let root = self.graph.root();
        self.cache.insert(0, root);
        self.pos = 0;
        let node = self.read_node(root)?;
        self.graph.restore(root, node);
        Ok(())
    }

    // ---- node decode ----

    /// Decode a record of `ty` at the current cursor. A cache hit means
    /// this offset was already decoded through another path; the cursor
    /// skips over the record instead of re-decoding it.
    fn decode_here(&mut self, ty: NodeType) -> Result<NodeId> {
        let pos = self.pos as u32;
        if let Some(&id) = self.cache.get(&pos) {
            debug!("skipping already decoded {} at {pos:#x}", ty.name());
            self.pos += measure(&self.graph, self.caps, id);
            return Ok(id);
        }
        let id = self.graph.alloc(Node::new(ty));
        self.cache.insert(pos, id);
        let node = self.read_node(id)?;
        self.graph.restore(id, node);
        Ok(id)
    }

    /// Walk the decode table of a record, filling its fields from the
    /// stream, then run its post hook. The record is swapped out of the
    /// arena for the duration so recursive decodes can borrow the graph;
    /// a concurrent cache hit only needs the id.
    fn read_node(&mut self, id: NodeId) -> Result<Node> {
        let mut node = self.graph.take(id);
        let start = self.pos;
        let table = node.decode_table(self.caps);
        for def in table {
            match def.kind {
                FieldKind::Int { width, unsigned } => {
                    let value = self.read_number(width as usize, unsigned)?;
                    node.put(def.field, FieldValue::Int(value));
                }
                FieldKind::StrFixed(len) => {
                    let value = self.read_latin1(len as usize)?;
                    node.put(def.field, FieldValue::Str(Some(value)));
                }
                FieldKind::StrPtr => {
                    let pos = self.read_u32()?;
                    let value = self.intern_at(pos);
                    node.put(def.field, FieldValue::Str(value));
                }
                FieldKind::NodePtr(target_ty) => {
                    let pos = self.read_u32()?;
                    if pos > 0 {
                        self.deferred.push(Deferred {
                            owner: id,
                            field: def.field,
                            pos,
                            ty: target_ty,
                        });
                    }
                    node.put(def.field, FieldValue::Node(None));
                }
                FieldKind::PtrRaw => {
                    let pos = self.read_u32()?;
                    node.put(def.field, FieldValue::Int(i64::from(pos)));
                }
                FieldKind::NodeEmbed(embed_ty) => {
                    let child = self.decode_here(embed_ty)?;
                    node.put(def.field, FieldValue::Node(Some(child)));
                }
                FieldKind::NodeArray { ty: elem_ty, count } => {
                    let n = node.get(count).as_int().max(0) as usize;
                    let mut ids = Vec::with_capacity(n);
                    for _ in 0..n {
                        ids.push(self.decode_here(elem_ty)?);
                    }
                    node.put(def.field, FieldValue::Nodes(ids));
                }
                FieldKind::Blob { len, variance } => {
                    let n = (node.get(len).as_int() + i64::from(variance)).max(0) as usize;
                    let bytes = self.read_blob(n)?;
                    node.put(def.field, FieldValue::Blob(bytes));
                }
                FieldKind::StrRef => {}
            }
        }
        self.bump_meter(self.pos - start);
        self.post_decode(&mut node);
        Ok(node)
    }

    // ---- pointer resolution ----

    /// Resolve an offset to a record of the expected type, jump-decoding
    /// it if this is the first visit. Any failure logs and yields `None`;
    /// the owning record stays walkable.
    fn item_at(&mut self, pos: u32, ty: NodeType) -> Option<NodeId> {
        if pos == 0 || pos as usize >= self.data.len() {
            warn!("invalid pointer {pos:#x} to {}", ty.name());
            return None;
        }
        if let Some(&id) = self.cache.get(&pos) {
            let found = self.graph.node(id).node_type();
            if found != ty {
                warn!(
                    "pointer {pos:#x} expected {} but found {}",
                    ty.name(),
                    found.name()
                );
                return None;
            }
            return Some(id);
        }
        if pos < self.attr_pos {
            warn!("pointer {pos:#x} to {} inside header rejected", ty.name());
            return None;
        }
        let save = self.pos;
        self.pos = pos as usize;
        let result = self.decode_here(ty);
        self.pos = save;
        match result {
            Ok(id) => Some(id),
            Err(err) => {
                warn!("dropping {} at {pos:#x}: {err}", ty.name());
                self.cache.remove(&pos);
                None
            }
        }
    }

    fn drain_deferred(&mut self) {
        while let Some(entry) = self.deferred.pop() {
            let resolved = self.item_at(entry.pos, entry.ty);
            if resolved.is_none() {
                debug!(
                    "unresolved {} pointer {:#x} in {}",
                    entry.ty.name(),
                    entry.pos,
                    self.graph.node(entry.owner).describe()
                );
            }
            self.graph
                .node_mut(entry.owner)
                .put(entry.field, FieldValue::Node(resolved));
        }
    }

    // ---- string pool ----

    /// Resolve a string offset through the pool, jump-decoding the
    /// length-prefixed bytes on first visit. Offset 0 is null.
    fn intern_at(&mut self, pos: u32) -> Option<String> {
        if pos == 0 {
            return None;
        }
        if let Some(s) = self.strings.get(&pos) {
            return Some(s.clone());
        }
        if pos as usize >= self.data.len() {
            warn!("string pointer {pos:#x} outside file bounds");
            return None;
        }
        let save = self.pos;
        self.pos = pos as usize;
        let mut r = self.reader();
        let result = r.read_latin1_prefixed();
        self.pos = save;
        match result {
            Ok(s) => {
                self.strings.insert(pos, s.clone());
                Some(s)
            }
            Err(err) => {
                warn!("bad string at {pos:#x}: {err}");
                None
            }
        }
    }

    // ---- post hooks ----

    fn post_decode(&mut self, node: &mut Node) {
        match node.node_type() {
            NodeType::Header => self.post_decode_header(node),
            NodeType::Panel => self.post_decode_panel(node),
            NodeType::Child => self.post_decode_child(node),
            NodeType::Action => self.post_decode_action(node),
            NodeType::ActionList => post_decode_action_list(node),
            NodeType::IrCode => self.post_decode_ir_code(node),
            _ => {}
        }
    }

    fn post_decode_header(&mut self, node: &mut Node) {
        let Node::Header(header) = node else { return };
        if header.crc1_pos != header.crc2_pos {
            warn!(
                "checksum position mismatch {:#x} != {:#x}",
                header.crc1_pos, header.crc2_pos
            );
        }
        if header.macro_panel.is_none() {
            // a deferred pointer may still assign the real one later
            let panel = self.graph.alloc(Node::Panel(crate::nodes::Panel::named("macro")));
            header.macro_panel = Some(panel);
        }
        header.set_capability(header.capability);
        self.caps = header.caps();
    }

    fn post_decode_panel(&mut self, node: &mut Node) {
        let Node::Panel(panel) = node else { return };
        if panel.count1 != panel.count2 {
            let min = panel.count1.min(panel.count2).min(10);
            warn!(
                "panel child count mismatch {} != {}, clamping to {min}",
                panel.count1, panel.count2
            );
            panel.count1 = min;
            panel.count2 = min;
            panel.children.truncate(min as usize);
        }
        panel.hidden = panel.name_pos & crate::nodes::panel::NAME_HIDDEN != 0;
        let name_pos = panel.name_pos & crate::nodes::panel::NAME_MASK;
        panel.name = self.intern_at(name_pos);
        if panel.name.is_none() && name_pos != 0 {
            warn!("panel name at {name_pos:#x} unreadable");
        }
    }

    fn post_decode_child(&mut self, node: &mut Node) {
        let Node::Child(child) = node else { return };
        if child.child_pos > 0 {
            child.payload = self.item_at(child.child_pos, child.kind.node_type());
        }
        if child.payload.is_none() {
            // substitute an empty widget so the tree stays walkable
            warn!("missing payload for {}", child.describe());
            let substitute = self.graph.alloc(Node::new(child.kind.node_type()));
            child.payload = Some(substitute);
        }
    }

    fn post_decode_action(&mut self, node: &mut Node) {
        // resolve targets immediately: actions are embedded, so by the
        // time one decodes, its pointers refer either to cached records
        // or to records safely reachable by a jump
        let Node::Action(action) = node else { return };
        match action.kind {
            ActionKind::Dummy => {}
            ActionKind::Delay | ActionKind::Beep => {
                action.p1 = 0;
            }
            ActionKind::IrCode => {
                action.p1 = 0;
                action.ref2 = self.item_at(action.p2, NodeType::IrCode);
                action.invalid = action.ref2.is_none();
            }
            ActionKind::AliasButton => {
                action.ref1 = self.item_at(action.p1, NodeType::Device);
                action.ref2 = self.item_at(action.p2, NodeType::Button);
                action.invalid = action.ref1.is_none() || action.ref2.is_none();
            }
            ActionKind::JumpPanel | ActionKind::MarantzJump => {
                if !action.is_special_jump() {
                    action.ref1 = self.item_at(action.p1, NodeType::Device);
                    action.ref2 = self.item_at(action.p2, NodeType::Panel);
                    action.invalid = action.ref1.is_none() || action.ref2.is_none();
                }
            }
            ActionKind::AliasKey | ActionKind::AliasDevice => {
                action.ref1 = self.item_at(action.p1, NodeType::Device);
                action.invalid = action.ref1.is_none();
            }
            ActionKind::Timer => {
                action.p1 = 0;
                action.ref2 = self.item_at(action.p2, NodeType::Timer);
                action.invalid = action.ref2.is_none();
            }
        }
        if action.invalid {
            warn!("invalid {}", action.describe());
        }
    }

    fn post_decode_ir_code(&mut self, node: &mut Node) {
        let Node::IrCode(code) = node else { return };
        code.has_udb = self.caps.has_udb();
        if code.name.is_none() {
            code.name = Some("IR Code".to_string());
        }
    }
}

fn post_decode_action_list(node: &mut Node) {
    let Node::ActionList(list) = node else { return };
    if list.count1 != list.count2 {
        let min = list.count1.min(list.count2).min(10);
        warn!(
            "action count mismatch {} != {}, clamping to {min}",
            list.count1, list.count2
        );
        list.count1 = min;
        list.count2 = min;
        list.actions.truncate(min as usize);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_buffer_passes_through() {
        let bytes = vec![0u8; 64];
        let out = inflate_container(bytes.clone(), None).unwrap();
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_container_without_inflater_fails() {
        let mut bytes = vec![0u8; 64];
        bytes[8..12].copy_from_slice(&CONTAINER_MAGIC.to_be_bytes());
        assert!(matches!(
            inflate_container(bytes, None),
            Err(Error::CompressedInput)
        ));
    }

    #[test]
    fn test_container_invokes_inflater() {
        let mut bytes = vec![0u8; 64];
        bytes[8..12].copy_from_slice(&CONTAINER_MAGIC.to_be_bytes());
        let inflate = |_: &[u8]| -> std::io::Result<Vec<u8>> { Ok(vec![1, 2, 3]) };
        let out = inflate_container(bytes, Some(&inflate)).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn test_short_file_is_fatal() {
        assert!(matches!(
            decode(&[0u8; 10]),
            Err(Error::HeaderTruncated(10))
        ));
    }
}
