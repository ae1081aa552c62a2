//! The public facade for working with CCF configurations.
//!
//! [`Ccf`] owns a decoded graph and exposes the structural edits the
//! codec tolerates: device list surgery, panel and widget creation,
//! action list editing. Several data structures are singly linked
//! lists; the accessors expose the first element and the helpers keep
//! the list integrity, but replacing a first element replaces the whole
//! list.

use std::fs;
use std::path::Path;

use log::debug;

use crate::caps::{models_by_capability, Capabilities, ProntoModel};
use crate::encode;
use crate::error::{Error, Result};
use crate::graph::{Graph, Node, NodeId};
use crate::nodes::{
    hard_keys, Action, ActionList, Button, Child, Device, Frame, HardKeyDef, IrCode, Panel, Timer,
};
use crate::progress::ProgressSink;
use crate::session::{self, InflateFn};
use crate::tree;

/// Smallest plausible encoded image; anything shorter indicates a
/// failed encode and is never allowed to replace an existing file.
const MIN_IMAGE_LEN: usize = 75;

/// Which of the three device lists to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceList {
    Home,
    Normal,
    Macro,
}

/// A hard key of a device: its static definition plus current state.
#[derive(Debug)]
pub struct HardKey {
    pub def: HardKeyDef,
    pub name: Option<String>,
    pub actions: Option<NodeId>,
}

/// An in-memory CCF configuration.
#[derive(Debug)]
pub struct Ccf {
    graph: Graph,
}

impl Ccf {
    /// Create a new empty configuration: one home device with one
    /// panel, plus the macro editing panel.
    pub fn new() -> Self {
        let mut graph = Graph::new();
        let home_panel = graph.alloc(Node::Panel(Panel::named("Home")));
        let mut home = Device::default();
        home.name = Some("HOME".to_string());
        home.first_panel = Some(home_panel);
        let home = graph.alloc(Node::Device(home));
        let macro_panel = graph.alloc(Node::Panel(Panel::named("macro")));
        {
            let header = graph.header_mut();
            header.version = Some(format!("ccfkit v{}", env!("CARGO_PKG_VERSION")));
            header.first_home = Some(home);
            header.macro_panel = Some(macro_panel);
        }
        tree::build(&mut graph);
        Ccf { graph }
    }

    /// Create a new configuration conforming to a specific model.
    pub fn with_model(model: &ProntoModel) -> Self {
        let mut ccf = Ccf::new();
        ccf.conform_to(model);
        ccf
    }

    /// Wrap an already decoded graph.
    pub fn from_graph(graph: Graph) -> Self {
        Ccf { graph }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    // ---- codec entry points ----

    /// Decode a raw CCF image.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Self::decode_with(bytes.to_vec(), None, None)
    }

    /// Decode with optional progress reporting and container inflater.
    pub fn decode_with(
        bytes: Vec<u8>,
        sink: Option<&mut dyn ProgressSink>,
        inflate: Option<InflateFn>,
    ) -> Result<Self> {
        let graph = session::decode_with(bytes, sink, inflate)?;
        let mut ccf = Ccf { graph };
        ccf.check_panels();
        Ok(ccf)
    }

    /// Encode into a raw CCF image.
    pub fn encode(&mut self) -> Result<Vec<u8>> {
        encode::encode(&mut self.graph, None)
    }

    /// Encode with progress reporting.
    pub fn encode_with(&mut self, sink: Option<&mut dyn ProgressSink>) -> Result<Vec<u8>> {
        encode::encode(&mut self.graph, sink)
    }

    /// Read and decode a CCF file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::decode_with(bytes, None, None)
    }

    /// Encode and atomically replace `path`: the image is written to a
    /// temp sibling, the previous file is kept as `.old`, and the
    /// rename only happens after a full successful encode.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.encode()?;
        if bytes.len() < MIN_IMAGE_LEN {
            return Err(Error::ImageTooSmall(bytes.len()));
        }

        let tmp = path.with_extension(format!("tmp-{}", std::process::id()));
        fs::write(&tmp, &bytes)?;

        if path.exists() {
            let old = path.with_extension("old");
            if old.exists() {
                fs::remove_file(&old)?;
            }
            fs::rename(path, &old)?;
        }
        fs::rename(&tmp, path)?;
        debug!("saved {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    // ---- capability / model ----

    pub fn caps(&self) -> Capabilities {
        self.graph.caps()
    }

    pub fn is_color(&self) -> bool {
        self.caps().has_color()
    }

    pub fn uses_udb(&self) -> bool {
        self.caps().has_udb()
    }

    /// The models whose capability word matches this configuration.
    pub fn matching_models(&self) -> Vec<&'static ProntoModel> {
        models_by_capability(self.graph.header().capability)
    }

    /// The screen size: the custom override when set, else the first
    /// matching model's, else the given default.
    pub fn screen_size(&self, default: (u16, u16)) -> (u16, u16) {
        self.graph.header().screen_size().unwrap_or_else(|| {
            self.matching_models()
                .first()
                .map(|m| (m.screen_width, m.screen_height))
                .unwrap_or(default)
        })
    }

    /// Rewrite the capability word for a target model and re-normalize
    /// capability-dependent records.
    pub fn conform_to(&mut self, model: &ProntoModel) {
        self.graph.header_mut().set_capability(model.capability);
        let udb = self.uses_udb();
        for id in self.graph.ids().collect::<Vec<_>>() {
            if let Node::IrCode(code) = self.graph.node_mut(id) {
                code.set_udb(udb);
            }
        }
        self.check_panels();
    }

    /// Model-family fixups applied after decode and conformance: the
    /// Marantz families expect scroll pseudo-devices in the home list,
    /// and custom mode expects the three named template panels.
    fn check_panels(&mut self) {
        let caps = self.caps();
        if caps.is_marantz() {
            for name in ["SCROLL UP", "SCROLL DOWN"] {
                if self.device_by_name(name).is_none() {
                    let dev = self.create_device(name);
                    self.append_device(DeviceList::Home, dev);
                }
            }
        } else if caps.is_custom() {
            let master = match self.graph.header().macro_panel {
                Some(mp) => mp,
                None => {
                    let mp = self.graph.alloc(Node::Panel(Panel::named("masterTemplate")));
                    self.graph.header_mut().macro_panel = Some(mp);
                    mp
                }
            };
            self.rename_panel(master, "masterTemplate");
            let device_tpl = self.panel_next_or_create(master, "deviceTemplate");
            self.panel_next_or_create(device_tpl, "macroTemplate");
            if self.graph.header().screen_size().is_none() {
                self.graph.header_mut().set_screen_size(240, 320);
            }
            tree::build(&mut self.graph);
        }
    }

    fn rename_panel(&mut self, panel: NodeId, name: &str) {
        if let Node::Panel(p) = self.graph.node_mut(panel) {
            p.name = Some(name.to_string());
        }
    }

    fn panel_next_or_create(&mut self, panel: NodeId, name: &str) -> NodeId {
        if let Some(next) = self.graph.node(panel).as_panel().and_then(|p| p.next) {
            self.rename_panel(next, name);
            return next;
        }
        let next = self.graph.alloc(Node::Panel(Panel::named(name)));
        if let Node::Panel(p) = self.graph.node_mut(panel) {
            p.next = Some(next);
        }
        next
    }

    /// Update the stored modification timestamp.
    pub fn set_modified(&mut self, year: u16, month: u8, day: u8, hour: u8, minute: u8, seconds: u8) {
        let header = self.graph.header_mut();
        header.year = year;
        header.month = month;
        header.day = day;
        header.hour = hour;
        header.minute = minute;
        header.seconds = seconds;
    }

    // ---- device lists ----

    pub fn first_device(&self, list: DeviceList) -> Option<NodeId> {
        let h = self.graph.header();
        match list {
            DeviceList::Home => h.first_home,
            DeviceList::Normal => h.first_device,
            DeviceList::Macro => h.first_macro,
        }
    }

    pub fn set_first_device(&mut self, list: DeviceList, dev: Option<NodeId>) {
        {
            let h = self.graph.header_mut();
            match list {
                DeviceList::Home => h.first_home = dev,
                DeviceList::Normal => h.first_device = dev,
                DeviceList::Macro => h.first_macro = dev,
            }
        }
        tree::build(&mut self.graph);
    }

    /// All devices of one list, in order.
    pub fn devices(&self, list: DeviceList) -> Vec<NodeId> {
        self.graph.device_chain(self.first_device(list))
    }

    /// Search all three lists for a device by name.
    pub fn device_by_name(&self, name: &str) -> Option<NodeId> {
        for list in [DeviceList::Home, DeviceList::Normal, DeviceList::Macro] {
            for id in self.devices(list) {
                if self.graph.node(id).as_device().and_then(|d| d.name.as_deref()) == Some(name) {
                    return Some(id);
                }
            }
        }
        None
    }

    /// Create a device; it is not linked into any list.
    pub fn create_device(&mut self, name: &str) -> NodeId {
        let mut dev = Device::default();
        dev.name = Some(name.to_string());
        self.graph.alloc(Node::Device(dev))
    }

    /// Append a device to the end of a list.
    pub fn append_device(&mut self, list: DeviceList, dev: NodeId) {
        match self.devices(list).last() {
            Some(&tail) => {
                if let Node::Device(d) = self.graph.node_mut(tail) {
                    d.next = Some(dev);
                }
            }
            None => return self.set_first_device(list, Some(dev)),
        }
        tree::build(&mut self.graph);
    }

    /// Insert a device before another, searching all three lists.
    pub fn insert_device_before(&mut self, existing: NodeId, dev: NodeId) {
        for list in [DeviceList::Home, DeviceList::Normal, DeviceList::Macro] {
            if self.first_device(list) == Some(existing) {
                if let Node::Device(d) = self.graph.node_mut(dev) {
                    d.next = Some(existing);
                }
                return self.set_first_device(list, Some(dev));
            }
            for id in self.devices(list) {
                let next = self.graph.node(id).as_device().and_then(|d| d.next);
                if next == Some(existing) {
                    if let Node::Device(d) = self.graph.node_mut(dev) {
                        d.next = Some(existing);
                    }
                    if let Node::Device(d) = self.graph.node_mut(id) {
                        d.next = Some(dev);
                    }
                    return tree::build(&mut self.graph);
                }
            }
        }
    }

    /// Unlink a device from whichever list holds it. Returns the new
    /// root of that list, if it still has one.
    pub fn delete_device(&mut self, dev: NodeId) -> Option<NodeId> {
        let dev_next = self.graph.node(dev).as_device().and_then(|d| d.next);
        for list in [DeviceList::Home, DeviceList::Normal, DeviceList::Macro] {
            if self.first_device(list) == Some(dev) {
                if let Node::Device(d) = self.graph.node_mut(dev) {
                    d.next = None;
                }
                self.set_first_device(list, dev_next);
                return self.first_device(list);
            }
            for id in self.devices(list) {
                let next = self.graph.node(id).as_device().and_then(|d| d.next);
                if next == Some(dev) {
                    if let Node::Device(d) = self.graph.node_mut(id) {
                        d.next = dev_next;
                    }
                    if let Node::Device(d) = self.graph.node_mut(dev) {
                        d.next = None;
                    }
                    tree::build(&mut self.graph);
                    return self.first_device(list);
                }
            }
        }
        None
    }

    // ---- panels ----

    pub fn panels(&self, dev: NodeId) -> Vec<NodeId> {
        let first = self.graph.node(dev).as_device().and_then(|d| d.first_panel);
        self.graph.panel_chain(first)
    }

    pub fn panel_by_name(&self, dev: NodeId, name: &str) -> Option<NodeId> {
        self.panels(dev).into_iter().find(|&p| {
            self.graph.node(p).as_panel().and_then(|p| p.name.as_deref()) == Some(name)
        })
    }

    /// Create a panel and append it to a device's panel list.
    pub fn add_panel(&mut self, dev: NodeId, name: &str) -> NodeId {
        let panel = self.graph.alloc(Node::Panel(Panel::named(name)));
        match self.panels(dev).last() {
            Some(&tail) => {
                if let Node::Panel(p) = self.graph.node_mut(tail) {
                    p.next = Some(panel);
                }
            }
            None => {
                if let Node::Device(d) = self.graph.node_mut(dev) {
                    d.first_panel = Some(panel);
                }
            }
        }
        self.graph.set_parent(panel, Some(dev));
        panel
    }

    /// Unlink a panel from its device's panel list.
    pub fn delete_panel(&mut self, dev: NodeId, panel: NodeId) {
        let panel_next = self.graph.node(panel).as_panel().and_then(|p| p.next);
        let first = self.graph.node(dev).as_device().and_then(|d| d.first_panel);
        if first == Some(panel) {
            if let Node::Device(d) = self.graph.node_mut(dev) {
                d.first_panel = panel_next;
            }
        } else {
            for id in self.panels(dev) {
                let next = self.graph.node(id).as_panel().and_then(|p| p.next);
                if next == Some(panel) {
                    if let Node::Panel(p) = self.graph.node_mut(id) {
                        p.next = panel_next;
                    }
                    break;
                }
            }
        }
        if let Node::Panel(p) = self.graph.node_mut(panel) {
            p.next = None;
        }
        self.graph.set_parent(panel, None);
    }

    // ---- widgets ----

    /// Create a button wrapped in a child slot and add it to a panel.
    pub fn add_button(&mut self, panel: NodeId, name: &str) -> NodeId {
        let button = self.graph.alloc(Node::Button(Button::named(name, self.is_color())));
        let child = self.graph.alloc(Node::Child(Child::button(button)));
        if let Node::Panel(p) = self.graph.node_mut(panel) {
            p.add_child(child);
        }
        self.graph.set_parent(child, Some(panel));
        self.graph.set_parent(button, Some(child));
        button
    }

    /// Create a frame wrapped in a child slot and add it to a panel.
    pub fn add_frame(&mut self, panel: NodeId, name: &str) -> NodeId {
        let frame = self.graph.alloc(Node::Frame(Frame::named(name)));
        let child = self.graph.alloc(Node::Child(Child::frame(frame)));
        if let Node::Panel(p) = self.graph.node_mut(panel) {
            p.add_child(child);
        }
        self.graph.set_parent(child, Some(panel));
        self.graph.set_parent(frame, Some(child));
        frame
    }

    /// Remove the child slot holding `payload` from a panel.
    pub fn remove_widget(&mut self, panel: NodeId, payload: NodeId) {
        let slot = self
            .graph
            .node(panel)
            .as_panel()
            .map(|p| p.children.clone())
            .unwrap_or_default()
            .into_iter()
            .find(|&c| self.graph.node(c).as_child().and_then(|c| c.payload) == Some(payload));
        if let Some(slot) = slot {
            if let Node::Panel(p) = self.graph.node_mut(panel) {
                p.remove_child(slot);
            }
            self.graph.set_parent(slot, None);
            self.graph.set_parent(payload, None);
        }
    }

    /// Recursively search a panel's widget tree for a button by name.
    pub fn button_by_name(&self, panel: NodeId, name: &str) -> Option<NodeId> {
        fn search(graph: &Graph, children: &[NodeId], name: &str) -> Option<NodeId> {
            for &slot in children {
                let Some(child) = graph.node(slot).as_child() else { continue };
                let Some(payload) = child.payload else { continue };
                match graph.node(payload) {
                    Node::Button(b) if b.name.as_deref() == Some(name) => return Some(payload),
                    Node::Frame(f) => {
                        if let Some(found) = search(graph, &f.children, name) {
                            return Some(found);
                        }
                    }
                    _ => {}
                }
            }
            None
        }
        let p = self.graph.node(panel).as_panel()?;
        search(&self.graph, &p.children, name)
    }

    // ---- actions ----

    /// Append an action to a button's list, creating the list if the
    /// button has none yet.
    pub fn append_button_action(&mut self, button: NodeId, action: Action) -> NodeId {
        let action_id = self.graph.alloc(Node::Action(action));
        let list = match self.graph.node(button).as_button().and_then(|b| b.actions) {
            Some(list) => list,
            None => {
                let list = self.graph.alloc(Node::ActionList(ActionList::default()));
                if let Node::Button(b) = self.graph.node_mut(button) {
                    b.actions = Some(list);
                }
                self.graph.set_parent(list, Some(button));
                list
            }
        };
        if let Node::ActionList(l) = self.graph.node_mut(list) {
            l.append(action_id);
        }
        self.graph.set_parent(action_id, Some(list));
        action_id
    }

    /// Register an IR code record for use in actions.
    pub fn add_ir_code(&mut self, name: &str, code: &str) -> NodeId {
        let udb = self.uses_udb();
        let code = if udb {
            IrCode::from_code(name, &format!("0000 0000 0000 {code}"), true)
        } else {
            IrCode::from_code(name, code, false)
        };
        self.graph.alloc(Node::IrCode(code))
    }

    /// Append a timer to the header's timer list.
    pub fn add_timer(&mut self, timer: Timer) -> NodeId {
        let id = self.graph.alloc(Node::Timer(timer));
        let tail = {
            let mut cur = self.graph.header().first_timer;
            let mut tail = None;
            let mut hops = self.graph.len();
            while let Some(t) = cur {
                tail = Some(t);
                cur = self.graph.node(t).as_timer().and_then(|t| t.next);
                hops -= 1;
                if hops == 0 {
                    break;
                }
            }
            tail
        };
        match tail {
            Some(tail) => {
                if let Node::Timer(t) = self.graph.node_mut(tail) {
                    t.next = Some(id);
                }
            }
            None => self.graph.header_mut().first_timer = Some(id),
        }
        self.graph.set_parent(id, Some(self.graph.root()));
        id
    }

    // ---- hard keys ----

    /// The hard keys of a device under the current capabilities.
    pub fn device_hard_keys(&self, dev: NodeId) -> Vec<HardKey> {
        let caps = self.caps();
        let Some(d) = self.graph.node(dev).as_device() else {
            return Vec::new();
        };
        hard_keys(caps)
            .iter()
            .map(|def| HardKey {
                def: *def,
                name: def.name_slot.and_then(|f| d.get(f).into_str()),
                actions: d.get(def.list_slot).as_node(),
            })
            .collect()
    }

    /// Attach an action list to a device hard key by its label.
    pub fn set_hard_key_actions(&mut self, dev: NodeId, label: &str, list: Option<NodeId>) -> bool {
        let caps = self.caps();
        let Some(def) = hard_keys(caps).iter().find(|k| k.label == label) else {
            return false;
        };
        let slot = def.list_slot;
        if let Node::Device(d) = self.graph.node_mut(dev) {
            d.put(slot, crate::schema::FieldValue::Node(list));
        }
        if let Some(list) = list {
            self.graph.set_parent(list, Some(dev));
        }
        true
    }
}

impl Default for Ccf {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_has_home_device() {
        let ccf = Ccf::new();
        let home = ccf.device_by_name("HOME").unwrap();
        let panels = ccf.panels(home);
        assert_eq!(panels.len(), 1);
        let name = ccf.graph().node(panels[0]).as_panel().unwrap().name.clone();
        assert_eq!(name.as_deref(), Some("Home"));
    }

    #[test]
    fn test_device_list_surgery() {
        let mut ccf = Ccf::new();
        let tv = ccf.create_device("TV");
        let vcr = ccf.create_device("VCR");
        let dvd = ccf.create_device("DVD");
        ccf.append_device(DeviceList::Normal, tv);
        ccf.append_device(DeviceList::Normal, dvd);
        ccf.insert_device_before(dvd, vcr);
        let names: Vec<_> = ccf
            .devices(DeviceList::Normal)
            .into_iter()
            .map(|d| ccf.graph().node(d).as_device().unwrap().name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["TV", "VCR", "DVD"]);

        ccf.delete_device(vcr);
        let names: Vec<_> = ccf
            .devices(DeviceList::Normal)
            .into_iter()
            .map(|d| ccf.graph().node(d).as_device().unwrap().name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["TV", "DVD"]);
    }

    #[test]
    fn test_delete_first_device_returns_new_root() {
        let mut ccf = Ccf::new();
        let tv = ccf.create_device("TV");
        let dvd = ccf.create_device("DVD");
        ccf.append_device(DeviceList::Normal, tv);
        ccf.append_device(DeviceList::Normal, dvd);
        let root = ccf.delete_device(tv);
        assert_eq!(root, Some(dvd));
    }

    #[test]
    fn test_button_activity_tracks_action_list() {
        let mut ccf = Ccf::new();
        let home = ccf.device_by_name("HOME").unwrap();
        let panel = ccf.panels(home)[0];
        let button = ccf.add_button(panel, "Play");
        assert!(!ccf.graph().button_is_active(button));
        ccf.append_button_action(button, Action::delay(100));
        assert!(ccf.graph().button_is_active(button));
    }

    #[test]
    fn test_button_search_recurses_frames() {
        let mut ccf = Ccf::new();
        let home = ccf.device_by_name("HOME").unwrap();
        let panel = ccf.panels(home)[0];
        let frame = ccf.add_frame(panel, "group");
        let inner = ccf.graph.alloc(Node::Button(Button::named("Stop", false)));
        let slot = ccf.graph.alloc(Node::Child(Child::button(inner)));
        if let Node::Frame(f) = ccf.graph.node_mut(frame) {
            f.add_child(slot);
        }
        assert_eq!(ccf.button_by_name(panel, "Stop"), Some(inner));
        assert_eq!(ccf.button_by_name(panel, "Missing"), None);
    }

    #[test]
    fn test_marantz_check_panels_adds_scroll_devices() {
        let mut ccf = Ccf::new();
        ccf.graph.header_mut().capability = 0x0801;
        ccf.check_panels();
        assert!(ccf.device_by_name("SCROLL UP").is_some());
        assert!(ccf.device_by_name("SCROLL DOWN").is_some());
    }
}
