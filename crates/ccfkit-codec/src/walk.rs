//! Read-only graph traversal for external consumers.
//!
//! The renderer and editor never see the byte format; they walk the
//! decoded graph through a visitor. Every reachable record is visited
//! exactly once, containment first: devices, then their panels, widget
//! trees, action lists, and the IR codes, timers, and icons they
//! reference.

use crate::graph::{Graph, NodeId};
use crate::schema::NodeType;

/// Callback for [`walk`].
pub trait Visitor {
    fn visit(&mut self, graph: &Graph, id: NodeId);
}

impl<F: FnMut(&Graph, NodeId)> Visitor for F {
    fn visit(&mut self, graph: &Graph, id: NodeId) {
        self(graph, id)
    }
}

/// Visit every record reachable from the header, once each.
pub fn walk(graph: &Graph, visitor: &mut dyn Visitor) {
    let mut walker = Walker { graph, visitor, seen: vec![false; graph.len()] };
    walker.node(graph.root());
}

struct Walker<'a> {
    graph: &'a Graph,
    visitor: &'a mut dyn Visitor,
    seen: Vec<bool>,
}

impl Walker<'_> {
    fn node(&mut self, id: NodeId) {
        if self.seen[id.index()] {
            return;
        }
        self.seen[id.index()] = true;
        self.visitor.visit(self.graph, id);

        let node = self.graph.node(id);
        match node.node_type() {
            NodeType::Header => {
                let h = self.graph.header();
                let chains = [h.first_home, h.first_device, h.first_macro];
                let macro_panel = h.macro_panel;
                let first_timer = h.first_timer;
                for first in chains {
                    self.chain(first, |g, id| g.node(id).as_device().and_then(|d| d.next));
                }
                self.chain(macro_panel, |g, id| g.node(id).as_panel().and_then(|p| p.next));
                self.chain(first_timer, |g, id| g.node(id).as_timer().and_then(|t| t.next));
            }
            NodeType::Device => {
                if let Some(d) = node.as_device() {
                    let mut refs = vec![d.icon_unselected, d.icon_selected, d.action];
                    refs.extend(d.key_lists(self.graph.caps()));
                    refs.push(d.first_panel);
                    for r in refs.into_iter().flatten() {
                        self.node(r);
                    }
                }
            }
            NodeType::Panel => {
                if let Some(p) = node.as_panel() {
                    for child in p.children.clone() {
                        self.node(child);
                    }
                }
            }
            NodeType::Child => {
                if let Some(payload) = node.as_child().and_then(|c| c.payload) {
                    self.node(payload);
                }
            }
            NodeType::Frame => {
                if let Some(f) = node.as_frame() {
                    let refs: Vec<NodeId> =
                        f.icon.into_iter().chain(f.children.clone()).collect();
                    for r in refs {
                        self.node(r);
                    }
                }
            }
            NodeType::Button => {
                if let Some(b) = node.as_button() {
                    let refs = [b.icon_iu, b.icon_is, b.icon_au, b.icon_as, b.actions];
                    for r in refs.into_iter().flatten() {
                        self.node(r);
                    }
                }
            }
            NodeType::ActionList => {
                if let Some(l) = node.as_action_list() {
                    for action in l.actions.clone() {
                        self.node(action);
                    }
                }
            }
            NodeType::Action => {
                // owned payloads only; alias and jump targets are
                // cross references visited through their containers
                if let Some(target) = node.as_action().and_then(|a| a.ref2) {
                    if matches!(
                        self.graph.node(target).node_type(),
                        NodeType::IrCode | NodeType::Timer
                    ) {
                        self.node(target);
                    }
                }
            }
            NodeType::Timer => {
                if let Some(t) = node.as_timer() {
                    for action in [t.start_action, t.end_action].into_iter().flatten() {
                        self.node(action);
                    }
                }
            }
            NodeType::IrCode | NodeType::Icon => {}
        }
    }

    /// Walk a linked list, visiting each element; `next` extracts the
    /// follow pointer. The visited set breaks corrupt cycles.
    fn chain(&mut self, first: Option<NodeId>, next: fn(&Graph, NodeId) -> Option<NodeId>) {
        let mut cur = first;
        while let Some(id) = cur {
            if self.seen[id.index()] {
                break;
            }
            self.node(id);
            cur = next(self.graph, id);
        }
    }
}
