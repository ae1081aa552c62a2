//! Parent-link assignment.
//!
//! Decode fills records in pointer-discovery order, so containment
//! parents cannot be assigned on the fly. This pass walks the fully
//! resolved graph from the header and assigns every reachable record its
//! owning parent; stale links on detached records are cleared first.
//! Linked lists in corrupt files can cycle back through the pointer
//! cache, so every step is guarded by a visited set.

use crate::graph::{Graph, NodeId};
use crate::schema::NodeType;

/// Rebuild all parent links from the header down.
pub fn build(graph: &mut Graph) {
    for id in graph.ids().collect::<Vec<_>>() {
        graph.set_parent(id, None);
    }

    let root = graph.root();
    let header = graph.header();
    let device_roots = [header.first_home, header.first_device, header.first_macro];
    let macro_panel = header.macro_panel;
    let first_timer = header.first_timer;

    let mut seen = vec![false; graph.len()];

    for first in device_roots {
        let mut cur = first;
        while let Some(id) = cur {
            if enter(&mut seen, id) {
                break;
            }
            build_device(graph, id, root, &mut seen);
            cur = graph.node(id).as_device().and_then(|d| d.next);
        }
    }

    let mut cur = macro_panel;
    while let Some(id) = cur {
        if enter(&mut seen, id) {
            break;
        }
        build_panel(graph, id, root, &mut seen);
        cur = graph.node(id).as_panel().and_then(|p| p.next);
    }

    let mut cur = first_timer;
    while let Some(id) = cur {
        if enter(&mut seen, id) {
            break;
        }
        build_timer(graph, id, root, &mut seen);
        cur = graph.node(id).as_timer().and_then(|t| t.next);
    }
}

/// Mark a record visited; true if it already was.
fn enter(seen: &mut [bool], id: NodeId) -> bool {
    let visited = seen[id.index()];
    seen[id.index()] = true;
    visited
}

fn build_device(graph: &mut Graph, id: NodeId, parent: NodeId, seen: &mut [bool]) {
    graph.set_parent(id, Some(parent));

    let (panels, lists) = match graph.node(id).as_device() {
        Some(d) => {
            let panels = graph.panel_chain(d.first_panel);
            let mut lists = vec![d.action];
            lists.extend(d.key_lists(graph.caps()));
            (panels, lists)
        }
        None => return,
    };

    for panel in panels {
        if !enter(seen, panel) {
            build_panel(graph, panel, id, seen);
        }
    }
    for list in lists.into_iter().flatten() {
        if !enter(seen, list) {
            build_action_list(graph, list, id, seen);
        }
    }
}

fn build_panel(graph: &mut Graph, id: NodeId, parent: NodeId, seen: &mut [bool]) {
    graph.set_parent(id, Some(parent));
    let children = match graph.node(id).as_panel() {
        Some(p) => p.children.clone(),
        None => return,
    };
    for child in children {
        if !enter(seen, child) {
            build_child(graph, child, id, seen);
        }
    }
}

fn build_child(graph: &mut Graph, id: NodeId, parent: NodeId, seen: &mut [bool]) {
    graph.set_parent(id, Some(parent));
    let payload = match graph.node(id).as_child() {
        Some(c) => c.payload,
        None => return,
    };
    let Some(payload) = payload else { return };
    if enter(seen, payload) {
        return;
    }
    match graph.node(payload).node_type() {
        NodeType::Button => build_button(graph, payload, id, seen),
        NodeType::Frame => build_frame(graph, payload, id, seen),
        _ => graph.set_parent(payload, Some(id)),
    }
}

fn build_button(graph: &mut Graph, id: NodeId, parent: NodeId, seen: &mut [bool]) {
    graph.set_parent(id, Some(parent));
    let actions = graph.node(id).as_button().and_then(|b| b.actions);
    if let Some(list) = actions {
        if !enter(seen, list) {
            build_action_list(graph, list, id, seen);
        }
    }
}

fn build_frame(graph: &mut Graph, id: NodeId, parent: NodeId, seen: &mut [bool]) {
    graph.set_parent(id, Some(parent));
    let children = match graph.node(id).as_frame() {
        Some(f) => f.children.clone(),
        None => return,
    };
    for child in children {
        if !enter(seen, child) {
            build_child(graph, child, id, seen);
        }
    }
}

fn build_action_list(graph: &mut Graph, id: NodeId, parent: NodeId, seen: &mut [bool]) {
    graph.set_parent(id, Some(parent));
    let actions = match graph.node(id).as_action_list() {
        Some(l) => l.actions.clone(),
        None => return,
    };
    for action in actions {
        if !enter(seen, action) {
            build_action(graph, action, id, seen);
        }
    }
}

fn build_action(graph: &mut Graph, id: NodeId, parent: NodeId, seen: &mut [bool]) {
    graph.set_parent(id, Some(parent));
    // IR code payloads are owned by their action; other targets are
    // cross references owned elsewhere
    let ir = graph
        .node(id)
        .as_action()
        .and_then(|a| a.ref2)
        .filter(|&r| graph.node(r).node_type() == NodeType::IrCode);
    if let Some(ir) = ir {
        if !enter(seen, ir) {
            graph.set_parent(ir, Some(id));
        }
    }
}

fn build_timer(graph: &mut Graph, id: NodeId, parent: NodeId, seen: &mut [bool]) {
    graph.set_parent(id, Some(parent));
    let (start, end) = match graph.node(id).as_timer() {
        Some(t) => (t.start_action, t.end_action),
        None => return,
    };
    for action in [start, end].into_iter().flatten() {
        if !enter(seen, action) {
            build_action(graph, action, id, seen);
        }
    }
}
