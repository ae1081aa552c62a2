//! End-to-end codec round trips over synthetic configurations.

use ccfkit_codec::nodes::{Action, SpecialJump, Timer};
use ccfkit_codec::schema::NodeType;
use ccfkit_codec::{walk, Ccf, DeviceList, Node, NodeId};
use ccfkit_common::crc;

fn panel_name(ccf: &Ccf, panel: NodeId) -> Option<String> {
    ccf.graph().node(panel).as_panel().and_then(|p| p.name.clone())
}

#[test]
fn minimal_file_round_trips() {
    let mut ccf = Ccf::new();
    let bytes = ccf.encode().unwrap();

    let again = Ccf::decode(&bytes).unwrap();
    let homes = again.devices(DeviceList::Home);
    assert_eq!(homes.len(), 1);
    let panels = again.panels(homes[0]);
    assert_eq!(panels.len(), 1);
    assert_eq!(panel_name(&again, panels[0]).as_deref(), Some("Home"));
    assert!(again.graph().node(panels[0]).as_panel().unwrap().children.is_empty());
}

#[test]
fn checksum_trails_the_image() {
    let mut ccf = Ccf::new();
    let bytes = ccf.encode().unwrap();

    // even payload plus the two checksum bytes
    assert_eq!(bytes.len() % 2, 0);
    let crc_pos = bytes.len() - 2;
    let stored = u16::from_be_bytes([bytes[crc_pos], bytes[crc_pos + 1]]);
    assert_eq!(stored, crc::checksum(&bytes[..crc_pos]));

    // both header copies record the checksum offset
    let header_crc1 = u32::from_be_bytes(bytes[16..20].try_into().unwrap());
    let header_crc2 = u32::from_be_bytes(bytes[40..44].try_into().unwrap());
    assert_eq!(header_crc1 as usize, crc_pos);
    assert_eq!(header_crc2 as usize, crc_pos);
}

#[test]
fn devices_and_widgets_survive_a_round_trip() {
    let mut ccf = Ccf::new();
    let tv = ccf.create_device("TV");
    ccf.append_device(DeviceList::Normal, tv);
    let main = ccf.add_panel(tv, "Main");
    let power = ccf.add_button(main, "Power");
    let code = ccf.add_ir_code("power-toggle", "0000 006c 0022 0002");
    ccf.append_button_action(power, Action::ir_code(code));
    ccf.append_button_action(power, Action::delay(250));

    let bytes = ccf.encode().unwrap();
    let again = Ccf::decode(&bytes).unwrap();

    let tv = again.device_by_name("TV").unwrap();
    let main = again.panel_by_name(tv, "Main").unwrap();
    let power = again.button_by_name(main, "Power").unwrap();
    assert!(again.graph().button_is_active(power));

    let list = again.graph().node(power).as_button().unwrap().actions.unwrap();
    let actions = &again.graph().node(list).as_action_list().unwrap().actions;
    assert_eq!(actions.len(), 2);

    let ir = again.graph().node(actions[0]).as_action().unwrap().ref2.unwrap();
    let ir = again.graph().node(ir).as_ir_code().unwrap();
    assert_eq!(ir.name.as_deref(), Some("power-toggle"));
    assert_eq!(ir.code(), "0000 006c 0022 0002");

    let delay = again.graph().node(actions[1]).as_action().unwrap();
    assert_eq!(delay.p2, 250);
}

#[test]
fn shared_action_lists_keep_identity() {
    let mut ccf = Ccf::new();
    let home = ccf.device_by_name("HOME").unwrap();
    let panel = ccf.panels(home)[0];
    let one = ccf.add_button(panel, "One");
    let two = ccf.add_button(panel, "Two");
    ccf.append_button_action(one, Action::delay(100));
    let shared = ccf.graph().node(one).as_button().unwrap().actions;
    if let Node::Button(b) = ccf.graph_mut().node_mut(two) {
        b.actions = shared;
    }

    let bytes = ccf.encode().unwrap();
    let again = Ccf::decode(&bytes).unwrap();

    let home = again.device_by_name("HOME").unwrap();
    let panel = again.panels(home)[0];
    let one = again.button_by_name(panel, "One").unwrap();
    let two = again.button_by_name(panel, "Two").unwrap();
    let list_one = again.graph().node(one).as_button().unwrap().actions.unwrap();
    let list_two = again.graph().node(two).as_button().unwrap().actions.unwrap();
    // one offset in the file, one record in the graph
    assert_eq!(list_one, list_two);
}

#[test]
fn dangling_actions_are_culled_in_order() {
    let mut ccf = Ccf::new();
    let home = ccf.device_by_name("HOME").unwrap();
    let panel = ccf.panels(home)[0];
    let button = ccf.add_button(panel, "Macro");
    let victim = ccf.add_button(panel, "Victim");

    ccf.append_button_action(button, Action::delay(100));
    ccf.append_button_action(button, Action::alias_button(Some(home), victim));
    ccf.append_button_action(button, Action::delay(200));
    ccf.append_button_action(button, Action::alias_button(Some(home), victim));
    ccf.append_button_action(button, Action::delay(300));

    ccf.remove_widget(panel, victim);
    let bytes = ccf.encode().unwrap();
    let again = Ccf::decode(&bytes).unwrap();

    let home = again.device_by_name("HOME").unwrap();
    let panel = again.panels(home)[0];
    let button = again.button_by_name(panel, "Macro").unwrap();
    let list = again.graph().node(button).as_button().unwrap().actions.unwrap();
    let actions = &again.graph().node(list).as_action_list().unwrap().actions;
    let delays: Vec<u32> = actions
        .iter()
        .map(|&a| again.graph().node(a).as_action().unwrap().p2)
        .collect();
    assert_eq!(delays, vec![100, 200, 300]);
}

#[test]
fn special_jumps_round_trip_without_a_panel() {
    let mut ccf = Ccf::new();
    let home = ccf.device_by_name("HOME").unwrap();
    let panel = ccf.panels(home)[0];
    let button = ccf.add_button(panel, "Fwd");
    ccf.append_button_action(button, Action::special_jump(SpecialJump::Forward));

    let bytes = ccf.encode().unwrap();
    let again = Ccf::decode(&bytes).unwrap();

    let home = again.device_by_name("HOME").unwrap();
    let panel = again.panels(home)[0];
    let button = again.button_by_name(panel, "Fwd").unwrap();
    let list = again.graph().node(button).as_button().unwrap().actions.unwrap();
    let actions = &again.graph().node(list).as_action_list().unwrap().actions;
    let action = again.graph().node(actions[0]).as_action().unwrap();
    assert_eq!(action.p2, 0xbbbb_bbbb);
    assert!(action.is_special_jump());
    assert!(action.ref2.is_none());
    assert!(action.is_valid());
}

#[test]
fn action_count_mismatch_is_clamped() {
    let mut ccf = Ccf::new();
    let home = ccf.device_by_name("HOME").unwrap();
    let panel = ccf.panels(home)[0];
    let button = ccf.add_button(panel, "Many");
    for i in 1..=7u32 {
        ccf.append_button_action(button, Action::delay(i * 100));
    }
    let mut bytes = ccf.encode().unwrap();

    // corrupt the duplicate count byte of the action list (7 -> 5)
    let pos = bytes
        .windows(3)
        .position(|w| w == [0x07, 0x07, 0x04])
        .expect("action list not found");
    bytes[pos + 1] = 5;

    let again = Ccf::decode(&bytes).unwrap();
    let home = again.device_by_name("HOME").unwrap();
    let panel = again.panels(home)[0];
    let button = again.button_by_name(panel, "Many").unwrap();
    let list = again.graph().node(button).as_button().unwrap().actions.unwrap();
    let list = again.graph().node(list).as_action_list().unwrap();
    assert_eq!(list.actions.len(), 5);
    assert_eq!(list.count1, 5);
    assert_eq!(list.count2, 5);
}

#[test]
fn hidden_panel_flag_survives() {
    let mut ccf = Ccf::new();
    let home = ccf.device_by_name("HOME").unwrap();
    let hidden = ccf.add_panel(home, "Secret");
    if let Node::Panel(p) = ccf.graph_mut().node_mut(hidden) {
        p.hidden = true;
    }

    let bytes = ccf.encode().unwrap();
    let again = Ccf::decode(&bytes).unwrap();

    let home = again.device_by_name("HOME").unwrap();
    let secret = again.panel_by_name(home, "Secret").unwrap();
    assert!(again.graph().node(secret).as_panel().unwrap().hidden);
    let first = again.panels(home)[0];
    assert!(!again.graph().node(first).as_panel().unwrap().hidden);
}

#[test]
fn ir_codes_round_trip_with_and_without_udb() {
    // plain gray remote: no UDB prefix
    let mut plain = Ccf::new();
    let dev = plain.create_device("AMP");
    plain.append_device(DeviceList::Normal, dev);
    let p = plain.add_panel(dev, "Main");
    let b = plain.add_button(p, "Vol");
    let code = plain.add_ir_code("vol-up", "1234 5678 9abc");
    plain.append_button_action(b, Action::ir_code(code));
    let bytes = plain.encode().unwrap();
    let again = Ccf::decode(&bytes).unwrap();
    let dev = again.device_by_name("AMP").unwrap();
    let p = again.panel_by_name(dev, "Main").unwrap();
    let b = again.button_by_name(p, "Vol").unwrap();
    let list = again.graph().node(b).as_button().unwrap().actions.unwrap();
    let a = again.graph().node(list).as_action_list().unwrap().actions[0];
    let ir = again.graph().node(a).as_action().unwrap().ref2.unwrap();
    let ir = again.graph().node(ir).as_ir_code().unwrap();
    assert!(!ir.has_udb);
    assert_eq!(ir.code(), "1234 5678 9abc");

    // UDB-capable remote: six-byte prefix carried inside the payload
    let mut udb = Ccf::with_model(ccfkit_codec::model_by_name("TSU6000").unwrap());
    let dev = udb.create_device("AMP");
    udb.append_device(DeviceList::Normal, dev);
    let p = udb.add_panel(dev, "Main");
    let b = udb.add_button(p, "Vol");
    let code = udb.add_ir_code("vol-up", "1234 5678 9abc");
    udb.append_button_action(b, Action::ir_code(code));
    let bytes = udb.encode().unwrap();
    let again = Ccf::decode(&bytes).unwrap();
    let dev = again.device_by_name("AMP").unwrap();
    let p = again.panel_by_name(dev, "Main").unwrap();
    let b = again.button_by_name(p, "Vol").unwrap();
    let list = again.graph().node(b).as_button().unwrap().actions.unwrap();
    let a = again.graph().node(list).as_action_list().unwrap().actions[0];
    let ir = again.graph().node(a).as_action().unwrap().ref2.unwrap();
    let ir = again.graph().node(ir).as_ir_code().unwrap();
    assert!(ir.has_udb);
    assert_eq!(ir.code(), "0000 0000 0000 1234 5678 9abc");
}

#[test]
fn timers_embed_their_actions() {
    let mut ccf = Ccf::new();
    let mut timer = Timer::default();
    timer.start_days = 0b0111110;
    timer.start_time = 7 * 60 + 30;
    timer.end_time = 8 * 60;
    ccf.add_timer(timer);

    let bytes = ccf.encode().unwrap();
    let again = Ccf::decode(&bytes).unwrap();

    let first = again.graph().header().first_timer.unwrap();
    let t = again.graph().node(first).as_timer().unwrap();
    assert_eq!(t.start_days, 0b0111110);
    assert_eq!(t.start_time, 7 * 60 + 30);
    assert_eq!(t.end_time, 8 * 60);
    // both action slots always exist in the image
    assert!(t.start_action.is_some());
    assert!(t.end_action.is_some());
}

#[test]
fn forward_device_references_resolve() {
    let mut ccf = Ccf::new();
    for name in ["A", "B", "C"] {
        let dev = ccf.create_device(name);
        ccf.append_device(DeviceList::Normal, dev);
    }
    let bytes = ccf.encode().unwrap();
    let again = Ccf::decode(&bytes).unwrap();
    let names: Vec<_> = again
        .devices(DeviceList::Normal)
        .into_iter()
        .map(|d| again.graph().node(d).as_device().unwrap().name.clone().unwrap())
        .collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[test]
fn walker_visits_each_record_once() {
    let mut ccf = Ccf::new();
    let tv = ccf.create_device("TV");
    ccf.append_device(DeviceList::Normal, tv);
    let p = ccf.add_panel(tv, "Main");
    let b = ccf.add_button(p, "Power");
    ccf.append_button_action(b, Action::delay(10));

    let mut visited: Vec<NodeId> = Vec::new();
    walk(ccf.graph(), &mut |_: &ccfkit_codec::Graph, id: NodeId| {
        visited.push(id);
    });

    let mut dedup = visited.clone();
    dedup.sort_by_key(|id| format!("{id}"));
    dedup.dedup();
    assert_eq!(dedup.len(), visited.len());

    // header, 2 devices, 3 panels, child, button, list, action
    let types: Vec<NodeType> = visited
        .iter()
        .map(|&id| ccf.graph().node(id).node_type())
        .collect();
    assert!(types.contains(&NodeType::Header));
    assert!(types.contains(&NodeType::Button));
    assert!(types.contains(&NodeType::Action));
    assert_eq!(types.iter().filter(|&&t| t == NodeType::Device).count(), 2);
}

#[test]
fn gray_no_timers_header_decodes() {
    // hand-built header with the attribute position of the older
    // layout; the decoder must fall back instead of failing
    let mut bytes = vec![0u8; 80];
    bytes[44..48].copy_from_slice(&60u32.to_be_bytes());
    let ccf = Ccf::decode(&bytes).unwrap();
    assert!(ccf.devices(DeviceList::Home).is_empty());
    assert!(ccf.devices(DeviceList::Normal).is_empty());
}

#[test]
fn save_is_atomic_and_keeps_a_backup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("remote.ccf");

    let mut ccf = Ccf::new();
    ccf.save(&path).unwrap();
    let first = std::fs::read(&path).unwrap();

    let tv = ccf.create_device("TV");
    ccf.append_device(DeviceList::Normal, tv);
    ccf.save(&path).unwrap();
    let second = std::fs::read(&path).unwrap();

    assert_ne!(first, second);
    let backup = std::fs::read(path.with_extension("old")).unwrap();
    assert_eq!(backup, first);

    let mut reloaded = Ccf::load(&path).unwrap();
    assert!(reloaded.device_by_name("TV").is_some());
    assert!(reloaded.encode().unwrap().len() >= second.len() - 2);
}
