//! ccfkit CLI - inspect and convert Pronto CCF configuration files.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use ccfkit_codec::nodes::ActionKind;
use ccfkit_codec::schema::NodeType;
use ccfkit_codec::{models_by_capability, walk, Ccf, DeviceList, Graph, NodeId, ProgressSink};

/// ccfkit - Pronto CCF configuration inspection tool
#[derive(Parser)]
#[command(name = "ccfkit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show header and record statistics for a CCF file
    Info {
        /// Path to the CCF file
        input: PathBuf,

        /// Emit machine-readable JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Print the device/panel/widget tree
    Tree {
        /// Path to the CCF file
        input: PathBuf,
    },

    /// Decode and re-encode a CCF file, dropping unreachable records
    Rewrite {
        /// Input CCF file
        input: PathBuf,

        /// Output CCF file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Extract IR codes as Pronto ASCII hex
    IrList {
        /// Path to the CCF file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Info { input, json } => info(input, json),
        Commands::Tree { input } => tree(input),
        Commands::Rewrite { input, output } => rewrite(input, output),
        Commands::IrList { input } => ir_list(input),
    }
}

/// Bridges codec progress onto an indicatif bar.
struct BarSink(ProgressBar);

impl BarSink {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template("{msg:24} [{bar:40.cyan/blue}] {pos:>3}%")
                .expect("static template")
                .progress_chars("=> "),
        );
        BarSink(bar)
    }

    fn finish(self) {
        self.0.finish_and_clear();
    }
}

impl ProgressSink for BarSink {
    fn on_percent(&mut self, percent: u8) {
        self.0.set_position(u64::from(percent));
    }

    fn on_message(&mut self, message: &str) {
        self.0.set_message(message.to_string());
    }
}

fn load(input: &PathBuf) -> Result<Ccf> {
    let bytes = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let mut sink = BarSink::new();
    let ccf = Ccf::decode_with(bytes, Some(&mut sink), None)
        .with_context(|| format!("decoding {}", input.display()))?;
    sink.finish();
    Ok(ccf)
}

#[derive(Default, Serialize)]
struct Stats {
    devices: usize,
    panels: usize,
    frames: usize,
    buttons: usize,
    action_lists: usize,
    actions: usize,
    ir_codes: usize,
    timers: usize,
    icons: usize,
}

#[derive(Serialize)]
struct InfoReport {
    version: Option<String>,
    capability: u32,
    models: Vec<&'static str>,
    color: bool,
    timers: bool,
    udb: bool,
    modified: String,
    stats: Stats,
}

fn gather(ccf: &Ccf) -> Stats {
    let mut stats = Stats::default();
    walk(ccf.graph(), &mut |graph: &Graph, id: NodeId| {
        match graph.node(id).node_type() {
            NodeType::Device => stats.devices += 1,
            NodeType::Panel => stats.panels += 1,
            NodeType::Frame => stats.frames += 1,
            NodeType::Button => stats.buttons += 1,
            NodeType::ActionList => stats.action_lists += 1,
            NodeType::Action => stats.actions += 1,
            NodeType::IrCode => stats.ir_codes += 1,
            NodeType::Timer => stats.timers += 1,
            NodeType::Icon => stats.icons += 1,
            NodeType::Header | NodeType::Child => {}
        }
    });
    stats
}

fn info(input: PathBuf, json: bool) -> Result<()> {
    let ccf = load(&input)?;
    let header = ccf.graph().header();
    let caps = ccf.caps();
    let report = InfoReport {
        version: header.version.clone(),
        capability: header.capability,
        models: models_by_capability(header.capability)
            .iter()
            .map(|m| m.name)
            .collect(),
        color: caps.has_color(),
        timers: caps.has_timers(),
        udb: caps.has_udb(),
        modified: format!(
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            header.year, header.month, header.day, header.hour, header.minute, header.seconds
        ),
        stats: gather(&ccf),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("version:    {}", report.version.as_deref().unwrap_or("?"));
    println!("capability: {:#010x}", report.capability);
    if report.models.is_empty() {
        println!("models:     (unknown)");
    } else {
        println!("models:     {}", report.models.join(", "));
    }
    println!(
        "features:   color={} timers={} udb={}",
        report.color, report.timers, report.udb
    );
    println!("modified:   {}", report.modified);
    let s = &report.stats;
    println!(
        "records:    {} devices, {} panels, {} frames, {} buttons",
        s.devices, s.panels, s.frames, s.buttons
    );
    println!(
        "            {} action lists, {} actions, {} ir codes, {} timers, {} icons",
        s.action_lists, s.actions, s.ir_codes, s.timers, s.icons
    );
    Ok(())
}

fn tree(input: PathBuf) -> Result<()> {
    let ccf = load(&input)?;
    for (label, list) in [
        ("home", DeviceList::Home),
        ("devices", DeviceList::Normal),
        ("macros", DeviceList::Macro),
    ] {
        let devices = ccf.devices(list);
        if devices.is_empty() {
            continue;
        }
        println!("[{label}]");
        for dev in devices {
            let name = ccf
                .graph()
                .node(dev)
                .as_device()
                .and_then(|d| d.name.clone())
                .unwrap_or_default();
            println!("  {name}");
            for panel in ccf.panels(dev) {
                let p = ccf.graph().node(panel).as_panel();
                let pname = p.and_then(|p| p.name.clone()).unwrap_or_default();
                let hidden = p.map(|p| p.hidden).unwrap_or(false);
                println!(
                    "    {}{}",
                    if hidden { format!("({pname})") } else { pname },
                    if p.map(|p| p.has_children()).unwrap_or(false) {
                        ""
                    } else {
                        " (empty)"
                    }
                );
                print_widgets(&ccf, panel, 6);
            }
        }
    }
    Ok(())
}

fn print_widgets(ccf: &Ccf, container: NodeId, indent: usize) {
    let children = match ccf.graph().node(container) {
        ccfkit_codec::Node::Panel(p) => p.children.clone(),
        ccfkit_codec::Node::Frame(f) => f.children.clone(),
        _ => return,
    };
    for slot in children {
        let Some(child) = ccf.graph().node(slot).as_child() else {
            continue;
        };
        let Some(payload) = child.payload else { continue };
        match ccf.graph().node(payload) {
            ccfkit_codec::Node::Button(b) => {
                let active = ccf.graph().button_is_active(payload);
                println!(
                    "{:indent$}[{}] {} @{},{}",
                    "",
                    if active { "btn*" } else { "btn" },
                    b.name.as_deref().unwrap_or(""),
                    child.x,
                    child.y,
                );
            }
            ccfkit_codec::Node::Frame(f) => {
                println!(
                    "{:indent$}[frame] {} @{},{}",
                    "",
                    f.name.as_deref().unwrap_or(""),
                    child.x,
                    child.y,
                );
                print_widgets(ccf, payload, indent + 2);
            }
            _ => {}
        }
    }
}

fn rewrite(input: PathBuf, output: PathBuf) -> Result<()> {
    let start = Instant::now();
    let mut ccf = load(&input)?;
    let mut sink = BarSink::new();
    let bytes = ccf
        .encode_with(Some(&mut sink))
        .with_context(|| format!("encoding {}", output.display()))?;
    sink.finish();
    fs::write(&output, &bytes).with_context(|| format!("writing {}", output.display()))?;
    println!(
        "wrote {} bytes to {} in {:.1?}",
        bytes.len(),
        output.display(),
        start.elapsed()
    );
    Ok(())
}

fn ir_list(input: PathBuf) -> Result<()> {
    let ccf = load(&input)?;
    walk(ccf.graph(), &mut |graph: &Graph, id: NodeId| {
        let node = graph.node(id);
        if let Some(action) = node.as_action() {
            if action.kind == ActionKind::IrCode {
                if let Some(ir) = action.ref2.and_then(|r| graph.node(r).as_ir_code()) {
                    println!("{}\t{}", ir.name.as_deref().unwrap_or("(unnamed)"), ir.code());
                }
            }
        }
    });
    Ok(())
}
