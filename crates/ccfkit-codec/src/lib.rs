//! Schema-driven codec for the Pronto CCF configuration format.
//!
//! A CCF file is a flat byte heap holding an object graph - devices,
//! panels, buttons, frames, action lists, IR codes, and timers - linked
//! by 32-bit file-offset pointers. This crate rebuilds that graph into
//! an arena of typed records, tolerates and repairs minor structural
//! corruption, lets an editor restructure the graph, and re-linearizes
//! it with freshly assigned offsets and a CRC-16 trailer.
//!
//! The binary layout of every record type is declared as a static field
//! descriptor table; one generic decode loop and one generic encode
//! loop drive all types, with per-type hooks for the few behaviors the
//! tables cannot express (count clamping, pointer fix-ups, capability
//! dependent record lengths). Layout variants are selected by the
//! header's capability word.
//!
//! ```
//! use ccfkit_codec::{Ccf, DeviceList};
//!
//! let mut ccf = Ccf::new();
//! let tv = ccf.create_device("TV");
//! ccf.append_device(DeviceList::Normal, tv);
//! let bytes = ccf.encode().unwrap();
//! let again = Ccf::decode(&bytes).unwrap();
//! assert!(again.device_by_name("TV").is_some());
//! ```

pub mod caps;
mod ccf;
mod encode;
mod error;
mod graph;
pub mod nodes;
mod progress;
pub mod schema;
mod session;
mod tree;
mod walk;

pub use caps::{model_by_name, models_by_capability, Capabilities, ProntoModel, MODELS};
pub use ccf::{Ccf, DeviceList, HardKey};
pub use encode::encode;
pub use error::{Error, Result};
pub use graph::{Graph, Node, NodeId, Slot};
pub use progress::{NullSink, ProgressSink, ScopedSink};
pub use session::{decode, decode_with, InflateFn, CONTAINER_MAGIC, CONTAINER_MAGIC_OFFSET};
pub use tree::build as build_tree;
pub use walk::{walk, Visitor};
