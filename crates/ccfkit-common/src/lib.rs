//! Common utilities for ccfkit.
//!
//! This crate provides the foundational types used across all ccfkit crates:
//!
//! - [`BinaryReader`] - big-endian cursor over a byte slice
//! - [`BinaryWriter`] - growable big-endian output buffer with random access
//! - [`crc`] - CRC-16/CCITT checksum used by the CCF trailer

mod error;
mod reader;
mod writer;

pub mod crc;

pub use error::{Error, Result};
pub use reader::BinaryReader;
pub use writer::BinaryWriter;
