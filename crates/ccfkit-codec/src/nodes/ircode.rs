//! IR codes: raw infrared waveform payloads.
//!
//! The stored size field is the payload length plus a fixed six-byte
//! variance. On remotes with a user database the payload itself starts
//! with a six-byte UDB prefix; the prefix is added or stripped whenever
//! the record moves to a header with the opposite capability, which
//! changes the record's total length and must happen before placement.

use crate::caps::Capabilities;
use crate::schema::{blob, sptr, uint, Field, FieldDef, FieldValue};

/// Length of the optional user-database prefix inside the payload.
pub const UDB_PREFIX_LEN: usize = 6;

static TABLE: &[FieldDef] = &[
    uint(2, Field::Size),
    sptr(Field::Name),
    blob(Field::Size, -6, Field::Data),
];

/// A named infrared waveform.
#[derive(Debug, Default)]
pub struct IrCode {
    /// Payload length plus six; recomputed whenever the payload changes.
    pub size: u16,
    pub name: Option<String>,
    pub data: Vec<u8>,
    /// Whether the payload currently carries the UDB prefix.
    pub has_udb: bool,
}

impl IrCode {
    /// Create a code from its Pronto ASCII-hex form.
    pub fn from_code(name: &str, code: &str, has_udb: bool) -> Self {
        let mut ir = IrCode { name: Some(name.to_string()), has_udb, ..IrCode::default() };
        ir.set_code(code);
        ir
    }

    /// Replace the payload, keeping the size field in step.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.size = (data.len() + UDB_PREFIX_LEN) as u16;
        self.data = data;
    }

    /// Add or strip the UDB prefix to match `udb`.
    pub fn set_udb(&mut self, udb: bool) {
        if udb == self.has_udb || self.data.is_empty() {
            self.has_udb = udb;
            return;
        }
        if udb {
            let mut data = vec![0u8; UDB_PREFIX_LEN];
            data.extend_from_slice(&self.data);
            self.set_data(data);
        } else if self.data.len() >= UDB_PREFIX_LEN {
            let data = self.data[UDB_PREFIX_LEN..].to_vec();
            self.set_data(data);
        }
        self.has_udb = udb;
    }

    /// The Pronto ASCII-hex representation: two hex digits per byte,
    /// space-separated into 16-bit words.
    pub fn code(&self) -> String {
        let mut out = String::with_capacity(self.data.len() * 2 + self.data.len() / 2);
        for (i, b) in self.data.iter().enumerate() {
            out.push_str(&format!("{b:02x}"));
            if i % 2 == 1 && i + 1 < self.data.len() {
                out.push(' ');
            }
        }
        out
    }

    /// Parse a Pronto ASCII-hex string into the payload. Whitespace is
    /// ignored; a trailing odd digit is dropped.
    pub fn set_code(&mut self, hex: &str) {
        let digits: Vec<u8> = hex
            .chars()
            .filter(|c| !c.is_whitespace())
            .filter_map(|c| c.to_digit(16).map(|d| d as u8))
            .collect();
        let data = digits.chunks_exact(2).map(|p| (p[0] << 4) | p[1]).collect();
        self.set_data(data);
    }

    pub fn decode_table(&self, _caps: Capabilities) -> &'static [FieldDef] {
        TABLE
    }

    pub fn encode_table(&self, _caps: Capabilities) -> &'static [FieldDef] {
        TABLE
    }

    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Size => FieldValue::Int(self.size.into()),
            Field::Name => FieldValue::Str(self.name.clone()),
            Field::Data => FieldValue::Blob(self.data.clone()),
            _ => unreachable!("ir code has no field {field:?}"),
        }
    }

    pub fn put(&mut self, field: Field, value: FieldValue) {
        match field {
            Field::Size => self.size = value.as_int() as u16,
            Field::Name => self.name = value.into_str(),
            Field::Data => self.data = value.into_blob(),
            _ => unreachable!("ir code has no field {field:?}"),
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "ir-code,{},{},{}",
            self.name.as_deref().unwrap_or(""),
            self.size,
            if self.has_udb { "udb" } else { "noudb" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_round_trip() {
        let mut ir = IrCode::default();
        ir.set_code("0000 006c 0022 0002");
        assert_eq!(ir.data, vec![0x00, 0x00, 0x00, 0x6c, 0x00, 0x22, 0x00, 0x02]);
        assert_eq!(ir.code(), "0000 006c 0022 0002");
        assert_eq!(ir.size as usize, ir.data.len() + UDB_PREFIX_LEN);
    }

    #[test]
    fn test_udb_prefix_round_trip() {
        let mut ir = IrCode::from_code("power", "1234 5678", false);
        let plain = ir.data.clone();
        ir.set_udb(true);
        assert_eq!(ir.data.len(), plain.len() + UDB_PREFIX_LEN);
        assert_eq!(&ir.data[UDB_PREFIX_LEN..], &plain[..]);
        ir.set_udb(false);
        assert_eq!(ir.data, plain);
    }

    #[test]
    fn test_set_udb_idempotent() {
        let mut ir = IrCode::from_code("power", "1234", true);
        let before = ir.data.clone();
        ir.set_udb(true);
        assert_eq!(ir.data, before);
    }
}
