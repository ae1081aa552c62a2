//! Icons: opaque bitmap payloads.
//!
//! Icons round-trip as raw blobs; pixel decoding is out of scope. The
//! stored size covers the record's fixed fields, so the blob length is
//! the size minus eight (ten on custom layouts, whose size field widens
//! to four bytes).

use crate::caps::Capabilities;
use crate::schema::{blob, uint, Field, FieldDef, FieldValue};

/// Type bit: payload is run-length compressed.
pub const ICON_COMPRESS: u16 = 1 << 15;
/// Type bits: 4-level grayscale image.
pub const ICON_COLOR_4: u16 = 1 << 8;
/// Type bits: 256-color image.
pub const ICON_COLOR_256: u16 = (1 << 0) | (1 << 9) | (1 << 10) | ICON_COLOR_4;
/// Type bits: full-color image (custom layouts).
pub const ICON_COLOR_FULL: u16 = (1 << 7) | ICON_COLOR_256;

static NORMAL: &[FieldDef] = &[
    uint(2, Field::Size),
    uint(2, Field::Width),
    uint(2, Field::Height),
    uint(2, Field::IconType),
    blob(Field::Size, -8, Field::Data),
];

static CUSTOM: &[FieldDef] = &[
    uint(4, Field::Size),
    uint(2, Field::Width),
    uint(2, Field::Height),
    uint(2, Field::IconType),
    blob(Field::Size, -10, Field::Data),
];

/// An opaque bitmap record.
#[derive(Debug, Default)]
pub struct Icon {
    pub size: u32,
    pub width: u16,
    pub height: u16,
    pub icon_type: u16,
    pub data: Vec<u8>,
}

impl Icon {
    pub fn is_compressed(&self) -> bool {
        self.icon_type & ICON_COMPRESS == ICON_COMPRESS
    }

    pub fn is_full_color(&self) -> bool {
        self.icon_type & ICON_COLOR_FULL == ICON_COLOR_FULL
    }

    pub fn is_color(&self) -> bool {
        self.icon_type & ICON_COLOR_256 == ICON_COLOR_256
    }

    pub fn is_gray(&self) -> bool {
        self.icon_type & ICON_COLOR_4 == ICON_COLOR_4
    }

    /// Replace the payload, keeping the size field in step with the
    /// record's fixed-field overhead.
    pub fn set_data(&mut self, data: Vec<u8>, custom: bool) {
        self.size = (data.len() + if custom { 10 } else { 8 }) as u32;
        self.data = data;
    }

    pub fn decode_table(&self, caps: Capabilities) -> &'static [FieldDef] {
        layout(caps)
    }

    pub fn encode_table(&self, caps: Capabilities) -> &'static [FieldDef] {
        layout(caps)
    }

    pub fn get(&self, field: Field) -> FieldValue {
        match field {
            Field::Size => FieldValue::Int(self.size.into()),
            Field::Width => FieldValue::Int(self.width.into()),
            Field::Height => FieldValue::Int(self.height.into()),
            Field::IconType => FieldValue::Int(self.icon_type.into()),
            Field::Data => FieldValue::Blob(self.data.clone()),
            _ => unreachable!("icon has no field {field:?}"),
        }
    }

    pub fn put(&mut self, field: Field, value: FieldValue) {
        match field {
            Field::Size => self.size = value.as_int() as u32,
            Field::Width => self.width = value.as_int() as u16,
            Field::Height => self.height = value.as_int() as u16,
            Field::IconType => self.icon_type = value.as_int() as u16,
            Field::Data => self.data = value.into_blob(),
            _ => unreachable!("icon has no field {field:?}"),
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "icon,{}x{},{}{}",
            self.width,
            self.height,
            if self.is_compressed() { "compressed " } else { "" },
            if self.is_full_color() {
                "fullColor"
            } else if self.is_color() {
                "color"
            } else if self.is_gray() {
                "gray"
            } else {
                "b&w"
            }
        )
    }
}

fn layout(caps: Capabilities) -> &'static [FieldDef] {
    if caps.is_custom() {
        CUSTOM
    } else {
        NORMAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_data_size() {
        let mut icon = Icon::default();
        icon.set_data(vec![0; 100], false);
        assert_eq!(icon.size, 108);
        icon.set_data(vec![0; 100], true);
        assert_eq!(icon.size, 110);
    }

    #[test]
    fn test_type_flags() {
        let icon = Icon { icon_type: ICON_COMPRESS | ICON_COLOR_4, ..Icon::default() };
        assert!(icon.is_compressed());
        assert!(icon.is_gray());
        assert!(!icon.is_color());
    }
}
