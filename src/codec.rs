//! Fixed-width record codec.
//!
//! Fields are extracted by byte offset and length, not by delimiter. Offsets
//! are byte positions even when field contents are multi-byte UTF-8; only the
//! slice boundaries are byte-indexed, the contents pass through unchanged.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("line is {len} bytes, schema requires at least {min}")]
    ShortLine { len: usize, min: usize },
}

/// One named field slot within a fixed-width line.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub length: usize,
    /// Required fields set the minimum line length; optional fields beyond
    /// the end of a line decode as empty.
    pub required: bool,
}

impl FieldSpec {
    pub const fn required(name: &'static str, offset: usize, length: usize) -> Self {
        Self {
            name,
            offset,
            length,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, offset: usize, length: usize) -> Self {
        Self {
            name,
            offset,
            length,
            required: false,
        }
    }
}

/// An ordered sequence of field slots describing one record layout.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    name: &'static str,
    fields: Vec<FieldSpec>,
    min_line_len: usize,
}

impl RecordSchema {
    pub fn new(name: &'static str, fields: Vec<FieldSpec>) -> Self {
        let min_line_len = fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.offset + f.length)
            .max()
            .unwrap_or(0);
        Self {
            name,
            fields,
            min_line_len,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Minimum byte length a line must have to decode.
    pub fn min_line_len(&self) -> usize {
        self.min_line_len
    }

    /// Decode one raw line into trimmed field values, in schema order.
    pub fn decode(&self, line: &str) -> Result<Vec<String>, DecodeError> {
        let bytes = line.as_bytes();
        if bytes.len() < self.min_line_len {
            return Err(DecodeError::ShortLine {
                len: bytes.len(),
                min: self.min_line_len,
            });
        }

        Ok(self
            .fields
            .iter()
            .map(|f| {
                let start = f.offset.min(bytes.len());
                let end = (f.offset + f.length).min(bytes.len());
                String::from_utf8_lossy(&bytes[start..end]).trim().to_string()
            })
            .collect())
    }

    /// Place field values into their byte slots, padding with spaces. Values
    /// longer than their slot are truncated to the slot's byte length.
    pub fn encode<S: AsRef<str>>(&self, values: &[S]) -> String {
        let total = self
            .fields
            .iter()
            .map(|f| f.offset + f.length)
            .max()
            .unwrap_or(0);
        let mut out = vec![b' '; total];
        for (field, value) in self.fields.iter().zip(values) {
            let bytes = value.as_ref().as_bytes();
            let take = bytes.len().min(field.length);
            out[field.offset..field.offset + take].copy_from_slice(&bytes[..take]);
        }
        String::from_utf8_lossy(&out).into_owned()
    }
}
