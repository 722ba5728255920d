//! JSON codec for manifest documents.
//!
//! A document is either a single record object or an array of record objects.
//! Decoding inspects the top-level shape and returns a [`Decoded`] saying which
//! one it found. Encoding is decided by the Rust type of the value: only
//! [`Encodable`] types compile against [`encode`], and [`encode_any`] downcasts
//! run-time values to the same set and rejects everything else.

use crate::record::FileRecord;
use serde_json::Value;
use std::any::Any;
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("cannot encode {found}: only file records and lists of file records are supported")]
    UnsupportedType { found: &'static str },
    #[error("expected a file record or a list of file records, found {found}")]
    UnexpectedShape { found: &'static str },
    #[error("expected {expected}, found {found}")]
    ShapeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A decoded document, tagged by its top-level shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Record(FileRecord),
    Records(Vec<FileRecord>),
}

impl Decoded {
    pub fn shape(&self) -> &'static str {
        match self {
            Decoded::Record(_) => "a single file record",
            Decoded::Records(_) => "a list of file records",
        }
    }

    pub fn into_record(self) -> Result<FileRecord, CodecError> {
        match self {
            Decoded::Record(record) => Ok(record),
            other => Err(CodecError::ShapeMismatch {
                expected: "a single file record",
                found: other.shape(),
            }),
        }
    }

    pub fn into_records(self) -> Result<Vec<FileRecord>, CodecError> {
        match self {
            Decoded::Records(records) => Ok(records),
            other => Err(CodecError::ShapeMismatch {
                expected: "a list of file records",
                found: other.shape(),
            }),
        }
    }
}

mod sealed {
    use crate::record::FileRecord;

    pub trait Sealed {}

    impl Sealed for FileRecord {}
    impl Sealed for [FileRecord] {}
    impl Sealed for Vec<FileRecord> {}
}

/// Types the codec can encode: a file record, or an ordered sequence of them.
///
/// Sealed. Other types with a similar JSON form are not records.
pub trait Encodable: sealed::Sealed {
    fn to_document(&self) -> Result<Value, CodecError>;
}

impl Encodable for FileRecord {
    fn to_document(&self) -> Result<Value, CodecError> {
        encode_record(self)
    }
}

impl Encodable for [FileRecord] {
    fn to_document(&self) -> Result<Value, CodecError> {
        encode_records(self)
    }
}

impl Encodable for Vec<FileRecord> {
    fn to_document(&self) -> Result<Value, CodecError> {
        encode_records(self)
    }
}

/// The JSON object for one record.
///
/// Fails only when `filename` is not valid UTF-8.
pub fn encode_record(record: &FileRecord) -> Result<Value, CodecError> {
    Ok(serde_json::to_value(record)?)
}

pub fn encode_records(records: &[FileRecord]) -> Result<Value, CodecError> {
    Ok(serde_json::to_value(records)?)
}

pub fn encode<T: Encodable + ?Sized>(value: &T) -> Result<Value, CodecError> {
    value.to_document()
}

/// Encode a value whose type is only known at run time.
///
/// Accepts a `FileRecord`, a `Vec<FileRecord>`, or a `Vec<Box<dyn Any>>`
/// whose every element is a `FileRecord`. A heterogeneous list is rejected
/// as a whole, before anything is encoded.
pub fn encode_any(value: &dyn Any) -> Result<Value, CodecError> {
    if let Some(record) = value.downcast_ref::<FileRecord>() {
        return encode_record(record);
    }
    if let Some(records) = value.downcast_ref::<Vec<FileRecord>>() {
        return encode_records(records);
    }
    if let Some(items) = value.downcast_ref::<Vec<Box<dyn Any>>>() {
        let records = items
            .iter()
            .map(|item| {
                (**item)
                    .downcast_ref::<FileRecord>()
                    .ok_or(CodecError::UnsupportedType {
                        found: "a list with an element that is not a file record",
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        return records
            .into_iter()
            .map(encode_record)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array);
    }
    Err(CodecError::UnsupportedType {
        found: "a value that is not a file record",
    })
}

/// Render an encoded document the way manifests are written to disk.
pub fn to_string_pretty(value: &Value) -> Result<String, CodecError> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

pub fn decode(text: &str) -> Result<Decoded, CodecError> {
    decode_value(serde_json::from_str(text)?)
}

pub fn decode_reader<R: Read>(reader: R) -> Result<Decoded, CodecError> {
    decode_value(serde_json::from_reader(reader)?)
}

pub fn decode_value(value: Value) -> Result<Decoded, CodecError> {
    match value {
        Value::Object(_) => Ok(Decoded::Record(serde_json::from_value(value)?)),
        Value::Array(_) => Ok(Decoded::Records(serde_json::from_value(value)?)),
        other => Err(CodecError::UnexpectedShape {
            found: json_type(&other),
        }),
    }
}

pub fn decode_record(text: &str) -> Result<FileRecord, CodecError> {
    decode(text)?.into_record()
}

pub fn decode_records(text: &str) -> Result<Vec<FileRecord>, CodecError> {
    decode(text)?.into_records()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
