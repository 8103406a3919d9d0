//! Document codec boundary.

use std::collections::BTreeMap;
use std::io::Cursor;

use macprofile_canonical::Value;
use thiserror::Error;

/// Errors raised while encoding or decoding documents.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The underlying property-list library failed.
    #[error("plist error: {0}")]
    Plist(#[from] plist::Error),
    /// The input holds a value the document model cannot carry.
    #[error("unsupported value: {0}")]
    Unsupported(String),
}

/// Turns documents into bytes and back without losing keys or scalar types.
pub trait Codec {
    /// Serializes `value`.
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;
    /// Parses `bytes`.
    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;
}

/// Property-list codec: writes XML, reads XML or binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlistCodec;

impl Codec for PlistCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::new();
        to_plist(value)?.to_writer_xml(&mut bytes)?;
        Ok(bytes)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        let value = plist::Value::from_reader(Cursor::new(bytes))?;
        from_plist(value)
    }
}

fn to_plist(value: &Value) -> Result<plist::Value, CodecError> {
    Ok(match value {
        Value::String(s) => plist::Value::String(s.clone()),
        Value::Integer(i) => plist::Value::Integer((*i).into()),
        Value::Real(r) => plist::Value::Real(*r),
        Value::Boolean(b) => plist::Value::Boolean(*b),
        Value::Data(bytes) => plist::Value::Data(bytes.clone()),
        Value::Date(text) => plist::Value::Date(
            plist::Date::from_xml_format(text)
                .map_err(|_| CodecError::Unsupported(format!("date '{}'", text)))?,
        ),
        Value::Array(items) => {
            plist::Value::Array(items.iter().map(to_plist).collect::<Result<_, _>>()?)
        }
        Value::Dictionary(map) => {
            let mut dict = plist::Dictionary::new();
            for (key, child) in map {
                dict.insert(key.clone(), to_plist(child)?);
            }
            plist::Value::Dictionary(dict)
        }
    })
}

fn from_plist(value: plist::Value) -> Result<Value, CodecError> {
    Ok(match value {
        plist::Value::String(s) => Value::String(s),
        plist::Value::Integer(i) => Value::Integer(
            i.as_signed()
                .ok_or_else(|| CodecError::Unsupported(format!("integer {:?}", i)))?,
        ),
        plist::Value::Real(r) => Value::Real(r),
        plist::Value::Boolean(b) => Value::Boolean(b),
        plist::Value::Data(bytes) => Value::Data(bytes),
        plist::Value::Date(date) => Value::Date(date.to_xml_format()),
        plist::Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(from_plist)
                .collect::<Result<_, _>>()?,
        ),
        plist::Value::Dictionary(dict) => {
            let mut map = BTreeMap::new();
            for (key, child) in dict {
                map.insert(key, from_plist(child)?);
            }
            Value::Dictionary(map)
        }
        other => return Err(CodecError::Unsupported(format!("{:?}", other))),
    })
}
