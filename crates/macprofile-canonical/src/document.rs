use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::identity::Identity;
use crate::validation::ValidationError;
use crate::value::Value;

/// Key holding the document's stable name.
pub const PAYLOAD_IDENTIFIER: &str = "PayloadIdentifier";
/// Key holding the nested content elements.
pub const PAYLOAD_CONTENT: &str = "PayloadContent";
/// Key holding the document's identity.
pub const PAYLOAD_UUID: &str = "PayloadUUID";
/// Key holding encrypted content once `PayloadContent` has been sealed.
pub const ENCRYPTED_PAYLOAD_CONTENT: &str = "EncryptedPayloadContent";

const PROFILE_NAME_PATTERN: &str = r"^[a-zA-Z0-9][a-zA-Z0-9\-\.]+[a-zA-Z0-9]$";

static PROFILE_NAME: OnceLock<Regex> = OnceLock::new();

/// Error raised when a value cannot act as a profile document.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DocumentError {
    /// The top-level value is not a dictionary.
    #[error("profile document must be a dictionary, found {0}")]
    NotADictionary(&'static str),
}

/// A profile document: a dictionary with well-known payload keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileDocument(BTreeMap<String, Value>);

impl ProfileDocument {
    /// Wraps a dictionary.
    pub fn new(entries: BTreeMap<String, Value>) -> Self {
        Self(entries)
    }

    /// Accepts `value` if it is a dictionary.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::Dictionary(map) => Ok(Self(map)),
            other => Err(DocumentError::NotADictionary(other.type_tag())),
        }
    }

    /// `PayloadIdentifier`, when it is a string.
    pub fn identifier(&self) -> Option<&str> {
        self.0.get(PAYLOAD_IDENTIFIER).and_then(Value::as_str)
    }

    /// `PayloadUUID` text, when it is a string.
    pub fn identity_text(&self) -> Option<&str> {
        self.0.get(PAYLOAD_UUID).and_then(Value::as_str)
    }

    /// Parsed `PayloadUUID`.
    pub fn identity(&self) -> Option<Identity> {
        self.identity_text().map(Identity::parse)
    }

    /// `PayloadContent`, when it is an array.
    pub fn content_elements(&self) -> Option<&[Value]> {
        self.0.get(PAYLOAD_CONTENT).and_then(Value::as_array)
    }

    /// Looks up an arbitrary key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Sets an arbitrary key, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// Removes an arbitrary key.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Borrowed entries.
    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.0
    }

    /// Copies the document into a [`Value::Dictionary`].
    pub fn to_value(&self) -> Value {
        Value::Dictionary(self.0.clone())
    }

    /// Converts the document into a [`Value::Dictionary`].
    pub fn into_value(self) -> Value {
        Value::Dictionary(self.0)
    }
}

impl From<ProfileDocument> for Value {
    fn from(value: ProfileDocument) -> Self {
        value.into_value()
    }
}

impl TryFrom<Value> for ProfileDocument {
    type Error = DocumentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// Checks a profile name (`com.example.wifi`) against the accepted shape.
pub fn validate_profile_name(name: &str) -> Result<(), ValidationError> {
    let pattern =
        PROFILE_NAME.get_or_init(|| Regex::new(PROFILE_NAME_PATTERN).expect("invalid regex"));
    if !pattern.is_match(name) {
        return Err(ValidationError::PatternMismatch {
            field: "name",
            value: name.to_string(),
        });
    }
    Ok(())
}
