use std::collections::BTreeMap;

use crate::digest::digest;
use crate::document::{ProfileDocument, PAYLOAD_CONTENT, PAYLOAD_IDENTIFIER, PAYLOAD_UUID};
use crate::identity::{Identity, IdentityFormat, PatternFormat};
use crate::value::Value;

/// Fills in missing identities throughout a profile document.
///
/// Work is bottom-up: content elements receive their identity before the
/// document's own identity is derived, so the root digest covers them.
/// Existing identities are never recomputed, which makes normalization
/// idempotent.
pub struct Normalizer {
    format: Box<dyn IdentityFormat + Send + Sync>,
}

impl Normalizer {
    /// Creates a normalizer presenting identities through `format`.
    pub fn new(format: impl IdentityFormat + Send + Sync + 'static) -> Self {
        Self {
            format: Box::new(format),
        }
    }

    /// Format used to present identities.
    pub fn format(&self) -> &dyn IdentityFormat {
        self.format.as_ref()
    }

    /// Returns a copy of `document` where the root and every content element
    /// carry a `PayloadUUID`.
    ///
    /// `desired` seeds the root identity when the document has none.
    ///
    /// # Example
    ///
    /// ```rust
    /// use macprofile_canonical::{dict, Normalizer, PatternFormat, ProfileDocument};
    ///
    /// let normalizer = Normalizer::new(PatternFormat::uuid_upper());
    /// let doc = ProfileDocument::from_value(dict! {
    ///     "PayloadIdentifier" => "x",
    ///     "PayloadContent" => vec![dict! { "a" => 1i64 }],
    /// })?;
    ///
    /// let normalized = normalizer.normalize(&doc, None);
    /// assert!(normalized.identity().is_some());
    /// assert_eq!(normalizer.normalize(&normalized, None), normalized);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn normalize(&self, document: &ProfileDocument, desired: Option<&Identity>) -> ProfileDocument {
        let mut entries = document.entries().clone();
        self.fill_content(&mut entries);

        let root = match entries.get(PAYLOAD_UUID) {
            Some(existing) => self.present(existing),
            None => {
                let text = match desired {
                    Some(identity) => identity.to_string(),
                    None => digest(&Value::Dictionary(entries.clone()))
                        .hyphenated()
                        .to_string(),
                };
                Value::String(self.format.apply(&text))
            }
        };
        entries.insert(PAYLOAD_UUID.to_string(), root);

        ProfileDocument::new(entries)
    }

    fn fill_content(&self, entries: &mut BTreeMap<String, Value>) {
        let Some(Value::Array(elements)) = entries.get_mut(PAYLOAD_CONTENT) else {
            return;
        };

        for element in elements.iter_mut() {
            let Value::Dictionary(child) = element else {
                continue;
            };
            if child.contains_key(PAYLOAD_IDENTIFIER) {
                self.fill_content(child);
            }
            let identity = match child.get(PAYLOAD_UUID) {
                Some(existing) => self.present(existing),
                None => {
                    let derived = digest(&Value::Dictionary(child.clone()));
                    Value::String(self.format.apply(&derived.hyphenated().to_string()))
                }
            };
            child.insert(PAYLOAD_UUID.to_string(), identity);
        }
    }

    fn present(&self, existing: &Value) -> Value {
        match existing {
            Value::String(text) => Value::String(self.format.apply(text)),
            other => other.clone(),
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(PatternFormat::uuid_upper())
    }
}
