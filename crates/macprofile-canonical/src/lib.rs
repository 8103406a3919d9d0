//! Canonical primitives for configuration profiles.
//!
//! A profile document is a dynamically typed [`Value`] tree. Its identity is
//! derived from content alone: the tree is flattened into an order-independent
//! signature and hashed into a version 5 UUID under a fixed namespace, so the
//! same content yields the same identity wherever it is computed.
//!
#![deny(missing_docs)]

/// Name-based identity derivation.
pub mod digest;
/// Profile document wrapper and well-known payload keys.
pub mod document;
/// Identity type and presentation rules.
pub mod identity;
/// Bottom-up identity assignment for documents.
pub mod normalizer;
/// Validation helpers used by canonical types.
pub mod validation;
/// Dynamically typed value tree.
pub mod value;

pub use digest::{digest, digest_in, PROFILE_NAMESPACE};
pub use document::{
    validate_profile_name, DocumentError, ProfileDocument, ENCRYPTED_PAYLOAD_CONTENT,
    PAYLOAD_CONTENT, PAYLOAD_IDENTIFIER, PAYLOAD_UUID,
};
pub use identity::{Identity, IdentityFormat, LetterCase, PatternFormat, UUID_PATTERN};
pub use normalizer::Normalizer;
pub use uuid::Uuid;
pub use validation::ValidationError;
pub use value::Value;
