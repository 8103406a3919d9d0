//! Name-based identity derivation.
//!
//! Identities are computed as `sha1(namespace_text || signature(value))`,
//! truncated to 128 bits and stamped as a version 5 UUID.

use sha1::{Digest as Sha1Digest, Sha1};
use uuid::Uuid;

use crate::value::Value;

/// Namespace shared by every profile identity.
pub const PROFILE_NAMESPACE: Uuid = Uuid::from_u128(0x3bc0480c_fdca_4351_afd1_d7d6ccad24ea);

const VERSION: u8 = 5;

/// Derives the identity of `value` within [`PROFILE_NAMESPACE`].
///
/// # Example
///
/// ```rust
/// use macprofile_canonical::{digest, dict};
///
/// let one = digest(&dict! { "a" => 1i64, "b" => 2i64 });
/// let two = digest(&dict! { "b" => 2i64, "a" => 1i64 });
/// assert_eq!(one, two);
/// assert_eq!(one.get_version_num(), 5);
/// ```
pub fn digest(value: &Value) -> Uuid {
    digest_in(&PROFILE_NAMESPACE, value)
}

/// Derives the identity of `value` within an arbitrary namespace.
///
/// The namespace enters the hash as its upper-case hyphenated text.
pub fn digest_in(namespace: &Uuid, value: &Value) -> Uuid {
    let mut namespace_text = [0u8; uuid::fmt::Hyphenated::LENGTH];
    let namespace_text = namespace.hyphenated().encode_upper(&mut namespace_text);

    let mut hasher = Sha1::new();
    hasher.update(namespace_text.as_bytes());
    hasher.update(value.signature());
    let hash = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);
    bytes[6] = (bytes[6] & 0x0f) | (VERSION << 4);
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    Uuid::from_bytes(bytes)
}
