use regex::Regex;
use std::fmt;
use uuid::Uuid;

use crate::validation::ValidationError;

/// Pattern accepted by [`PatternFormat::uuid_upper`].
pub const UUID_PATTERN: &str =
    r"^[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12}$";

/// Identity of a profile document.
///
/// Hyphenated UUID text parses into [`Identity::Uuid`] and compares by its 128
/// bits. Anything else is kept verbatim as [`Identity::Opaque`]; the live
/// system reports such identifiers for profiles installed by other tooling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// 128-bit identity.
    Uuid(Uuid),
    /// Free-form identifier compared as an exact string.
    Opaque(String),
}

impl Identity {
    /// Interprets identifier text.
    pub fn parse(text: &str) -> Self {
        if text.len() == uuid::fmt::Hyphenated::LENGTH {
            if let Ok(uuid) = Uuid::try_parse(text) {
                return Identity::Uuid(uuid);
            }
        }
        Identity::Opaque(text.to_string())
    }

    /// Renders the identity, applying `format`'s case rule.
    pub fn render(&self, format: &dyn IdentityFormat) -> String {
        format.apply(&self.to_string())
    }
}

impl From<Uuid> for Identity {
    fn from(value: Uuid) -> Self {
        Identity::Uuid(value)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::Uuid(uuid) => write!(f, "{}", uuid.hyphenated()),
            Identity::Opaque(text) => f.write_str(text),
        }
    }
}

/// Letter case used when presenting identities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LetterCase {
    /// `ABCDEF…`
    #[default]
    Upper,
    /// `abcdef…`
    Lower,
}

impl LetterCase {
    fn convert(self, text: &str) -> String {
        match self {
            LetterCase::Upper => text.to_uppercase(),
            LetterCase::Lower => text.to_lowercase(),
        }
    }
}

/// Decides how identity strings are presented.
///
/// Only identifiers already in the recognized form are re-cased; anything
/// else passes through untouched.
pub trait IdentityFormat {
    /// Whether `text` is in the form this deployment controls.
    fn recognizes(&self, text: &str) -> bool;

    /// Case applied to recognized identifiers.
    fn preferred_case(&self) -> LetterCase;

    /// Re-cases `text` when recognized.
    fn apply(&self, text: &str) -> String {
        if self.recognizes(text) {
            self.preferred_case().convert(text)
        } else {
            text.to_string()
        }
    }
}

/// Regex-backed [`IdentityFormat`].
#[derive(Debug, Clone)]
pub struct PatternFormat {
    pattern: Regex,
    case: LetterCase,
}

impl PatternFormat {
    /// Compiles `pattern`.
    pub fn new(pattern: &str, case: LetterCase) -> Result<Self, ValidationError> {
        let pattern = Regex::new(pattern).map_err(|err| ValidationError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self { pattern, case })
    }

    /// Hyphenated hex UUIDs, upper-cased.
    pub fn uuid_upper() -> Self {
        Self {
            pattern: Regex::new(UUID_PATTERN).expect("invalid regex"),
            case: LetterCase::Upper,
        }
    }
}

impl Default for PatternFormat {
    fn default() -> Self {
        Self::uuid_upper()
    }
}

impl IdentityFormat for PatternFormat {
    fn recognizes(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    fn preferred_case(&self) -> LetterCase {
        self.case
    }
}
