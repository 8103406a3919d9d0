//! Snapshot of the profiles installed on the live system.

use macprofile_canonical::{Identity, ProfileDocument, Value};

use crate::codec::Codec;
use crate::errors::StateError;
use crate::record::CurrentRecord;
use crate::runner::ProcessRunner;
use crate::tools::ProfileTools;

const PROFILE_IDENTIFIER: &str = "ProfileIdentifier";
const PROFILE_UUID: &str = "ProfileUUID";

/// Source of the current state.
pub trait StateSource {
    /// Point-in-time list of installed profiles.
    fn list_current_profiles(&self) -> Result<Vec<CurrentRecord>, StateError>;
}

/// Reads installed profiles from `profiles show`.
pub struct ProfilesCommandSource<'a> {
    runner: &'a dyn ProcessRunner,
    tools: &'a ProfileTools,
    codec: &'a dyn Codec,
}

impl<'a> ProfilesCommandSource<'a> {
    /// Creates a source decoding the listing with `codec`.
    pub fn new(runner: &'a dyn ProcessRunner, tools: &'a ProfileTools, codec: &'a dyn Codec) -> Self {
        Self {
            runner,
            tools,
            codec,
        }
    }
}

impl StateSource for ProfilesCommandSource<'_> {
    fn list_current_profiles(&self) -> Result<Vec<CurrentRecord>, StateError> {
        let output = self.runner.run(&self.tools.show())?;
        if !output.success() {
            return Err(StateError::Command {
                status: output.status,
                output: output.text(),
            });
        }
        if output.output.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        parse_listing(&self.codec.decode(&output.output)?)
    }
}

/// Extracts records from a listing shaped `{ scope: [ {ProfileIdentifier, ProfileUUID, ..} ] }`.
///
/// Every array-valued scope is read: computer-level and per-user alike.
pub fn parse_listing(listing: &Value) -> Result<Vec<CurrentRecord>, StateError> {
    let scopes = listing
        .as_dictionary()
        .ok_or_else(|| StateError::Malformed(format!("top level is {}", listing.type_tag())))?;

    let mut records = Vec::new();
    for (scope, profiles) in scopes {
        let Some(profiles) = profiles.as_array() else {
            tracing::debug!(scope = %scope, "skipping non-array scope");
            continue;
        };
        for profile in profiles {
            let name = profile.get(PROFILE_IDENTIFIER).and_then(Value::as_str);
            let identity = profile.get(PROFILE_UUID).and_then(Value::as_str);
            let (Some(name), Some(identity)) = (name, identity) else {
                tracing::warn!(scope = %scope, "profile entry without identifier or UUID");
                continue;
            };
            let raw = ProfileDocument::from_value(profile.clone())
                .map_err(|err| StateError::Malformed(err.to_string()))?;
            records.push(CurrentRecord {
                name: name.to_string(),
                identity: Identity::parse(identity),
                raw,
            });
        }
    }
    Ok(records)
}
