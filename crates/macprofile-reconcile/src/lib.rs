//! Reconciliation of configuration profiles against the live system.
//!
//! This crate provides:
//! - Desired/current records and the identity-based decision table ([`plan`])
//! - The apply [`Pipeline`]: materialize, encrypt, sign, install or remove
//! - Collaborator seams for process execution, certificate lookup,
//!   encryption, the document codec and the system state listing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::collections::BTreeMap;
//!
//! use macprofile_canonical::{dict, Normalizer, ProfileDocument};
//! use macprofile_reconcile::{
//!     index_current, plan, CmsEncryptor, DesiredRecord, KeychainTrustStore, Pipeline,
//!     PlistCodec, ProfileTools, ProfilesCommandSource, StateSource, SystemRunner, WorkingDir,
//! };
//!
//! let normalizer = Normalizer::default();
//! let document = ProfileDocument::from_value(dict! {
//!     "PayloadIdentifier" => "com.example.wifi",
//!     "PayloadContent" => vec![dict! { "SSID_STR" => "example" }],
//! })?;
//! let record = DesiredRecord::new("com.example.wifi", Some(document)).normalize(&normalizer);
//! let desired = BTreeMap::from([(record.name.clone(), record)]);
//!
//! let tools = ProfileTools::default();
//! let runner = SystemRunner;
//! let codec = PlistCodec;
//! let current = ProfilesCommandSource::new(&runner, &tools, &codec).list_current_profiles()?;
//! let actions = plan(&desired, &index_current(current));
//!
//! let workdir = WorkingDir::acquire("/var/lib/macprofile/mobileconfigs")?;
//! let trust = KeychainTrustStore::new(&runner, &tools);
//! let encryptor = CmsEncryptor::new(&runner, &tools, workdir.root());
//! let pipeline = Pipeline::new(&workdir, &runner, &trust, &encryptor, &codec, &tools);
//! let report = pipeline.apply(&actions);
//! for (name, err) in report.failures() {
//!     eprintln!("{}: {}", name, err);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(missing_docs)]

/// Document codec boundary.
pub mod codec;
/// Payload encryption.
pub mod encrypt;
/// Error types for planning and applying.
pub mod errors;
/// Apply pipeline.
pub mod pipeline;
/// Decision table.
pub mod plan;
/// Desired and current records.
pub mod record;
/// Process execution abstraction.
pub mod runner;
/// Live system state.
pub mod state;
/// External program command lines.
pub mod tools;
/// Certificate lookup.
pub mod trust;
/// Owner-only artifact directory.
pub mod workdir;

pub use codec::{Codec, CodecError, PlistCodec};
pub use encrypt::{CmsEncryptor, Encryptor};
pub use errors::{ApplyError, Stage, StateError, ValidationFailure};
pub use pipeline::{Applied, Outcome, PassReport, Pipeline};
pub use plan::{index_current, plan, Action, ActionKind};
pub use record::{CurrentRecord, DesiredRecord, Ensure, Mode};
pub use runner::{MockRunner, ProcessOutput, ProcessRunner, SystemRunner};
pub use state::{parse_listing, ProfilesCommandSource, StateSource};
pub use tools::ProfileTools;
pub use trust::{KeychainTrustStore, StaticTrustStore, TrustStore};
pub use workdir::{Artifact, ArtifactVariant, WorkingDir};
