//! Certificate lookup.

use std::collections::BTreeMap;
use std::io;

use crate::runner::ProcessRunner;
use crate::tools::ProfileTools;

/// Resolves certificate labels to PEM bytes.
pub trait TrustStore {
    /// Certificate labelled `label`, or `None` when the store has none.
    fn find_certificate(&self, label: &str) -> io::Result<Option<Vec<u8>>>;
}

/// Trust store backed by the system keychain.
pub struct KeychainTrustStore<'a> {
    runner: &'a dyn ProcessRunner,
    tools: &'a ProfileTools,
}

impl<'a> KeychainTrustStore<'a> {
    /// Creates a store running lookups through `runner`.
    pub fn new(runner: &'a dyn ProcessRunner, tools: &'a ProfileTools) -> Self {
        Self { runner, tools }
    }
}

impl TrustStore for KeychainTrustStore<'_> {
    fn find_certificate(&self, label: &str) -> io::Result<Option<Vec<u8>>> {
        let output = self.runner.run(&self.tools.find_certificate(label))?;
        if !output.success() || output.output.is_empty() {
            tracing::debug!(label, status = output.status, "certificate not found");
            return Ok(None);
        }
        Ok(Some(output.output))
    }
}

/// Fixed in-memory trust store.
#[derive(Debug, Clone, Default)]
pub struct StaticTrustStore {
    certificates: BTreeMap<String, Vec<u8>>,
}

impl StaticTrustStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a certificate under `label`.
    pub fn with_certificate(mut self, label: impl Into<String>, pem: impl Into<Vec<u8>>) -> Self {
        self.certificates.insert(label.into(), pem.into());
        self
    }
}

impl TrustStore for StaticTrustStore {
    fn find_certificate(&self, label: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.certificates.get(label).cloned())
    }
}
