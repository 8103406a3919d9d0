//! Payload encryption for a certificate's owner.

use std::io::{self, Write};
use std::path::Path;

use crate::runner::ProcessRunner;
use crate::tools::ProfileTools;

/// Seals bytes for the holder of a certificate.
pub trait Encryptor {
    /// Encrypts `payload` for the PEM `certificate`, returning DER bytes.
    fn encrypt(&self, certificate: &[u8], payload: &[u8]) -> io::Result<Vec<u8>>;
}

/// CMS (PKCS#7 enveloped data, AES-128) via the `openssl` tool.
///
/// Inputs are staged in owner-only temporary files inside `scratch` and
/// deleted when the call returns.
pub struct CmsEncryptor<'a> {
    runner: &'a dyn ProcessRunner,
    tools: &'a ProfileTools,
    scratch: &'a Path,
}

impl<'a> CmsEncryptor<'a> {
    /// Creates an encryptor staging files under `scratch`.
    pub fn new(runner: &'a dyn ProcessRunner, tools: &'a ProfileTools, scratch: &'a Path) -> Self {
        Self {
            runner,
            tools,
            scratch,
        }
    }

    fn stage(&self, bytes: &[u8]) -> io::Result<tempfile::NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix(".stage-")
            .tempfile_in(self.scratch)?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(file)
    }
}

impl Encryptor for CmsEncryptor<'_> {
    fn encrypt(&self, certificate: &[u8], payload: &[u8]) -> io::Result<Vec<u8>> {
        let recipient = self.stage(certificate)?;
        let input = self.stage(payload)?;
        let output = self.stage(&[])?;

        let result = self
            .runner
            .run(&self.tools.encrypt(recipient.path(), input.path(), output.path()))?;
        if !result.success() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("openssl exited with {}: {}", result.status, result.text()),
            ));
        }

        let sealed = std::fs::read(output.path())?;
        if sealed.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "openssl produced no output",
            ));
        }
        Ok(sealed)
    }
}
