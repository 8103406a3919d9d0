//! Command lines of the external programs the pipeline drives.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Locations of the external programs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileTools {
    /// Profile installer/lister.
    pub profiles: PathBuf,
    /// Keychain and CMS signing tool.
    pub security: PathBuf,
    /// CMS encryption tool.
    pub openssl: PathBuf,
}

impl Default for ProfileTools {
    fn default() -> Self {
        Self {
            profiles: PathBuf::from("/usr/bin/profiles"),
            security: PathBuf::from("/usr/bin/security"),
            openssl: PathBuf::from("/usr/bin/openssl"),
        }
    }
}

fn text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn argv(program: &Path, args: &[&str]) -> Vec<String> {
    std::iter::once(text(program))
        .chain(args.iter().map(|arg| arg.to_string()))
        .collect()
}

impl ProfileTools {
    /// Lists installed configuration profiles as an XML plist.
    pub fn show(&self) -> Vec<String> {
        argv(
            &self.profiles,
            &["show", "-type", "configuration", "-output", "stdout-xml"],
        )
    }

    /// Installs the profile at `path`.
    pub fn install(&self, path: &Path) -> Vec<String> {
        argv(
            &self.profiles,
            &["install", "-type", "configuration", "-path", &text(path)],
        )
    }

    /// Removes the profile called `name`.
    pub fn remove(&self, name: &str) -> Vec<String> {
        argv(
            &self.profiles,
            &["remove", "-type", "configuration", "-identifier", name],
        )
    }

    /// Prints the PEM certificate labelled `label`.
    pub fn find_certificate(&self, label: &str) -> Vec<String> {
        argv(&self.security, &["find-certificate", "-c", label, "-p"])
    }

    /// Signs `input` into `output` with the identity labelled `label`.
    pub fn sign(&self, label: &str, input: &Path, output: &Path) -> Vec<String> {
        argv(
            &self.security,
            &["cms", "-S", "-N", label, "-i", &text(input), "-o", &text(output)],
        )
    }

    /// Encrypts `input` for the PEM certificate at `recipient` into DER `output`.
    pub fn encrypt(&self, recipient: &Path, input: &Path, output: &Path) -> Vec<String> {
        argv(
            &self.openssl,
            &[
                "cms",
                "-encrypt",
                "-binary",
                "-aes128",
                "-outform",
                "DER",
                "-in",
                &text(input),
                "-out",
                &text(output),
                &text(recipient),
            ],
        )
    }
}
