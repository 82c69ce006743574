//! rsw-store
//!
//! The three JSON documents a failover run reads from its state directory:
//! credentials, pair parameters and the captured baseline. Setup commands write
//! them; every other command loads them and stops with a `MissingStore` error
//! naming the setup command when one is absent.

mod credentials;
mod documents;

pub use credentials::StoredCredentials;
pub use documents::{capture_baseline, validate_parameters, BaselineRecord, ParametersDoc};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use rsw_reconcile::{Baseline, ParameterSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Credentials,
    Parameters,
    Baseline,
}

impl StoreKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            StoreKind::Credentials => "credentials.json",
            StoreKind::Parameters => "parameters.json",
            StoreKind::Baseline => "baseline.json",
        }
    }

    /// Operator command that creates this document.
    pub fn setup_command(&self) -> &'static str {
        match self {
            StoreKind::Credentials => "set-user",
            StoreKind::Parameters => "set-params",
            StoreKind::Baseline => "capture-baseline",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Credentials => "credential",
            StoreKind::Parameters => "parameter",
            StoreKind::Baseline => "baseline",
        }
    }
}

/// Store failures the CLI reports as missing or invalid configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    MissingStore { kind: StoreKind, path: PathBuf },
    Corrupt { kind: StoreKind, path: PathBuf, reason: String },
    Invalid(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::MissingStore { kind, path } => write!(
                f,
                "{} store not found at {} - run `rsw {}` first",
                kind.as_str(),
                path.display(),
                kind.setup_command()
            ),
            StoreError::Corrupt { kind, path, reason } => write!(
                f,
                "{} store at {} is unreadable ({reason}) - re-run `rsw {}`",
                kind.as_str(),
                path.display(),
                kind.setup_command()
            ),
            StoreError::Invalid(msg) => write!(f, "invalid store contents: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Handle on the state directory.
#[derive(Debug, Clone)]
pub struct StateDir {
    root: PathBuf,
}

impl StateDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, kind: StoreKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    pub fn exists(&self, kind: StoreKind) -> bool {
        self.path(kind).exists()
    }

    pub fn write_credentials(&self, creds: &StoredCredentials) -> Result<PathBuf> {
        self.write_doc(StoreKind::Credentials, creds)
    }

    pub fn load_credentials(&self) -> Result<StoredCredentials> {
        self.read_doc(StoreKind::Credentials)
    }

    /// Validates before writing; an invalid pair leaves the old document in place.
    pub fn write_parameters(&self, params: &ParameterSet) -> Result<PathBuf> {
        validate_parameters(params)?;
        self.write_doc(StoreKind::Parameters, &ParametersDoc::new(params.clone()))
    }

    pub fn load_parameters(&self) -> Result<ParameterSet> {
        let doc: ParametersDoc = self.read_doc(StoreKind::Parameters)?;
        validate_parameters(&doc.params)?;
        Ok(doc.params)
    }

    pub fn write_baseline(&self, record: &BaselineRecord) -> Result<PathBuf> {
        self.write_doc(StoreKind::Baseline, record)
    }

    pub fn load_baseline_record(&self) -> Result<BaselineRecord> {
        self.read_doc(StoreKind::Baseline)
    }

    pub fn load_baseline(&self) -> Result<Baseline> {
        Ok(self.load_baseline_record()?.baseline())
    }

    fn read_doc<T: DeserializeOwned>(&self, kind: StoreKind) -> Result<T> {
        let path = self.path(kind);
        if !path.exists() {
            return Err(StoreError::MissingStore { kind, path }.into());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("read {} store failed: {}", kind.as_str(), path.display()))?;
        serde_json::from_str(&raw).map_err(|e| {
            StoreError::Corrupt {
                kind,
                path,
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Pretty JSON, written to a sibling temp file then renamed over the target
    /// so a crash never leaves a half-written document.
    fn write_doc<T: Serialize>(&self, kind: StoreKind, doc: &T) -> Result<PathBuf> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("create state dir failed: {}", self.root.display()))?;

        let path = self.path(kind);
        let tmp = self.root.join(format!(".{}.tmp", kind.file_name()));
        let json = serde_json::to_string_pretty(doc)
            .with_context(|| format!("serialize {} store failed", kind.as_str()))?;
        fs::write(&tmp, format!("{json}\n"))
            .with_context(|| format!("write {} store failed: {}", kind.as_str(), tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("replace {} store failed: {}", kind.as_str(), path.display()))?;

        tracing::info!(store = kind.as_str(), path = %path.display(), "store written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_store_names_the_setup_command() {
        let err = StoreError::MissingStore {
            kind: StoreKind::Baseline,
            path: PathBuf::from("/state/baseline.json"),
        };
        assert_eq!(
            err.to_string(),
            "baseline store not found at /state/baseline.json - run `rsw capture-baseline` first"
        );
    }

    #[test]
    fn each_kind_has_its_own_file() {
        let dir = StateDir::new("/state");
        assert_eq!(dir.path(StoreKind::Credentials), Path::new("/state/credentials.json"));
        assert_eq!(dir.path(StoreKind::Parameters), Path::new("/state/parameters.json"));
        assert_eq!(dir.path(StoreKind::Baseline), Path::new("/state/baseline.json"));
    }
}
