//! Typed view over the merged config document.
//!
//! Every field has a value in `defaults.yaml`, so extraction only fails when an
//! operator layer supplies the wrong type or an out-of-range value.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    pub nsx: NsxSettings,
    pub stores: StoreSettings,
    pub audit: AuditSettings,
    pub credentials: CredentialSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NsxSettings {
    pub scheme: String,
    pub api_prefix: String,
    pub request_timeout_secs: u64,
    pub tls: TlsSettings,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsSettings {
    /// Skip certificate verification. Lab managers only.
    pub accept_invalid_certs: bool,
}

/// Bounded exponential backoff for idempotent reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSettings {
    pub enabled: bool,
    pub path: Option<PathBuf>,
    pub hash_chain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSettings {
    /// NAME of the env var carrying the manager password.
    pub password_env: String,
}

impl EngineSettings {
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let settings: EngineSettings =
            serde_json::from_value(cfg.clone()).context("config does not match engine settings")?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        match self.nsx.scheme.as_str() {
            "http" | "https" => {}
            other => bail!("CONFIG_INVALID nsx.scheme must be http or https, got '{other}'"),
        }
        if !self.nsx.api_prefix.starts_with('/') {
            bail!(
                "CONFIG_INVALID nsx.api_prefix must start with '/', got '{}'",
                self.nsx.api_prefix
            );
        }
        if self.nsx.request_timeout_secs == 0 {
            bail!("CONFIG_INVALID nsx.request_timeout_secs must be at least 1");
        }
        self.nsx.retry.validate()?;
        if self.credentials.password_env.trim().is_empty() {
            bail!("CONFIG_INVALID credentials.password_env must name an env var");
        }
        Ok(())
    }

    /// Audit log location; relative to the state dir when not configured.
    pub fn audit_path(&self, state_dir: &Path) -> PathBuf {
        match &self.audit.path {
            Some(p) => p.clone(),
            None => state_dir.join("audit.jsonl"),
        }
    }
}

impl NsxSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            bail!("CONFIG_INVALID nsx.retry.max_attempts must be at least 1");
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            bail!(
                "CONFIG_INVALID nsx.retry.initial_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.initial_backoff_ms,
                self.max_backoff_ms
            );
        }
        Ok(())
    }

    /// Sleep before retry number `attempt` (1-based): doubles from the initial
    /// backoff and is capped at `max_backoff_ms`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(20);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(1u64 << shift)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}
