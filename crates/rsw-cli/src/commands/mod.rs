//! Command handlers for `rsw`.
//!
//! Shared session setup lives here: config loading, state dir, manager client
//! and audit log. Handlers return an [`Outcome`]; setup and I/O failures are
//! errors and map to exit code 2 in `main`.

pub mod audit;
pub mod pair;
pub mod setup;
pub mod swap;

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use uuid::Uuid;

use rsw_audit::{AuditEventType, AuditWriter};
use rsw_config::{report_unused_keys, EngineSettings, LoadedConfig, UnusedKeyPolicy};
use rsw_nsx::NsxClient;
use rsw_reconcile::{Baseline, ParameterSet, ReconciliationResult};
use rsw_store::StateDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Authorized, applied, or informational success.
    Done,
    /// Rejected or apply failed; the result has been printed.
    Refused,
}

impl Outcome {
    pub fn of(result: &ReconciliationResult) -> Self {
        if result.authorized {
            Outcome::Done
        } else {
            Outcome::Refused
        }
    }

    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Done => ExitCode::SUCCESS,
            Outcome::Refused => ExitCode::from(1),
        }
    }
}

/// Everything one invocation needs, built once at start.
pub struct Session {
    pub config: LoadedConfig,
    pub settings: EngineSettings,
    pub state: StateDir,
    pub json: bool,
    pub invocation_id: Uuid,
}

impl Session {
    pub fn load(
        config_paths: &[String],
        state_dir: Option<PathBuf>,
        strict_config: bool,
        json: bool,
    ) -> Result<Self> {
        let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
        let config = rsw_config::load_engine_config(&path_refs)?;

        let policy = if strict_config {
            UnusedKeyPolicy::Fail
        } else {
            UnusedKeyPolicy::Warn
        };
        let report = report_unused_keys(&config.config_json, policy)?;
        if !report.is_clean() {
            tracing::warn!(keys = ?report.unused_leaf_pointers, "config keys not read by rsw");
        }

        let settings = config.settings()?;
        let state = StateDir::new(state_dir.unwrap_or_else(|| settings.stores.dir.clone()));
        let invocation_id = Uuid::new_v4();
        tracing::debug!(
            config_hash = %config.config_hash,
            state_dir = %state.root().display(),
            %invocation_id,
            "session ready"
        );

        Ok(Self {
            config,
            settings,
            state,
            json,
            invocation_id,
        })
    }

    /// Client for the stored manager. Fails when credentials are missing.
    pub fn client(&self) -> Result<NsxClient> {
        let creds = self.state.load_credentials()?;
        tracing::info!(
            host = %creds.target_host,
            user = %creds.username,
            config_hash = %self.config.config_hash,
            "connecting to manager"
        );
        NsxClient::new(&creds.target_host, &creds.auth_header(), &self.settings.nsx)
    }

    /// Stores a pair command needs, loaded before any network call so a
    /// missing one stops the run immediately.
    pub fn pair_inputs(&self) -> Result<(NsxClient, ParameterSet)> {
        let params = self.state.load_parameters()?;
        let client = self.client()?;
        Ok((client, params))
    }

    /// Stores a swap needs plus the audit writer. Everything that can fail
    /// locally fails here, before any router is touched.
    pub fn swap_session(&self) -> Result<(NsxClient, ParameterSet, Baseline, Option<AuditWriter>)> {
        let (client, params, baseline) = self.swap_inputs()?;
        let audit = self.open_audit()?;
        Ok((client, params, baseline, audit))
    }

    pub fn swap_inputs(&self) -> Result<(NsxClient, ParameterSet, Baseline)> {
        let params = self.state.load_parameters()?;
        let baseline = self.state.load_baseline()?;
        let client = self.client()?;
        Ok((client, params, baseline))
    }

    /// Audit writer for this run, or `None` when auditing is off. Opening
    /// reads the existing log, so a damaged log fails here.
    pub fn open_audit(&self) -> Result<Option<AuditWriter>> {
        if !self.settings.audit.enabled {
            return Ok(None);
        }
        let path = self.settings.audit_path(self.state.root());
        let writer = AuditWriter::open(&path, self.settings.audit.hash_chain, self.invocation_id)
            .with_context(|| format!("open audit log failed: {}", path.display()))?;
        Ok(Some(writer))
    }

    /// Append one event to the audit log, when enabled.
    pub fn record(&self, event_type: AuditEventType, payload: Value) -> Result<()> {
        if let Some(mut writer) = self.open_audit()? {
            writer.append(event_type, payload)?;
        }
        Ok(())
    }

    /// Message, or the whole result under `--json`.
    pub fn emit(&self, result: &ReconciliationResult) -> Result<()> {
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(result).context("serialize result failed")?
            );
        } else {
            println!("{}", result.message);
        }
        Ok(())
    }
}
