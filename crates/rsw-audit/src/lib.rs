//! rsw-audit
//!
//! Append-only JSON Lines record of every outcome an operator may need to
//! recover from: baseline captures, applied swaps, failed applies (including
//! the partial case) and refused swaps. Each event carries the pre-images of
//! both routers, so a partial apply can be reconciled by hand from the log.
//!
//! With the hash chain on, every line holds `hash_prev` and `hash_self` over
//! its canonical sorted-key JSON, and `verify_hash_chain` finds the first
//! edited or removed line.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use rsw_reconcile::{ReconciliationResult, Stage};

/// Topic for every event this tool writes.
pub const TOPIC: &str = "ROUTE_SWAP";

/// Namespace for deterministic event ids.
const EVENT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a7e_93b4_4d0a_8e55_0c3f_71d2_a9b8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditEventType {
    BaselineCaptured,
    SwapApplied,
    SwapApplyFailed,
    SwapRefused,
}

impl AuditEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::BaselineCaptured => "BASELINE_CAPTURED",
            AuditEventType::SwapApplied => "SWAP_APPLIED",
            AuditEventType::SwapApplyFailed => "SWAP_APPLY_FAILED",
            AuditEventType::SwapRefused => "SWAP_REFUSED",
        }
    }

    /// Classify the final result of a swap command.
    pub fn for_swap(result: &ReconciliationResult) -> Self {
        match result.stage {
            Stage::Applied(_) => AuditEventType::SwapApplied,
            Stage::ApplyFailed(_) => AuditEventType::SwapApplyFailed,
            _ => AuditEventType::SwapRefused,
        }
    }
}

/// Payload for a swap outcome: the command, the partial flag and the full
/// result with its pre-images.
pub fn swap_payload(command: &str, result: &ReconciliationResult) -> Result<Value> {
    let result_json = serde_json::to_value(result).context("serialize swap result failed")?;
    Ok(json!({
        "command": command,
        "partial": result.is_partial_apply(),
        "result": result_json,
    }))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub invocation_id: Uuid,
    pub ts_utc: DateTime<Utc>,
    pub topic: String,
    pub event_type: String,
    pub payload: Value,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

/// Appends events to one log file.
pub struct AuditWriter {
    path: PathBuf,
    hash_chain: bool,
    invocation_id: Uuid,
    last_hash: Option<String>,
    /// Events already in the file; the next event's sequence number.
    seq: u64,
}

impl AuditWriter {
    /// Open `path` for appending, creating parent dirs. An existing log is
    /// resumed: the chain continues from its last line.
    pub fn open(path: impl AsRef<Path>, hash_chain: bool, invocation_id: Uuid) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create audit dir failed: {}", parent.display()))?;
        }

        let (seq, last_hash) = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("read audit log failed: {}", path.display()))?;
            resume_point(&content)?
        } else {
            (0, None)
        };
        if seq > 0 {
            tracing::debug!(path = %path.display(), seq, "resuming audit log");
        }

        Ok(Self {
            path,
            hash_chain,
            invocation_id,
            last_hash,
            seq,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn append(&mut self, event_type: AuditEventType, payload: Value) -> Result<AuditEvent> {
        let event_id = derive_event_id(self.last_hash.as_deref(), &payload, self.seq)?;

        let mut ev = AuditEvent {
            event_id,
            invocation_id: self.invocation_id,
            ts_utc: Utc::now(),
            topic: TOPIC.to_string(),
            event_type: event_type.as_str().to_string(),
            payload,
            hash_prev: None,
            hash_self: None,
        };

        if self.hash_chain {
            ev.hash_prev = self.last_hash.clone();
            ev.hash_self = Some(compute_event_hash(&ev)?);
        }

        let line = canonical_json_line(&ev)?;
        append_line(&self.path, &line)?;

        self.seq += 1;
        if self.hash_chain {
            self.last_hash = ev.hash_self.clone();
        }
        tracing::info!(
            event_type = %ev.event_type,
            event_id = %ev.event_id,
            path = %self.path.display(),
            "audit event written"
        );
        Ok(ev)
    }
}

/// Event count and last `hash_self` of an existing log.
fn resume_point(content: &str) -> Result<(u64, Option<String>)> {
    let mut seq = 0u64;
    let mut last: Option<&str> = None;
    for line in content.lines() {
        if !line.trim().is_empty() {
            seq += 1;
            last = Some(line);
        }
    }
    let last_hash = match last {
        Some(line) => {
            let ev: AuditEvent =
                serde_json::from_str(line.trim()).context("parse last audit event failed")?;
            ev.hash_self
        }
        None => None,
    };
    Ok((seq, last_hash))
}

/// UUID v5 over the previous hash, the sequence number and the canonical
/// payload. Two events can only share an id if all three match.
pub fn derive_event_id(last_hash: Option<&str>, payload: &Value, seq: u64) -> Result<Uuid> {
    let canonical_payload =
        serde_json::to_string(&sort_keys(payload)).context("serialize audit payload failed")?;
    let name = format!("{}|{}|{}", last_hash.unwrap_or("GENESIS"), seq, canonical_payload);
    Ok(Uuid::new_v5(&EVENT_ID_NAMESPACE, name.as_bytes()))
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open audit log failed: {}", path.display()))?;
    f.write_all(line.as_bytes())
        .and_then(|_| f.write_all(b"\n"))
        .context("write audit line failed")?;
    Ok(())
}

fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize audit event failed")?;
    serde_json::to_string(&sort_keys(&raw)).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = serde_json::Map::new();
            for k in keys {
                out.insert(k.clone(), sort_keys(&map[k]));
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// SHA-256 of the event's canonical JSON with `hash_self` cleared.
pub fn compute_event_hash(ev: &AuditEvent) -> Result<String> {
    let mut unsealed = ev.clone();
    unsealed.hash_self = None;
    let canonical = canonical_json_line(&unsealed)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { lines: usize },
    Broken { line: usize, reason: String },
}

pub fn verify_hash_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("read audit log failed: {}", path.display()))?;
    verify_hash_chain_str(&content)
}

pub fn verify_hash_chain_str(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut lines = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let line_no = i + 1;
        let ev: AuditEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("parse audit event at line {line_no}"))?;
        lines += 1;

        if ev.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: line_no,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, ev.hash_prev
                ),
            });
        }
        if let Some(claimed) = &ev.hash_self {
            let recomputed = compute_event_hash(&ev)?;
            if *claimed != recomputed {
                return Ok(VerifyResult::Broken {
                    line: line_no,
                    reason: format!("hash_self mismatch: claimed {claimed}, recomputed {recomputed}"),
                });
            }
        }
        prev_hash = ev.hash_self;
    }

    Ok(VerifyResult::Valid { lines })
}
