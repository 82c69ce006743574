//! Manager payloads and status mapping. Pure functions, no I/O.

use serde::Deserialize;

use rsw_reconcile::{RouterCandidate, TransportError};

/// One page of `GET /infra/tier-1s`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Tier1ListPage {
    #[serde(default)]
    pub results: Vec<Tier1Summary>,
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Tier1Summary {
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: String,
    pub path: String,
}

impl Tier1Summary {
    /// Older managers omit `unique_id`; fall back to the policy `id`.
    pub fn into_candidate(self) -> RouterCandidate {
        let id = self.unique_id.or(self.id).unwrap_or_default();
        RouterCandidate::new(id, self.display_name, self.path)
    }
}

/// Error body the manager returns on non-2xx.
#[derive(Debug, Clone, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    error_message: Option<String>,
}

/// Best human-readable message from an error response body.
pub(crate) fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody {
            error_code: Some(code),
            error_message: Some(msg),
        }) => format!("{msg} (error_code={code})"),
        Ok(ApiErrorBody {
            error_message: Some(msg),
            ..
        }) => msg,
        _ => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no response body".to_string()
            } else {
                truncate(trimmed, 200)
            }
        }
    }
}

pub(crate) fn map_status(status: u16, path: &str, body: &str) -> TransportError {
    match status {
        404 => TransportError::NotFound(path.to_string()),
        409 | 412 => TransportError::RevisionConflict(format!("{path}: {}", error_message(body))),
        500..=599 => TransportError::Unreachable(format!(
            "status={status} on {path}: {}",
            error_message(body)
        )),
        _ => TransportError::Rejected {
            status,
            message: error_message(body),
        },
    }
}

/// Next cursor to request, or `None` when listing is complete.
///
/// A cursor already seen means the manager is looping; that is an error rather
/// than an endless listing.
pub(crate) fn next_cursor(
    page_cursor: Option<String>,
    seen: &mut Vec<String>,
) -> Result<Option<String>, TransportError> {
    match page_cursor {
        None => Ok(None),
        Some(c) if c.is_empty() => Ok(None),
        Some(c) if seen.contains(&c) => Err(TransportError::Decode(format!(
            "manager repeated list cursor '{c}'"
        ))),
        Some(c) => {
            seen.push(c.clone());
            Ok(Some(c))
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
