use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rsw_reconcile::{fmt_set, Baseline, ParameterSet, ReconciliationResult, RouterState, Stage};

use crate::{StateDir, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParametersDoc {
    #[serde(flatten)]
    pub params: ParameterSet,
    pub modified_at_utc: DateTime<Utc>,
}

impl ParametersDoc {
    pub fn new(params: ParameterSet) -> Self {
        Self {
            params,
            modified_at_utc: Utc::now(),
        }
    }
}

/// Both identifiers present and naming different routers.
pub fn validate_parameters(params: &ParameterSet) -> Result<(), StoreError> {
    let primary = params.primary_identifier.trim();
    let dr = params.dr_identifier.trim();
    if primary.is_empty() || dr.is_empty() {
        return Err(StoreError::Invalid(
            "primary and DR identifiers must both be set".to_string(),
        ));
    }
    if primary == dr {
        return Err(StoreError::Invalid(format!(
            "primary and DR identifiers are both '{primary}' - they must name different routers"
        )));
    }
    Ok(())
}

/// Baseline plus where each router lived when it was captured. Paths are
/// informational; resolution always runs again before a swap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineRecord {
    pub primary: RouterState,
    pub dr: RouterState,
    #[serde(default)]
    pub primary_path: String,
    #[serde(default)]
    pub dr_path: String,
    pub modified_at_utc: DateTime<Utc>,
}

impl BaselineRecord {
    pub fn baseline(&self) -> Baseline {
        Baseline {
            primary: self.primary.clone(),
            dr: self.dr.clone(),
        }
    }
}

/// Persist the live states of a verified pair as the new baseline.
///
/// Anything other than an authorized, verified result is refused and the
/// existing baseline is left untouched. So is a pair advertising the same
/// set on both routers: no direction could ever be decided from it.
pub fn capture_baseline(dir: &StateDir, verified: &ReconciliationResult) -> Result<BaselineRecord> {
    if !verified.authorized {
        return Err(StoreError::Invalid(format!(
            "refusing to capture baseline from a failed verification: {}",
            verified.message
        ))
        .into());
    }
    let (primary, dr) = match (
        verified.stage,
        verified.primary_live.as_ref(),
        verified.dr_live.as_ref(),
    ) {
        (Stage::Verified, Some(p), Some(d)) => (p.clone(), d.clone()),
        _ => {
            return Err(StoreError::Invalid(
                "refusing to capture baseline: pair has not been verified".to_string(),
            )
            .into())
        }
    };

    if primary.route_advertisement_types == dr.route_advertisement_types {
        tracing::warn!(
            kinds = %fmt_set(&primary.route_advertisement_types),
            "primary and DR advertise the same set; baseline not captured"
        );
        return Err(StoreError::Invalid(format!(
            "refusing to capture baseline: primary and DR both advertise {} - \
             failover direction could never be determined",
            fmt_set(&primary.route_advertisement_types)
        ))
        .into());
    }

    let record = BaselineRecord {
        primary,
        dr,
        primary_path: verified
            .primary_ref
            .as_ref()
            .map(|r| r.path.clone())
            .unwrap_or_default(),
        dr_path: verified
            .dr_ref
            .as_ref()
            .map(|r| r.path.clone())
            .unwrap_or_default(),
        modified_at_utc: Utc::now(),
    };
    dir.write_baseline(&record)?;
    Ok(record)
}
