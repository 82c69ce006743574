use tracing::{debug, warn};

use crate::transport::RouterTransport;
use crate::types::{Failure, ReconciliationResult, RouterRole, Stage};

/// Fetch live state for both resolved routers.
///
/// An unauthorized result is passed through with only its message changed;
/// nothing is fetched. The two fetches are joined: both complete before
/// either outcome is inspected, and a failure of either fails the stage.
pub async fn fetch_states<T>(transport: &T, mut result: ReconciliationResult) -> ReconciliationResult
where
    T: RouterTransport + ?Sized,
{
    if !result.authorized {
        result.message = format!(
            "Cannot verify an unresolved pair - no state fetched ({})",
            result.message
        );
        return result;
    }

    let (primary_path, dr_path) = match (&result.primary_ref, &result.dr_ref) {
        (Some(p), Some(d)) => (p.path.clone(), d.path.clone()),
        _ => {
            result.reject(Failure::Unresolved);
            return result;
        }
    };

    let (primary, dr) = tokio::join!(
        transport.fetch_router(&primary_path),
        transport.fetch_router(&dr_path)
    );

    let primary = match primary {
        Ok(s) => s,
        Err(e) => {
            warn!(path = %primary_path, error = %e, "primary state fetch failed");
            result.reject(Failure::FetchFailed {
                role: RouterRole::Primary,
                path: primary_path,
                error: e.to_string(),
            });
            return result;
        }
    };
    let dr = match dr {
        Ok(s) => s,
        Err(e) => {
            warn!(path = %dr_path, error = %e, "DR state fetch failed");
            result.reject(Failure::FetchFailed {
                role: RouterRole::Dr,
                path: dr_path,
                error: e.to_string(),
            });
            return result;
        }
    };

    debug!(
        primary_revision = primary.revision,
        dr_revision = dr.revision,
        "live router states collected"
    );

    result.primary_live = Some(primary);
    result.dr_live = Some(dr);
    result.authorized = true;
    result.stage = Stage::Verified;
    result.failure = None;
    result.message = "States Collected".to_string();
    result
}
