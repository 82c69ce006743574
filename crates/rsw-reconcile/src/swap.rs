use tracing::{error, info, warn};

use crate::transport::RouterTransport;
use crate::types::{
    fmt_set, Direction, Failure, ReconciliationResult, RouterPatch, RouterRole, RouterState, Stage,
};

/// The two reciprocal patches of one swap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SwapPatches {
    pub dr: RouterPatch,
    pub primary: RouterPatch,
}

/// Build the cross-assigned patches: each router keeps its own revision and
/// display name and receives the other router's advertisement set.
pub fn build_patches(primary: &RouterState, dr: &RouterState) -> SwapPatches {
    SwapPatches {
        dr: RouterPatch {
            revision: dr.revision,
            display_name: dr.display_name.clone(),
            route_advertisement_types: primary.route_advertisement_types.clone(),
        },
        primary: RouterPatch {
            revision: primary.revision,
            display_name: primary.display_name.clone(),
            route_advertisement_types: dr.route_advertisement_types.clone(),
        },
    }
}

/// Swap the advertisement sets of the pair.
///
/// Entry requires `result` authorized for exactly `direction`; an
/// unauthorized result is returned untouched and nothing is applied.
///
/// The DR patch is applied first, then the primary patch. Neither call is
/// retried and a failed primary apply does not roll back the DR apply: the
/// result then carries DR's post-apply state next to primary's pre-apply
/// state and a `PartialApply` failure.
pub async fn execute<T>(
    transport: &T,
    direction: Direction,
    mut result: ReconciliationResult,
) -> ReconciliationResult
where
    T: RouterTransport + ?Sized,
{
    if !result.authorized {
        return result;
    }

    match result.stage {
        Stage::Authorized(d) if d == direction => {}
        Stage::Authorized(d) => {
            result.reject(Failure::DirectionMismatch {
                requested: direction,
                authorized: Some(d),
            });
            return result;
        }
        _ => {
            result.reject(Failure::DirectionMismatch {
                requested: direction,
                authorized: None,
            });
            return result;
        }
    }

    let (primary_path, dr_path, primary_live, dr_live) = match (
        &result.primary_ref,
        &result.dr_ref,
        &result.primary_live,
        &result.dr_live,
    ) {
        (Some(pr), Some(dr), Some(pl), Some(dl)) => {
            (pr.path.clone(), dr.path.clone(), pl.clone(), dl.clone())
        }
        _ => {
            result.reject(Failure::NotVerified);
            return result;
        }
    };

    result.prior_primary = Some(primary_live.clone());
    result.prior_dr = Some(dr_live.clone());

    let patches = build_patches(&primary_live, &dr_live);
    info!(
        %direction,
        dr = %dr_path,
        dr_kinds = %fmt_set(&patches.dr.route_advertisement_types),
        primary = %primary_path,
        primary_kinds = %fmt_set(&patches.primary.route_advertisement_types),
        "applying route advertisement swap"
    );

    let dr_after = match transport.apply_router(&dr_path, &patches.dr).await {
        Ok(s) => s,
        Err(e) => {
            warn!(path = %dr_path, error = %e, "DR apply failed; nothing changed");
            result.apply_failed(
                direction,
                Failure::ApplyFailed {
                    role: RouterRole::Dr,
                    path: dr_path,
                    error: e.to_string(),
                    revision_conflict: e.is_revision_conflict(),
                },
            );
            return result;
        }
    };
    result.dr_live = Some(dr_after);

    let primary_after = match transport.apply_router(&primary_path, &patches.primary).await {
        Ok(s) => s,
        Err(e) => {
            error!(
                dr = %dr_path,
                primary = %primary_path,
                error = %e,
                "primary apply failed after DR apply; pair left inconsistent"
            );
            result.apply_failed(
                direction,
                Failure::PartialApply {
                    dr_path,
                    dr_applied: patches.dr.route_advertisement_types.clone(),
                    primary_path,
                    error: e.to_string(),
                    revision_conflict: e.is_revision_conflict(),
                },
            );
            return result;
        }
    };
    result.primary_live = Some(primary_after);

    result.stage = Stage::Applied(direction);
    result.failure = None;
    result.message = format!(
        "Config Applied Primary: {} Config Applied DR: {}",
        fmt_set(&patches.primary.route_advertisement_types),
        fmt_set(&patches.dr.route_advertisement_types)
    );
    result
}
