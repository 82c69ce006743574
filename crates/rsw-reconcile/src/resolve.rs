use tracing::{debug, info};

use crate::transport::RouterTransport;
use crate::types::{
    Failure, IdentityStrategy, ParameterSet, ReconciliationResult, RouterCandidate, RouterRef,
    RouterRole, Stage,
};

/// Map the configured identifiers onto live router paths.
///
/// Always returns a fresh result: authorized only when both roles match
/// exactly one candidate each and those candidates differ.
pub async fn resolve<T>(transport: &T, params: &ParameterSet) -> ReconciliationResult
where
    T: RouterTransport + ?Sized,
{
    let mut result = ReconciliationResult::unresolved();

    let candidates = match transport.list_routers().await {
        Ok(c) => c,
        Err(e) => {
            result.reject(Failure::ListFailed {
                error: e.to_string(),
            });
            return result;
        }
    };
    debug!(candidates = candidates.len(), "router listing received");

    match resolve_candidates(&candidates, params) {
        Ok((primary, dr)) => {
            info!(primary = %primary.path, dr = %dr.path, "router pair resolved");
            result.primary_ref = Some(primary);
            result.dr_ref = Some(dr);
            result.authorized = true;
            result.stage = Stage::Resolved;
            result.message = "Routers Confirmed - Paths Collected".to_string();
        }
        Err(failure) => result.reject(failure),
    }
    result
}

/// Pure matching step of [`resolve`]. Primary is checked before DR.
pub fn resolve_candidates(
    candidates: &[RouterCandidate],
    params: &ParameterSet,
) -> Result<(RouterRef, RouterRef), Failure> {
    let strategy = params.identity_strategy;
    let primary = match_role(candidates, strategy, params, RouterRole::Primary)?;
    let dr = match_role(candidates, strategy, params, RouterRole::Dr)?;

    if primary.path == dr.path {
        return Err(Failure::SameRouter {
            path: primary.path.clone(),
            primary_identifier: params.primary_identifier.clone(),
            dr_identifier: params.dr_identifier.clone(),
        });
    }

    Ok((
        RouterRef {
            role: RouterRole::Primary,
            path: primary.path.clone(),
        },
        RouterRef {
            role: RouterRole::Dr,
            path: dr.path.clone(),
        },
    ))
}

fn match_role<'a>(
    candidates: &'a [RouterCandidate],
    strategy: IdentityStrategy,
    params: &ParameterSet,
    role: RouterRole,
) -> Result<&'a RouterCandidate, Failure> {
    let identifier = params.identifier(role);
    let matches: Vec<&RouterCandidate> = candidates
        .iter()
        .filter(|c| strategy.key_of(c) == identifier)
        .collect();

    match matches.as_slice() {
        [] => Err(Failure::NotFound {
            role,
            identifier: identifier.to_string(),
            strategy,
        }),
        [only] => Ok(*only),
        many => Err(Failure::Ambiguous {
            role,
            identifier: identifier.to_string(),
            strategy,
            paths: many.iter().map(|c| c.path.clone()).collect(),
        }),
    }
}
