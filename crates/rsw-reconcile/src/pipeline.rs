//! Stage compositions used by the operator commands.
//!
//! Each function starts from a fresh resolution; nothing is carried across
//! calls.

use crate::decide::{assess, decide};
use crate::resolve::resolve;
use crate::swap::execute;
use crate::transport::RouterTransport;
use crate::types::{Baseline, Direction, ParameterSet, ReconciliationResult};
use crate::verify::fetch_states;

/// Resolve + verify.
pub async fn verify_pair<T>(transport: &T, params: &ParameterSet) -> ReconciliationResult
where
    T: RouterTransport + ?Sized,
{
    let resolved = resolve(transport, params).await;
    fetch_states(transport, resolved).await
}

/// Resolve + verify + decide one direction. Never mutates.
pub async fn check<T>(
    transport: &T,
    params: &ParameterSet,
    baseline: &Baseline,
    direction: Direction,
) -> ReconciliationResult
where
    T: RouterTransport + ?Sized,
{
    let verified = verify_pair(transport, params).await;
    decide(direction, verified, baseline)
}

/// Check one direction and swap if it is authorized.
pub async fn switch_over<T>(
    transport: &T,
    params: &ParameterSet,
    baseline: &Baseline,
    direction: Direction,
) -> ReconciliationResult
where
    T: RouterTransport + ?Sized,
{
    let checked = check(transport, params, baseline, direction).await;
    execute(transport, direction, checked).await
}

/// Decide both directions from one verification and swap in the single
/// authorized one. Refuses with "Nothing Changed" otherwise.
pub async fn execute_auto<T>(
    transport: &T,
    params: &ParameterSet,
    baseline: &Baseline,
) -> ReconciliationResult
where
    T: RouterTransport + ?Sized,
{
    let verified = verify_pair(transport, params).await;
    match assess(verified, baseline).actionable() {
        Ok((direction, authorized)) => execute(transport, direction, authorized).await,
        Err(refused) => refused,
    }
}
