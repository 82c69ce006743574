use tracing::info;

use crate::types::{
    AdvertisementSet, Baseline, Direction, Failure, ReconciliationResult, RouterRole, Stage,
};

/// Compare live state against the baseline in the orientation `direction`
/// requires.
///
/// - `ToDr`: live primary == baseline primary, live DR == baseline DR.
/// - `ToPrimary`: live DR == baseline primary, live primary == baseline DR.
///
/// An unauthorized result is returned untouched. The comparison is pure, so
/// deciding twice on the same inputs yields the same result.
pub fn decide(
    direction: Direction,
    mut result: ReconciliationResult,
    baseline: &Baseline,
) -> ReconciliationResult {
    if !result.authorized {
        return result;
    }

    let outcome = match (&result.primary_live, &result.dr_live) {
        (Some(p), Some(d)) => check_direction(
            direction,
            &p.route_advertisement_types,
            &d.route_advertisement_types,
            baseline,
        ),
        _ => Err(Failure::NotVerified),
    };

    match outcome {
        Ok(()) => {
            info!(%direction, "live config matches stored config");
            result.stage = Stage::Authorized(direction);
            result.failure = None;
            result.message = direction.ready_message().to_string();
        }
        Err(failure) => result.reject(failure),
    }
    result
}

/// Pure comparison behind [`decide`].
///
/// A baseline that records the same set for both roles authorizes nothing:
/// both orientations would pass and the swap would be a no-op.
pub fn check_direction(
    direction: Direction,
    primary_live: &AdvertisementSet,
    dr_live: &AdvertisementSet,
    baseline: &Baseline,
) -> Result<(), Failure> {
    if baseline.primary.route_advertisement_types == baseline.dr.route_advertisement_types {
        return Err(Failure::IndistinguishableBaseline {
            kinds: baseline.primary.route_advertisement_types.clone(),
        });
    }

    // (baseline role, live router) pairs, in check order.
    let expectations = match direction {
        Direction::ToDr => [
            (RouterRole::Primary, RouterRole::Primary),
            (RouterRole::Dr, RouterRole::Dr),
        ],
        Direction::ToPrimary => [
            (RouterRole::Primary, RouterRole::Dr),
            (RouterRole::Dr, RouterRole::Primary),
        ],
    };

    for (baseline_role, live_role) in expectations {
        let expected = &baseline.state(baseline_role).route_advertisement_types;
        let live = match live_role {
            RouterRole::Primary => primary_live,
            RouterRole::Dr => dr_live,
        };
        if expected != live {
            return Err(Failure::BaselineMismatch {
                direction,
                baseline_role,
                live_role,
                expected: expected.clone(),
                live: live.clone(),
            });
        }
    }
    Ok(())
}

/// Both directions decided against one verified result.
#[derive(Clone, Debug)]
pub struct Readiness {
    pub failover: ReconciliationResult,
    pub failback: ReconciliationResult,
    verified: bool,
}

/// Decide both directions from the same verified state.
pub fn assess(verified: ReconciliationResult, baseline: &Baseline) -> Readiness {
    let was_verified = verified.authorized;
    Readiness {
        failover: decide(Direction::ToDr, verified.clone(), baseline),
        failback: decide(Direction::ToPrimary, verified, baseline),
        verified: was_verified,
    }
}

impl Readiness {
    /// The single authorized direction, or a refusal.
    ///
    /// A pair that never got verified is returned with its original failure;
    /// a verified pair that matches neither orientation is refused as
    /// "Nothing Changed".
    pub fn actionable(self) -> Result<(Direction, ReconciliationResult), ReconciliationResult> {
        match (self.failover.authorized, self.failback.authorized) {
            (true, false) => Ok((Direction::ToDr, self.failover)),
            (false, true) => Ok((Direction::ToPrimary, self.failback)),
            (true, true) => {
                let mut refused = self.failover;
                refused.reject(Failure::DirectionConflict);
                Err(refused)
            }
            (false, false) if !self.verified => Err(self.failover),
            (false, false) => {
                let failback_reason = self.failback.message.clone();
                let mut refused = self.failover;
                let failover_reason = refused.message.clone();
                refused.reject(Failure::NothingSafe {
                    failover_reason,
                    failback_reason,
                });
                Err(refused)
            }
        }
    }
}
