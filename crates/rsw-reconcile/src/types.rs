use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Route-advertisement kinds carried by one router (e.g. `TIER1_CONNECTED`).
///
/// A set, not a list: the manager may return the tokens in any order and the
/// engine only ever reasons about presence/absence.
pub type AdvertisementSet = BTreeSet<String>;

/// Render an advertisement set for operator-facing messages: `[A, B]`.
pub fn fmt_set(set: &AdvertisementSet) -> String {
    let items: Vec<&str> = set.iter().map(|s| s.as_str()).collect();
    format!("[{}]", items.join(", "))
}

/// Logical role of a router within the pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterRole {
    Primary,
    Dr,
}

impl RouterRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouterRole::Primary => "primary",
            RouterRole::Dr => "DR",
        }
    }

    /// Short label used in rejection messages ("Pri" / "DR").
    pub fn short_label(&self) -> &'static str {
        match self {
            RouterRole::Primary => "Pri",
            RouterRole::Dr => "DR",
        }
    }

    pub fn other(&self) -> RouterRole {
        match self {
            RouterRole::Primary => RouterRole::Dr,
            RouterRole::Dr => RouterRole::Primary,
        }
    }
}

impl fmt::Display for RouterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved identity of one logical router.
///
/// `path` is server-assigned and only valid for the invocation that resolved
/// it; it is never persisted as an identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterRef {
    pub role: RouterRole,
    pub path: String,
}

/// One entry of the manager's router listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterCandidate {
    pub id: String,
    pub display_name: String,
    pub path: String,
}

impl RouterCandidate {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            path: path.into(),
        }
    }
}

/// Snapshot of the router attributes the engine reads or writes.
///
/// Field names follow the manager's wire format so live snapshots and stored
/// baselines share one shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterState {
    /// Optimistic-lock version assigned by the manager.
    #[serde(rename = "_revision")]
    pub revision: i64,
    #[serde(default)]
    pub route_advertisement_types: AdvertisementSet,
    #[serde(default)]
    pub display_name: String,
}

impl RouterState {
    pub fn new<I, S>(revision: i64, display_name: impl Into<String>, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            revision,
            route_advertisement_types: kinds.into_iter().map(Into::into).collect(),
            display_name: display_name.into(),
        }
    }
}

/// Body of one apply call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterPatch {
    #[serde(rename = "_revision")]
    pub revision: i64,
    pub display_name: String,
    pub route_advertisement_types: AdvertisementSet,
}

/// How configured identifiers are matched against the router listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStrategy {
    /// Match on the manager's stable unique id.
    UniqueId,
    /// Match on the operator-visible display name.
    DisplayName,
}

impl IdentityStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdentityStrategy::UniqueId => "unique_id",
            IdentityStrategy::DisplayName => "display_name",
        }
    }

    /// The attribute of `candidate` this strategy compares against.
    pub fn key_of<'a>(&self, candidate: &'a RouterCandidate) -> &'a str {
        match self {
            IdentityStrategy::UniqueId => &candidate.id,
            IdentityStrategy::DisplayName => &candidate.display_name,
        }
    }
}

impl fmt::Display for IdentityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operator intent: which two routers form the pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSet {
    pub primary_identifier: String,
    pub dr_identifier: String,
    pub identity_strategy: IdentityStrategy,
}

impl ParameterSet {
    pub fn identifier(&self, role: RouterRole) -> &str {
        match role {
            RouterRole::Primary => &self.primary_identifier,
            RouterRole::Dr => &self.dr_identifier,
        }
    }
}

/// Known-good configuration of both routers, captured before any failover.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    pub primary: RouterState,
    pub dr: RouterState,
}

impl Baseline {
    pub fn state(&self, role: RouterRole) -> &RouterState {
        match role {
            RouterRole::Primary => &self.primary,
            RouterRole::Dr => &self.dr,
        }
    }
}

/// Which way a swap moves the pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Failover: promote DR.
    ToDr,
    /// Failback: return to primary.
    ToPrimary,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ToDr => "failover",
            Direction::ToPrimary => "failback",
        }
    }

    pub fn banner(&self) -> &'static str {
        match self {
            Direction::ToDr => "*** Executing Primary --> DR configuration ***",
            Direction::ToPrimary => "*** Executing DR --> Primary configuration ***",
        }
    }

    pub(crate) fn ready_message(&self) -> &'static str {
        match self {
            Direction::ToDr => "Config confirmed against stored config - DR Ready for failover",
            Direction::ToPrimary => {
                "Config confirmed against stored config - DR Ready for failback"
            }
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of one invocation in the engine's state machine.
///
/// `Rejected` and `ApplyFailed` are terminal failures, `Applied` is the
/// terminal success. There is no transition back to `Unresolved`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Unresolved,
    Resolved,
    Verified,
    Authorized(Direction),
    Rejected,
    Applied(Direction),
    ApplyFailed(Direction),
}

/// Terminal condition reached by a stage. Rendered into the result message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    /// The router listing itself could not be read.
    ListFailed { error: String },
    NotFound {
        role: RouterRole,
        identifier: String,
        strategy: IdentityStrategy,
    },
    /// One identifier matched more than one candidate.
    Ambiguous {
        role: RouterRole,
        identifier: String,
        strategy: IdentityStrategy,
        paths: Vec<String>,
    },
    /// Both roles resolved to the same router.
    SameRouter {
        path: String,
        primary_identifier: String,
        dr_identifier: String,
    },
    /// Verification was asked for a result without resolved refs.
    Unresolved,
    FetchFailed {
        role: RouterRole,
        path: String,
        error: String,
    },
    /// Decision was asked for a result without live states.
    NotVerified,
    /// Baseline records the same set for both roles; no direction is meaningful.
    IndistinguishableBaseline { kinds: AdvertisementSet },
    /// Live state diverges from what `direction` requires.
    BaselineMismatch {
        direction: Direction,
        /// Role whose baseline set was expected.
        baseline_role: RouterRole,
        /// Router whose live set was compared.
        live_role: RouterRole,
        expected: AdvertisementSet,
        live: AdvertisementSet,
    },
    /// Neither direction could be authorized.
    NothingSafe {
        failover_reason: String,
        failback_reason: String,
    },
    /// Both directions authorized at once; refused.
    DirectionConflict,
    NotAuthorized,
    /// Swap requested for a direction other than the one authorized.
    DirectionMismatch {
        requested: Direction,
        authorized: Option<Direction>,
    },
    /// The DR apply (first call) failed; nothing was mutated.
    ApplyFailed {
        role: RouterRole,
        path: String,
        error: String,
        revision_conflict: bool,
    },
    /// The DR apply succeeded but the primary apply failed.
    PartialApply {
        dr_path: String,
        dr_applied: AdvertisementSet,
        primary_path: String,
        error: String,
        revision_conflict: bool,
    },
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::ListFailed { error } => {
                write!(f, "Router listing failed - {error}")
            }
            Failure::NotFound {
                role,
                identifier,
                strategy,
            } => write!(
                f,
                "{} T1 Not Found - Check Parameters (no router with {strategy} '{identifier}')",
                role_title(*role)
            ),
            Failure::Ambiguous {
                role,
                identifier,
                strategy,
                paths,
            } => write!(
                f,
                "{} T1 Ambiguous - Check Parameters ({strategy} '{identifier}' matches {} routers: {})",
                role_title(*role),
                paths.len(),
                paths.join(", ")
            ),
            Failure::SameRouter {
                path,
                primary_identifier,
                dr_identifier,
            } => write!(
                f,
                "Primary and DR resolve to the same router {path} \
                 (primary '{primary_identifier}', DR '{dr_identifier}') - Check Parameters"
            ),
            Failure::Unresolved => {
                write!(f, "Cannot verify an unresolved pair - no state fetched")
            }
            Failure::FetchFailed { role, path, error } => write!(
                f,
                "Failed to get T1 policy state for {role} router {path}: {error}"
            ),
            Failure::NotVerified => write!(
                f,
                "Live router state not collected - verify the pair before deciding"
            ),
            Failure::IndistinguishableBaseline { kinds } => write!(
                f,
                "Stored config records the same route advertisements {} for primary and DR - \
                 failover direction cannot be determined",
                fmt_set(kinds)
            ),
            Failure::BaselineMismatch {
                direction,
                baseline_role,
                live_role,
                expected,
                live,
            } => {
                let prefix = match direction {
                    Direction::ToDr => "Error",
                    Direction::ToPrimary => "Failback Check Error",
                };
                write!(
                    f,
                    "{prefix} - {} route states do not match config requirements \
                     (expected stored {baseline_role} config {} on {live_role} router, live {})",
                    baseline_role.short_label(),
                    fmt_set(expected),
                    fmt_set(live)
                )
            }
            Failure::NothingSafe {
                failover_reason,
                failback_reason,
            } => write!(
                f,
                "Nothing Changed - neither failover nor failback is safe. \
                 failover: {failover_reason}; failback: {failback_reason}"
            ),
            Failure::DirectionConflict => write!(
                f,
                "Nothing Changed - failover and failback both matched the stored config"
            ),
            Failure::NotAuthorized => write!(f, "Swap refused - result is not authorized"),
            Failure::DirectionMismatch {
                requested,
                authorized,
            } => match authorized {
                Some(a) => write!(
                    f,
                    "Swap refused - {requested} requested but the pair was checked for {a}"
                ),
                None => write!(
                    f,
                    "Swap refused - {requested} requested but no direction was checked"
                ),
            },
            Failure::ApplyFailed {
                role,
                path,
                error,
                revision_conflict,
            } => {
                write!(f, "{role} apply failed on {path}: {error}")?;
                if *revision_conflict {
                    write!(f, " (router changed since it was fetched)")?;
                }
                write!(f, " - Nothing Changed")
            }
            Failure::PartialApply {
                dr_path,
                dr_applied,
                primary_path,
                error,
                revision_conflict,
            } => {
                write!(
                    f,
                    "PARTIAL APPLY - DR router {dr_path} now advertises {} but primary apply \
                     on {primary_path} failed: {error}",
                    fmt_set(dr_applied)
                )?;
                if *revision_conflict {
                    write!(f, " (router changed since it was fetched)")?;
                }
                write!(f, ". Pair is inconsistent - reconcile manually")
            }
        }
    }
}

fn role_title(role: RouterRole) -> &'static str {
    match role {
        RouterRole::Primary => "Primary",
        RouterRole::Dr => "DR",
    }
}

/// Result threaded through resolve -> verify -> decide -> execute.
///
/// `authorized` only ever goes from true to false within one run; a stage
/// that finds it false leaves the result alone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub authorized: bool,
    pub message: String,
    pub stage: Stage,
    pub failure: Option<Failure>,
    pub primary_ref: Option<RouterRef>,
    pub dr_ref: Option<RouterRef>,
    pub primary_live: Option<RouterState>,
    pub dr_live: Option<RouterState>,
    /// Pre-images taken right before mutation. Never restored automatically.
    pub prior_primary: Option<RouterState>,
    pub prior_dr: Option<RouterState>,
}

impl ReconciliationResult {
    pub fn unresolved() -> Self {
        Self {
            authorized: false,
            message: "Router pair not resolved".to_string(),
            stage: Stage::Unresolved,
            failure: None,
            primary_ref: None,
            dr_ref: None,
            primary_live: None,
            dr_live: None,
            prior_primary: None,
            prior_dr: None,
        }
    }

    /// Direction this result was authorized (or applied) for, if any.
    pub fn direction(&self) -> Option<Direction> {
        match self.stage {
            Stage::Authorized(d) | Stage::Applied(d) | Stage::ApplyFailed(d) => Some(d),
            _ => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self.stage, Stage::Applied(_))
    }

    pub fn is_partial_apply(&self) -> bool {
        matches!(self.failure, Some(Failure::PartialApply { .. }))
    }

    pub fn live(&self, role: RouterRole) -> Option<&RouterState> {
        match role {
            RouterRole::Primary => self.primary_live.as_ref(),
            RouterRole::Dr => self.dr_live.as_ref(),
        }
    }

    pub(crate) fn reject(&mut self, failure: Failure) {
        self.authorized = false;
        self.stage = Stage::Rejected;
        self.message = failure.to_string();
        self.failure = Some(failure);
    }

    pub(crate) fn apply_failed(&mut self, direction: Direction, failure: Failure) {
        self.authorized = false;
        self.stage = Stage::ApplyFailed(direction);
        self.message = failure.to_string();
        self.failure = Some(failure);
    }
}
