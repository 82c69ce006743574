//! rsw-reconcile
//!
//! Router-pair reconciliation and failover engine.
//!
//! Stages, strictly linear:
//! - resolve: operator identifiers -> live router paths
//! - verify: fetch live state of both routers (joined)
//! - decide: compare live state to the stored baseline for one direction
//! - execute: swap advertisement sets, DR first, then primary
//!
//! Every stage takes and returns a [`ReconciliationResult`]; failures are
//! values, never panics. All I/O goes through [`RouterTransport`].

mod decide;
mod pipeline;
mod resolve;
mod swap;
mod transport;
mod types;
mod verify;

pub use decide::{assess, check_direction, decide, Readiness};
pub use pipeline::{check, execute_auto, switch_over, verify_pair};
pub use resolve::{resolve, resolve_candidates};
pub use swap::{build_patches, execute, SwapPatches};
pub use transport::{RouterTransport, TransportError};
pub use types::*;
pub use verify::fetch_states;
