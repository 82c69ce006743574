//! Mutating commands. Every outcome, refused or not, is written to the audit log.

use anyhow::Result;

use rsw_audit::{swap_payload, AuditEventType, AuditWriter};
use rsw_reconcile::{execute_auto, switch_over, Direction, ReconciliationResult, Stage};

use super::{Outcome, Session};

pub async fn switch(session: &Session, direction: Direction) -> Result<Outcome> {
    let (client, params, baseline, audit) = session.swap_session()?;
    let r = switch_over(&client, &params, &baseline, direction).await;
    finish(session, audit, direction.as_str(), &r)
}

pub async fn execute(session: &Session) -> Result<Outcome> {
    let (client, params, baseline, audit) = session.swap_session()?;
    let r = execute_auto(&client, &params, &baseline).await;
    finish(session, audit, "execute", &r)
}

/// The exit code follows the swap result. A failed audit append is reported
/// on stderr but does not change it: the routers are already in that state.
fn finish(
    session: &Session,
    audit: Option<AuditWriter>,
    command: &str,
    r: &ReconciliationResult,
) -> Result<Outcome> {
    if let Stage::Applied(d) | Stage::ApplyFailed(d) = r.stage {
        if !session.json {
            println!("{}", d.banner());
        }
    }
    session.emit(r)?;

    let event_type = AuditEventType::for_swap(r);
    match event_type {
        AuditEventType::SwapApplied => tracing::info!(command, "swap applied"),
        AuditEventType::SwapApplyFailed if r.is_partial_apply() => {
            tracing::error!(command, "partial apply: pair is inconsistent")
        }
        AuditEventType::SwapApplyFailed => tracing::error!(command, "swap apply failed"),
        _ => tracing::warn!(command, "swap refused"),
    }

    if let Some(mut writer) = audit {
        let written = swap_payload(command, r).and_then(|p| writer.append(event_type, p));
        if let Err(e) = written {
            tracing::error!(
                command,
                event_type = event_type.as_str(),
                path = %writer.path().display(),
                "audit write failed: {e:#}"
            );
            eprintln!("warning: swap outcome not recorded in audit log: {e:#}");
        }
    }

    Ok(Outcome::of(r))
}
