//! Read-only pair commands plus baseline capture.

use anyhow::{Context, Result};
use serde_json::json;

use rsw_audit::AuditEventType;
use rsw_reconcile::{check, fmt_set, resolve, verify_pair, Direction, RouterTransport};
use rsw_store::{capture_baseline, StoreError};

use super::{Outcome, Session};

pub async fn list(session: &Session) -> Result<Outcome> {
    let client = session.client()?;
    let routers = match client.list_routers().await {
        Ok(r) => r,
        Err(e) => {
            println!("Router listing failed - {e}");
            return Ok(Outcome::Refused);
        }
    };

    if session.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&routers).context("serialize router list failed")?
        );
        return Ok(Outcome::Done);
    }

    let id_w = routers.iter().map(|r| r.id.len()).max().unwrap_or(0).max(9);
    let name_w = routers
        .iter()
        .map(|r| r.display_name.len())
        .max()
        .unwrap_or(0)
        .max(12);
    println!("{:<id_w$}  {:<name_w$}  Path", "Tier 1 ID", "Display Name");
    println!("{}  {}  {}", "-".repeat(id_w), "-".repeat(name_w), "-".repeat(4));
    for r in &routers {
        println!("{:<id_w$}  {:<name_w$}  {}", r.id, r.display_name, r.path);
    }
    Ok(Outcome::Done)
}

pub async fn confirm(session: &Session) -> Result<Outcome> {
    let (client, params) = session.pair_inputs()?;
    let r = resolve(&client, &params).await;
    session.emit(&r)?;
    if !session.json {
        if let (Some(p), Some(d)) = (&r.primary_ref, &r.dr_ref) {
            println!("Primary: {}", p.path);
            println!("DR:      {}", d.path);
        }
    }
    Ok(Outcome::of(&r))
}

pub async fn verify(session: &Session) -> Result<Outcome> {
    let (client, params) = session.pair_inputs()?;
    let r = verify_pair(&client, &params).await;
    session.emit(&r)?;
    if !session.json {
        print_live_sets(&r);
    }
    Ok(Outcome::of(&r))
}

/// Verify, then store both live states as the new baseline. A failed
/// verification leaves the stored baseline alone.
pub async fn capture(session: &Session) -> Result<Outcome> {
    let (client, params) = session.pair_inputs()?;
    let r = verify_pair(&client, &params).await;
    if !r.authorized {
        session.emit(&r)?;
        return Ok(Outcome::Refused);
    }

    let record = match capture_baseline(&session.state, &r) {
        Ok(record) => record,
        Err(e) if matches!(e.downcast_ref::<StoreError>(), Some(StoreError::Invalid(_))) => {
            if !session.json {
                print_live_sets(&r);
            }
            println!("{e}");
            return Ok(Outcome::Refused);
        }
        Err(e) => return Err(e),
    };
    session.record(
        AuditEventType::BaselineCaptured,
        json!({
            "command": "capture-baseline",
            "baseline": record,
            "result": r,
        }),
    )?;

    session.emit(&r)?;
    if !session.json {
        print_live_sets(&r);
        println!("Configuration Stored.");
    }
    Ok(Outcome::Done)
}

pub async fn check_readiness(session: &Session, direction: Direction) -> Result<Outcome> {
    let (client, params, baseline) = session.swap_inputs()?;
    let r = check(&client, &params, &baseline, direction).await;
    session.emit(&r)?;
    Ok(Outcome::of(&r))
}

fn print_live_sets(r: &rsw_reconcile::ReconciliationResult) {
    if let Some(p) = &r.primary_live {
        println!("Primary Route Advertisements Config: {}", fmt_set(&p.route_advertisement_types));
    }
    if let Some(d) = &r.dr_live {
        println!("DR Route Advertisements Config: {}", fmt_set(&d.route_advertisement_types));
    }
}
