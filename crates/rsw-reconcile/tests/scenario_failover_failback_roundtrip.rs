//! Failover then failback against one unchanged baseline returns the pair to
//! its original posture.

mod support;

use rsw_reconcile::*;
use support::*;

#[tokio::test]
async fn failover_then_failback_restores_original_posture() {
    let mgr = FakeManager::pair(&["A"], &["B"]);
    let b = baseline(&["A"], &["B"]);

    // Failover.
    let r = switch_over(&mgr, &params(), &b, Direction::ToDr).await;
    assert!(r.is_applied(), "{}", r.message);
    assert_eq!(mgr.state(PRIMARY_PATH).route_advertisement_types, set(&["B"]));
    assert_eq!(mgr.state(DR_PATH).route_advertisement_types, set(&["A"]));

    // After failover only failback is authorized.
    let again = check(&mgr, &params(), &b, Direction::ToDr).await;
    assert!(!again.authorized);
    let back = check(&mgr, &params(), &b, Direction::ToPrimary).await;
    assert!(back.authorized, "{}", back.message);
    assert_eq!(
        back.message,
        "Config confirmed against stored config - DR Ready for failback"
    );

    // Failback.
    let r = switch_over(&mgr, &params(), &b, Direction::ToPrimary).await;
    assert!(r.is_applied(), "{}", r.message);
    assert_eq!(r.direction(), Some(Direction::ToPrimary));
    assert_eq!(mgr.state(PRIMARY_PATH).route_advertisement_types, set(&["A"]));
    assert_eq!(mgr.state(DR_PATH).route_advertisement_types, set(&["B"]));
}

#[tokio::test]
async fn auto_execute_picks_the_authorized_direction_each_time() {
    let mgr = FakeManager::pair(&["A", "X"], &["B"]);
    let b = baseline(&["A", "X"], &["B"]);

    let first = execute_auto(&mgr, &params(), &b).await;
    assert_eq!(first.stage, Stage::Applied(Direction::ToDr), "{}", first.message);

    let second = execute_auto(&mgr, &params(), &b).await;
    assert_eq!(second.stage, Stage::Applied(Direction::ToPrimary), "{}", second.message);

    assert_eq!(mgr.state(PRIMARY_PATH).route_advertisement_types, set(&["A", "X"]));
    assert_eq!(mgr.state(DR_PATH).route_advertisement_types, set(&["B"]));
    assert_eq!(mgr.applies().len(), 4);
}
