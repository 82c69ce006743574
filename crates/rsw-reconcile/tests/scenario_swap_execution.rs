mod support;

use rsw_reconcile::*;
use support::*;

async fn authorized_failover(mgr: &FakeManager) -> ReconciliationResult {
    let r = check(mgr, &params(), &baseline(&["A"], &["B"]), Direction::ToDr).await;
    assert!(r.authorized, "precondition: {}", r.message);
    r
}

#[tokio::test]
async fn swap_cross_assigns_and_applies_dr_first() {
    let mgr = FakeManager::pair(&["A"], &["B"]);
    let r = authorized_failover(&mgr).await;

    let r = execute(&mgr, Direction::ToDr, r).await;
    assert!(r.authorized);
    assert_eq!(r.stage, Stage::Applied(Direction::ToDr));
    assert_eq!(r.failure, None);

    let applies = mgr.applies();
    assert_eq!(applies.len(), 2);
    let (first_path, dr_patch) = &applies[0];
    let (second_path, primary_patch) = &applies[1];
    assert_eq!(first_path, DR_PATH);
    assert_eq!(second_path, PRIMARY_PATH);

    assert_eq!(dr_patch.route_advertisement_types, set(&["A"]));
    assert_eq!(dr_patch.revision, 20);
    assert_eq!(dr_patch.display_name, "t1-site-b");
    assert_eq!(primary_patch.route_advertisement_types, set(&["B"]));
    assert_eq!(primary_patch.revision, 10);
    assert_eq!(primary_patch.display_name, "t1-site-a");

    assert_eq!(
        r.message,
        "Config Applied Primary: [B] Config Applied DR: [A]"
    );
}

#[tokio::test]
async fn post_apply_states_and_pre_images_are_recorded() {
    let mgr = FakeManager::pair(&["A"], &["B"]);
    let r = execute(&mgr, Direction::ToDr, authorized_failover(&mgr).await).await;

    let prior_primary = r.prior_primary.as_ref().unwrap();
    let prior_dr = r.prior_dr.as_ref().unwrap();
    assert_eq!(prior_primary.route_advertisement_types, set(&["A"]));
    assert_eq!(prior_primary.revision, 10);
    assert_eq!(prior_dr.route_advertisement_types, set(&["B"]));

    let primary = r.primary_live.as_ref().unwrap();
    let dr = r.dr_live.as_ref().unwrap();
    assert_eq!(primary.route_advertisement_types, set(&["B"]));
    assert_eq!(primary.revision, 11);
    assert_eq!(dr.route_advertisement_types, set(&["A"]));
    assert_eq!(dr.revision, 21);
}

#[tokio::test]
async fn unauthorized_result_is_never_applied() {
    let mgr = FakeManager::pair(&["A"], &["B"]);
    let rejected = check(&mgr, &params(), &baseline(&["A"], &["B"]), Direction::ToPrimary).await;
    assert!(!rejected.authorized);

    let r = execute(&mgr, Direction::ToPrimary, rejected.clone()).await;
    assert_eq!(r, rejected);
    assert!(mgr.applies().is_empty());
}

#[tokio::test]
async fn executing_a_direction_that_was_not_checked_is_refused() {
    let mgr = FakeManager::pair(&["A"], &["B"]);
    let r = authorized_failover(&mgr).await;

    let r = execute(&mgr, Direction::ToPrimary, r).await;
    assert!(!r.authorized);
    assert_eq!(
        r.failure,
        Some(Failure::DirectionMismatch {
            requested: Direction::ToPrimary,
            authorized: Some(Direction::ToDr),
        })
    );
    assert!(mgr.applies().is_empty());

    // Verified but never decided.
    let verified = verify_pair(&mgr, &params()).await;
    let r = execute(&mgr, Direction::ToDr, verified).await;
    assert!(matches!(
        r.failure,
        Some(Failure::DirectionMismatch {
            authorized: None,
            ..
        })
    ));
    assert!(mgr.applies().is_empty());
}

#[tokio::test]
async fn failed_dr_apply_changes_nothing() {
    let mgr = FakeManager::pair(&["A"], &["B"]).fail_apply(
        DR_PATH,
        TransportError::Rejected {
            status: 400,
            message: "bad request".to_string(),
        },
    );
    let r = execute(&mgr, Direction::ToDr, authorized_failover(&mgr).await).await;

    assert!(!r.authorized);
    assert_eq!(r.stage, Stage::ApplyFailed(Direction::ToDr));
    assert!(matches!(
        r.failure,
        Some(Failure::ApplyFailed {
            role: RouterRole::Dr,
            revision_conflict: false,
            ..
        })
    ));
    assert!(r.message.ends_with("Nothing Changed"), "{}", r.message);
    // Primary apply never attempted.
    assert_eq!(mgr.applies().len(), 1);
    assert_eq!(mgr.state(PRIMARY_PATH).route_advertisement_types, set(&["A"]));
}

#[tokio::test]
async fn failed_primary_apply_reports_the_asymmetric_state() {
    let mgr = FakeManager::pair(&["A"], &["B"])
        .fail_apply(PRIMARY_PATH, TransportError::Unreachable("timeout".to_string()));
    let r = execute(&mgr, Direction::ToDr, authorized_failover(&mgr).await).await;

    assert!(!r.authorized);
    assert!(r.is_partial_apply());
    assert_eq!(r.stage, Stage::ApplyFailed(Direction::ToDr));
    assert!(r.message.starts_with("PARTIAL APPLY"), "{}", r.message);
    assert!(r.message.contains(DR_PATH));
    assert!(r.message.contains(PRIMARY_PATH));

    // DR carries its post-apply state, primary its untouched pre-apply state.
    let dr = r.dr_live.as_ref().unwrap();
    assert_eq!(dr.route_advertisement_types, set(&["A"]));
    assert_eq!(dr.revision, 21);
    let primary = r.primary_live.as_ref().unwrap();
    assert_eq!(primary, r.prior_primary.as_ref().unwrap());
    assert_eq!(primary.route_advertisement_types, set(&["A"]));

    assert_eq!(mgr.state(DR_PATH).route_advertisement_types, set(&["A"]));
    assert_eq!(mgr.state(PRIMARY_PATH).route_advertisement_types, set(&["A"]));
}

#[tokio::test]
async fn concurrent_change_surfaces_as_revision_conflict() {
    let mgr = FakeManager::pair(&["A"], &["B"]);
    let r = authorized_failover(&mgr).await;
    mgr.touch(DR_PATH);

    let r = execute(&mgr, Direction::ToDr, r).await;
    assert!(!r.authorized);
    match &r.failure {
        Some(Failure::ApplyFailed {
            revision_conflict, ..
        }) => assert!(*revision_conflict),
        other => panic!("unexpected failure: {other:?}"),
    }
    assert!(r.message.contains("changed since it was fetched"));
    assert_eq!(mgr.applies().len(), 1);
}
