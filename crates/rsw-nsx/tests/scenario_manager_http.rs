//! NsxClient against a mock manager.

use httpmock::prelude::*;
use serde_json::json;

use rsw_config::{NsxSettings, RetryPolicy, TlsSettings};
use rsw_nsx::NsxClient;
use rsw_reconcile::{RouterPatch, RouterTransport, TransportError};

const AUTH: &str = "Basic YWRtaW46cGFzc3dvcmQ=";
const PREFIX: &str = "/policy/api/v1";

fn settings(max_attempts: u32) -> NsxSettings {
    NsxSettings {
        scheme: "http".to_string(),
        api_prefix: PREFIX.to_string(),
        request_timeout_secs: 5,
        tls: TlsSettings {
            accept_invalid_certs: false,
        },
        retry: RetryPolicy {
            max_attempts,
            initial_backoff_ms: 1,
            max_backoff_ms: 4,
        },
    }
}

fn client(server: &MockServer, max_attempts: u32) -> NsxClient {
    NsxClient::new(&server.address().to_string(), AUTH, &settings(max_attempts)).unwrap()
}

#[tokio::test]
async fn listing_maps_unique_id_and_sends_basic_auth() {
    let server = MockServer::start_async().await;
    let list = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/policy/api/v1/infra/tier-1s")
                .header("Authorization", AUTH);
            then.status(200).json_body(json!({
                "result_count": 2,
                "results": [
                    {"unique_id": "2b1c-0001", "id": "t1-a", "display_name": "T1-SiteA", "path": "/infra/tier-1s/t1-a"},
                    {"unique_id": "2b1c-0002", "id": "t1-b", "display_name": "T1-SiteB", "path": "/infra/tier-1s/t1-b"}
                ]
            }));
        })
        .await;

    let routers = client(&server, 3).list_routers().await.unwrap();
    list.assert_async().await;
    assert_eq!(routers.len(), 2);
    assert_eq!(routers[0].id, "2b1c-0001");
    assert_eq!(routers[0].display_name, "T1-SiteA");
    assert_eq!(routers[1].path, "/infra/tier-1s/t1-b");
}

#[tokio::test]
async fn listing_follows_the_cursor_across_pages() {
    let server = MockServer::start_async().await;
    // Declared first: the earliest matching mock answers.
    let page2 = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/policy/api/v1/infra/tier-1s")
                .query_param("cursor", "c1");
            then.status(200).json_body(json!({
                "results": [
                    {"unique_id": "u2", "display_name": "T1-SiteB", "path": "/infra/tier-1s/t1-b"}
                ]
            }));
        })
        .await;
    let page1 = server
        .mock_async(|when, then| {
            when.method(GET).path("/policy/api/v1/infra/tier-1s");
            then.status(200).json_body(json!({
                "cursor": "c1",
                "results": [
                    {"unique_id": "u1", "display_name": "T1-SiteA", "path": "/infra/tier-1s/t1-a"}
                ]
            }));
        })
        .await;

    let routers = client(&server, 1).list_routers().await.unwrap();
    let ids: Vec<&str> = routers.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["u1", "u2"]);
    page1.assert_hits_async(1).await;
    page2.assert_hits_async(1).await;
}

#[tokio::test]
async fn fetch_decodes_revision_and_advertisements() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/policy/api/v1/infra/tier-1s/t1-a");
            then.status(200).json_body(json!({
                "_revision": 7,
                "display_name": "T1-SiteA",
                "route_advertisement_types": ["TIER1_CONNECTED", "TIER1_NAT"],
                "failover_mode": "NON_PREEMPTIVE"
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/policy/api/v1/infra/tier-1s/t1-b");
            then.status(200)
                .json_body(json!({"_revision": 2, "display_name": "T1-SiteB"}));
        })
        .await;

    let c = client(&server, 3);
    let a = c.fetch_router("/infra/tier-1s/t1-a").await.unwrap();
    assert_eq!(a.revision, 7);
    assert!(a.route_advertisement_types.contains("TIER1_NAT"));
    assert_eq!(a.route_advertisement_types.len(), 2);

    // Missing advertisement list means nothing advertised.
    let b = c.fetch_router("/infra/tier-1s/t1-b").await.unwrap();
    assert!(b.route_advertisement_types.is_empty());
}

#[tokio::test]
async fn unavailable_manager_is_retried_up_to_max_attempts() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/policy/api/v1/infra/tier-1s/t1-a");
            then.status(503).body("service unavailable");
        })
        .await;

    let err = client(&server, 3)
        .fetch_router("/infra/tier-1s/t1-a")
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Unreachable(_)), "{err}");
    m.assert_hits_async(3).await;
}

#[tokio::test]
async fn missing_router_is_not_retried() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET).path("/policy/api/v1/infra/tier-1s/gone");
            then.status(404).json_body(json!({
                "error_code": 500090,
                "error_message": "The path=[/infra/tier-1s/gone] is invalid"
            }));
        })
        .await;

    let err = client(&server, 5)
        .fetch_router("/infra/tier-1s/gone")
        .await
        .unwrap_err();
    assert_eq!(err, TransportError::NotFound("/infra/tier-1s/gone".to_string()));
    m.assert_hits_async(1).await;
}

#[tokio::test]
async fn apply_puts_the_patch_and_returns_the_new_state() {
    let server = MockServer::start_async().await;
    let put = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/policy/api/v1/infra/tier-1s/t1-b")
                .header("Content-Type", "application/json")
                .json_body(json!({
                    "_revision": 20,
                    "display_name": "T1-SiteB",
                    "route_advertisement_types": ["TIER1_CONNECTED"]
                }));
            then.status(200).json_body(json!({
                "_revision": 21,
                "display_name": "T1-SiteB",
                "route_advertisement_types": ["TIER1_CONNECTED"]
            }));
        })
        .await;

    let patch = RouterPatch {
        revision: 20,
        display_name: "T1-SiteB".to_string(),
        route_advertisement_types: ["TIER1_CONNECTED".to_string()].into_iter().collect(),
    };
    let after = client(&server, 3)
        .apply_router("/infra/tier-1s/t1-b", &patch)
        .await
        .unwrap();
    put.assert_async().await;
    assert_eq!(after.revision, 21);
}

#[tokio::test]
async fn apply_is_never_retried() {
    let server = MockServer::start_async().await;
    let conflict = server
        .mock_async(|when, then| {
            when.method(PUT).path("/policy/api/v1/infra/tier-1s/t1-a");
            then.status(412).json_body(json!({
                "error_code": 602,
                "error_message": "The object was modified by somebody else"
            }));
        })
        .await;
    let unavailable = server
        .mock_async(|when, then| {
            when.method(PUT).path("/policy/api/v1/infra/tier-1s/t1-b");
            then.status(503);
        })
        .await;

    let c = client(&server, 5);
    let patch = RouterPatch {
        revision: 10,
        display_name: "T1".to_string(),
        route_advertisement_types: Default::default(),
    };

    let err = c.apply_router("/infra/tier-1s/t1-a", &patch).await.unwrap_err();
    assert!(err.is_revision_conflict(), "{err}");
    assert!(err.to_string().contains("modified by somebody else"));
    conflict.assert_hits_async(1).await;

    let err = c.apply_router("/infra/tier-1s/t1-b", &patch).await.unwrap_err();
    assert!(matches!(err, TransportError::Unreachable(_)), "{err}");
    unavailable.assert_hits_async(1).await;
}

#[tokio::test]
async fn rejected_apply_carries_the_manager_message() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(PUT).path("/policy/api/v1/infra/tier-1s/t1-a");
            then.status(400).json_body(json!({
                "error_code": 500012,
                "error_message": "Invalid route advertisement type BOGUS"
            }));
        })
        .await;

    let patch = RouterPatch {
        revision: 1,
        display_name: "T1".to_string(),
        route_advertisement_types: ["BOGUS".to_string()].into_iter().collect(),
    };
    let err = client(&server, 3)
        .apply_router("/infra/tier-1s/t1-a", &patch)
        .await
        .unwrap_err();
    match err {
        TransportError::Rejected { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("BOGUS"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unreachable_host_is_reported_after_retries() {
    // Nothing listens on the discard port.
    let c = NsxClient::new("127.0.0.1:9", AUTH, &settings(2)).unwrap();
    let err = c.fetch_router("/infra/tier-1s/t1-a").await.unwrap_err();
    assert!(matches!(err, TransportError::Unreachable(_)), "{err}");
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/policy/api/v1/infra/tier-1s/t1-a");
            then.status(200).body("<html>login</html>");
        })
        .await;

    let err = client(&server, 3)
        .fetch_router("/infra/tier-1s/t1-a")
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Decode(_)), "{err}");
}
