//! API client refresh-and-retry integration tests using wiremock
//!
//! Verifies that:
//!
//! - A `token_not_valid` rejection triggers exactly one refresh and one
//!   replay with the new token.
//! - A replay that fails again is returned without a second refresh.
//! - A failed refresh logs the session out and replaces the original error.
//! - Other failures are passed through untouched.
//! - Concurrent rejected calls share one refresh.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use cinearc::api::client::ApiRequest;
use cinearc::auth::storage::{SessionStorage, ACCESS_TOKEN_KEY};
use cinearc::error::CinearcError;

mod common;

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

async fn mount_refresh(server: &MockServer, new_access: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .and(body_json(json!({"refresh": "R1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": new_access})))
        .expect(expected_calls)
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// Pass-through
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_send_attaches_bearer_token() {
    let server = MockServer::start().await;
    let a1 = common::valid_token("a1");

    Mock::given(method("GET"))
        .and(path("/movies/"))
        .and(query_param("page", "2"))
        .and(header("Authorization", bearer(&a1).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1, "title": "Alien"}])))
        .expect(1)
        .mount(&server)
        .await;

    let (ctx, _) = common::seeded_context(&server, &a1, Some("R1"));

    let body = ctx
        .api
        .send(&ApiRequest::get("/movies/").with_query("page", "2"))
        .await
        .unwrap();

    assert_eq!(body, json!([{"id": 1, "title": "Alien"}]));
}

#[tokio::test]
async fn test_send_posts_json_body() {
    let server = MockServer::start().await;
    let a1 = common::valid_token("a1");

    Mock::given(method("POST"))
        .and(path("/basket/"))
        .and(body_json(json!({"session": 3, "seats": [4, 5]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 11})))
        .expect(1)
        .mount(&server)
        .await;

    let (ctx, _) = common::seeded_context(&server, &a1, Some("R1"));

    #[derive(serde::Deserialize)]
    struct Created {
        id: u64,
    }

    let created: Created = ctx
        .api
        .send_json(&ApiRequest::post(
            "/basket/",
            json!({"session": 3, "seats": [4, 5]}),
        ))
        .await
        .unwrap();

    assert_eq!(created.id, 11);
}

#[tokio::test]
async fn test_send_empty_response_is_null() {
    let server = MockServer::start().await;
    let a1 = common::valid_token("a1");

    Mock::given(method("DELETE"))
        .and(path("/basket/11/"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (ctx, _) = common::seeded_context(&server, &a1, Some("R1"));

    let body = ctx.api.send(&ApiRequest::delete("/basket/11/")).await.unwrap();
    assert!(body.is_null());
}

#[tokio::test]
async fn test_non_token_error_passes_through_without_refresh() {
    let server = MockServer::start().await;
    let a1 = common::valid_token("a1");

    Mock::given(method("GET"))
        .and(path("/sessions/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "unused", 0).await;

    let (ctx, _) = common::seeded_context(&server, &a1, Some("R1"));

    let err = ctx.api.send(&ApiRequest::get("/sessions/")).await.unwrap_err();

    match err.downcast_ref::<CinearcError>() {
        Some(CinearcError::Api { status, code, .. }) => {
            assert_eq!(*status, 500);
            assert!(code.is_none());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(ctx.store.access_token(), Some(a1));
}

#[tokio::test]
async fn test_unauthorized_without_sentinel_code_is_not_refreshed() {
    let server = MockServer::start().await;
    let a1 = common::valid_token("a1");

    Mock::given(method("GET"))
        .and(path("/sessions/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Authentication credentials were not provided."
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "unused", 0).await;

    let (ctx, _) = common::seeded_context(&server, &a1, Some("R1"));

    let err = ctx.api.send(&ApiRequest::get("/sessions/")).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CinearcError>(),
        Some(CinearcError::Api { status: 401, .. })
    ));
}

#[tokio::test]
async fn test_token_failure_without_refresh_token_returns_original_error() {
    let server = MockServer::start().await;
    let a1 = common::valid_token("a1");

    Mock::given(method("GET"))
        .and(path("/sessions/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(common::token_not_valid_body()))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, "unused", 0).await;

    let (ctx, _) = common::seeded_context(&server, &a1, None);

    let err = ctx.api.send(&ApiRequest::get("/sessions/")).await.unwrap_err();

    let classified = err.downcast_ref::<CinearcError>().expect("classified error");
    assert!(classified.is_token_not_valid());
    assert!(ctx.store.is_authenticated());
}

// ---------------------------------------------------------------------------
// Refresh and replay
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_replayed() {
    let server = MockServer::start().await;
    let a1 = common::valid_token("a1");
    let a2 = common::valid_token("a2");

    Mock::given(method("GET"))
        .and(path("/sessions/"))
        .and(header("Authorization", bearer(&a1).as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(common::token_not_valid_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sessions/"))
        .and(header("Authorization", bearer(&a2).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 5}])))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, &a2, 1).await;

    let (ctx, storage) = common::seeded_context(&server, &a1, Some("R1"));

    let body = ctx.api.send(&ApiRequest::get("/sessions/")).await.unwrap();

    assert_eq!(body, json!([{"id": 5}]));
    assert_eq!(ctx.store.access_token(), Some(a2.clone()));
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), Some(a2));
    assert!(ctx.navigator.pending().is_none());
}

#[tokio::test]
async fn test_replayed_request_keeps_method_and_body() {
    let server = MockServer::start().await;
    let a1 = common::valid_token("a1");
    let a2 = common::valid_token("a2");

    Mock::given(method("POST"))
        .and(path("/basket/"))
        .and(header("Authorization", bearer(&a1).as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(common::token_not_valid_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/basket/"))
        .and(header("Authorization", bearer(&a2).as_str()))
        .and(body_json(json!({"session": 3})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 12})))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, &a2, 1).await;

    let (ctx, _) = common::seeded_context(&server, &a1, Some("R1"));

    let body = ctx
        .api
        .send(&ApiRequest::post("/basket/", json!({"session": 3})))
        .await
        .unwrap();
    assert_eq!(body, json!({"id": 12}));
}

#[tokio::test]
async fn test_second_token_failure_is_returned_without_another_refresh() {
    let server = MockServer::start().await;
    let a1 = common::valid_token("a1");
    let a2 = common::valid_token("a2");

    Mock::given(method("GET"))
        .and(path("/sessions/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(common::token_not_valid_body()))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(&server, &a2, 1).await;

    let (ctx, _) = common::seeded_context(&server, &a1, Some("R1"));

    let err = ctx.api.send(&ApiRequest::get("/sessions/")).await.unwrap_err();

    let classified = err.downcast_ref::<CinearcError>().expect("classified error");
    assert!(classified.is_token_not_valid());
    // The refresh itself succeeded, so the session is kept.
    assert_eq!(ctx.store.access_token(), Some(a2));
    assert!(ctx.navigator.pending().is_none());
}

#[tokio::test]
async fn test_failed_refresh_logs_out_and_replaces_error() {
    let server = MockServer::start().await;
    let a1 = common::valid_token("a1");

    Mock::given(method("GET"))
        .and(path("/sessions/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(common::token_not_valid_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Token is invalid or expired",
            "code": "token_not_valid"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (ctx, storage) = common::seeded_context(&server, &a1, Some("R1"));

    let err = ctx.api.send(&ApiRequest::get("/sessions/")).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<CinearcError>(),
        Some(CinearcError::RefreshFailed(_))
    ));
    assert!(!ctx.store.is_authenticated());
    assert!(storage.get(ACCESS_TOKEN_KEY).unwrap().is_none());
    assert_eq!(ctx.navigator.pending().as_deref(), Some("/login"));
}

#[tokio::test]
async fn test_concurrent_rejections_share_one_refresh() {
    let server = MockServer::start().await;
    let a1 = common::valid_token("a1");
    let a2 = common::valid_token("a2");

    Mock::given(method("GET"))
        .and(path("/sessions/"))
        .and(header("Authorization", bearer(&a1).as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(common::token_not_valid_body()))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sessions/"))
        .and(header("Authorization", bearer(&a2).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": a2}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (ctx, _) = common::seeded_context(&server, &a1, Some("R1"));
    let request = ApiRequest::get("/sessions/");

    let (first, second, third) = tokio::join!(
        ctx.api.send(&request),
        ctx.api.send(&request),
        ctx.api.send(&request)
    );

    assert_eq!(first.unwrap(), json!([]));
    assert_eq!(second.unwrap(), json!([]));
    assert_eq!(third.unwrap(), json!([]));
    assert_eq!(ctx.store.access_token(), Some(a2));
}

#[tokio::test]
async fn test_concurrent_rejections_after_failed_refresh_all_fail() {
    let server = MockServer::start().await;
    let a1 = common::valid_token("a1");

    Mock::given(method("GET"))
        .and(path("/sessions/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(common::token_not_valid_body()))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
        .expect(1)
        .mount(&server)
        .await;

    let (ctx, _) = common::seeded_context(&server, &a1, Some("R1"));
    let request = ApiRequest::get("/sessions/");

    let (first, second) = tokio::join!(ctx.api.send(&request), ctx.api.send(&request));

    for result in [first, second] {
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CinearcError>(),
            Some(CinearcError::RefreshFailed(_))
        ));
    }
    assert!(!ctx.store.is_authenticated());
}
