use std::time::Duration;

use httpmock::prelude::*;
use hubsync_github::GithubIdentitySource;
use hubsync_reconcile::{IdentityError, IdentitySource};
use serde_json::json;

fn source(server: &MockServer) -> GithubIdentitySource {
    GithubIdentitySource::new_with_base_url(
        "test-token".to_string(),
        &server.base_url(),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn fetch_maps_github_user_to_profile() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/users/octocat")
                .header("Authorization", "Bearer test-token")
                .header("Accept", "application/vnd.github+json");
            then.status(200).json_body(json!({
                "login": "octocat",
                "id": 583231,
                "name": "The Octocat",
                "email": "octo@github.com",
                "bio": null,
                "location": "San Francisco",
                "created_at": "2011-01-25T18:44:36Z"
            }));
        })
        .await;

    let p = source(&server).fetch("octocat").await.unwrap();
    m.assert_async().await;

    assert_eq!(p.username, "octocat");
    assert_eq!(p.display_name.as_deref(), Some("The Octocat"));
    assert_eq!(p.email.as_deref(), Some("octo@github.com"));
    assert_eq!(p.bio, None);
    assert_eq!(p.location.as_deref(), Some("San Francisco"));
    assert_eq!(
        p.created_at.map(|t| t.to_rfc3339()),
        Some("2011-01-25T18:44:36+00:00".to_string())
    );
}

#[tokio::test]
async fn canonical_login_wins_over_requested_case() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/users/OctoCat");
            then.status(200).json_body(json!({ "login": "octocat" }));
        })
        .await;

    let p = source(&server).fetch("OctoCat").await.unwrap();
    assert_eq!(p.username, "octocat");
    assert_eq!(p.display_name, None);
    assert_eq!(p.created_at, None);
}

#[tokio::test]
async fn missing_user_is_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/users/ghost-404");
            then.status(404).json_body(json!({ "message": "Not Found" }));
        })
        .await;

    let err = source(&server).fetch("ghost-404").await.unwrap_err();
    assert!(matches!(err, IdentityError::NotFound(ref u) if u == "ghost-404"), "got: {err}");
}

#[tokio::test]
async fn bad_credentials_are_auth_errors() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/users/octocat");
            then.status(401).json_body(json!({ "message": "Bad credentials" }));
        })
        .await;

    let err = source(&server).fetch("octocat").await.unwrap_err();
    assert!(matches!(err, IdentityError::Auth(_)), "got: {err}");
    assert!(err.to_string().contains("Bad credentials"));
}

#[tokio::test]
async fn server_errors_are_transport_errors_with_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/users/octocat");
            then.status(502).body("bad gateway");
        })
        .await;

    let err = source(&server).fetch("octocat").await.unwrap_err();
    assert!(matches!(err, IdentityError::Transport(_)), "got: {err}");
    assert!(err.to_string().contains("status=502"));
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/users/octocat");
            then.status(200).body("not json");
        })
        .await;

    let err = source(&server).fetch("octocat").await.unwrap_err();
    assert!(matches!(err, IdentityError::Decode(_)), "got: {err}");
}
