use std::time::Duration;

use interfaces_github_oauth::AccessToken;
use interfaces_github_user::{
    fetch_identity, fetch_owned_repositories, fetch_user_resources, FetchCall, FetchErrorKind,
    GitHubApiConfig, RetryPolicy,
};
use reqwest::{Client, StatusCode};
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> GitHubApiConfig {
    GitHubApiConfig {
        base_url: Url::parse(&server.uri()).unwrap(),
        max_pages: 5,
        retry: RetryPolicy {
            min_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            max_retries: 2,
        },
    }
}

fn token() -> AccessToken {
    AccessToken::new("tok_xyz")
}

#[tokio::test]
async fn identity_is_fetched_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", "Bearer tok_xyz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "login": "alice", "name": "alice", "email": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let identity = fetch_identity(&Client::new(), &api(&server), &token())
        .await
        .unwrap();

    assert_eq!(identity["id"], 1);
    assert_eq!(identity["name"], "alice");
}

#[tokio::test]
async fn repositories_follow_link_pagination() {
    let server = MockServer::start().await;
    let next = format!("{}/user/repos?affiliation=owner&per_page=100&page=2", server.uri());

    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 12, "name": "repo-c", "private": false, "stargazers_count": 0 }
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .and(query_param("affiliation", "owner"))
        .and(query_param("per_page", "100"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", format!(r#"<{next}>; rel="next", <{next}>; rel="last""#).as_str())
                .set_body_json(json!([
                    { "id": 10, "name": "repo-a", "private": false, "stargazers_count": 5 },
                    { "id": 11, "name": "repo-b", "private": true, "stargazers_count": 1 }
                ])),
        )
        .with_priority(10)
        .expect(1)
        .mount(&server)
        .await;

    let repos = fetch_owned_repositories(&Client::new(), &api(&server), &token())
        .await
        .unwrap();

    let ids: Vec<i64> = repos.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![10, 11, 12]);
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .with_priority(2)
        .mount(&server)
        .await;

    let repos = fetch_owned_repositories(&Client::new(), &api(&server), &token())
        .await
        .unwrap();

    assert!(repos.is_empty());
}

#[tokio::test]
async fn unauthorized_identity_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "Bad credentials"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetch_identity(&Client::new(), &api(&server), &token())
        .await
        .unwrap_err();

    assert_eq!(err.call, FetchCall::Identity);
    assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
    assert!(err.to_string().contains("Bad credentials"));
}

#[tokio::test]
async fn resources_failure_after_identity_is_reported_as_resources() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1, "name": "alice" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let err = fetch_user_resources(&Client::new(), &api(&server), &token())
        .await
        .unwrap_err();

    assert_eq!(err.call, FetchCall::Resources);
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
}

#[tokio::test]
async fn identity_failure_skips_resources_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let err = fetch_user_resources(&Client::new(), &api(&server), &token())
        .await
        .unwrap_err();

    assert_eq!(err.call, FetchCall::Identity);
}

#[tokio::test]
async fn non_array_repository_page_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "message": "nope" })))
        .mount(&server)
        .await;

    let err = fetch_owned_repositories(&Client::new(), &api(&server), &token())
        .await
        .unwrap_err();

    assert!(matches!(err.kind, FetchErrorKind::UnexpectedShape { expected: "array" }));
}

#[tokio::test]
async fn endless_pagination_is_cut_off() {
    let server = MockServer::start().await;
    let again = format!("{}/user/repos?page=again", server.uri());
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", format!(r#"<{again}>; rel="next""#).as_str())
                .set_body_json(json!([])),
        )
        .mount(&server)
        .await;

    let mut config = api(&server);
    config.max_pages = 2;

    let err = fetch_owned_repositories(&Client::new(), &config, &token())
        .await
        .unwrap_err();

    assert!(matches!(err.kind, FetchErrorKind::TooManyPages { max_pages: 2 }));
}

#[tokio::test]
async fn next_link_to_another_host_is_not_followed() {
    let server = MockServer::start().await;
    let elsewhere = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&elsewhere)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "link",
                    format!(r#"<{}/user/repos?page=2>; rel="next""#, elsewhere.uri()).as_str(),
                )
                .set_body_json(json!([])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = fetch_owned_repositories(&Client::new(), &api(&server), &token())
        .await
        .unwrap_err();

    assert_eq!(err.call, FetchCall::Resources);
    assert!(matches!(err.kind, FetchErrorKind::ForeignNextLink { .. }));
    assert!(elsewhere.received_requests().await.unwrap().is_empty());
}
