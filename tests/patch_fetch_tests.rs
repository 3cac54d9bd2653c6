use std::collections::HashSet;

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lint_action::actions::{ActionContext, RepoSlug};
use lint_action::config::{Config, InstallMode};
use lint_action::github::GithubClient;
use lint_action::patch::resolve_patch;

const DIFF: &str = "\
diff --git a/main.go b/main.go
--- a/main.go
+++ b/main.go
@@ -1 +1,2 @@
 package main
+var unused int
";

fn config(only_new_issues: bool) -> Config {
    Config {
        install_mode: InstallMode::Binary,
        version: "latest".to_string(),
        only_new_issues,
        github_token: "ghs_test".to_string(),
        args: String::new(),
        working_directory: None,
        debug: HashSet::new(),
    }
}

fn context(api_url: String) -> ActionContext {
    ActionContext {
        event_name: "pull_request".to_string(),
        repository: Some(RepoSlug {
            owner: "golangci".to_string(),
            name: "example".to_string(),
        }),
        pull_number: Some(7),
        api_url,
    }
}

#[tokio::test]
async fn test_successful_diff_fetch_writes_patch_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/golangci/example/pulls/7"))
        .and(header("accept", "application/vnd.github.v3.diff"))
        .and(header("authorization", "token ghs_test"))
        .respond_with(ResponseTemplate::new(200).set_body_string(DIFF))
        .mount(&server)
        .await;

    let client = GithubClient::new(&server.uri(), "ghs_test").unwrap();
    let patch = resolve_patch(&config(true), &context(server.uri()), &client).await;

    assert!(patch.ends_with("pull.patch"), "unexpected patch path {:?}", patch);
    assert_eq!(std::fs::read_to_string(&patch).unwrap(), DIFF);
}

#[tokio::test]
async fn test_server_error_degrades_to_empty_sentinel() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/golangci/example/pulls/7"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = GithubClient::new(&server.uri(), "ghs_test").unwrap();
    let patch = resolve_patch(&config(true), &context(server.uri()), &client).await;
    assert_eq!(patch, "");
}

#[tokio::test]
async fn test_unreachable_api_degrades_to_empty_sentinel() {
    // 端口上没有任何服务，传输层直接失败
    let client = GithubClient::new("http://127.0.0.1:9", "ghs_test").unwrap();
    let patch = resolve_patch(
        &config(true),
        &context("http://127.0.0.1:9".to_string()),
        &client,
    )
    .await;
    assert_eq!(patch, "");
}

#[tokio::test]
async fn test_disabled_filter_never_touches_the_network() {
    // MockServer 没有挂载任何期望，任何请求都会被记录为未匹配
    let server = MockServer::start().await;
    let client = GithubClient::new(&server.uri(), "ghs_test").unwrap();

    let patch = resolve_patch(&config(false), &context(server.uri()), &client).await;
    assert_eq!(patch, "");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_latest_release_resolution() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/golangci/golangci-lint/releases/latest"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                r#"{"tag_name": "v1.64.8", "name": "v1.64.8"}"#,
                "application/json",
            ),
        )
        .mount(&server)
        .await;

    let client = GithubClient::new(&server.uri(), "").unwrap();
    let tag = client.latest_release("golangci", "golangci-lint").await.unwrap();
    assert_eq!(tag, "v1.64.8");
}
