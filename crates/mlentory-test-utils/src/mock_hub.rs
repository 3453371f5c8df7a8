//! `wiremock` stub builders shared by the platform extractors' own test
//! suites (huggingface, openml, ai4life each mount these against their own
//! base-url config rather than importing a live client).

use serde_json::Value as JsonValue;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Start a server and stub `GET <path>` to return `body` as JSON with status 200.
pub async fn stub_json_get(path_pattern: &str, body: JsonValue) -> MockServer {
    let server = MockServer::start().await;
    mount_json_get(&server, path_pattern, body).await;
    server
}

/// Mount an additional `GET <path>` JSON stub on an already-running server.
pub async fn mount_json_get(server: &MockServer, path_pattern: &str, body: JsonValue) {
    Mock::given(method("GET"))
        .and(path(path_pattern))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mount a `GET <path>` stub that returns `status` with an empty body, for
/// exercising a missing-README/404 branch.
pub async fn mount_status_get(server: &MockServer, path_pattern: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(path_pattern))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
