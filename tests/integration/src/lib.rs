//! Integration tests for RestStack server.
//!
//! These tests require a running RestStack server at `localhost:3000`
//! started with conditional requests and collection deletes enabled:
//!
//! ```text
//! ETAGS=true ALLOW_DELETE_COLLECTION=true reststack-server
//! ```
//!
//! They are marked `#[ignore]` so they don't run during normal `cargo test`.
//! Run them with:
//! ```text
//! cargo test -p reststack-integration -- --ignored
//! ```

use std::sync::Once;

use serde_json::Value;

static INIT: Once = Once::new();

/// Initialize tracing (once).
fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Endpoint URL for the server.
#[must_use]
pub fn endpoint_url() -> String {
    std::env::var("RESTSTACK_ENDPOINT_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned())
}

/// Create an HTTP client for the local server.
#[must_use]
pub fn client() -> reqwest::Client {
    init_tracing();
    reqwest::Client::new()
}

/// Generate a unique resource name for a test.
#[must_use]
pub fn test_resource_name(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string()[..8].to_owned();
    format!("test-{prefix}-{id}")
}

/// Absolute URL of a resource collection.
#[must_use]
pub fn collection_url(resource: &str) -> String {
    format!("{}/{resource}", endpoint_url())
}

/// Absolute URL of a single item.
#[must_use]
pub fn item_url(resource: &str, id: &str) -> String {
    format!("{}/{resource}/{id}", endpoint_url())
}

/// POST `body` to `resource` and return the created item.
pub async fn create_item(client: &reqwest::Client, resource: &str, body: &Value) -> Value {
    let resp = client
        .post(collection_url(resource))
        .json(body)
        .send()
        .await
        .unwrap_or_else(|e| panic!("failed to create item in {resource}: {e}"));
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
    resp.json().await.expect("created item should be JSON")
}

/// Delete every item in a resource; errors are ignored.
pub async fn cleanup_resource(client: &reqwest::Client, resource: &str) {
    let _ = client
        .delete(collection_url(resource))
        .header("if-match", "*")
        .send()
        .await;
}

mod test_crud;
mod test_error;
mod test_filter;
mod test_health;
mod test_precondition;
