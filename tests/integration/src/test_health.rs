//! Health endpoint integration tests.

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use crate::{client, endpoint_url};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_running() {
        let client = client();

        for path in ["/_reststack/health", "/_health", "/health"] {
            let resp = client
                .get(format!("{}{path}", endpoint_url()))
                .send()
                .await
                .expect("health");
            assert!(resp.status().is_success(), "{path}");
            let body: Value = resp.json().await.expect("json");
            assert_eq!(body["status"], "running");
        }
    }
}
