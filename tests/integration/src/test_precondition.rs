//! Conditional request integration tests (If-Match, If-None-Match).

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;

    use crate::{cleanup_resource, client, create_item, item_url, test_resource_name};

    async fn etag_of(client: &reqwest::Client, url: &str) -> String {
        let resp = client.get(url).send().await.expect("get");
        resp.headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .expect("etag header")
            .to_owned()
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_not_modified_for_matching_etag() {
        let client = client();
        let resource = test_resource_name("ifnone");
        let created = create_item(&client, &resource, &json!({"v": 1})).await;
        let url = item_url(&resource, created["id"].as_str().expect("id"));

        let etag = etag_of(&client, &url).await;
        assert!(etag.starts_with("W/\""));

        let resp = client
            .get(&url)
            .header("if-none-match", &etag)
            .send()
            .await
            .expect("conditional get");
        assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);

        cleanup_resource(&client, &resource).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_update_with_matching_if_match() {
        let client = client();
        let resource = test_resource_name("ifmatch");
        let created = create_item(&client, &resource, &json!({"v": 1})).await;
        let url = item_url(&resource, created["id"].as_str().expect("id"));

        let etag = etag_of(&client, &url).await;
        let resp = client
            .patch(&url)
            .header("if-match", &etag)
            .json(&json!({"v": 2}))
            .send()
            .await
            .expect("patch");
        assert_eq!(resp.status(), StatusCode::OK);

        // The old tag is now stale.
        let stale = client
            .patch(&url)
            .header("if-match", &etag)
            .json(&json!({"v": 3}))
            .send()
            .await
            .expect("stale patch");
        assert_eq!(stale.status(), StatusCode::PRECONDITION_FAILED);

        cleanup_resource(&client, &resource).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_require_if_match_on_write() {
        let client = client();
        let resource = test_resource_name("nomatch");
        let created = create_item(&client, &resource, &json!({"v": 1})).await;
        let url = item_url(&resource, created["id"].as_str().expect("id"));

        let resp = client
            .put(&url)
            .json(&json!({"v": 2}))
            .send()
            .await
            .expect("put");
        assert_eq!(resp.status(), StatusCode::PRECONDITION_FAILED);

        cleanup_resource(&client, &resource).await;
    }
}
