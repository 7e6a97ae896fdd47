//! Error response integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::{Value, json};

    use crate::{client, collection_url, endpoint_url, item_url, test_resource_name};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_not_found_for_missing_id() {
        let client = client();
        let resource = test_resource_name("missing");

        let resp = client
            .get(item_url(&resource, "doesnotexist"))
            .send()
            .await
            .expect("get");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body, json!({"message": "ID 'doesnotexist' not found"}));
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_id_in_body() {
        let client = client();
        let resource = test_resource_name("idbody");

        let resp = client
            .post(collection_url(&resource))
            .json(&json!({"id": "x"}))
            .send()
            .await
            .expect("post");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_update_without_id() {
        let client = client();
        let resource = test_resource_name("noid");

        let resp = client
            .put(collection_url(&resource))
            .json(&json!({"v": 1}))
            .send()
            .await
            .expect("put");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_malformed_json() {
        let client = client();
        let resource = test_resource_name("badjson");

        let resp = client
            .post(collection_url(&resource))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .expect("post");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_unsupported_method() {
        let client = client();

        let resp = client
            .request(reqwest::Method::OPTIONS, format!("{}/items", endpoint_url()))
            .send()
            .await
            .expect("options");
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            resp.headers().get("server").and_then(|v| v.to_str().ok()),
            Some("RestStack"),
        );
        assert!(resp.headers().contains_key("x-request-id"));
    }
}
