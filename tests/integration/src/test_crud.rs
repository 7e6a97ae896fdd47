//! Create / read / update / delete integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        cleanup_resource, client, collection_url, create_item, item_url, test_resource_name,
    };

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_create_and_get_item() {
        let client = client();
        let resource = test_resource_name("create");

        let created = create_item(&client, &resource, &json!({"name": "widget", "qty": 3})).await;
        let id = created["id"].as_str().expect("generated id").to_owned();
        assert_eq!(created["name"], "widget");

        let fetched: Value = client
            .get(item_url(&resource, &id))
            .send()
            .await
            .expect("get")
            .json()
            .await
            .expect("json");
        assert_eq!(fetched, created);

        cleanup_resource(&client, &resource).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_create_with_id_from_url_and_set_location() {
        let client = client();
        let resource = test_resource_name("location");

        let resp = client
            .post(item_url(&resource, "abc"))
            .json(&json!({"v": 1}))
            .send()
            .await
            .expect("post");
        assert_eq!(resp.status(), StatusCode::CREATED);
        let location = resp
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        assert_eq!(location, Some(format!("/{resource}/abc")));

        let again = client
            .post(item_url(&resource, "abc"))
            .json(&json!({"v": 2}))
            .send()
            .await
            .expect("post again");
        assert_eq!(again.status(), StatusCode::CONFLICT);

        cleanup_resource(&client, &resource).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_replace_and_merge_item() {
        let client = client();
        let resource = test_resource_name("update");
        let resp = client
            .post(item_url(&resource, "1"))
            .json(&json!({"a": 1, "b": 2}))
            .send()
            .await
            .expect("post");
        assert_eq!(resp.status(), StatusCode::CREATED);

        let patched: Value = client
            .patch(item_url(&resource, "1"))
            .header("if-match", "*")
            .json(&json!({"b": null, "c": 3}))
            .send()
            .await
            .expect("patch")
            .json()
            .await
            .expect("json");
        assert_eq!(patched, json!({"id": "1", "a": 1, "b": null, "c": 3}));

        let replaced: Value = client
            .put(item_url(&resource, "1"))
            .header("if-match", "*")
            .json(&json!({"z": true}))
            .send()
            .await
            .expect("put")
            .json()
            .await
            .expect("json");
        assert_eq!(replaced, json!({"id": "1", "z": true}));

        cleanup_resource(&client, &resource).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_delete_item_idempotently() {
        let client = client();
        let resource = test_resource_name("delete");
        let created = create_item(&client, &resource, &json!({"x": 1})).await;
        let id = created["id"].as_str().expect("id").to_owned();

        for _ in 0..2 {
            let resp = client
                .delete(item_url(&resource, &id))
                .header("if-match", "*")
                .send()
                .await
                .expect("delete");
            assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        }

        let resp = client.get(item_url(&resource, &id)).send().await.expect("get");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_serve_head_without_body() {
        let client = client();
        let resource = test_resource_name("head");
        create_item(&client, &resource, &json!({"x": 1})).await;

        let resp = client.head(collection_url(&resource)).send().await.expect("head");
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("etag"));
        let body = resp.bytes().await.expect("body");
        assert!(body.is_empty());

        cleanup_resource(&client, &resource).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_survive_concurrent_creates() {
        let client = client();
        let resource = test_resource_name("concurrent");

        let creates = (0..20).map(|i| {
            let client = client.clone();
            let resource = resource.clone();
            async move { create_item(&client, &resource, &json!({"n": i})).await }
        });
        futures::future::join_all(creates).await;

        let items: Vec<Value> = client
            .get(collection_url(&resource))
            .send()
            .await
            .expect("get")
            .json()
            .await
            .expect("json");
        assert_eq!(items.len(), 20);

        cleanup_resource(&client, &resource).await;
    }
}
