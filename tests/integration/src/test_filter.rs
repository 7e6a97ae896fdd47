//! Collection filter integration tests.

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::{Value, json};

    use crate::{cleanup_resource, client, collection_url, create_item, test_resource_name};

    async fn seed(client: &reqwest::Client, resource: &str) {
        let items = [
            json!({"name": "Alice", "age": 30, "address": {"city": "Oslo"}}),
            json!({"name": "bob", "age": 25, "address": {"city": "Rome"}}),
            json!({"name": "Carol", "age": 30}),
        ];
        for item in &items {
            create_item(client, resource, item).await;
        }
    }

    async fn query(client: &reqwest::Client, resource: &str, q: &str) -> Vec<Value> {
        client
            .get(format!("{}?{q}", collection_url(resource)))
            .send()
            .await
            .expect("get")
            .json()
            .await
            .expect("json")
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_filter_case_insensitively() {
        let client = client();
        let resource = test_resource_name("filter");
        seed(&client, &resource).await;

        let items = query(&client, &resource, "filter.name=ALICE").await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["name"], "Alice");

        cleanup_resource(&client, &resource).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_filter_on_numbers_and_nested_fields() {
        let client = client();
        let resource = test_resource_name("nested");
        seed(&client, &resource).await;

        assert_eq!(query(&client, &resource, "filter.age[eq]=30").await.len(), 2);
        assert_eq!(query(&client, &resource, "filter.age[neq]=30").await.len(), 1);

        let rome = query(&client, &resource, "filter.address.city=rome").await;
        assert_eq!(rome.len(), 1);
        assert_eq!(rome[0]["name"], "bob");

        cleanup_resource(&client, &resource).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_malformed_filter() {
        let client = client();
        let resource = test_resource_name("malformed");

        let resp = client
            .get(format!("{}?filter.name[gt]=1", collection_url(&resource)))
            .send()
            .await
            .expect("get");
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.expect("json");
        assert_eq!(body["message"], "Malformed filter expression");
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_delete_only_matching_items() {
        let client = client();
        let resource = test_resource_name("delfilter");
        seed(&client, &resource).await;

        let resp = client
            .delete(format!("{}?filter.age[eq]=30", collection_url(&resource)))
            .header("if-match", "*")
            .send()
            .await
            .expect("delete");
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let left = query(&client, &resource, "").await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0]["name"], "bob");

        cleanup_resource(&client, &resource).await;
    }
}
