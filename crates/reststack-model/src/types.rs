//! Items, resource paths, and broadcast payloads.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON object without its `id`.
pub type Document = serde_json::Map<String, Value>;

/// The name of the identifying field on every item.
pub const ID_FIELD: &str = "id";

/// A stored record: an immutable `id` plus arbitrary fields.
///
/// `fields` never contains an `id` key; constructors strip it so that the
/// serialized form carries exactly one `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique id within the item's resource collection.
    pub id: String,
    /// All remaining fields.
    #[serde(flatten)]
    pub fields: Document,
}

impl Item {
    /// Create an item, dropping any `id` key from `fields`.
    #[must_use]
    pub fn new(id: impl Into<String>, mut fields: Document) -> Self {
        fields.remove(ID_FIELD);
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Look up a top-level field, including `id`.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        if name == ID_FIELD {
            Some(Value::String(self.id.clone()))
        } else {
            self.fields.get(name).cloned()
        }
    }

    /// Shallow-merge `patch` over this item. Explicit `null` values are
    /// stored as `null`; the `id` is never changed.
    pub fn merge(&mut self, patch: Document) {
        for (key, value) in patch {
            if key != ID_FIELD {
                self.fields.insert(key, value);
            }
        }
    }

    /// Convert into a JSON object with `id` first.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut doc = Document::new();
        doc.insert(ID_FIELD.to_owned(), Value::String(self.id));
        doc.extend(self.fields);
        Value::Object(doc)
    }

    /// Same as [`Item::into_value`] without consuming the item.
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.clone().into_value()
    }
}

/// The `(resource, id)` pair a request path resolves to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourcePath {
    /// First path segment.
    pub resource: Option<String>,
    /// Second path segment.
    pub id: Option<String>,
}

impl ResourcePath {
    /// Build a path from its parts.
    #[must_use]
    pub fn new(resource: Option<String>, id: Option<String>) -> Self {
        Self { resource, id }
    }
}

/// Kind of mutation announced by a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BroadcastAction {
    /// An item was created.
    Create,
    /// An item was replaced or merged.
    Update,
    /// One item was deleted.
    Delete,
    /// A whole (possibly filtered) collection was deleted.
    DeleteAll,
}

/// Mutation event sent to subscribers after a successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastEvent {
    /// Resource the mutation happened on.
    pub resource: String,
    /// What happened.
    pub action: BroadcastAction,
    /// Affected item; `{ "id": ... }` for deletes, absent for `DELETE_ALL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl BroadcastEvent {
    /// An item was created.
    #[must_use]
    pub fn created(resource: &str, item: &Item) -> Self {
        Self {
            resource: resource.to_owned(),
            action: BroadcastAction::Create,
            data: Some(item.to_value()),
        }
    }

    /// An item was updated.
    #[must_use]
    pub fn updated(resource: &str, item: &Item) -> Self {
        Self {
            resource: resource.to_owned(),
            action: BroadcastAction::Update,
            data: Some(item.to_value()),
        }
    }

    /// An item was deleted; only its id is carried.
    #[must_use]
    pub fn deleted(resource: &str, id: &str) -> Self {
        Self {
            resource: resource.to_owned(),
            action: BroadcastAction::Delete,
            data: Some(serde_json::json!({ ID_FIELD: id })),
        }
    }

    /// A collection was cleared.
    #[must_use]
    pub fn deleted_all(resource: &str) -> Self {
        Self {
            resource: resource.to_owned(),
            action: BroadcastAction::DeleteAll,
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_should_strip_id_from_fields() {
        let item = Item::new("a", doc(json!({"id": "b", "name": "x"})));
        assert_eq!(item.id, "a");
        assert!(!item.fields.contains_key("id"));
        assert_eq!(item.into_value(), json!({"id": "a", "name": "x"}));
    }

    #[test]
    fn test_should_roundtrip_through_serde() {
        let item: Item = serde_json::from_value(json!({"id": "1", "n": 2})).unwrap();
        assert_eq!(item.id, "1");
        assert_eq!(item.fields.get("n"), Some(&json!(2)));
        assert_eq!(serde_json::to_value(&item).unwrap(), json!({"id": "1", "n": 2}));
    }

    #[test]
    fn test_should_keep_explicit_null_on_merge() {
        let mut item = Item::new("1", doc(json!({"x": 1, "y": 2})));
        item.merge(doc(json!({"x": null, "z": 3, "id": "nope"})));
        assert_eq!(item.to_value(), json!({"id": "1", "x": null, "y": 2, "z": 3}));
    }

    #[test]
    fn test_should_serialize_broadcast_payloads() {
        let item = Item::new("7", doc(json!({"a": 1})));
        let created = serde_json::to_value(BroadcastEvent::created("items", &item)).unwrap();
        assert_eq!(
            created,
            json!({"resource": "items", "action": "CREATE", "data": {"id": "7", "a": 1}})
        );

        let deleted = serde_json::to_value(BroadcastEvent::deleted("items", "7")).unwrap();
        assert_eq!(deleted["data"], json!({"id": "7"}));

        let cleared = serde_json::to_value(BroadcastEvent::deleted_all("items")).unwrap();
        assert_eq!(cleared, json!({"resource": "items", "action": "DELETE_ALL"}));
    }
}
