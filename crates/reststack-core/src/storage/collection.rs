//! Collection operations shared by the list-backed stores.
//!
//! Every function works on a plain `Vec<Item>` so the memory, JSON file and
//! JSON directory backends only differ in how they load and persist it.

use reststack_model::types::{Document, Item};

use super::{StorageError, StorageResult};
use crate::filter::{Filter, matches};

/// Items matching `filter`, or all items.
#[must_use]
pub fn select(items: &[Item], filter: Option<&Filter>) -> Vec<Item> {
    match filter {
        Some(filter) => items
            .iter()
            .filter(|item| matches(filter, item))
            .cloned()
            .collect(),
        None => items.to_vec(),
    }
}

/// The item with `id`.
#[must_use]
pub fn find(items: &[Item], id: &str) -> Option<Item> {
    items.iter().find(|item| item.id == id).cloned()
}

/// Append a new item. A generated id is a fresh UUID v4.
pub fn insert(items: &mut Vec<Item>, id: Option<&str>, fields: Document) -> StorageResult<Item> {
    let id = match id {
        Some(id) => {
            if items.iter().any(|item| item.id == id) {
                return Err(StorageError::AlreadyExists { id: id.to_owned() });
            }
            id.to_owned()
        }
        None => loop {
            let candidate = uuid::Uuid::new_v4().to_string();
            if !items.iter().any(|item| item.id == candidate) {
                break candidate;
            }
        },
    };
    let item = Item::new(id, fields);
    items.push(item.clone());
    Ok(item)
}

/// Shallow-merge `patch` over the stored item with the same id.
pub fn merge(items: &mut [Item], patch: Item) -> StorageResult<Item> {
    let stored = position(items, &patch.id)?;
    items[stored].merge(patch.fields);
    Ok(items[stored].clone())
}

/// Replace the stored item with the same id, keeping its position.
pub fn replace(items: &mut [Item], item: Item) -> StorageResult<Item> {
    let stored = position(items, &item.id)?;
    items[stored] = Item::new(item.id, item.fields);
    Ok(items[stored].clone())
}

/// Remove the item with `id`; returns whether anything was removed.
pub fn remove(items: &mut Vec<Item>, id: &str) -> bool {
    let before = items.len();
    items.retain(|item| item.id != id);
    items.len() != before
}

/// Remove every item matching `filter`; returns how many were removed.
pub fn remove_matching(items: &mut Vec<Item>, filter: &Filter) -> usize {
    let before = items.len();
    items.retain(|item| !matches(filter, item));
    before - items.len()
}

fn position(items: &[Item], id: &str) -> StorageResult<usize> {
    items
        .iter()
        .position(|item| item.id == id)
        .ok_or_else(|| StorageError::NotFound { id: id.to_owned() })
}
