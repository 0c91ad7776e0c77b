use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use super::item::Item;

/// Items held by one Wax session.
///
/// Items are kept in an append-ordered list and looked up by a linear scan on
/// `id`. Every mutation is a remove-then-append, so an item that is replaced
/// or patched moves to the end of the list while plain reads leave the order
/// alone. Sessions hold a handful of fixtures, which keeps the scan cheap.
///
/// Every operation takes this session's own lock for its full duration and
/// returns owned copies; callers never hold a reference into the list, so
/// serialization of a response happens without the lock.
#[derive(Debug)]
pub struct SessionData {
    items: Mutex<Vec<Item>>,
}

impl Default for SessionData {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionData {
    /// Create a session seeded with items `A` and `B`, as the hosted Wax
    /// service does.
    #[must_use]
    pub fn new() -> Self {
        let mut seed_a = Item::with_name("A", "Item A");
        seed_a.stamp_kind();
        let mut seed_b = Item::with_name("B", "Item B");
        seed_b.stamp_kind();
        Self {
            items: Mutex::new(vec![seed_a, seed_b]),
        }
    }

    // Each mutation is a single Vec operation, so a poisoned list is still consistent.
    fn lock(&self) -> MutexGuard<'_, Vec<Item>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn position(items: &[Item], key: &str) -> Option<usize> {
        items.iter().position(|item| item.id() == Some(key))
    }

    /// Insert `item` under `key` unless an item with that id already exists.
    ///
    /// Returns a copy of the stored value, or `None` on conflict.
    pub fn add_new_item(&self, key: &str, mut item: Item) -> Option<Item> {
        item.pin_id(key);
        item.stamp_kind();

        let mut items = self.lock();
        if Self::position(&items, key).is_some() {
            debug!(item_id = %key, "Item already exists");
            return None;
        }
        items.push(item.clone());
        Some(item)
    }

    /// Insert or fully replace the item under `key`. No field of a previous
    /// value survives. The stored item moves to the end of the order.
    pub fn replace_item(&self, key: &str, mut item: Item) -> Item {
        item.pin_id(key);
        item.stamp_kind();

        let mut items = self.lock();
        if let Some(idx) = Self::position(&items, key) {
            items.remove(idx);
        }
        items.push(item.clone());
        item
    }

    /// Merge the top-level fields of `patch` over the item under `key`.
    ///
    /// Patch fields win; `id` stays `key` and `kind` is re-stamped. The merged
    /// item moves to the end of the order. Returns `None` when `key` is unknown.
    pub fn patch_item(&self, key: &str, patch: &Item) -> Option<Item> {
        let mut items = self.lock();
        let idx = Self::position(&items, key)?;
        let existing = items.remove(idx);

        let mut merged = existing.merged_with(patch);
        merged.pin_id(key);
        merged.stamp_kind();

        items.push(merged.clone());
        Some(merged)
    }

    /// Remove the item under `key`, returning the value it held.
    pub fn delete_item(&self, key: &str) -> Option<Item> {
        let mut items = self.lock();
        let idx = Self::position(&items, key)?;
        Some(items.remove(idx))
    }

    #[must_use]
    pub fn get_item_copy(&self, key: &str) -> Option<Item> {
        let items = self.lock();
        Self::position(&items, key).map(|idx| items[idx].clone())
    }

    /// Copies of all items in current store order.
    #[must_use]
    pub fn get_all_items_copy(&self) -> Vec<Item> {
        self.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
