use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `kind` stamped onto every stored item.
pub const ITEM_KIND: &str = "wax#waxDataItem";

/// Field holding the caller-supplied item identifier.
pub const ID_FIELD: &str = "id";

/// Field holding the resource kind.
pub const KIND_FIELD: &str = "kind";

/// A schema-free Wax item: a JSON object with a mandatory `id` and a
/// store-stamped `kind`.
///
/// `Item` has value semantics. Cloning produces a deep copy of the whole
/// object tree, so a value handed out by the store never aliases the value
/// held inside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Map<String, Value>);

impl Item {
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Convenience constructor used for the session seed items.
    #[must_use]
    pub fn with_name(id: &str, name: &str) -> Self {
        let mut item = Self::new();
        item.insert(ID_FIELD, Value::String(id.to_string()));
        item.insert("name", Value::String(name.to_string()));
        item
    }

    /// The item identifier, when present as a JSON string.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.0.get(ID_FIELD).and_then(Value::as_str)
    }

    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.0.get(KIND_FIELD).and_then(Value::as_str)
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: &str, value: Value) -> Option<Value> {
        self.0.insert(field.to_string(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Set `kind` to [`ITEM_KIND`], overwriting any caller value.
    pub fn stamp_kind(&mut self) {
        self.insert(KIND_FIELD, Value::String(ITEM_KIND.to_string()));
    }

    /// Set `id` to `key`, overwriting any caller value.
    pub(crate) fn pin_id(&mut self, key: &str) {
        self.insert(ID_FIELD, Value::String(key.to_string()));
    }

    /// Shallow merge: every top-level field of `patch` replaces the field of
    /// the same name in `self`; fields missing from `patch` are kept.
    #[must_use]
    pub fn merged_with(&self, patch: &Item) -> Item {
        let mut merged = self.0.clone();
        for (field, value) in &patch.0 {
            merged.insert(field.clone(), value.clone());
        }
        Item(merged)
    }

    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Item {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Item {
    type Error = Value;

    /// Only JSON objects are items; anything else is handed back unchanged.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

impl From<Item> for Value {
    fn from(item: Item) -> Self {
        item.into_value()
    }
}
