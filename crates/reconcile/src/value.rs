//! Local attribute values and the per-instance attribute store
//!
//! The store is the host's view of one resource instance. Optional and
//! one-of nested blocks are held as lists of maps (a singleton list for a
//! block with at most one element), the same way the host runtime
//! represents them.

use serde::Serialize;
use std::collections::BTreeMap;

/// Map of attribute name to value, used for nested blocks
pub type Block = BTreeMap<String, Value>;

/// A single attribute value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    String(String),
    /// Ordered list; order is significant
    List(Vec<Value>),
    /// Unordered set; always kept sorted and deduplicated
    Set(Vec<Value>),
    /// One element of a nested block list
    Block(Block),
}

impl Value {
    /// Build a set, normalising element order and removing duplicates
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        let mut items: Vec<Value> = items.into_iter().collect();
        items.sort();
        items.dedup();
        Self::Set(items)
    }

    /// Build a list of nested blocks
    pub fn blocks(items: impl IntoIterator<Item = Block>) -> Self {
        Self::List(items.into_iter().map(Value::Block).collect())
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Elements of a list or set
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) | Self::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Self::Block(b) => Some(b),
            _ => None,
        }
    }

    /// First block of a nested block list
    pub fn first_block(&self) -> Option<&Block> {
        self.as_items()?.first()?.as_block()
    }

    /// True for lists and sets with no elements
    pub fn is_empty_collection(&self) -> bool {
        self.as_items().is_some_and(<[Value]>::is_empty)
    }

    /// Short type name used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Set(_) => "set",
            Self::Block(_) => "block",
        }
    }

    /// Render for display in plans and schema output
    pub fn render(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::String(s) => format!("{s:?}"),
            Self::List(items) | Self::Set(items) => {
                let inner: Vec<String> = items.iter().map(Value::render).collect();
                format!("[{}]", inner.join(", "))
            }
            Self::Block(b) => {
                let inner: Vec<String> = b
                    .iter()
                    .map(|(k, v)| format!("{k} = {}", v.render()))
                    .collect();
                format!("{{ {} }}", inner.join(", "))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Per-instance attribute store
///
/// Empty lists and sets are never stored: setting one removes the key, so an
/// absent attribute and an empty collection are indistinguishable. The
/// remote identifier lives outside the attribute map and is only assigned
/// from remote objects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttributeStore {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    values: BTreeMap<String, Value>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from attribute pairs (no identifier)
    pub fn from_values(values: impl IntoIterator<Item = (String, Value)>) -> Self {
        let mut store = Self::new();
        for (k, v) in values {
            store.set(k, v);
        }
        store
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    pub fn clear_id(&mut self) {
        self.id = None;
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Set an attribute; empty collections remove it instead
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if value.is_empty_collection() {
            self.values.remove(&name);
        } else {
            self.values.insert(name, value);
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
