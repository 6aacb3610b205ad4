//! Generic mapping between remote objects and the local attribute store
//!
//! Read-mapping decodes every generically mapped field of a remote object
//! into the store; encode-mapping builds a request payload from the store.
//! Fields declared with [`crate::schema::Field::custom`] are skipped in both
//! directions and left to the resource.
//!
//! Read-mapping is all-or-nothing: every field is decoded into a staging
//! list first, and the store is only touched once the whole object decoded
//! cleanly.

use crate::schema::{Field, FieldType, Presence, ResourceSchema, Scalar};
use crate::value::{AttributeStore, Block, Value};
use serde_json::{Map, Value as Json};
use thiserror::Error;
use validation::{Diagnostic, Diagnostics};

/// A remote object as returned by the API: a JSON object
pub type RemoteObject = Map<String, Json>;

/// Key of the remote identifier in every remote object
pub const REMOTE_ID: &str = "id";

/// A remote value whose shape does not match the declared field type
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct MappingError {
    /// Attribute path (e.g. `conditions[0].operator`)
    pub field: String,
    pub message: String,
}

impl MappingError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn within(mut self, parent: &str) -> Self {
        self.field = if self.field.starts_with('[') {
            format!("{parent}{}", self.field)
        } else {
            format!("{parent}.{}", self.field)
        };
        self
    }
}

/// Which request an encoded payload is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeMode {
    Create,
    /// Immutable fields are left out
    Update,
}

/// Naming used by the JSON side of a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keys {
    /// Remote objects: camelCase keys, generic fields only
    Remote,
    /// Config and state files: local field names, every field
    Local,
}

/// Decode all generic fields of `remote`
///
/// Returns one entry per generic field; `None` means the field is absent,
/// null or empty remotely and must be cleared locally.
pub fn decode_fields(
    schema: &ResourceSchema,
    remote: &RemoteObject,
) -> Result<Vec<(&'static str, Option<Value>)>, MappingError> {
    schema
        .generic_fields()
        .map(|field| {
            let value = match remote.get(&field.remote_key()) {
                Some(raw) => convert(field, raw, Keys::Remote)?,
                None => None,
            };
            Ok((field.name, value))
        })
        .collect()
}

/// Apply the generic fields of `remote` to `store` without touching the id
pub fn apply_generic(
    schema: &ResourceSchema,
    remote: &RemoteObject,
    store: &mut AttributeStore,
) -> Result<(), MappingError> {
    let staged = decode_fields(schema, remote)?;
    for (name, value) in staged {
        match value {
            Some(v) => store.set(name, v),
            // secrets are write-only on most endpoints
            None if schema.get(name).is_some_and(|f| f.sensitive) => {}
            None => {
                store.remove(name);
            }
        }
    }
    Ok(())
}

/// Full read-mapping: generic fields, then the identifier
pub fn read_into(
    schema: &ResourceSchema,
    remote: &RemoteObject,
    store: &mut AttributeStore,
) -> Result<(), MappingError> {
    let id = remote_id(remote)?;
    apply_generic(schema, remote, store)?;
    store.set_id(id);
    Ok(())
}

/// Identifier of a remote object (string or number)
pub fn remote_id(remote: &RemoteObject) -> Result<String, MappingError> {
    match remote.get(REMOTE_ID) {
        Some(Json::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Json::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(MappingError::new(
            REMOTE_ID,
            format!("expected a string or number, got {}", json_kind(other)),
        )),
        None => Err(MappingError::new(REMOTE_ID, "remote object has no identifier")),
    }
}

/// Build a request payload from the generic fields of `store`
///
/// Computed fields are never sent. Optional fields that are unset are left
/// out so the server keeps its value; required and force-new fields are
/// always sent, as their zero value when unset.
pub fn encode(schema: &ResourceSchema, store: &AttributeStore, mode: EncodeMode) -> RemoteObject {
    let mut payload = RemoteObject::new();
    for field in schema.generic_fields() {
        if field.is_computed() || (mode == EncodeMode::Update && field.immutable) {
            continue;
        }
        let value = match store.get(field.name) {
            Some(v) => encode_value(field, v),
            None if field.presence == Presence::Required || field.force_new => {
                encode_value(field, &field.ty.zero())
            }
            None => continue,
        };
        payload.insert(field.remote_key(), value);
    }
    payload
}

/// Encode one block of a nested block field with remote keys
pub fn encode_block(schema: &ResourceSchema, block: &Block) -> RemoteObject {
    let mut out = RemoteObject::new();
    for field in schema.generic_fields() {
        if field.is_computed() {
            continue;
        }
        if let Some(value) = block.get(field.name) {
            out.insert(field.remote_key(), encode_value(field, value));
        }
    }
    out
}

/// Decode one remote object into a block of `schema`
pub fn decode_block(schema: &ResourceSchema, remote: &RemoteObject) -> Result<Block, MappingError> {
    decode_object(schema, remote, Keys::Remote)
}

fn encode_value(field: &Field, value: &Value) -> Json {
    match (&field.ty, value) {
        (FieldType::Block(schema), Value::List(items)) => {
            let mut blocks = items
                .iter()
                .filter_map(Value::as_block)
                .map(|b| Json::Object(encode_block(schema, b)));
            if field.max_items == Some(1) {
                blocks.next().unwrap_or(Json::Null)
            } else {
                Json::Array(blocks.collect())
            }
        }
        _ => scalar_json(value),
    }
}

fn scalar_json(value: &Value) -> Json {
    match value {
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::from(*i),
        Value::String(s) => Json::String(s.clone()),
        Value::List(items) | Value::Set(items) => Json::Array(items.iter().map(scalar_json).collect()),
        Value::Block(b) => Json::Object(
            b.iter()
                .map(|(k, v)| (k.clone(), scalar_json(v)))
                .collect(),
        ),
    }
}

/// Decode a user-supplied attribute map keyed by local field names
///
/// Used for desired-state files and the local state file. Every field is
/// decoded, including custom-mapped ones; unknown keys are rejected.
pub fn decode_config(schema: &ResourceSchema, attrs: &Map<String, Json>) -> Result<AttributeStore, Diagnostics> {
    let mut diags = Diagnostics::new();
    let mut store = AttributeStore::new();

    for (key, raw) in attrs {
        let Some(field) = schema.get(key) else {
            diags.push(
                Diagnostic::error(
                    "unsupported argument",
                    format!("an argument named {key:?} is not expected here"),
                )
                .at(key),
            );
            continue;
        };
        match convert(field, raw, Keys::Local) {
            Ok(Some(value)) => store.set(field.name, value),
            Ok(None) => {}
            Err(e) => diags.push(
                Diagnostic::error("incorrect attribute value type", e.message).at(&e.field),
            ),
        }
    }

    if diags.has_errors() {
        return Err(diags);
    }
    Ok(store)
}

/// Convert one JSON value into the declared type of `field`
fn convert(field: &Field, raw: &Json, keys: Keys) -> Result<Option<Value>, MappingError> {
    let mismatch = |expected: &str| {
        MappingError::new(
            field.name,
            format!("expected {expected}, got {}", json_kind(raw)),
        )
    };

    let value = match (&field.ty, raw) {
        (_, Json::Null) => return Ok(None),
        (FieldType::List(element), Json::Array(items)) => {
            Value::List(scalars(*element, items).map_err(|e| e.within(field.name))?)
        }
        (FieldType::Set(element), Json::Array(items)) => {
            Value::set(scalars(*element, items).map_err(|e| e.within(field.name))?)
        }
        (FieldType::Block(schema), Json::Object(obj)) => Value::blocks([
            decode_object(schema, obj, keys).map_err(|e| e.within(&format!("{}[0]", field.name)))?,
        ]),
        (FieldType::Block(schema), Json::Array(items)) => {
            let mut blocks = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let path = format!("{}[{i}]", field.name);
                let Json::Object(obj) = item else {
                    return Err(MappingError::new(
                        path,
                        format!("expected object, got {}", json_kind(item)),
                    ));
                };
                blocks.push(decode_object(schema, obj, keys).map_err(|e| e.within(&path))?);
            }
            Value::blocks(blocks)
        }
        (FieldType::String, _) => scalar(Scalar::String, raw).ok_or_else(|| mismatch("string"))?,
        (FieldType::Int, _) => scalar(Scalar::Int, raw).ok_or_else(|| mismatch("integer"))?,
        (FieldType::Bool, _) => scalar(Scalar::Bool, raw).ok_or_else(|| mismatch("bool"))?,
        (ty, _) => return Err(mismatch(&ty.describe())),
    };

    Ok((!value.is_empty_collection()).then_some(value))
}

fn scalars(element: Scalar, items: &[Json]) -> Result<Vec<Value>, MappingError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            scalar(element, item).ok_or_else(|| {
                MappingError::new(
                    format!("[{i}]"),
                    format!("expected {}, got {}", element.name(), json_kind(item)),
                )
            })
        })
        .collect()
}

fn scalar(kind: Scalar, raw: &Json) -> Option<Value> {
    match (kind, raw) {
        (Scalar::String, Json::String(s)) => Some(Value::String(s.clone())),
        (Scalar::Int, Json::Number(n)) => n.as_i64().map(Value::Int),
        (Scalar::Bool, Json::Bool(b)) => Some(Value::Bool(*b)),
        _ => None,
    }
}

fn decode_object(schema: &ResourceSchema, obj: &Map<String, Json>, keys: Keys) -> Result<Block, MappingError> {
    if keys == Keys::Local
        && let Some(unknown) = obj.keys().find(|k| schema.get(k).is_none())
    {
        return Err(MappingError::new(unknown.as_str(), "unsupported argument"));
    }

    let mut block = Block::new();
    for field in schema.fields() {
        let raw = match keys {
            Keys::Remote if !field.is_generic() => continue,
            Keys::Remote => obj.get(&field.remote_key()),
            Keys::Local => obj.get(field.name),
        };
        if let Some(raw) = raw
            && let Some(value) = convert(field, raw, keys)?
        {
            block.insert(field.name.to_string(), value);
        }
    }
    Ok(block)
}

pub(crate) fn json_kind(raw: &Json) -> &'static str {
    match raw {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> ResourceSchema {
        ResourceSchema::new()
            .field(Field::string("name").required())
            .field(Field::string("description"))
            .field(Field::bool("enabled"))
            .field(Field::int("priority"))
            .field(Field::list("ordered_ids", Scalar::String))
            .field(Field::set("domain_names", Scalar::String))
            .field(Field::string("config_space").remote_name("configSpaceName"))
            .field(Field::string("created_time").computed())
            .field(Field::string("microtenant_id").immutable())
            .field(Field::list("tcp_port_range", Scalar::Int).custom())
            .field(
                Field::block(
                    "conditions",
                    ResourceSchema::new()
                        .field(Field::string("operator"))
                        .field(Field::set("values", Scalar::String)),
                ),
            )
    }

    fn object(v: Json) -> RemoteObject {
        match v {
            Json::Object(m) => m,
            _ => unreachable!(),
        }
    }

    fn remote() -> RemoteObject {
        object(json!({
            "id": "72058304855015574",
            "name": "web",
            "enabled": true,
            "priority": 3,
            "orderedIds": ["b", "a"],
            "domainNames": ["z.example.com", "a.example.com", "z.example.com"],
            "configSpaceName": "DEFAULT",
            "createdTime": "1700000000",
            "tcpPortRange": [{"from": "443", "to": "443"}],
            "conditions": [{"operator": "OR", "values": ["x"]}],
            "unknownServerField": {"nested": 1}
        }))
    }

    #[test]
    fn test_read_maps_generic_fields() {
        let mut store = AttributeStore::new();
        read_into(&schema(), &remote(), &mut store).unwrap();

        assert_eq!(store.id(), Some("72058304855015574"));
        assert_eq!(store.get_str("name"), Some("web"));
        assert_eq!(store.get_bool("enabled"), Some(true));
        assert_eq!(store.get_int("priority"), Some(3));
        assert_eq!(store.get_str("config_space"), Some("DEFAULT"));
        assert_eq!(store.get_str("created_time"), Some("1700000000"));
        assert_eq!(
            store.get("ordered_ids"),
            Some(&Value::List(vec!["b".into(), "a".into()]))
        );
        assert_eq!(
            store.get("domain_names"),
            Some(&Value::Set(vec!["a.example.com".into(), "z.example.com".into()]))
        );
        assert!(!store.contains("tcp_port_range"));
        let cond = store.get("conditions").and_then(Value::first_block).unwrap();
        assert_eq!(cond.get("operator"), Some(&Value::from("OR")));
    }

    #[test]
    fn test_read_is_idempotent() {
        let mut store = AttributeStore::new();
        read_into(&schema(), &remote(), &mut store).unwrap();
        let first = store.clone();
        read_into(&schema(), &remote(), &mut store).unwrap();
        assert_eq!(store, first);
    }

    #[test]
    fn test_read_clears_absent_fields() {
        let mut store = AttributeStore::new();
        store.set("description", "stale".into());
        store.set("domain_names", Value::set(vec!["old.example.com".into()]));
        store.set("tcp_port_range", Value::List(vec![Value::Int(80)]));

        let mut r = remote();
        r.insert("domainNames".into(), json!([]));
        read_into(&schema(), &r, &mut store).unwrap();

        assert!(!store.contains("description"));
        assert!(!store.contains("domain_names"));
        // custom fields belong to the resource
        assert!(store.contains("tcp_port_range"));
    }

    #[test]
    fn test_read_keeps_unechoed_secrets() {
        let schema = ResourceSchema::new()
            .field(Field::string("name"))
            .field(Field::string("client_secret").sensitive());
        let mut store = AttributeStore::new();
        store.set("client_secret", "s3cret".into());

        read_into(&schema, &object(json!({"id": "1", "name": "idp"})), &mut store).unwrap();
        assert_eq!(store.get_str("client_secret"), Some("s3cret"));

        read_into(
            &schema,
            &object(json!({"id": "1", "clientSecret": "rotated"})),
            &mut store,
        )
        .unwrap();
        assert_eq!(store.get_str("client_secret"), Some("rotated"));
    }

    #[test]
    fn test_read_null_clears() {
        let mut store = AttributeStore::new();
        store.set("priority", Value::Int(1));
        let mut r = remote();
        r.insert("priority".into(), Json::Null);
        read_into(&schema(), &r, &mut store).unwrap();
        assert!(!store.contains("priority"));
    }

    #[test]
    fn test_type_mismatch_leaves_store_untouched() {
        let mut store = AttributeStore::new();
        store.set("name", "before".into());
        store.set_id("1");

        let mut r = remote();
        r.insert("conditions".into(), json!([{"operator": 7}]));
        let err = read_into(&schema(), &r, &mut store).unwrap_err();

        assert_eq!(err.field, "conditions[0].operator");
        assert_eq!(store.get_str("name"), Some("before"));
        assert_eq!(store.id(), Some("1"));
        assert!(!store.contains("enabled"));
    }

    #[test]
    fn test_set_element_mismatch_path() {
        let mut r = remote();
        r.insert("domainNames".into(), json!(["a.com", 5]));
        let err = decode_fields(&schema(), &r).unwrap_err();
        assert_eq!(err.field, "domain_names[1]");
    }

    #[test]
    fn test_remote_id_forms() {
        assert_eq!(remote_id(&object(json!({"id": 42}))).unwrap(), "42");
        assert_eq!(remote_id(&object(json!({"id": "abc"}))).unwrap(), "abc");
        assert!(remote_id(&object(json!({"name": "x"}))).is_err());
        assert!(remote_id(&object(json!({"id": ""}))).is_err());
    }

    #[test]
    fn test_encode_skips_computed_and_unset_optional() {
        let mut store = AttributeStore::new();
        store.set("name", "web".into());
        store.set("created_time", "1".into());
        let payload = encode(&schema(), &store, EncodeMode::Create);

        assert_eq!(payload.get("name"), Some(&json!("web")));
        assert!(!payload.contains_key("createdTime"));
        assert!(!payload.contains_key("description"));
        assert!(!payload.contains_key("enabled"));
    }

    #[test]
    fn test_encode_sends_required_and_force_new_when_unset() {
        let schema = ResourceSchema::new()
            .field(Field::string("name").required())
            .field(Field::bool("bypass").force_new())
            .field(Field::string("note"));
        let payload = encode(&schema, &AttributeStore::new(), EncodeMode::Create);
        assert_eq!(payload.get("name"), Some(&json!("")));
        assert_eq!(payload.get("bypass"), Some(&json!(false)));
        assert!(!payload.contains_key("note"));
    }

    #[test]
    fn test_encode_update_omits_immutable() {
        let mut store = AttributeStore::new();
        store.set("name", "web".into());
        store.set("microtenant_id", "0".into());
        let create = encode(&schema(), &store, EncodeMode::Create);
        let update = encode(&schema(), &store, EncodeMode::Update);
        assert!(create.contains_key("microtenantId"));
        assert!(!update.contains_key("microtenantId"));
    }

    #[test]
    fn test_encode_single_block_as_object() {
        let schema = ResourceSchema::new().field(
            Field::block("config", ResourceSchema::new().field(Field::string("issuer"))).max_items(1),
        );
        let mut block = Block::new();
        block.insert("issuer".into(), "https://idp".into());
        let mut store = AttributeStore::new();
        store.set("config", Value::blocks([block]));

        let payload = encode(&schema, &store, EncodeMode::Create);
        assert_eq!(payload.get("config"), Some(&json!({"issuer": "https://idp"})));
    }

    #[test]
    fn test_round_trip() {
        let mut cond = Block::new();
        cond.insert("operator".into(), "AND".into());
        cond.insert("values".into(), Value::set(vec!["a".into(), "b".into()]));

        let mut store = AttributeStore::new();
        store.set("name", "web".into());
        store.set("description", "servers".into());
        store.set("enabled", false.into());
        store.set("priority", Value::Int(9));
        store.set("ordered_ids", Value::List(vec!["2".into(), "1".into()]));
        store.set("domain_names", Value::set(vec!["b.com".into(), "a.com".into()]));
        store.set("config_space", "SIEM".into());
        store.set("conditions", Value::blocks([cond]));

        let mut payload = encode(&schema(), &store, EncodeMode::Create);
        payload.insert(REMOTE_ID.into(), json!("1"));

        let mut decoded = AttributeStore::new();
        read_into(&schema(), &payload, &mut decoded).unwrap();
        decoded.clear_id();
        assert_eq!(decoded, store);
    }

    #[test]
    fn test_decode_config_uses_local_names() {
        let attrs = object(json!({
            "name": "web",
            "config_space": "DEFAULT",
            "tcp_port_range": [443, 443],
            "domain_names": ["b.com", "a.com"],
            "conditions": {"operator": "OR"}
        }));
        let store = decode_config(&schema(), &attrs).unwrap();
        assert_eq!(store.get_str("config_space"), Some("DEFAULT"));
        assert_eq!(
            store.get("tcp_port_range"),
            Some(&Value::List(vec![Value::Int(443), Value::Int(443)]))
        );
        assert_eq!(
            store.get("domain_names"),
            Some(&Value::Set(vec!["a.com".into(), "b.com".into()]))
        );
        assert!(store.get("conditions").and_then(Value::first_block).is_some());
    }

    #[test]
    fn test_decode_config_reports_every_problem() {
        let attrs = object(json!({
            "name": 1,
            "colour": "red",
            "conditions": [{"operator": "OR", "bogus": true}]
        }));
        let diags = decode_config(&schema(), &attrs).unwrap_err();
        assert_eq!(diags.len(), 3);
        let paths: Vec<_> = diags.iter().filter_map(|d| d.attribute.clone()).collect();
        assert!(paths.contains(&"conditions[0].bogus".to_string()));
        assert!(paths.contains(&"colour".to_string()));
    }
}
