//! Attribute schema model
//!
//! A [`ResourceSchema`] is an ordered list of [`Field`]s declared with a
//! builder:
//!
//! ```
//! use reconcile::schema::{Field, ResourceSchema, Scalar};
//!
//! let schema = ResourceSchema::new()
//!     .field(Field::string("name").required())
//!     .field(Field::bool("enabled").with_default(true))
//!     .field(Field::set("domain_names", Scalar::String))
//!     .field(Field::string("status").computed());
//!
//! assert!(schema.check().is_ok());
//! assert!(schema.excluded_keys().is_empty());
//! ```
//!
//! Fields that need hand-written decode logic are declared with
//! [`Field::custom`]. The exclusion set handed to the generic engine is
//! derived from those declarations, so it cannot drift from the schema.

use crate::value::{AttributeStore, Block, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use validation::{Diagnostic, Diagnostics, Validator};

/// Element type of scalar lists and sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    String,
    Int,
    Bool,
}

impl Scalar {
    pub fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (Self::String, Value::String(_)) | (Self::Int, Value::Int(_)) | (Self::Bool, Value::Bool(_))
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Bool => "bool",
        }
    }
}

/// Semantic type of a field
#[derive(Debug, Clone)]
pub enum FieldType {
    String,
    Int,
    Bool,
    List(Scalar),
    Set(Scalar),
    /// Nested block, held locally as a list of maps
    Block(Box<ResourceSchema>),
}

impl FieldType {
    pub fn describe(&self) -> String {
        match self {
            Self::String => "string".into(),
            Self::Int => "int".into(),
            Self::Bool => "bool".into(),
            Self::List(s) => format!("list({})", s.name()),
            Self::Set(s) => format!("set({})", s.name()),
            Self::Block(_) => "block".into(),
        }
    }

    /// Zero value sent for unset fields that must always be transmitted
    pub fn zero(&self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Int => Value::Int(0),
            Self::Bool => Value::Bool(false),
            Self::List(_) | Self::Block(_) => Value::List(Vec::new()),
            Self::Set(_) => Value::Set(Vec::new()),
        }
    }
}

/// Who supplies a field's value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Must be configured
    Required,
    /// May be configured
    Optional,
    /// Set by the server only
    Computed,
    /// May be configured; the server fills it in otherwise
    OptionalComputed,
}

impl Presence {
    pub fn label(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Optional => "optional",
            Self::Computed => "computed",
            Self::OptionalComputed => "optional+computed",
        }
    }
}

/// How the reconciliation engine treats a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mapping {
    /// Mapped generically by name transform
    Generic,
    /// Excluded from generic mapping; the resource decodes it itself
    Custom,
}

/// Validator attached to a field
#[derive(Clone)]
pub enum FieldValidator {
    Str(Arc<dyn Validator<str>>),
    Int(Arc<dyn Validator<i64>>),
}

impl FieldValidator {
    fn validate(&self, value: &Value) -> Diagnostics {
        match (self, value) {
            (Self::Str(v), Value::String(s)) => v.validate(s),
            (Self::Int(v), Value::Int(i)) => v.validate(i),
            _ => Diagnostics::new(),
        }
    }
}

/// One declared attribute
#[derive(Clone)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
    pub presence: Presence,
    pub default: Option<Value>,
    /// Changing the value requires destroy-then-recreate
    pub force_new: bool,
    /// Never sent on update; the remote API rejects changes to it
    pub immutable: bool,
    pub sensitive: bool,
    pub conflicts_with: Vec<&'static str>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub mapping: Mapping,
    pub description: &'static str,
    remote_name: Option<&'static str>,
    validator: Option<FieldValidator>,
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("presence", &self.presence)
            .field("default", &self.default)
            .field("force_new", &self.force_new)
            .field("mapping", &self.mapping)
            .field("has_validator", &self.validator.is_some())
            .finish_non_exhaustive()
    }
}

impl Field {
    fn new(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            presence: Presence::Optional,
            default: None,
            force_new: false,
            immutable: false,
            sensitive: false,
            conflicts_with: Vec::new(),
            min_items: None,
            max_items: None,
            mapping: Mapping::Generic,
            description: "",
            remote_name: None,
            validator: None,
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn int(name: &'static str) -> Self {
        Self::new(name, FieldType::Int)
    }

    pub fn bool(name: &'static str) -> Self {
        Self::new(name, FieldType::Bool)
    }

    pub fn list(name: &'static str, element: Scalar) -> Self {
        Self::new(name, FieldType::List(element))
    }

    pub fn set(name: &'static str, element: Scalar) -> Self {
        Self::new(name, FieldType::Set(element))
    }

    pub fn block(name: &'static str, schema: ResourceSchema) -> Self {
        Self::new(name, FieldType::Block(Box::new(schema)))
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn computed(mut self) -> Self {
        self.presence = Presence::Computed;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.presence = Presence::OptionalComputed;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn conflicts_with(mut self, peers: &[&'static str]) -> Self {
        self.conflicts_with.extend_from_slice(peers);
        self
    }

    pub fn items(mut self, min: usize, max: usize) -> Self {
        self.min_items = Some(min);
        self.max_items = Some(max);
        self
    }

    pub fn max_items(mut self, max: usize) -> Self {
        self.max_items = Some(max);
        self
    }

    /// Use `key` remotely instead of the camelCase transform of the name
    pub fn remote_name(mut self, key: &'static str) -> Self {
        self.remote_name = Some(key);
        self
    }

    /// Exclude from generic mapping
    pub fn custom(mut self) -> Self {
        self.mapping = Mapping::Custom;
        self
    }

    pub fn describe(mut self, text: &'static str) -> Self {
        self.description = text;
        self
    }

    pub fn validate_str(mut self, validator: impl Validator<str> + 'static) -> Self {
        self.validator = Some(FieldValidator::Str(Arc::new(validator)));
        self
    }

    pub fn validate_int(mut self, validator: impl Validator<i64> + 'static) -> Self {
        self.validator = Some(FieldValidator::Int(Arc::new(validator)));
        self
    }

    /// JSON key of this field in remote objects
    pub fn remote_key(&self) -> String {
        self.remote_name
            .map_or_else(|| camel_case(self.name), ToString::to_string)
    }

    pub fn is_generic(&self) -> bool {
        self.mapping == Mapping::Generic
    }

    pub fn is_computed(&self) -> bool {
        self.presence == Presence::Computed
    }

    /// Nested schema of a block field
    pub fn nested(&self) -> Option<&ResourceSchema> {
        match &self.ty {
            FieldType::Block(schema) => Some(schema),
            _ => None,
        }
    }

    /// Check a configured value against type, cardinality and validator
    ///
    /// Paths in the returned diagnostics are relative to this field.
    fn check_value(&self, value: &Value) -> Diagnostics {
        let mut diags = Diagnostics::new();
        match (&self.ty, value) {
            (FieldType::String, Value::String(_)) | (FieldType::Int, Value::Int(_)) => {
                if let Some(v) = &self.validator {
                    diags.extend(v.validate(value));
                }
            }
            (FieldType::Bool, Value::Bool(_)) => {}
            (FieldType::List(element), Value::List(items))
            | (FieldType::Set(element), Value::Set(items)) => {
                diags.extend(self.check_count(items.len()));
                for (i, item) in items.iter().enumerate() {
                    let at = format!("[{i}]");
                    if !element.matches(item) {
                        diags.push(type_mismatch(element.name(), item).at(&at));
                    } else if let Some(v) = &self.validator {
                        diags.extend(v.validate(item).at(&at));
                    }
                }
            }
            (FieldType::Block(schema), Value::List(items)) => {
                diags.extend(self.check_count(items.len()));
                for (i, item) in items.iter().enumerate() {
                    let at = format!("[{i}]");
                    match item {
                        Value::Block(block) => diags.extend(schema.validate_block(block).at(&at)),
                        other => diags.push(type_mismatch("block", other).at(&at)),
                    }
                }
            }
            (ty, other) => diags.push(type_mismatch(&ty.describe(), other)),
        }
        diags
    }

    fn check_count(&self, n: usize) -> Diagnostics {
        if let Some(min) = self.min_items
            && n < min
        {
            return Diagnostics::error(
                "too few items",
                format!("attribute supports {min} item minimum, but config has {n} declared"),
            );
        }
        if let Some(max) = self.max_items
            && n > max
        {
            return Diagnostics::error(
                "too many items",
                format!("no more than {max} items are allowed, but config has {n} declared"),
            );
        }
        Diagnostics::new()
    }
}

fn type_mismatch(expected: &str, got: &Value) -> Diagnostic {
    Diagnostic::error(
        "incorrect attribute value type",
        format!("expected {expected}, got {} {}", got.kind(), got.render()),
    )
}

/// Ordered set of fields describing one resource type (or nested block)
#[derive(Debug, Clone, Default)]
pub struct ResourceSchema {
    fields: Vec<Field>,
}

impl ResourceSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Fields the generic engine maps
    pub fn generic_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_generic())
    }

    /// Fields the generic engine must skip
    pub fn excluded_keys(&self) -> BTreeSet<&'static str> {
        self.fields
            .iter()
            .filter(|f| !f.is_generic())
            .map(|f| f.name)
            .collect()
    }

    /// Verify the declaration itself is consistent
    pub fn check(&self) -> Result<(), String> {
        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.name) {
                return Err(format!("duplicate field {:?}", field.name));
            }
        }
        let mut remote_keys = BTreeSet::new();
        for field in self.generic_fields() {
            if !remote_keys.insert(field.remote_key()) {
                return Err(format!(
                    "field {:?} maps to remote key {:?} already used by another field",
                    field.name,
                    field.remote_key()
                ));
            }
        }
        for field in &self.fields {
            for peer in &field.conflicts_with {
                if !seen.contains(peer) {
                    return Err(format!(
                        "field {:?} conflicts with undeclared field {peer:?}",
                        field.name
                    ));
                }
            }
            if let Some(default) = &field.default
                && !field.check_value(default).is_empty()
            {
                return Err(format!("default of {:?} does not match its type", field.name));
            }
            if field.is_computed() && field.default.is_some() {
                return Err(format!("computed field {:?} cannot have a default", field.name));
            }
            if let Some(nested) = field.nested() {
                nested
                    .check()
                    .map_err(|e| format!("in block {:?}: {e}", field.name))?;
            }
        }
        Ok(())
    }

    /// Validate a configured store before anything is sent remotely
    pub fn validate_config(&self, store: &AttributeStore) -> Diagnostics {
        self.validate_block(store.values())
    }

    /// Validate one map of attribute values against this schema
    pub fn validate_block(&self, values: &BTreeMap<String, Value>) -> Diagnostics {
        let mut diags = Diagnostics::new();

        for key in values.keys() {
            if self.get(key).is_none() {
                diags.push(
                    Diagnostic::error(
                        "unsupported argument",
                        format!("an argument named {key:?} is not expected here"),
                    )
                    .at(key),
                );
            }
        }

        for field in &self.fields {
            match values.get(field.name) {
                None if field.presence == Presence::Required => diags.push(
                    Diagnostic::error(
                        "missing required argument",
                        format!(
                            "the argument {:?} is required, but no definition was found",
                            field.name
                        ),
                    )
                    .at(field.name),
                ),
                None => {}
                Some(_) if field.is_computed() => diags.push(
                    Diagnostic::error(
                        "computed attribute cannot be set",
                        format!("{:?} is assigned by the server", field.name),
                    )
                    .at(field.name),
                ),
                Some(value) => diags.extend(field.check_value(value).at(field.name)),
            }
        }

        let mut reported = BTreeSet::new();
        for field in &self.fields {
            if !is_populated(values.get(field.name)) {
                continue;
            }
            for peer in &field.conflicts_with {
                if !is_populated(values.get(*peer)) {
                    continue;
                }
                let pair = if field.name < *peer {
                    (field.name, *peer)
                } else {
                    (*peer, field.name)
                };
                if reported.insert(pair) {
                    diags.push(
                        Diagnostic::error(
                            "conflicting configuration arguments",
                            format!("{:?}: conflicts with {peer:?}", field.name),
                        )
                        .at(field.name),
                    );
                }
            }
        }

        diags
    }

    /// Fill unset optional fields with their declared defaults
    pub fn apply_defaults(&self, store: &mut AttributeStore) {
        self.apply_defaults_block(store.values_mut());
    }

    fn apply_defaults_block(&self, values: &mut Block) {
        for field in &self.fields {
            if !values.contains_key(field.name) {
                if let Some(default) = &field.default
                    && !default.is_empty_collection()
                {
                    values.insert(field.name.to_string(), default.clone());
                }
                continue;
            }
            if let (Some(nested), Some(Value::List(items))) =
                (field.nested(), values.get_mut(field.name))
            {
                for item in items {
                    if let Value::Block(block) = item {
                        nested.apply_defaults_block(block);
                    }
                }
            }
        }
    }
}

fn is_populated(value: Option<&Value>) -> bool {
    value.is_some_and(|v| !v.is_empty_collection())
}

/// `tcp_keep_alive` -> `tcpKeepAlive`
pub fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use validation::{hostname, int_between, string_in_slice};

    fn rule_schema() -> ResourceSchema {
        ResourceSchema::new()
            .field(Field::string("name").required())
            .field(
                Field::string("action")
                    .with_default("ALLOW")
                    .validate_str(string_in_slice(&["ALLOW", "DENY"])),
            )
            .field(Field::int("priority").validate_int(int_between(1, 100)))
            .field(Field::bool("apply_to_everyone").conflicts_with(&["source_ids"]))
            .field(Field::set("source_ids", Scalar::String).conflicts_with(&["apply_to_everyone"]))
            .field(Field::set("domains", Scalar::String).validate_str(hostname))
            .field(
                Field::block(
                    "conditions",
                    ResourceSchema::new()
                        .field(Field::string("operator").validate_str(string_in_slice(&["AND", "OR"])))
                        .field(Field::bool("negated").with_default(false)),
                )
                .max_items(2),
            )
            .field(Field::string("status").computed())
    }

    fn store(pairs: Vec<(&str, Value)>) -> AttributeStore {
        AttributeStore::from_values(pairs.into_iter().map(|(k, v)| (k.to_string(), v)))
    }

    fn condition(operator: &str) -> Block {
        let mut b = Block::new();
        b.insert("operator".into(), Value::from(operator));
        b
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("tcp_keep_alive"), "tcpKeepAlive");
        assert_eq!(camel_case("name"), "name");
        assert_eq!(camel_case("ip_anchored"), "ipAnchored");
    }

    #[test]
    fn test_remote_key_override() {
        let f = Field::string("config_space").remote_name("configSpaceName");
        assert_eq!(f.remote_key(), "configSpaceName");
    }

    #[test]
    fn test_schema_check() {
        assert!(rule_schema().check().is_ok());

        let dup = ResourceSchema::new()
            .field(Field::string("name"))
            .field(Field::int("name"));
        assert!(dup.check().is_err());

        let dangling = ResourceSchema::new().field(Field::bool("a").conflicts_with(&["b"]));
        assert!(dangling.check().unwrap_err().contains("\"b\""));

        let bad_default = ResourceSchema::new().field(Field::int("n").with_default("x"));
        assert!(bad_default.check().is_err());

        let clash = ResourceSchema::new()
            .field(Field::string("app_id"))
            .field(Field::string("application").remote_name("appId"));
        assert!(clash.check().is_err());
    }

    #[test]
    fn test_excluded_keys_follow_declaration() {
        let schema = ResourceSchema::new()
            .field(Field::string("name"))
            .field(Field::list("tcp_port_range", Scalar::Int).custom());
        let excluded = schema.excluded_keys();
        assert_eq!(excluded.len(), 1);
        assert!(excluded.contains("tcp_port_range"));
        assert_eq!(schema.generic_fields().count(), 1);
    }

    #[test]
    fn test_validate_accepts_valid_config() {
        let s = store(vec![
            ("name", "rule".into()),
            ("action", "DENY".into()),
            ("priority", Value::Int(10)),
            ("domains", Value::set(vec!["a.example.com".into()])),
            ("conditions", Value::blocks(vec![condition("OR")])),
        ]);
        let diags = rule_schema().validate_config(&s);
        assert!(diags.is_empty(), "{diags}");
    }

    #[test]
    fn test_validate_missing_required() {
        let diags = rule_schema().validate_config(&AttributeStore::new());
        assert!(diags.has_errors());
        assert_eq!(diags.last().unwrap().attribute.as_deref(), Some("name"));
    }

    #[test]
    fn test_validate_reports_attribute_paths() {
        let s = store(vec![
            ("name", "rule".into()),
            ("domains", Value::set(vec!["ok.com".into(), "bad-.com".into()])),
            ("conditions", Value::blocks(vec![condition("OR"), condition("XOR")])),
        ]);
        let diags = rule_schema().validate_config(&s);
        let paths: Vec<_> = diags.iter().filter_map(|d| d.attribute.clone()).collect();
        assert!(paths.contains(&"domains[0]".to_string()));
        assert!(paths.contains(&"conditions[1].operator".to_string()));
    }

    #[test]
    fn test_validate_rejects_conflicting_fields() {
        let s = store(vec![
            ("name", "rule".into()),
            ("apply_to_everyone", true.into()),
            ("source_ids", Value::set(vec!["72058304855047746".into()])),
        ]);
        let diags = rule_schema().validate_config(&s);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags.last().unwrap().summary, "conflicting configuration arguments");
    }

    #[test]
    fn test_validate_rejects_computed_and_unknown() {
        let s = store(vec![
            ("name", "rule".into()),
            ("status", "ACTIVE".into()),
            ("colour", "blue".into()),
        ]);
        let diags = rule_schema().validate_config(&s);
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_validate_type_and_cardinality() {
        let s = store(vec![
            ("name", Value::Int(5)),
            (
                "conditions",
                Value::blocks(vec![condition("OR"), condition("AND"), condition("OR")]),
            ),
        ]);
        let diags = rule_schema().validate_config(&s);
        let summaries: Vec<_> = diags.iter().map(|d| d.summary.as_str()).collect();
        assert!(summaries.contains(&"incorrect attribute value type"));
        assert!(summaries.contains(&"too many items"));
    }

    #[test]
    fn test_apply_defaults() {
        let mut s = store(vec![
            ("name", "rule".into()),
            ("conditions", Value::blocks(vec![condition("OR")])),
        ]);
        rule_schema().apply_defaults(&mut s);
        assert_eq!(s.get_str("action"), Some("ALLOW"));
        let block = s.get("conditions").and_then(Value::first_block).unwrap();
        assert_eq!(block.get("negated"), Some(&Value::Bool(false)));
        assert!(!s.contains("apply_to_everyone"));
    }
}
