//! Polymorphic one-of sub-blocks
//!
//! Some remote objects carry exactly one of several nested configurations,
//! selected by a discriminant field (`"protocol": "SAML"` next to a
//! `samlConfig` object). Locally each branch is its own block field, held
//! as a singleton list, and unselected branches are simply absent.
//!
//! Branch fields are custom-mapped, so the generic engine never sees them;
//! [`OneOf::flatten`] runs after generic read-mapping and
//! [`OneOf::expand`] after generic encode-mapping.

use crate::mapping::{EncodeMode, MappingError, RemoteObject, decode_block, encode_block, json_kind};
use crate::schema::{FieldType, Mapping, ResourceSchema};
use crate::value::{AttributeStore, Value};
use serde_json::Value as Json;

/// One alternative of a one-of group
#[derive(Debug, Clone)]
pub struct Branch {
    /// Discriminant value selecting this branch
    pub tag: &'static str,
    /// Local block field holding the branch
    pub field: &'static str,
    /// Remote key of the branch body
    pub remote_key: &'static str,
}

/// The branch selected by a remote object
#[derive(Debug, Clone, Copy)]
pub struct Variant<'a> {
    pub branch: &'a Branch,
    pub body: &'a RemoteObject,
}

/// A discriminated group of mutually exclusive sub-blocks
#[derive(Debug, Clone)]
pub struct OneOf {
    /// Remote key of the discriminant
    pub discriminant: &'static str,
    /// The discriminant cannot change after create and is left out of updates
    pub immutable: bool,
    branches: Vec<Branch>,
}

impl OneOf {
    pub fn new(discriminant: &'static str) -> Self {
        Self {
            discriminant,
            immutable: false,
            branches: Vec::new(),
        }
    }

    pub fn branch(mut self, tag: &'static str, field: &'static str, remote_key: &'static str) -> Self {
        self.branches.push(Branch {
            tag,
            field,
            remote_key,
        });
        self
    }

    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Local field names of every branch
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.branches.iter().map(|b| b.field)
    }

    /// Verify the branches against the resource schema
    ///
    /// Every branch must be a custom-mapped block that conflicts with all
    /// of its siblings, so selecting two branches fails validation.
    pub fn check(&self, schema: &ResourceSchema) -> Result<(), String> {
        for branch in &self.branches {
            let field = schema
                .get(branch.field)
                .ok_or_else(|| format!("one-of branch {:?} is not declared", branch.field))?;
            if !matches!(field.ty, FieldType::Block(_)) {
                return Err(format!("one-of branch {:?} must be a block", branch.field));
            }
            if field.mapping != Mapping::Custom {
                return Err(format!("one-of branch {:?} must be custom-mapped", branch.field));
            }
            for sibling in self.fields().filter(|f| *f != branch.field) {
                if !field.conflicts_with.contains(&sibling) {
                    return Err(format!(
                        "one-of branch {:?} must conflict with {sibling:?}",
                        branch.field
                    ));
                }
            }
        }
        Ok(())
    }

    /// Branch populated in a local store
    ///
    /// With several populated (rejected by validation) the first one wins.
    pub fn selected(&self, store: &AttributeStore) -> Option<&Branch> {
        self.branches
            .iter()
            .find(|b| store.get(b.field).is_some_and(|v| !v.is_empty_collection()))
    }

    /// Whether going from `prior` to `desired` selects a different branch
    pub fn switches(&self, prior: &AttributeStore, desired: &AttributeStore) -> bool {
        match (self.selected(prior), self.selected(desired)) {
            (Some(before), Some(after)) => before.tag != after.tag,
            _ => false,
        }
    }

    /// Branch selected by `remote`, or `None` when no discriminant is set
    pub fn variant_of<'a>(&'a self, remote: &'a RemoteObject) -> Result<Option<Variant<'a>>, MappingError> {
        let tag = match remote.get(self.discriminant) {
            None | Some(Json::Null) => return Ok(None),
            Some(Json::String(s)) if s.is_empty() => return Ok(None),
            Some(Json::String(s)) => s.as_str(),
            Some(other) => {
                return Err(MappingError::new(
                    self.discriminant,
                    format!("expected a string discriminant, got {}", json_kind(other)),
                ));
            }
        };

        let branch = self.branches.iter().find(|b| b.tag == tag).ok_or_else(|| {
            let known: Vec<&str> = self.branches.iter().map(|b| b.tag).collect();
            MappingError::new(
                self.discriminant,
                format!("unknown variant {tag:?}, expected one of [{}]", known.join(", ")),
            )
        })?;

        match remote.get(branch.remote_key) {
            Some(Json::Object(body)) => Ok(Some(Variant { branch, body })),
            other => Err(MappingError::new(
                branch.remote_key,
                format!(
                    "{} is {tag:?} but the {} object is {}",
                    self.discriminant,
                    branch.remote_key,
                    other.map_or("missing", json_kind)
                ),
            )),
        }
    }

    /// Write the selected branch into `store` as a one-element block list
    ///
    /// Sibling branch fields are left as they are.
    pub fn flatten(
        &self,
        schema: &ResourceSchema,
        remote: &RemoteObject,
        store: &mut AttributeStore,
    ) -> Result<(), MappingError> {
        let Some(variant) = self.variant_of(remote)? else {
            return Ok(());
        };
        let nested = schema
            .get(variant.branch.field)
            .and_then(|f| f.nested())
            .ok_or_else(|| MappingError::new(variant.branch.field, "branch is not a declared block"))?;

        let mut block = decode_block(nested, variant.body).map_err(|e| {
            MappingError::new(format!("{}[0].{}", variant.branch.field, e.field), e.message)
        })?;
        if let Some(prior) = store.get(variant.branch.field).and_then(Value::first_block) {
            for field in nested.fields().iter().filter(|f| f.sensitive) {
                if !block.contains_key(field.name)
                    && let Some(secret) = prior.get(field.name)
                {
                    block.insert(field.name.to_string(), secret.clone());
                }
            }
        }
        store.set(variant.branch.field, Value::blocks([block]));
        Ok(())
    }

    /// Add the discriminant and the populated branch body to `payload`
    pub fn expand(
        &self,
        schema: &ResourceSchema,
        store: &AttributeStore,
        payload: &mut RemoteObject,
        mode: EncodeMode,
    ) -> Result<(), MappingError> {
        let populated: Vec<&Branch> = self
            .branches
            .iter()
            .filter(|b| store.get(b.field).is_some_and(|v| !v.is_empty_collection()))
            .collect();

        let branch = match populated.as_slice() {
            [] => return Ok(()),
            [branch] => *branch,
            many => {
                let names: Vec<&str> = many.iter().map(|b| b.field).collect();
                return Err(MappingError::new(
                    self.discriminant,
                    format!("only one of [{}] may be set", names.join(", ")),
                ));
            }
        };

        let nested = schema
            .get(branch.field)
            .and_then(|f| f.nested())
            .ok_or_else(|| MappingError::new(branch.field, "branch is not a declared block"))?;
        let body = store
            .get(branch.field)
            .and_then(Value::first_block)
            .map(|b| encode_block(nested, b))
            .unwrap_or_default();

        if !(self.immutable && mode == EncodeMode::Update) {
            payload.insert(self.discriminant.to_string(), Json::String(branch.tag.to_string()));
        }
        payload.insert(branch.remote_key.to_string(), Json::Object(body));
        Ok(())
    }
}
