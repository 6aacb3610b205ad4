//! Attribute-level change detection

use crate::resource::Resource;
use crate::schema::{Presence, ResourceSchema};
use crate::value::{AttributeStore, Value};
use serde::Serialize;

/// A change to one attribute between two stores
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeChange {
    pub name: &'static str,
    pub before: Option<Value>,
    pub after: Option<Value>,
    /// The field cannot be updated in place
    pub force_new: bool,
    /// Values must not be printed
    pub sensitive: bool,
}

impl AttributeChange {
    /// Render as `name: before -> after`
    pub fn render(&self) -> String {
        let show = |v: &Option<Value>| match v {
            _ if self.sensitive => "(sensitive)".to_string(),
            Some(v) => v.render(),
            None => "(unset)".to_string(),
        };
        let replace = if self.force_new { " (forces replacement)" } else { "" };
        format!("{}: {} -> {}{replace}", self.name, show(&self.before), show(&self.after))
    }
}

/// Set of attributes that differ between a synced store and desired config
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    changes: Vec<AttributeChange>,
}

impl ChangeSet {
    /// Compare `prior` (last synced) with `desired` over the fields of `schema`
    ///
    /// Computed fields are ignored. A field the desired config leaves unset
    /// is not a change unless encode would still send it (required or
    /// force-new fields): the server keeps its value, so reporting it would
    /// plan the same update forever.
    pub fn between(schema: &ResourceSchema, prior: &AttributeStore, desired: &AttributeStore) -> Self {
        let changes = schema
            .fields()
            .iter()
            .filter(|f| f.presence != Presence::Computed)
            .filter_map(|field| {
                let before = prior.get(field.name);
                let after = desired.get(field.name);
                if after.is_none() && field.presence != Presence::Required && !field.force_new {
                    return None;
                }
                (before != after).then(|| AttributeChange {
                    name: field.name,
                    before: before.cloned(),
                    after: after.cloned(),
                    force_new: field.force_new,
                    sensitive: field.sensitive,
                })
            })
            .collect();
        Self { changes }
    }

    /// Compare stores of one instance of `resource`
    ///
    /// Like [`ChangeSet::between`], and selecting another branch of an
    /// immutable one-of group also forces replacement.
    pub fn for_resource(resource: &dyn Resource, prior: &AttributeStore, desired: &AttributeStore) -> Self {
        let mut set = Self::between(resource.schema(), prior, desired);
        if let Some(group) = resource.one_of()
            && group.immutable
            && group.switches(prior, desired)
        {
            for change in &mut set.changes {
                if group.fields().any(|f| f == change.name) {
                    change.force_new = true;
                }
            }
        }
        set
    }

    /// Did attribute `name` change?
    pub fn changed(&self, name: &str) -> bool {
        self.changes.iter().any(|c| c.name == name)
    }

    /// True if any changed attribute forces replacement
    pub fn requires_replace(&self) -> bool {
        self.changes.iter().any(|c| c.force_new)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttributeChange> {
        self.changes.iter()
    }
}

/// What applying one instance will do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannedAction {
    Create,
    Update,
    /// Delete then create
    Replace,
    Delete,
    NoOp,
}

impl PlannedAction {
    /// Choose the action for an instance from its prior and desired stores
    pub fn decide(changes: &ChangeSet, prior: bool, desired: bool) -> Self {
        match (prior, desired) {
            (false, true) => Self::Create,
            (true, false) => Self::Delete,
            (false, false) => Self::NoOp,
            (true, true) if changes.is_empty() => Self::NoOp,
            (true, true) if changes.requires_replace() => Self::Replace,
            (true, true) => Self::Update,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Create => "+",
            Self::Update => "~",
            Self::Replace => "-/+",
            Self::Delete => "-",
            Self::NoOp => " ",
        }
    }

    pub fn is_change(&self) -> bool {
        !matches!(self, Self::NoOp)
    }
}
