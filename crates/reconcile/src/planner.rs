//! Execution planner - pairs desired instances with recorded state

use crate::diff::{ChangeSet, PlannedAction};
use crate::resource::SharedResource;
use crate::value::AttributeStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Instance address: `type.name`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    pub kind: String,
    pub name: String,
}

impl Address {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Parse `type.name`
    pub fn parse(s: &str) -> Option<Self> {
        let (kind, name) = s.split_once('.')?;
        if kind.is_empty() || name.is_empty() || name.contains('.') {
            return None;
        }
        Some(Self::new(kind, name))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

/// One resource instance with its attributes
#[derive(Debug, Clone)]
pub struct Instance {
    pub address: Address,
    pub resource: SharedResource,
    pub attributes: AttributeStore,
}

/// What will happen to one instance
#[derive(Debug, Clone)]
pub struct PlannedChange {
    pub address: Address,
    pub resource: SharedResource,
    pub action: PlannedAction,
    /// Last synced state, with the remote identifier
    pub prior: Option<AttributeStore>,
    /// Desired configuration with defaults applied
    pub desired: Option<AttributeStore>,
    pub changes: ChangeSet,
}

impl PlannedChange {
    /// Human-readable description
    pub fn description(&self) -> String {
        let verb = match self.action {
            PlannedAction::Create => "create",
            PlannedAction::Update => "update in place",
            PlannedAction::Replace => "replace",
            PlannedAction::Delete => "delete",
            PlannedAction::NoOp => "no changes",
        };
        format!("{} {}: {verb}", self.action.symbol(), self.address)
    }

    /// Remote identifier from the last sync
    pub fn remote_id(&self) -> Option<&str> {
        self.prior.as_ref().and_then(AttributeStore::id)
    }
}

/// Ordered list of planned changes
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub changes: Vec<PlannedChange>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare desired instances against recorded state
    ///
    /// Desired instances come first in their given order, followed by
    /// deletions of recorded instances no longer desired.
    pub fn build(desired: Vec<Instance>, prior: Vec<Instance>) -> Self {
        let mut recorded: BTreeMap<Address, Instance> = prior
            .into_iter()
            .filter(|i| i.attributes.id().is_some())
            .map(|i| (i.address.clone(), i))
            .collect();

        let mut changes = Vec::with_capacity(desired.len() + recorded.len());
        for instance in desired {
            let mut wanted = instance.attributes;
            instance.resource.schema().apply_defaults(&mut wanted);
            let prior = recorded.remove(&instance.address).map(|i| i.attributes);
            let diff = prior
                .as_ref()
                .map(|p| ChangeSet::for_resource(instance.resource.as_ref(), p, &wanted))
                .unwrap_or_default();
            changes.push(PlannedChange {
                action: PlannedAction::decide(&diff, prior.is_some(), true),
                address: instance.address,
                resource: instance.resource,
                prior,
                desired: Some(wanted),
                changes: diff,
            });
        }

        for (address, instance) in recorded {
            changes.push(PlannedChange {
                address,
                resource: instance.resource,
                action: PlannedAction::Delete,
                prior: Some(instance.attributes),
                desired: None,
                changes: ChangeSet::default(),
            });
        }

        Self { changes }
    }

    /// Plan deletion of every recorded instance
    pub fn destroy(prior: Vec<Instance>) -> Self {
        Self::build(Vec::new(), prior)
    }

    /// Filter plan to only include changes matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&PlannedChange) -> bool,
    {
        Self {
            changes: self.changes.into_iter().filter(|c| predicate(c)).collect(),
        }
    }

    /// Filter plan to only include instances matching a target pattern
    ///
    /// Target format: "type" or "type.name"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (kind, name) = parse_target(t);
                self.filter(|c| matches_filter(&c.address, kind.as_deref(), name.as_deref()))
            }
        }
    }

    /// Changes that will touch the remote API
    pub fn pending(&self) -> impl Iterator<Item = &PlannedChange> {
        self.changes.iter().filter(|c| c.action.is_change())
    }

    /// Total number of instances in the plan
    pub fn total_resources(&self) -> usize {
        self.changes.len()
    }

    /// Check if the plan has nothing to do
    pub fn is_empty(&self) -> bool {
        self.pending().next().is_none()
    }

    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for change in &self.changes {
            match change.action {
                PlannedAction::Create => summary.additions += 1,
                PlannedAction::Update => summary.modifications += 1,
                PlannedAction::Replace => summary.replacements += 1,
                PlannedAction::Delete => summary.removals += 1,
                PlannedAction::NoOp => summary.unchanged += 1,
            }
        }
        summary
    }
}

/// Plan summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub additions: usize,
    pub modifications: usize,
    pub replacements: usize,
    pub removals: usize,
    pub unchanged: usize,
}

impl DiffSummary {
    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.modifications + self.replacements + self.removals
    }

    /// Check if there are any changes
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}

/// Parse a target string like "type.name" into (type, name)
fn parse_target(target: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = target.split('.').collect();
    match parts.len() {
        1 => (Some(parts[0].to_string()), None),
        2 => (Some(parts[0].to_string()), Some(parts[1].to_string())),
        _ => (None, Some(target.to_string())),
    }
}

/// Check if an address matches the filter criteria
fn matches_filter(address: &Address, kind: Option<&str>, name: Option<&str>) -> bool {
    if let Some(k) = kind
        && address.kind != k
    {
        return false;
    }
    if let Some(n) = name
        && address.name != n
    {
        return false;
    }
    true
}
