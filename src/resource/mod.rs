//! Managed resource types
//!
//! Every type declares its schema once and leaves mapping and lifecycle to
//! the reconcile engine. Per-type code only covers what the generic engine
//! cannot express:
//! - `segment_group`: numeric-string keep-alive flag
//! - `application_segment`: port ranges sent as flat string lists, host
//!   header blanked in direct access mode
//! - `access_rule`: rule order set through a separate reorder call
//! - `auth_profile`: SAML or OIDC configuration
//! - `tenant_restriction`: Microsoft, Google or Slack configuration

mod access_rule;
mod application_segment;
mod auth_profile;
mod segment_group;
mod tenant_restriction;

pub use access_rule::AccessRule;
pub use application_segment::ApplicationSegment;
pub use auth_profile::AuthProfile;
pub use segment_group::SegmentGroup;
pub use tenant_restriction::TenantRestriction;

use reconcile::{MappingError, RemoteObject, SharedResource};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// All resource types known to the provider, by type name
pub struct Registry {
    types: BTreeMap<&'static str, SharedResource>,
}

impl Registry {
    pub fn new() -> Self {
        let all: [SharedResource; 5] = [
            Arc::new(SegmentGroup::new()),
            Arc::new(ApplicationSegment::new()),
            Arc::new(AccessRule::new()),
            Arc::new(AuthProfile::new()),
            Arc::new(TenantRestriction::new()),
        ];
        Self {
            types: all.into_iter().map(|r| (r.type_name(), r)).collect(),
        }
    }

    pub fn get(&self, type_name: &str) -> Option<SharedResource> {
        self.types.get(type_name).cloned()
    }

    /// Look up a type, listing the known ones when it does not exist
    pub fn require(&self, type_name: &str) -> anyhow::Result<SharedResource> {
        self.get(type_name).ok_or_else(|| {
            anyhow::anyhow!(
                "Unknown resource type '{type_name}' (known: {})",
                self.names().collect::<Vec<_>>().join(", ")
            )
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.types.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SharedResource> {
        self.types.values()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode an integer the API sends as a numeric string
///
/// Absent, null and empty values decode to `None`.
pub(crate) fn numeric_string(remote: &RemoteObject, key: &str, field: &str) -> Result<Option<i64>, MappingError> {
    match remote.get(key) {
        None | Some(Json::Null) => Ok(None),
        Some(Json::String(s)) if s.is_empty() => Ok(None),
        Some(Json::String(s)) => s
            .parse()
            .map(Some)
            .map_err(|_| MappingError::new(field, format!("{key} is not a number: {s:?}"))),
        Some(Json::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| MappingError::new(field, format!("{key} is out of range: {n}"))),
        Some(_) => Err(MappingError::new(field, format!("{key} must be a numeric string"))),
    }
}
