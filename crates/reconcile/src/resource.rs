//! Resource trait: one implementation per managed remote object type
//!
//! A resource declares its schema and the collection path it lives under.
//! Everything else has a default, and only resources with custom-mapped
//! fields, one-of groups or follow-up calls override the hooks.

use crate::api::{ApiResult, RemoteApi};
use crate::diff::ChangeSet;
use crate::mapping::{EncodeMode, MappingError, RemoteObject};
use crate::oneof::OneOf;
use crate::schema::ResourceSchema;
use crate::value::AttributeStore;
use std::fmt;
use std::sync::Arc;
use validation::Diagnostics;

/// Core trait for managed resource types
///
/// Implementations hold no per-instance state; the same value serves
/// every instance of its type, possibly from several threads at once.
pub trait Resource: Send + Sync + fmt::Debug {
    /// Type name used in desired-state files (`segment_group`)
    fn type_name(&self) -> &'static str;

    /// Collection path under the customer endpoint (`segmentGroup`)
    fn api_path(&self) -> &'static str;

    /// One-line description for listings
    fn description(&self) -> &'static str {
        ""
    }

    fn schema(&self) -> &ResourceSchema;

    /// Discriminated sub-block group, if the type has one
    fn one_of(&self) -> Option<&OneOf> {
        None
    }

    /// Cross-field checks the schema cannot express
    fn validate_extra(&self, _store: &AttributeStore) -> Diagnostics {
        Diagnostics::new()
    }

    /// Decode custom-mapped fields from a remote object
    ///
    /// Runs after generic mapping and the one-of flattener, on a staged copy
    /// of the store; an error discards the whole read.
    fn decode_custom(&self, _remote: &RemoteObject, _store: &mut AttributeStore) -> Result<(), MappingError> {
        Ok(())
    }

    /// Add custom-mapped fields to an outbound payload
    fn encode_custom(
        &self,
        _store: &AttributeStore,
        _payload: &mut RemoteObject,
        _mode: EncodeMode,
    ) -> Result<(), MappingError> {
        Ok(())
    }

    /// Label of the follow-up call, used in partial-success errors
    fn follow_up_step(&self) -> &'static str {
        "follow-up call"
    }

    /// Calls that must run after the primary create, before read-back
    fn after_create(&self, _api: &dyn RemoteApi, _id: &str, _store: &AttributeStore) -> ApiResult<()> {
        Ok(())
    }

    /// Calls that must run after the primary update when `changes` warrant it
    fn after_update(
        &self,
        _api: &dyn RemoteApi,
        _id: &str,
        _store: &AttributeStore,
        _changes: &ChangeSet,
    ) -> ApiResult<()> {
        Ok(())
    }
}

/// A shared, type-erased resource
pub type SharedResource = Arc<dyn Resource>;

/// Extension trait for declaration checks
pub trait ResourceExt {
    /// Check the schema and one-of group are consistent with each other
    fn check(&self) -> Result<(), String>;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn check(&self) -> Result<(), String> {
        let schema = self.schema();
        schema
            .check()
            .map_err(|e| format!("{}: {e}", self.type_name()))?;
        if let Some(group) = self.one_of() {
            group
                .check(schema)
                .map_err(|e| format!("{}: {e}", self.type_name()))?;
        }
        Ok(())
    }
}
