//! CRUD lifecycle controller
//!
//! Drives one resource instance through create, read, update and delete
//! against an explicit [`RemoteApi`]. The rules every resource type shares:
//!
//! - Configuration is validated before any remote call.
//! - Create and update always finish with a read, so the store reflects
//!   what the server actually holds.
//! - Not-found on read or delete means the object is gone: the identifier
//!   is cleared and no error is returned. Every other API failure is
//!   returned wrapped with the resource type and identifier, and leaves the
//!   identifier in place.
//! - A read either applies completely or not at all.

use crate::api::RemoteApi;
use crate::diff::ChangeSet;
use crate::error::{ApiError, Error, Result};
use crate::mapping::{self, EncodeMode, RemoteObject};
use crate::resource::Resource;
use crate::value::AttributeStore;
use log::{debug, info, warn};
use validation::{Diagnostic, Diagnostics};

/// Result of a read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The object exists and the store was refreshed
    Present,
    /// The object no longer exists; the identifier was cleared
    Gone,
}

/// Lifecycle operations bound to one API client
#[derive(Clone, Copy)]
pub struct Lifecycle<'a> {
    api: &'a dyn RemoteApi,
}

impl<'a> Lifecycle<'a> {
    pub fn new(api: &'a dyn RemoteApi) -> Self {
        Self { api }
    }

    /// Validate configuration without touching the network
    pub fn validate(&self, resource: &dyn Resource, store: &AttributeStore) -> Result<()> {
        let mut diags = resource.schema().validate_config(store);
        diags.extend(resource.validate_extra(store));
        for warning in diags.iter().filter(|d| !d.is_error()) {
            warn!("{}: {warning}", resource.type_name());
        }
        if diags.has_errors() {
            return Err(Error::Validation(diags));
        }
        Ok(())
    }

    /// Create the object remotely, then read it back into `store`
    pub fn create(&self, resource: &dyn Resource, store: &mut AttributeStore) -> Result<()> {
        let kind = resource.type_name();
        self.validate(resource, store)?;
        resource.schema().apply_defaults(store);

        let payload = build_payload(resource, store, EncodeMode::Create)?;
        debug!("creating {kind} at {}", resource.api_path());
        let remote = self
            .api
            .create(resource.api_path(), &payload)
            .map_err(|e| Error::api(kind, None, e))?;
        let id = mapping::remote_id(&remote).map_err(|e| Error::mapping(kind, e))?;
        store.set_id(id.clone());
        info!("created {kind} {id}");

        resource
            .after_create(self.api, &id, store)
            .map_err(|source| Error::PartialSuccess {
                resource: kind.to_string(),
                id: id.clone(),
                step: resource.follow_up_step().to_string(),
                source,
            })?;

        self.read_back(resource, store, &id)
    }

    /// Refresh `store` from the remote object
    ///
    /// An instance without an identifier has nothing to read and is
    /// reported as gone.
    pub fn read(&self, resource: &dyn Resource, store: &mut AttributeStore) -> Result<ReadOutcome> {
        let kind = resource.type_name();
        let Some(id) = store.id().map(ToString::to_string) else {
            return Ok(ReadOutcome::Gone);
        };

        debug!("reading {kind} {id}");
        match self.api.get(resource.api_path(), &id) {
            Ok(remote) => {
                reconcile(resource, &remote, store)?;
                Ok(ReadOutcome::Present)
            }
            Err(e) if e.is_not_found() => {
                warn!("{kind} {id} no longer exists remotely, removing it from state");
                store.clear_id();
                Ok(ReadOutcome::Gone)
            }
            Err(e) => Err(Error::api(kind, Some(&id), e)),
        }
    }

    /// Update the object from `prior` (last synced) to `desired`
    ///
    /// On success `desired` holds the refreshed remote state.
    pub fn update(
        &self,
        resource: &dyn Resource,
        prior: &AttributeStore,
        desired: &mut AttributeStore,
    ) -> Result<()> {
        let kind = resource.type_name();
        let id = prior
            .id()
            .ok_or_else(|| Error::NotCreated {
                resource: kind.to_string(),
            })?
            .to_string();

        self.validate(resource, desired)?;
        resource.schema().apply_defaults(desired);

        let changes = ChangeSet::for_resource(resource, prior, desired);
        if changes.requires_replace() {
            let fields: Vec<&str> = changes.iter().filter(|c| c.force_new).map(|c| c.name).collect();
            return Err(Error::Validation(Diagnostics::from(Diagnostic::error(
                "replacement required",
                format!("{} cannot be changed in place", fields.join(", ")),
            ))));
        }
        desired.set_id(id.clone());

        let payload = build_payload(resource, desired, EncodeMode::Update)?;
        debug!("updating {kind} {id} ({} changed attributes)", changes.len());
        self.api
            .update(resource.api_path(), &id, &payload)
            .map_err(|e| Error::api(kind, Some(&id), e))?;
        info!("updated {kind} {id}");

        resource
            .after_update(self.api, &id, desired, &changes)
            .map_err(|source| Error::PartialSuccess {
                resource: kind.to_string(),
                id: id.clone(),
                step: resource.follow_up_step().to_string(),
                source,
            })?;

        self.read_back(resource, desired, &id)
    }

    /// Delete the object; an object that is already gone counts as deleted
    pub fn delete(&self, resource: &dyn Resource, store: &mut AttributeStore) -> Result<()> {
        let kind = resource.type_name();
        let Some(id) = store.id().map(ToString::to_string) else {
            return Ok(());
        };

        debug!("deleting {kind} {id}");
        match self.api.delete(resource.api_path(), &id) {
            Ok(()) => info!("deleted {kind} {id}"),
            Err(e) if e.is_not_found() => warn!("{kind} {id} was already deleted"),
            Err(e) => return Err(Error::api(kind, Some(&id), e)),
        }
        store.clear_id();
        Ok(())
    }

    fn read_back(&self, resource: &dyn Resource, store: &mut AttributeStore, id: &str) -> Result<()> {
        match self.read(resource, store)? {
            ReadOutcome::Present => Ok(()),
            ReadOutcome::Gone => Err(Error::api(resource.type_name(), Some(id), ApiError::NotFound)),
        }
    }
}

/// Map a remote object into `store`: generic fields, one-of branch, custom
/// fields, and the identifier last
///
/// All steps run on a staged copy; `store` is only replaced when every step
/// succeeded.
pub fn reconcile(resource: &dyn Resource, remote: &RemoteObject, store: &mut AttributeStore) -> Result<()> {
    let kind = resource.type_name();
    let schema = resource.schema();
    let mut staged = store.clone();

    mapping::apply_generic(schema, remote, &mut staged).map_err(|e| Error::mapping(kind, e))?;
    if let Some(group) = resource.one_of() {
        group
            .flatten(schema, remote, &mut staged)
            .map_err(|e| Error::mapping(kind, e))?;
    }
    resource
        .decode_custom(remote, &mut staged)
        .map_err(|e| Error::mapping(kind, e))?;
    let id = mapping::remote_id(remote).map_err(|e| Error::mapping(kind, e))?;
    staged.set_id(id);

    *store = staged;
    Ok(())
}

/// Build the request payload for `store`
pub fn build_payload(resource: &dyn Resource, store: &AttributeStore, mode: EncodeMode) -> Result<RemoteObject> {
    let kind = resource.type_name();
    let schema = resource.schema();
    let mut payload = mapping::encode(schema, store, mode);
    if let Some(group) = resource.one_of() {
        group
            .expand(schema, store, &mut payload, mode)
            .map_err(|e| Error::mapping(kind, e))?;
    }
    resource
        .encode_custom(store, &mut payload, mode)
        .map_err(|e| Error::mapping(kind, e))?;
    Ok(payload)
}
