//! # Reconcile
//!
//! Schema-driven reconciliation between a local attribute store and the
//! objects of a remote REST API.
//!
//! ## Core Concepts
//!
//! - **ResourceSchema**: typed field declarations (type, presence, defaults,
//!   conflicts, replace-on-change, validators)
//! - **Mapping**: generic read-mapping (remote to local) and encode-mapping
//!   (local to remote) for every field not declared custom
//! - **OneOf**: discriminated sub-blocks, flattened into one-element block
//!   lists locally
//! - **Lifecycle**: create/read/update/delete for one instance, tolerant of
//!   objects that disappeared remotely
//! - **ExecutionPlan** / **execute**: plan and apply many instances in
//!   parallel
//!
//! ## Example
//!
//! ```
//! use reconcile::{
//!     AttributeStore, Field, Lifecycle, MockApi, Resource, ResourceSchema, Value,
//! };
//!
//! #[derive(Debug)]
//! struct Group(ResourceSchema);
//!
//! impl Resource for Group {
//!     fn type_name(&self) -> &'static str { "segment_group" }
//!     fn api_path(&self) -> &'static str { "segmentGroup" }
//!     fn schema(&self) -> &ResourceSchema { &self.0 }
//! }
//!
//! let group = Group(
//!     ResourceSchema::new()
//!         .field(Field::string("name").required())
//!         .field(Field::bool("enabled").with_default(true)),
//! );
//!
//! let api = MockApi::new();
//! let lifecycle = Lifecycle::new(&api);
//!
//! let mut store = AttributeStore::new();
//! store.set("name", Value::from("web"));
//! lifecycle.create(&group, &mut store).unwrap();
//! assert!(store.id().is_some());
//! assert_eq!(store.get_bool("enabled"), Some(true));
//!
//! lifecycle.delete(&group, &mut store).unwrap();
//! assert!(store.id().is_none());
//! ```
//!
//! ## Provider Traits
//!
//! - [`RemoteApi`]: the remote API client, passed explicitly to every
//!   lifecycle operation
//! - [`ProgressCallback`]: receives progress updates
//! - [`ConfirmCallback`]: handles user confirmations

pub mod api;
pub mod context;
pub mod diff;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod mapping;
pub mod oneof;
pub mod planner;
pub mod resource;
pub mod schema;
pub mod types;
pub mod value;

// Re-export main types at crate root
pub use api::{ApiResult, Call, Method, MockApi, RemoteApi};
pub use context::{AutoConfirm, AutoDecline, ConfirmCallback, NoProgress, ProgressCallback};
pub use diff::{AttributeChange, ChangeSet, PlannedAction};
pub use error::{ApiError, Error, ErrorCategory, Result};
pub use executor::{ExecuteReport, Outcome, execute};
pub use lifecycle::{Lifecycle, ReadOutcome, build_payload, reconcile};
pub use mapping::{EncodeMode, MappingError, RemoteObject, decode_config};
pub use oneof::{Branch, OneOf, Variant};
pub use planner::{Address, DiffSummary, ExecutionPlan, Instance, PlannedChange};
pub use resource::{Resource, ResourceExt, SharedResource};
pub use schema::{Field, FieldType, Mapping, Presence, ResourceSchema, Scalar};
pub use types::{ApplyResult, ExecuteOptions, ExecuteSummary};
pub use value::{AttributeStore, Block, Value};
