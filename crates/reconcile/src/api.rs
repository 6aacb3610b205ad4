//! Remote API collaborator
//!
//! Lifecycle operations never talk HTTP themselves: they call a
//! [`RemoteApi`] passed in by the caller. The trait allows:
//! - The blocking REST client used in production
//! - [`MockApi`], an in-memory server for tests

use crate::error::ApiError;
use crate::mapping::{REMOTE_ID, RemoteObject};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Result type for remote calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// CRUD calls against one collection path (e.g. `segmentGroup`).
///
/// Implementations must be safe to share between threads; independent
/// instances are applied in parallel.
pub trait RemoteApi: Send + Sync {
    /// Create an object, returning it with its assigned identifier.
    fn create(&self, path: &str, payload: &RemoteObject) -> ApiResult<RemoteObject>;

    /// Fetch an object; a missing object is `ApiError::NotFound`.
    fn get(&self, path: &str, id: &str) -> ApiResult<RemoteObject>;

    /// Replace an object. Some endpoints answer with no body.
    fn update(&self, path: &str, id: &str, payload: &RemoteObject) -> ApiResult<Option<RemoteObject>>;

    /// Delete an object; a missing object is `ApiError::NotFound`.
    fn delete(&self, path: &str, id: &str) -> ApiResult<()>;

    /// PUT to an arbitrary sub-resource path (reorder, attach, ...).
    fn put(&self, path: &str, body: Option<&Json>) -> ApiResult<()>;
}

/// Kind of call recorded by [`MockApi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Create,
    Get,
    Update,
    Delete,
    Put,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub id: Option<String>,
    pub body: Option<Json>,
}

#[derive(Debug, Default)]
struct MockState {
    objects: BTreeMap<(String, String), RemoteObject>,
    computed: BTreeMap<String, RemoteObject>,
    failures: Vec<(Method, ApiError)>,
    calls: Vec<Call>,
    next_id: u64,
}

/// In-memory remote API for tests.
///
/// Assigns numeric string identifiers, stores objects per collection path,
/// records every call, and can be told to fail the next call of a given
/// kind. Clones share the same server.
#[derive(Debug, Clone, Default)]
pub struct MockApi {
    state: Arc<Mutex<MockState>>,
}

const FIRST_ID: u64 = 72_058_304_855_000_001;

impl MockApi {
    /// Create a new empty mock server.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fields the server adds to every object created under `path`.
    pub fn with_computed(self, path: &str, key: &str, value: Json) -> Self {
        self.state()
            .computed
            .entry(path.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self
    }

    /// Fail the next call of kind `method` with `error`.
    pub fn fail_next(&self, method: Method, error: ApiError) {
        self.state().failures.push((method, error));
    }

    /// Store an object directly, as if created out of band.
    pub fn insert(&self, path: &str, mut object: RemoteObject) -> String {
        let mut state = self.state();
        let id = state.assign_id();
        object.insert(REMOTE_ID.to_string(), Json::String(id.clone()));
        state.objects.insert((path.to_string(), id.clone()), object);
        id
    }

    /// Delete an object out of band.
    pub fn remove(&self, path: &str, id: &str) -> Option<RemoteObject> {
        self.state()
            .objects
            .remove(&(path.to_string(), id.to_string()))
    }

    /// Modify a stored object out of band.
    pub fn patch(&self, path: &str, id: &str, key: &str, value: Json) {
        if let Some(object) = self
            .state()
            .objects
            .get_mut(&(path.to_string(), id.to_string()))
        {
            object.insert(key.to_string(), value);
        }
    }

    pub fn object(&self, path: &str, id: &str) -> Option<RemoteObject> {
        self.state()
            .objects
            .get(&(path.to_string(), id.to_string()))
            .cloned()
    }

    pub fn len(&self, path: &str) -> usize {
        self.state().objects.keys().filter(|(p, _)| p == path).count()
    }

    pub fn is_empty(&self) -> bool {
        self.state().objects.is_empty()
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Calls of one kind.
    pub fn calls_of(&self, method: Method) -> Vec<Call> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }
}

impl MockState {
    fn assign_id(&mut self) -> String {
        let id = FIRST_ID + self.next_id;
        self.next_id += 1;
        id.to_string()
    }

    fn record(&mut self, method: Method, path: &str, id: Option<&str>, body: Option<Json>) -> ApiResult<()> {
        self.calls.push(Call {
            method,
            path: path.to_string(),
            id: id.map(ToString::to_string),
            body,
        });
        match self.failures.iter().position(|(m, _)| *m == method) {
            Some(i) => Err(self.failures.remove(i).1),
            None => Ok(()),
        }
    }
}

impl RemoteApi for MockApi {
    fn create(&self, path: &str, payload: &RemoteObject) -> ApiResult<RemoteObject> {
        let mut state = self.state();
        state.record(Method::Create, path, None, Some(Json::Object(payload.clone())))?;

        let mut object = state.computed.get(path).cloned().unwrap_or_default();
        object.extend(payload.clone());
        let id = state.assign_id();
        object.insert(REMOTE_ID.to_string(), Json::String(id.clone()));
        state.objects.insert((path.to_string(), id), object.clone());
        Ok(object)
    }

    fn get(&self, path: &str, id: &str) -> ApiResult<RemoteObject> {
        let mut state = self.state();
        state.record(Method::Get, path, Some(id), None)?;
        state
            .objects
            .get(&(path.to_string(), id.to_string()))
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    fn update(&self, path: &str, id: &str, payload: &RemoteObject) -> ApiResult<Option<RemoteObject>> {
        let mut state = self.state();
        state.record(Method::Update, path, Some(id), Some(Json::Object(payload.clone())))?;
        let object = state
            .objects
            .get_mut(&(path.to_string(), id.to_string()))
            .ok_or(ApiError::NotFound)?;
        object.extend(payload.clone());
        Ok(None)
    }

    fn delete(&self, path: &str, id: &str) -> ApiResult<()> {
        let mut state = self.state();
        state.record(Method::Delete, path, Some(id), None)?;
        state
            .objects
            .remove(&(path.to_string(), id.to_string()))
            .map(|_| ())
            .ok_or(ApiError::NotFound)
    }

    fn put(&self, path: &str, body: Option<&Json>) -> ApiResult<()> {
        self.state().record(Method::Put, path, None, body.cloned())
    }
}
