//! Transport trait and implementations.
//!
//! The [`Transport`] trait moves JSON bodies to and from the devhub REST API.
//! [`http::HttpTransport`] talks to a real server; [`MockTransport`] keeps
//! objects in memory for tests.
//!
//! # Testing
//!
//! ```
//! use devhub_client::transport::{MockTransport, Transport};
//! use serde_json::json;
//!
//! let mock = MockTransport::new();
//! let created = mock
//!     .create("dashboards", &json!({ "id": "", "name": "ops", "panels": [{ "id": "" }] }))
//!     .unwrap();
//!
//! assert_ne!(created["id"], "");
//! assert_ne!(created["panels"][0]["id"], "");
//! ```

pub mod http;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use crate::error::{Error, Result};

/// Transport trait for the devhub REST API.
///
/// Paths are collection paths below `/api/v1/`, e.g. `querydesk/databases`.
pub trait Transport: Send + Sync {
    /// `POST {collection}`.
    fn create(&self, collection: &str, body: &Value) -> Result<Value>;

    /// `GET {collection}/{id}`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the id is unknown.
    fn get(&self, collection: &str, id: &str) -> Result<Value>;

    /// `PATCH {collection}/{id}`.
    fn update(&self, collection: &str, id: &str, body: &Value) -> Result<Value>;

    /// `DELETE {collection}/{id}`.
    fn delete(&self, collection: &str, id: &str) -> Result<()>;

    /// `GET {collection}/lookup?{field}={value}`.
    fn lookup(&self, collection: &str, field: &str, value: &str) -> Result<Value>;
}

/// HTTP method of a recorded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read or lookup.
    Get,
    /// Create.
    Post,
    /// Update.
    Patch,
    /// Delete.
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        write!(f, "{name}")
    }
}

/// A call recorded by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    /// HTTP method.
    pub method: Method,
    /// Path below `/api/v1/`.
    pub path: String,
    /// Request body, for writes.
    pub body: Option<Value>,
}

/// Rewrites a response before it is returned.
pub type ResponseHook = Arc<dyn Fn(Method, &mut Value) + Send + Sync>;

#[derive(Default)]
struct MockState {
    objects: HashMap<String, BTreeMap<String, Value>>,
    calls: Vec<Call>,
    next_id: u64,
    failure: Option<Error>,
    hook: Option<ResponseHook>,
}

impl MockState {
    fn fresh_id(&mut self) -> String {
        self.next_id += 1;
        format!("mock-{}", self.next_id)
    }

    /// Give every object with an empty `id` a fresh one, recursively.
    fn assign_ids(&mut self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                if map.get("id").is_some_and(|id| id == "") {
                    map.insert("id".to_string(), Value::String(self.fresh_id()));
                }
                for child in map.values_mut() {
                    self.assign_ids(child);
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.assign_ids(item);
                }
            }
            _ => {}
        }
    }

    fn record(&mut self, method: Method, path: String, body: Option<&Value>) -> Result<()> {
        self.calls.push(Call {
            method,
            path,
            body: body.cloned(),
        });
        match self.failure.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn respond(&self, method: Method, mut value: Value) -> Value {
        if let Some(hook) = &self.hook {
            hook(method, &mut value);
        }
        value
    }
}

/// In-memory transport for testing without network access.
///
/// Objects live in per-collection maps. Writes assign a fresh identifier to
/// every nested object whose `id` is empty, the way the API does. Clones
/// share state, so a test can keep a handle after moving one into a client.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("calls", &self.lock().calls.len())
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    /// Create a new empty mock transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store an object directly, bypassing call recording.
    pub fn insert(&self, collection: &str, object: Value) {
        let mut state = self.lock();
        let id = object["id"].as_str().unwrap_or_default().to_string();
        state
            .objects
            .entry(collection.to_string())
            .or_default()
            .insert(id, object);
    }

    /// Get a stored object, bypassing call recording.
    #[must_use]
    pub fn object(&self, collection: &str, id: &str) -> Option<Value> {
        self.lock()
            .objects
            .get(collection)
            .and_then(|objects| objects.get(id))
            .cloned()
    }

    /// Remove a stored object, simulating deletion outside this client.
    pub fn remove(&self, collection: &str, id: &str) {
        if let Some(objects) = self.lock().objects.get_mut(collection) {
            objects.remove(id);
        }
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: Error) {
        self.lock().failure = Some(error);
    }

    /// Rewrite every response with `hook`.
    pub fn set_hook(&self, hook: impl Fn(Method, &mut Value) + Send + Sync + 'static) {
        self.lock().hook = Some(Arc::new(hook));
    }

    /// Every call made so far.
    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Number of calls with the given method.
    #[must_use]
    pub fn count(&self, method: Method) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.method == method)
            .count()
    }
}

impl Transport for MockTransport {
    fn create(&self, collection: &str, body: &Value) -> Result<Value> {
        let mut state = self.lock();
        state.record(Method::Post, collection.to_string(), Some(body))?;

        let mut object = body.clone();
        if object.get("id").is_none() {
            object["id"] = Value::String(String::new());
        }
        state.assign_ids(&mut object);
        let id = object["id"].as_str().unwrap_or_default().to_string();
        state
            .objects
            .entry(collection.to_string())
            .or_default()
            .insert(id, object.clone());

        Ok(state.respond(Method::Post, object))
    }

    fn get(&self, collection: &str, id: &str) -> Result<Value> {
        let path = format!("{collection}/{id}");
        let mut state = self.lock();
        state.record(Method::Get, path.clone(), None)?;

        let object = state
            .objects
            .get(collection)
            .and_then(|objects| objects.get(id))
            .cloned()
            .ok_or_else(|| Error::not_found(path))?;
        Ok(state.respond(Method::Get, object))
    }

    fn update(&self, collection: &str, id: &str, body: &Value) -> Result<Value> {
        let path = format!("{collection}/{id}");
        let mut state = self.lock();
        state.record(Method::Patch, path.clone(), Some(body))?;

        let exists = state
            .objects
            .get(collection)
            .is_some_and(|objects| objects.contains_key(id));
        if !exists {
            return Err(Error::not_found(path));
        }

        let mut object = body.clone();
        object["id"] = Value::String(id.to_string());
        state.assign_ids(&mut object);
        state
            .objects
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), object.clone());

        Ok(state.respond(Method::Patch, object))
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let path = format!("{collection}/{id}");
        let mut state = self.lock();
        state.record(Method::Delete, path.clone(), None)?;

        state
            .objects
            .get_mut(collection)
            .and_then(|objects| objects.remove(id))
            .map(|_| ())
            .ok_or_else(|| Error::not_found(path))
    }

    fn lookup(&self, collection: &str, field: &str, value: &str) -> Result<Value> {
        let path = format!("{collection}/lookup?{field}={value}");
        let mut state = self.lock();
        state.record(Method::Get, path.clone(), None)?;

        let found = state
            .objects
            .get(collection)
            .and_then(|objects| objects.values().find(|object| object[field] == value))
            .cloned()
            .ok_or_else(|| Error::not_found(path))?;
        Ok(state.respond(Method::Get, found))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mock_transport_new() {
        let mock = MockTransport::new();
        assert!(mock.calls().is_empty());
        assert!(mock.get("workflows", "w1").is_err());
    }

    #[test]
    fn test_create_assigns_ids_recursively() {
        let mock = MockTransport::new();
        let created = mock
            .create(
                "workflows",
                &json!({
                    "id": "",
                    "steps": [
                        { "id": "", "permissions": [{ "id": "" }, { "id": "" }] },
                        { "id": "kept" }
                    ]
                }),
            )
            .unwrap();

        let ids = [
            &created["id"],
            &created["steps"][0]["id"],
            &created["steps"][0]["permissions"][0]["id"],
            &created["steps"][0]["permissions"][1]["id"],
        ];
        for id in ids {
            assert!(id.as_str().is_some_and(|id| id.starts_with("mock-")));
        }
        assert_eq!(created["steps"][1]["id"], "kept");
        assert_ne!(
            created["steps"][0]["permissions"][0]["id"],
            created["steps"][0]["permissions"][1]["id"]
        );
    }

    #[test]
    fn test_get_update_delete() {
        let mock = MockTransport::new();
        let created = mock.create("dashboards", &json!({ "id": "", "name": "a" })).unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        assert_eq!(mock.get("dashboards", &id).unwrap()["name"], "a");

        let updated = mock
            .update("dashboards", &id, &json!({ "name": "b" }))
            .unwrap();
        assert_eq!(updated["id"], id.as_str());
        assert_eq!(mock.object("dashboards", &id).unwrap()["name"], "b");

        mock.delete("dashboards", &id).unwrap();
        let err = mock.delete("dashboards", &id).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_update_unknown_id() {
        let mock = MockTransport::new();
        let err = mock.update("workflows", "nope", &json!({})).unwrap_err();
        assert!(matches!(err, Error::NotFound { path } if path == "workflows/nope"));
    }

    #[test]
    fn test_fail_next_fails_once() {
        let mock = MockTransport::new();
        mock.fail_next(Error::status(500, "boom"));

        assert!(matches!(
            mock.create("workflows", &json!({ "id": "" })),
            Err(Error::Status { status: 500, .. })
        ));
        assert!(mock.create("workflows", &json!({ "id": "" })).is_ok());
        assert_eq!(mock.count(Method::Post), 2);
    }

    #[test]
    fn test_hook_rewrites_responses() {
        let mock = MockTransport::new();
        mock.set_hook(|method, value| {
            if method == Method::Post {
                value["restricted_access"] = json!(true);
            }
        });

        let created = mock.create("dashboards", &json!({ "id": "" })).unwrap();
        assert_eq!(created["restricted_access"], true);
    }

    #[test]
    fn test_lookup() {
        let mock = MockTransport::new();
        mock.insert("users", json!({ "id": "u1", "name": "Ada", "email": "ada@example.com" }));

        let user = mock.lookup("users", "email", "ada@example.com").unwrap();
        assert_eq!(user["id"], "u1");

        let err = mock.lookup("users", "name", "Grace").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
        assert_eq!(mock.calls()[1].path, "users/lookup?name=Grace");
    }
}
