//! Blocking HTTP transport.
//!
//! Every request carries the API key in the `x-api-key` header and a JSON
//! content type. The agent enforces one global timeout per request; a
//! timeout surfaces as `Error::Network` and is never retried here.

use std::time::Duration;

use log::debug;
use serde_json::Value;
use ureq::Body;
use ureq::http::Response;

use crate::error::{Error, Result};
use crate::transport::Transport;

/// Default devhub host.
pub const DEFAULT_HOST: &str = "http://localhost:4000";

/// Fixed request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP transport backed by a `ureq` agent.
pub struct HttpTransport {
    /// HTTP agent for requests.
    agent: ureq::Agent,
    /// Host, without the `/api/v1` suffix.
    host: String,
    api_key: String,
}

impl HttpTransport {
    /// Create a transport for `host`.
    #[must_use]
    pub fn new(host: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            host: host.into(),
            api_key: api_key.into(),
        }
    }

    /// Get the configured host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Build the URL for a path below `/api/v1/`.
    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.host.trim_end_matches('/'), path)
    }

    fn read(path: &str, mut response: Response<Body>) -> Result<Value> {
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        let body = check_status(path, status, body)?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Map a response status onto the error taxonomy.
///
/// 404 is `NotFound`; any other non-2xx status is `Status` with the body.
pub fn check_status(path: &str, status: u16, body: String) -> Result<String> {
    match status {
        200..=299 => Ok(body),
        404 => Err(Error::not_found(path)),
        _ => Err(Error::status(status, body)),
    }
}

fn encode(body: &Value) -> Result<String> {
    serde_json::to_string(body).map_err(|e| Error::Serialize(e.to_string()))
}

impl Transport for HttpTransport {
    fn create(&self, collection: &str, body: &Value) -> Result<Value> {
        debug!("POST {collection}");
        let response = self
            .agent
            .post(&self.url(collection))
            .header("x-api-key", &self.api_key)
            .header("content-type", "application/json")
            .send(encode(body)?)?;
        Self::read(collection, response)
    }

    fn get(&self, collection: &str, id: &str) -> Result<Value> {
        let path = format!("{collection}/{id}");
        debug!("GET {path}");
        let response = self
            .agent
            .get(&self.url(&path))
            .header("x-api-key", &self.api_key)
            .header("content-type", "application/json")
            .call()?;
        Self::read(&path, response)
    }

    fn update(&self, collection: &str, id: &str, body: &Value) -> Result<Value> {
        let path = format!("{collection}/{id}");
        debug!("PATCH {path}");
        let response = self
            .agent
            .patch(&self.url(&path))
            .header("x-api-key", &self.api_key)
            .header("content-type", "application/json")
            .send(encode(body)?)?;
        Self::read(&path, response)
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let path = format!("{collection}/{id}");
        debug!("DELETE {path}");
        let mut response = self
            .agent
            .delete(&self.url(&path))
            .header("x-api-key", &self.api_key)
            .header("content-type", "application/json")
            .call()?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        check_status(&path, status, body).map(|_| ())
    }

    fn lookup(&self, collection: &str, field: &str, value: &str) -> Result<Value> {
        let path = format!("{collection}/lookup");
        debug!("GET {path}?{field}=...");
        let response = self
            .agent
            .get(&self.url(&path))
            .query(field, value)
            .header("x-api-key", &self.api_key)
            .header("content-type", "application/json")
            .call()?;
        Self::read(&path, response)
    }
}
