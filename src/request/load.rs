//! Typed builder for `load`.

use super::{ParameterValue, Parameters, Request};
use crate::client::Client;
use crate::command::{LOAD_COMMAND, VALUES_PARAMETER};
use crate::response::Response;
use crate::Result;

/// `load` request. The `values` payload travels in the HTTP body, never in the URL.
#[derive(Debug, Clone)]
pub struct LoadRequest {
    inner: Request,
}

impl LoadRequest {
    pub fn new() -> Self {
        Self {
            inner: Request::new(LOAD_COMMAND),
        }
    }

    fn wrap(inner: Request) -> Self {
        Self { inner }
    }

    pub fn table(&self, table: impl Into<ParameterValue>) -> Self {
        Self::wrap(self.inner.parameter("table", table))
    }

    pub fn columns(&self, columns: impl Into<ParameterValue>) -> Self {
        Self::wrap(self.inner.values_parameter("columns", columns))
    }

    /// Raw JSON payload, sent as-is.
    pub fn raw_values(&self, values: impl Into<String>) -> Self {
        Self::wrap(self.inner.parameter(VALUES_PARAMETER, values.into()))
    }

    /// Serialize `values` (usually an array of records) as the payload.
    pub fn values<T: serde::Serialize>(&self, values: &T) -> Result<Self> {
        let payload = serde_json::to_string(values)?;
        Ok(self.raw_values(payload))
    }

    pub fn parameter(&self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self::wrap(self.inner.parameter(name, value))
    }

    pub fn to_parameters(&self) -> Parameters {
        self.inner.to_parameters()
    }

    pub fn response(&self, client: &Client) -> Result<&Response> {
        self.inner.response(client)
    }

    pub fn as_request(&self) -> &Request {
        &self.inner
    }

    pub fn into_request(self) -> Request {
        self.inner
    }
}

impl Default for LoadRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl From<LoadRequest> for Request {
    fn from(request: LoadRequest) -> Self {
        request.inner
    }
}
