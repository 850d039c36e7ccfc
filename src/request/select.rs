//! Typed builder for `select`.

use super::{Extension, ParameterValue, Parameters, Request};
use crate::client::Client;
use crate::response::select::SelectBody;
use crate::response::Response;
use crate::Result;
use std::sync::Arc;

pub const SELECT_COMMAND: &str = "select";

/// `select` request with named setters for the common parameters.
#[derive(Debug, Clone)]
pub struct SelectRequest {
    inner: Request,
}

impl SelectRequest {
    pub fn new() -> Self {
        Self {
            inner: Request::new(SELECT_COMMAND),
        }
    }

    fn wrap(inner: Request) -> Self {
        Self { inner }
    }

    pub fn table(&self, table: impl Into<ParameterValue>) -> Self {
        Self::wrap(self.inner.parameter("table", table))
    }

    pub fn query(&self, query: impl Into<ParameterValue>) -> Self {
        Self::wrap(self.inner.parameter("query", query))
    }

    pub fn filter(&self, filter: impl Into<ParameterValue>) -> Self {
        Self::wrap(self.inner.parameter("filter", filter))
    }

    pub fn match_columns(&self, columns: impl Into<ParameterValue>) -> Self {
        Self::wrap(self.inner.values_parameter("match_columns", columns))
    }

    pub fn output_columns(&self, columns: impl Into<ParameterValue>) -> Self {
        Self::wrap(self.inner.values_parameter("output_columns", columns))
    }

    /// Sent as both `sort_keys` and the older `sortby` so either server generation accepts it.
    pub fn sort_keys(&self, keys: impl Into<ParameterValue>) -> Self {
        Self::wrap(self.inner.values_parameter(["sort_keys", "sortby"], keys))
    }

    pub fn limit(&self, limit: impl Into<ParameterValue>) -> Self {
        Self::wrap(self.inner.parameter("limit", limit))
    }

    pub fn offset(&self, offset: impl Into<ParameterValue>) -> Self {
        Self::wrap(self.inner.parameter("offset", offset))
    }

    pub fn query_flags(&self, flags: impl Into<ParameterValue>) -> Self {
        Self::wrap(self.inner.flags_parameter("query_flags", flags))
    }

    pub fn parameter(&self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        Self::wrap(self.inner.parameter(name, value))
    }

    pub fn extension<E: Extension + 'static>(&self, extension: E) -> Self {
        Self::wrap(self.inner.extension(extension))
    }

    pub fn extensions<I>(&self, extensions: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Extension>>,
    {
        Self::wrap(self.inner.extensions(extensions))
    }

    pub fn to_parameters(&self) -> Parameters {
        self.inner.to_parameters()
    }

    pub fn response(&self, client: &Client) -> Result<&Response> {
        self.inner.response(client)
    }

    /// Execute (or reuse the cached response) and parse the result set.
    pub fn body(&self, client: &Client) -> Result<SelectBody> {
        SelectBody::from_response(self.response(client)?)
    }

    pub fn as_request(&self) -> &Request {
        &self.inner
    }

    pub fn into_request(self) -> Request {
        self.inner
    }
}

impl Default for SelectRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl From<SelectRequest> for Request {
    fn from(request: SelectRequest) -> Self {
        request.inner
    }
}
