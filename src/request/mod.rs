//! Immutable, chainable command requests.
//!
//! Every builder call returns a new [`Request`]; the receiver is never
//! modified. Execution is the only I/O and its result is memoized per
//! instance.
//!
//! ```rust,no_run
//! use groonga_client::{Client, ClientOptions, Request};
//!
//! # fn main() -> groonga_client::Result<()> {
//! let client = Client::open(ClientOptions::default())?;
//! let request = Request::new("select")
//!     .parameter("table", "Users")
//!     .values_parameter("output_columns", ["_key", "name"]);
//! let response = request.response(&client)?;
//! println!("{}", response.body);
//! # Ok(())
//! # }
//! ```

pub mod extension;
pub mod load;
pub mod parameter;
pub mod select;

pub use extension::{Extension, FnExtension};
pub use load::LoadRequest;
pub use parameter::{
    FlagsParameter, OverwriteMerger, ParameterNames, ParameterSource, ParameterValue, Parameters,
    ScalarParameter, ValuesParameter,
};
pub use select::SelectRequest;

use crate::client::Client;
use crate::response::Response;
use crate::{Error, Result};
use extension::ExtensionSet;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::debug;

/// A command name, its parameter tree and attached extensions.
#[derive(Debug, Clone)]
pub struct Request {
    command_name: String,
    parameters: Option<Arc<dyn ParameterSource>>,
    extensions: ExtensionSet,
    response: OnceCell<Response>,
}

impl Request {
    /// Generic request for any command name.
    pub fn new(command_name: impl Into<String>) -> Self {
        Self::with_parts(command_name.into(), None, ExtensionSet::default())
    }

    fn with_parts(
        command_name: String,
        parameters: Option<Arc<dyn ParameterSource>>,
        extensions: ExtensionSet,
    ) -> Self {
        Self {
            command_name,
            parameters,
            extensions,
            response: OnceCell::new(),
        }
    }

    pub fn command_name(&self) -> &str {
        &self.command_name
    }

    pub fn parameter(&self, name: impl Into<String>, value: impl Into<ParameterValue>) -> Self {
        self.add_parameter(ScalarParameter::new(name, value))
    }

    pub fn values_parameter(
        &self,
        names: impl Into<ParameterNames>,
        values: impl Into<ParameterValue>,
    ) -> Self {
        self.add_parameter(ValuesParameter::new(names, values))
    }

    pub fn flags_parameter(
        &self,
        names: impl Into<ParameterNames>,
        flags: impl Into<ParameterValue>,
    ) -> Self {
        self.add_parameter(FlagsParameter::new(names, flags))
    }

    fn add_parameter<P: ParameterSource + 'static>(&self, parameter: P) -> Self {
        let merger = OverwriteMerger::new(self.parameters.clone(), Some(Arc::new(parameter)));
        Self::with_parts(
            self.command_name.clone(),
            Some(Arc::new(merger)),
            self.extensions.clone(),
        )
    }

    /// Ordered union of the current extensions and `extensions`.
    ///
    /// An empty argument list returns the request as it is.
    pub fn extensions<I>(&self, extensions: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Extension>>,
    {
        let mut extensions = extensions.into_iter().peekable();
        if extensions.peek().is_none() {
            return self.clone();
        }
        Self::with_parts(
            self.command_name.clone(),
            self.parameters.clone(),
            self.extensions.union(extensions),
        )
    }

    pub fn extension<E: Extension + 'static>(&self, extension: E) -> Self {
        self.extensions([Arc::new(extension) as Arc<dyn Extension>])
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.find(name).is_some()
    }

    pub fn extension_names(&self) -> Vec<&str> {
        self.extensions.names()
    }

    pub fn find_extension(&self, name: &str) -> Option<&Arc<dyn Extension>> {
        self.extensions.find(name)
    }

    pub fn to_parameters(&self) -> Parameters {
        self.parameters
            .as_ref()
            .map(|parameters| parameters.to_map())
            .unwrap_or_default()
    }

    /// Execute against `client` on first access and return the cached response afterwards.
    ///
    /// Fails with [`Error::Application`] when the server reports that the
    /// command failed. Failures are not cached.
    pub fn response(&self, client: &Client) -> Result<&Response> {
        self.response.get_or_try_init(|| self.create_response(client))
    }

    /// The memoized response, if this request has already executed.
    pub fn cached_response(&self) -> Option<&Response> {
        self.response.get()
    }

    fn create_response(&self, client: &Client) -> Result<Response> {
        let response = client.execute(&self.command_name, &self.to_parameters())?;
        if !response.success() {
            debug!(
                command = %self.command_name,
                return_code = response.header.return_code,
                "command reported failure"
            );
            return Err(Error::application(response));
        }
        self.extensions.apply(response)
    }
}
