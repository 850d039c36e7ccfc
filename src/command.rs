//! Commands as sent over the wire.

use crate::request::Parameters;
use url::form_urlencoded;

/// Bulk-load command; its payload goes in the request body.
pub const LOAD_COMMAND: &str = "load";

/// Parameter that carries the bulk-load payload.
pub const VALUES_PARAMETER: &str = "values";

/// A command name with its flattened parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    parameters: Parameters,
}

impl Command {
    pub fn new(name: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn is_load(&self) -> bool {
        self.name == LOAD_COMMAND
    }

    /// Relative path plus query: `/d/<name>?<params>`.
    pub fn to_uri_format(&self) -> String {
        self.to_uri_format_without(&[])
    }

    /// Like [`Command::to_uri_format`] but leaves the named parameters out of the query.
    pub fn to_uri_format_without(&self, excluded: &[&str]) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        let mut has_query = false;
        for (name, value) in &self.parameters {
            if excluded.contains(&name.as_str()) {
                continue;
            }
            query.append_pair(name, value);
            has_query = true;
        }
        let path = format!("/d/{}", self.name);
        if has_query {
            format!("{}?{}", path, query.finish())
        } else {
            path
        }
    }
}
