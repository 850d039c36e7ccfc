//! Behaviour attached to a request after construction.
//!
//! Extensions are resolved in insertion order and decorate the parsed
//! response once a request has executed successfully.

use crate::response::Response;
use crate::Result;
use std::fmt;
use std::sync::Arc;

/// A named capability attached to a [`Request`](super::Request).
///
/// Two extensions with the same name are considered the same capability.
pub trait Extension: Send + Sync {
    fn name(&self) -> &str;

    /// Post-process a successful response. The default leaves it untouched.
    fn decorate(&self, response: Response) -> Result<Response> {
        Ok(response)
    }
}

type DecorateFn = dyn Fn(Response) -> Result<Response> + Send + Sync;

/// Closure-backed extension for ad-hoc behaviour.
pub struct FnExtension {
    name: String,
    decorate: Arc<DecorateFn>,
}

impl FnExtension {
    pub fn new<F>(name: impl Into<String>, decorate: F) -> Self
    where
        F: Fn(Response) -> Result<Response> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            decorate: Arc::new(decorate),
        }
    }
}

impl fmt::Debug for FnExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnExtension").field("name", &self.name).finish()
    }
}

impl Extension for FnExtension {
    fn name(&self) -> &str {
        &self.name
    }

    fn decorate(&self, response: Response) -> Result<Response> {
        (self.decorate)(response)
    }
}

/// Ordered, duplicate-free set of extensions.
#[derive(Clone, Default)]
pub(crate) struct ExtensionSet {
    items: Vec<Arc<dyn Extension>>,
}

impl ExtensionSet {
    /// Ordered union: existing entries keep their position, new names are appended.
    pub(crate) fn union<I>(&self, extensions: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Extension>>,
    {
        let mut items = self.items.clone();
        for extension in extensions {
            if !items.iter().any(|e| e.name() == extension.name()) {
                items.push(extension);
            }
        }
        Self { items }
    }

    pub(crate) fn names(&self) -> Vec<&str> {
        self.items.iter().map(|e| e.name()).collect()
    }

    pub(crate) fn find(&self, name: &str) -> Option<&Arc<dyn Extension>> {
        self.items.iter().find(|e| e.name() == name)
    }

    pub(crate) fn apply(&self, response: Response) -> Result<Response> {
        self.items
            .iter()
            .try_fold(response, |response, extension| extension.decorate(response))
    }
}

impl fmt::Debug for ExtensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
