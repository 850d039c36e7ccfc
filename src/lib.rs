//! # groonga-client
//!
//! Synchronous HTTP client and immutable request builder for the Groonga
//! command protocol.
//!
//! ## Overview
//!
//! A command (`select`, `load`, `status`, ...) is a name plus named
//! parameters. This crate builds those parameters compositionally and sends
//! each command as a single HTTP exchange, telling apart:
//!
//! - results (2xx, 400, or any body that starts with a `[[` envelope),
//! - protocol errors (other statuses) as [`Error::Protocol`],
//! - command failures reported inside a result as [`Error::Application`],
//! - socket failures and read timeouts as [`Error::Transport`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use groonga_client::{Client, SelectRequest};
//!
//! fn main() -> groonga_client::Result<()> {
//!     let client = Client::builder()
//!         .url("http://127.0.0.1:10041")
//!         .read_timeout(5.0)
//!         .build()?;
//!
//!     let select = SelectRequest::new()
//!         .table("Users")
//!         .query("name:@alice")
//!         .output_columns(["_key", "name"])
//!         .limit(10);
//!     let body = select.body(&client)?;
//!     println!("{} hits", body.n_hits);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`request`] | Immutable request builder, parameter nodes, extensions |
//! | [`command`] | Wire command and URI query format |
//! | [`transport`] | Blocking HTTP transport and response classification |
//! | [`client`] | Transport-bound client and builder |
//! | [`response`] | Response envelope and `select` body parsing |
//! | [`config`] | Client options from code, YAML or environment |

pub mod client;
pub mod command;
pub mod config;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{Client, ClientBuilder};
pub use command::Command;
pub use config::{ClientOptions, TlsOptions, VerifyMode};
pub use request::{Extension, FnExtension, LoadRequest, Parameters, Request, SelectRequest};
pub use response::Response;
pub use transport::{EmptyRequest, ProtocolError, TransportError};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
