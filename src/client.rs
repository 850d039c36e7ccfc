//! Transport-bound client.
//!
//! Implementation details are split into submodules under `src/client/`.

pub mod builder;
pub mod core;

pub use self::builder::ClientBuilder;
pub use self::core::Client;
