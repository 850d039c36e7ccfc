use crate::command::Command;
use crate::config::ClientOptions;
use crate::request::Parameters;
use crate::response::Response;
use crate::transport::{EmptyRequest, SynchronousTransport};
use crate::Result;
use tracing::info;

use super::builder::ClientBuilder;

/// Executes commands over a [`SynchronousTransport`].
///
/// Holds only immutable configuration; calls from several threads each get
/// their own connection.
#[derive(Debug, Clone)]
pub struct Client {
    options: ClientOptions,
    transport: SynchronousTransport,
}

impl Client {
    pub fn open(options: ClientOptions) -> Result<Self> {
        let transport = SynchronousTransport::new(&options)?;
        info!(endpoint = %transport.endpoint(), "groonga client opened");
        Ok(Self { options, transport })
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Send one command and parse its response envelope.
    ///
    /// A response whose header reports failure is still returned; callers
    /// decide whether that is an error.
    pub fn execute(&self, command_name: &str, parameters: &Parameters) -> Result<Response> {
        let command = Command::new(command_name, parameters.clone());
        self.execute_command(&command)
    }

    pub fn execute_command(&self, command: &Command) -> Result<Response> {
        let mut raw = None;
        self.transport.send(command, |body| raw = Some(body))?;
        Response::parse(command.name(), raw.unwrap_or_default())
    }

    pub fn connected(&self) -> bool {
        self.transport.connected()
    }

    pub fn close(&self) -> bool {
        self.transport.close()
    }

    pub fn close_with<F: FnOnce()>(&self, on_closed: F) -> EmptyRequest {
        self.transport.close_with(on_closed)
    }
}
