//! Blocking HTTP transport.
//!
//! Each [`SynchronousTransport::send`] performs exactly one request on a fresh
//! connection: idle pooling is disabled and nothing is retried. Ordinary
//! commands are sent as `GET <base>/d/<name>?<params>`; `load` is sent as a
//! `POST` whose JSON body is the `values` parameter.
//!
//! The read timeout is a socket deadline that applies to each read on its
//! own. A response that keeps arriving is never cut off by it, and uploads
//! are not bounded by it at all.

use super::{classify_response, resolve_path, EmptyRequest, TransportError};
use crate::command::{Command, VALUES_PARAMETER};
use crate::config::{ClientOptions, TlsOptions, VerifyMode};
use crate::{Error, ErrorContext, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use percent_encoding::percent_decode_str;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{self, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};
use std::fmt;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use ureq::{Agent, AgentBuilder};
use url::Url;

const JSON_CONTENT_TYPE: &str = "application/json";
const PEM_CERTIFICATE_MARKER: &[u8] = b"-----BEGIN CERTIFICATE-----";
const UNKNOWN_REASON: &str = "Unknown";

#[derive(Debug, Clone)]
struct Credentials {
    user: String,
    password: Option<String>,
}

impl Credentials {
    fn authorization(&self) -> String {
        let pair = format!("{}:{}", self.user, self.password.as_deref().unwrap_or_default());
        format!("Basic {}", STANDARD.encode(pair))
    }
}

/// Stateless per call; safe to share across threads.
#[derive(Clone)]
pub struct SynchronousTransport {
    agent: Agent,
    /// Endpoint with userinfo stripped.
    endpoint: Url,
    credentials: Option<Credentials>,
    chunk: bool,
    read_timeout: Option<Duration>,
    verify_peer: bool,
}

impl fmt::Debug for SynchronousTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SynchronousTransport")
            .field("endpoint", &self.endpoint.as_str())
            .field("authenticated", &self.credentials.is_some())
            .field("chunk", &self.chunk)
            .field("read_timeout", &self.read_timeout)
            .field("verify_peer", &self.verify_peer)
            .finish_non_exhaustive()
    }
}

impl SynchronousTransport {
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let mut endpoint = options.parsed_url()?;
        let credentials = take_credentials(&mut endpoint);
        let read_timeout = options.effective_read_timeout();

        // ureq only retries requests written to a reused connection; with no
        // idle pool every call opens and drops its own.
        let mut builder = AgentBuilder::new()
            .max_idle_connections(0)
            .max_idle_connections_per_host(0)
            .redirects(0)
            .user_agent(&options.user_agent)
            .tls_config(tls_config(&options.tls)?);
        if let Some(timeout) = read_timeout {
            builder = builder.timeout_read(timeout);
        }
        if let Some(timeout) = options.effective_connect_timeout() {
            builder = builder.timeout_connect(timeout);
        }

        Ok(Self {
            agent: builder.build(),
            endpoint,
            credentials,
            chunk: options.chunk,
            read_timeout,
            verify_peer: options.tls.verify_mode != Some(VerifyMode::None),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// False when `verify_mode: none` accepts any server certificate.
    pub fn verifies_peer(&self) -> bool {
        self.verify_peer
    }

    /// Send `command` and hand the classified body to `on_body`.
    ///
    /// `on_body` runs once when the exchange yields a result. Non-result
    /// statuses fail with [`Error::Protocol`]; socket failures and timeouts
    /// fail with [`Error::Transport`].
    pub fn send<F>(&self, command: &Command, on_body: F) -> Result<EmptyRequest>
    where
        F: FnOnce(String),
    {
        let response = self.dispatch(command)?;
        let status = response.status();
        let reason = reason_phrase(response.status_text()).to_string();
        let mut body = String::new();
        response
            .into_reader()
            .read_to_string(&mut body)
            .map_err(|e| self.transport_error(command, TransportError::from_io(e)))?;

        let body = classify_response(status, &reason, body).map_err(|e| {
            warn!(command = command.name(), status = e.status, "protocol error");
            e
        })?;
        debug!(
            command = command.name(),
            status,
            bytes = body.len(),
            "response received"
        );
        on_body(body);
        Ok(EmptyRequest::new())
    }

    /// Always false: connections are never kept alive.
    pub fn connected(&self) -> bool {
        false
    }

    /// Nothing to close; returns false because there is no connection.
    pub fn close(&self) -> bool {
        false
    }

    /// Runs `on_closed` immediately and returns an already-finished handle.
    pub fn close_with<F: FnOnce()>(&self, on_closed: F) -> EmptyRequest {
        on_closed();
        EmptyRequest::new()
    }

    /// Perform the exchange. Every status comes back as a response; only
    /// failures below HTTP are errors here.
    fn dispatch(&self, command: &Command) -> Result<ureq::Response> {
        let result = if command.is_load() {
            // The payload can be huge: keep it out of the request line.
            let uri = command.to_uri_format_without(&[VALUES_PARAMETER]);
            let path = resolve_path(&self.endpoint, &uri);
            let payload = command.get(VALUES_PARAMETER).unwrap_or_default().as_bytes().to_vec();
            let length = payload.len();
            debug!(
                command = command.name(),
                path = %path,
                bytes = length,
                chunked = self.chunk,
                "POST"
            );
            let request = self
                .request("POST", &path)?
                .set("Content-Type", JSON_CONTENT_TYPE);
            let request = if self.chunk {
                request.set("Transfer-Encoding", "chunked")
            } else {
                request.set("Content-Length", &length.to_string())
            };
            request.send(Cursor::new(payload))
        } else {
            let path = resolve_path(&self.endpoint, &command.to_uri_format());
            debug!(command = command.name(), path = %path, "GET");
            self.request("GET", &path)?.call()
        };

        match result {
            Ok(response) | Err(ureq::Error::Status(_, response)) => Ok(response),
            Err(ureq::Error::Transport(error)) => {
                Err(self.transport_error(command, TransportError::from_ureq(error)))
            }
        }
    }

    fn request(&self, method: &str, path_and_query: &str) -> Result<ureq::Request> {
        let request = self.agent.request_url(method, &self.endpoint.join(path_and_query)?);
        Ok(match &self.credentials {
            Some(credentials) => request.set("Authorization", &credentials.authorization()),
            None => request,
        })
    }

    fn transport_error(&self, command: &Command, error: TransportError) -> Error {
        warn!(command = command.name(), error = %error, "transport failure");
        error.into()
    }
}

/// Servers may send an empty reason phrase.
fn reason_phrase(status_text: &str) -> &str {
    match status_text.trim() {
        "" => UNKNOWN_REASON,
        text => text,
    }
}

/// Remove userinfo from `url`, returning it form-decoded.
fn take_credentials(url: &mut Url) -> Option<Credentials> {
    let user = url.username();
    let password = url.password();
    if user.is_empty() && password.is_none() {
        return None;
    }
    let credentials = Credentials {
        user: decode_component(user),
        password: password.map(decode_component),
    };
    // Only URLs that cannot carry userinfo refuse this, and they have none.
    match url.set_username("").and_then(|()| url.set_password(None)) {
        Ok(()) => Some(credentials),
        Err(()) => None,
    }
}

/// `+` is a space; percent escapes are resolved afterwards, so `%2B` stays `+`.
fn decode_component(component: &str) -> String {
    let spaced = component.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

fn tls_config(tls: &TlsOptions) -> Result<Arc<ClientConfig>> {
    let provider = Arc::new(crypto::ring::default_provider());
    let roots = root_store(tls)?;
    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::configuration(format!("unsupported TLS setup: {}", e)))?;

    let config = match tls.verify_mode {
        Some(VerifyMode::None) => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCertificate { provider }))
            .with_no_client_auth(),
        Some(VerifyMode::Peer) | None => {
            builder.with_root_certificates(roots).with_no_client_auth()
        }
    };
    Ok(Arc::new(config))
}

/// Bundled web roots plus any configured CA file and directory.
///
/// Configured certificates are loaded even when peers are not verified, so a
/// bad path is reported either way.
fn root_store(tls: &TlsOptions) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    if let Some(ca_file) = &tls.ca_file {
        trust(&mut roots, ca_file, "tls.ca_file")?;
    }
    if let Some(ca_path) = &tls.ca_path {
        for path in certificate_files(ca_path)? {
            trust(&mut roots, &path, "tls.ca_path")?;
        }
    }
    Ok(roots)
}

fn trust(roots: &mut RootCertStore, path: &Path, field: &str) -> Result<()> {
    for certificate in load_certificates(path, field)? {
        roots
            .add(certificate)
            .map_err(|e| tls_error(path, field, e.to_string()))?;
    }
    Ok(())
}

fn load_certificates(path: &Path, field: &str) -> Result<Vec<CertificateDer<'static>>> {
    let pem = std::fs::read(path).map_err(|e| tls_error(path, field, e.to_string()))?;
    let certificates = rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| tls_error(path, field, e.to_string()))?;
    if certificates.is_empty() {
        return Err(tls_error(path, field, "no PEM certificate found".to_string()));
    }
    Ok(certificates)
}

/// Regular files in `dir` that contain a PEM certificate block.
fn certificate_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| tls_error(dir, "tls.ca_path", e.to_string()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let contents = std::fs::read(&path)?;
        if !contains(&contents, PEM_CERTIFICATE_MARKER) {
            debug!(path = %path.display(), "skipping non-certificate file");
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

fn tls_error(path: &Path, field: &str, reason: String) -> Error {
    Error::configuration_with_context(
        format!("cannot load certificate: {}", reason),
        ErrorContext::new()
            .with_field_path(field)
            .with_details(path.display().to_string())
            .with_source("transport"),
    )
}

/// Certificate verifier for `verify_mode: none`.
///
/// Any chain is accepted, but handshake signatures are still checked against
/// the presented certificate.
#[derive(Debug)]
struct AcceptAnyServerCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}
