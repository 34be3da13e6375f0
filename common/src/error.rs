//! Typed failures of the discovery pipeline.
//!
//! Each stage owns one enum so callers can tell a dead transport apart from a malformed
//! response batch or a device that simply refused to identify itself.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Hard failures of a single probe attempt.
///
/// A deadline expiring or a silent endpoint are not errors and never appear here.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{addr}: failed to set read/write deadline ({timeout:?} is not representable)")]
    Deadline {
        addr: SocketAddr,
        timeout: std::time::Duration,
    },

    #[error("{addr}: failed to write probe message")]
    Write {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    #[error("{addr}: probe deadline expired before the probe message was written")]
    WriteTimeout { addr: SocketAddr },

    #[error("unable to resolve the remote address of the connection")]
    PeerAddr(#[source] io::Error),

    #[error("{protocol} discovery requires a packet transport, got a stream connection")]
    UnsupportedTransport { protocol: &'static str },

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// The response batch of one probe attempt could not be parsed.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed probe response {index}: {message}")]
    Malformed { index: usize, message: String },
}

/// The device refused or failed the information query.
#[derive(Debug, Error)]
pub enum IdentifyError {
    #[error("protocol properties are missing '{0}'")]
    MissingProperty(&'static str),

    #[error("invalid value '{value}' for property '{key}'")]
    InvalidProperty { key: &'static str, value: String },

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("device at {url} answered with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("device returned a SOAP fault: {0}")]
    Fault(String),

    #[error("unexpected device information response: {0}")]
    Response(String),
}

/// Failures looking up credentials for a secret path.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("no credentials stored under secret path '{0}'")]
    NotFound(String),

    #[error("failed to read credentials file '{path}'")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse credentials file '{path}': {message}")]
    Parse { path: String, message: String },
}

/// A probe result could not be turned into a discovered device.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("empty EndpointRefAddress for XAddr {xaddr}")]
    MissingEndpointReference { xaddr: String },

    #[error("unable to convert probe result into an {expected} device, payload kind={actual}")]
    UnexpectedPayload {
        expected: &'static str,
        actual: &'static str,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}'")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("unknown {what} '{value}'")]
    UnknownValue { what: &'static str, value: String },
}
