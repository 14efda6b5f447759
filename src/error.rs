//! Error types for the sidecar.

use std::io;

use thiserror::Error;

/// Errors raised by the sidecar.
///
/// Only [`Error::Config`] is ever surfaced to the host, at construction
/// time. The per-cycle variants are absorbed by the sampling loop and
/// reported through the logging facade.
#[derive(Debug, Error)]
pub enum Error {
    /// The stats source could not be reached.
    #[error("stats source unavailable")]
    SourceUnavailable(#[source] io::Error),

    /// The stats source returned data that did not decode as a snapshot.
    #[error("malformed stats snapshot")]
    MalformedSnapshot(#[from] serde_json::Error),

    /// A gauge could not be delivered to the statsd collector.
    #[error("statsd transport failure")]
    SinkTransport(#[from] cadence::MetricError),

    /// The sidecar configuration is invalid.
    ///
    /// Raised before the sampling loop starts, never from within a cycle.
    #[error("invalid statsd configuration: {0}")]
    Config(String),
}
