//! The gauge emission side of the sidecar.

use std::collections::BTreeMap;
use std::net::UdpSocket;
use std::panic::RefUnwindSafe;

use cadence::{Gauged, MetricSink, StatsdClient, UdpMetricSink};

use crate::config::SinkConfig;
use crate::Error;

/// A configured, tag-aware statsd gauge emitter.
///
/// Built once at startup from a [`SinkConfig`] and shared with the
/// sampling loop. Every emission carries the configured tag set. A sink
/// constructed from a config without a host is disabled: it reports
/// [`MetricsSink::enabled`] as `false` and drops all emissions.
pub struct MetricsSink {
    client: Option<StatsdClient>,
    tags: BTreeMap<String, String>,
    host: String,
}

impl MetricsSink {
    /// Creates a sink speaking the statsd UDP line protocol to the
    /// configured collector.
    ///
    /// Fails only on startup configuration problems: an unbindable local
    /// socket or an unresolvable collector address.
    pub fn new(config: &SinkConfig) -> Result<Self, Error> {
        let client = if config.enabled() {
            let socket = UdpSocket::bind("0.0.0.0:0")
                .map_err(|err| Error::Config(format!("unable to bind local udp socket: {err}")))?;
            let sink = UdpMetricSink::from((config.host.as_str(), config.port), socket)
                .map_err(|err| {
                    Error::Config(format!("invalid statsd host {:?}: {err}", config.host))
                })?;
            Some(StatsdClient::from_sink(&config.prefix, sink))
        } else {
            None
        };

        Ok(Self {
            client,
            tags: config.tags.clone(),
            host: config.host.clone(),
        })
    }

    /// Creates a sink emitting through a custom [`MetricSink`] instead of
    /// the UDP transport, keeping the configured prefix and tags.
    pub fn with_sink<T>(config: &SinkConfig, sink: T) -> Self
    where
        T: MetricSink + Send + Sync + RefUnwindSafe + 'static,
    {
        Self {
            client: Some(StatsdClient::from_sink(&config.prefix, sink)),
            tags: config.tags.clone(),
            host: config.host.clone(),
        }
    }

    /// Whether a collector host is configured.
    pub fn enabled(&self) -> bool {
        self.client.is_some()
    }

    /// The configured collector host.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Emits a single gauge datagram with all configured tags attached.
    ///
    /// A no-op on a disabled sink. Transport failures surface as
    /// [`Error::SinkTransport`] and are absorbed by the sampling loop.
    pub fn emit_gauge(&self, name: &str, value: u64) -> Result<(), Error> {
        let Some(client) = &self.client else {
            return Ok(());
        };
        let mut builder = client.gauge_with_tags(name, value);
        for (key, tag) in &self.tags {
            builder = builder.with_tag(key, tag);
        }
        builder.try_send()?;
        Ok(())
    }
}

impl std::fmt::Debug for MetricsSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsSink")
            .field("host", &self.host)
            .field("enabled", &self.enabled())
            .field("tags", &self.tags)
            .finish()
    }
}
