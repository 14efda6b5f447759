//! Background statsd reporting for application server worker pool stats.
//!
//! This crate runs a small telemetry sidecar next to an application
//! server: on a fixed cadence it pulls the server's stats snapshot,
//! normalizes it into six server-health gauges (worker counts, running
//! threads, backlog, pool capacity, thread ceiling) and ships each one to
//! a statsd collector over UDP, tagged with deployment metadata. Clustered
//! snapshots are aggregated across worker processes transparently.
//!
//! The loop is the availability boundary: a failing cycle, whether the
//! stats source was unreachable, the snapshot did not decode, or the
//! collector dropped the datagram, is logged and absorbed, and the next
//! cycle proceeds on schedule.
//!
//! # Usage
//!
//! ```rust,ignore
//! use statsd_sidecar::Sidecar;
//!
//! let sidecar = Sidecar::from_env()?;
//! let _sampler = sidecar.start(move || Ok(server.stats_json()));
//! ```
//!
//! Configuration comes from the environment: `APP_STATSD_HOST` (empty
//! disables reporting), `APP_STATSD_PORT`, `APP_STATSD_TAGS`, plus
//! `MY_POD_NAME` and `STATSD_GROUPING` for deployment tags.

#![warn(missing_docs)]

mod config;
mod error;
mod sampler;
mod sink;
mod stats;


pub use config::{Schedule, SinkConfig};
pub use error::Error;
pub use sampler::{Sampler, StatsSource};
pub use sink::MetricsSink;
pub use stats::GaugeSet;

use log::debug;

/// The sidecar entry point.
///
/// Construction resolves the configuration and builds the sink; this is
/// the only place a hard error can surface to the host. [`Sidecar::start`]
/// then wires the sampling loop into the host process, or does nothing
/// when reporting is disabled.
#[derive(Debug)]
pub struct Sidecar {
    sink: MetricsSink,
    schedule: Schedule,
}

impl Sidecar {
    /// Builds a sidecar from the process environment with the default
    /// schedule.
    pub fn from_env() -> Result<Self, Error> {
        Self::new(SinkConfig::from_env()?, Schedule::default())
    }

    /// Builds a sidecar from an explicit configuration.
    pub fn new(config: SinkConfig, schedule: Schedule) -> Result<Self, Error> {
        let sink = MetricsSink::new(&config)?;
        Ok(Self { sink, schedule })
    }

    /// Whether a collector host is configured.
    pub fn enabled(&self) -> bool {
        self.sink.enabled()
    }

    /// Starts the background sampling loop over the host's stats source.
    ///
    /// Returns `None` without spawning anything when reporting is
    /// disabled. Dropping the returned [`Sampler`] stops the loop; keep it
    /// alive for the lifetime of the host process.
    pub fn start<S: StatsSource>(self, source: S) -> Option<Sampler> {
        if !self.enabled() {
            debug!("statsd reporting not enabled (no host configured)");
            return None;
        }
        debug!("statsd reporting enabled (host: {})", self.sink.host());
        Some(Sampler::spawn(source, self.sink, self.schedule))
    }
}
