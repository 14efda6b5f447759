//! Configuration for the statsd sidecar.

use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

use crate::Error;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 9125;
const DEFAULT_PREFIX: &str = "server";

/// Environment variable holding the collector address.
pub const ENV_HOST: &str = "APP_STATSD_HOST";
/// Environment variable holding the collector port.
pub const ENV_PORT: &str = "APP_STATSD_PORT";
/// Environment variable holding the raw `key:value` tag list.
pub const ENV_TAGS: &str = "APP_STATSD_TAGS";
/// Environment variable holding the metric name prefix.
pub const ENV_PREFIX: &str = "APP_STATSD_PREFIX";
/// Environment variable holding the pod identity, added as a `pod_name` tag.
pub const ENV_POD_NAME: &str = "MY_POD_NAME";
/// Environment variable holding the grouping label, added as a `grouping` tag.
pub const ENV_GROUPING: &str = "STATSD_GROUPING";

/// Connection settings and tags for the statsd collector.
///
/// Resolved once at startup and immutable afterwards. The sidecar is
/// disabled by configuring an empty host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SinkConfig {
    /// Collector address. An empty string disables the sink.
    pub host: String,

    /// Collector UDP port.
    pub port: u16,

    /// Prefix prepended to every metric name.
    pub prefix: String,

    /// Tags attached to every emitted gauge.
    pub tags: BTreeMap<String, String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            prefix: DEFAULT_PREFIX.into(),
            tags: BTreeMap::new(),
        }
    }
}

impl SinkConfig {
    /// Resolves the configuration from the process environment.
    ///
    /// Fails only on values that defaults cannot absorb, such as an
    /// unparsable port.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Resolves the configuration through the given variable lookup.
    ///
    /// This is what [`SinkConfig::from_env`] uses under the hood; taking
    /// the lookup as a parameter keeps construction testable without
    /// touching the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let host = lookup(ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.into());

        let port = match lookup(ENV_PORT) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid statsd port: {raw:?}")))?,
            None => DEFAULT_PORT,
        };

        let prefix = lookup(ENV_PREFIX).unwrap_or_else(|| DEFAULT_PREFIX.into());

        let mut tags = parse_tag_list(lookup(ENV_TAGS).as_deref().unwrap_or(""));
        if let Some(pod_name) = lookup(ENV_POD_NAME) {
            tags.insert("pod_name".into(), pod_name);
        }
        if let Some(grouping) = lookup(ENV_GROUPING) {
            tags.insert("grouping".into(), grouping);
        }

        Ok(Self {
            host,
            port,
            prefix,
            tags,
        })
    }

    /// Whether a collector host is configured at all.
    pub fn enabled(&self) -> bool {
        !self.host.is_empty()
    }
}

/// Parses a comma separated `key:value` list into a tag map.
///
/// Entries without a `:` become a tag with an empty value; empty entries
/// are dropped.
fn parse_tag_list(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((key, value)) => (key.into(), value.into()),
            None => (entry.into(), String::new()),
        })
        .collect()
}

/// Timing of the sampling loop.
///
/// The defaults leave the host server five seconds to finish booting
/// before the first sample, then sample every two seconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    /// Delay before the first sampling cycle.
    pub initial_delay: Duration,

    /// Delay between the end of one cycle and the start of the next.
    pub interval: Duration,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            interval: Duration::from_secs(2),
        }
    }
}
