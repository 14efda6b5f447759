//! The background sampling loop.

use std::error::Error as _;
use std::fmt::Write;
use std::io;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, error};
use serde_json::Value;

use crate::config::Schedule;
use crate::sink::MetricsSink;
use crate::stats::GaugeSet;
use crate::Error;

/// The host server's stats accessor.
///
/// One synchronous call returning the current stats snapshot in its raw
/// serialized form; the sidecar decodes and normalizes it. Implemented
/// for plain closures:
///
/// ```rust,ignore
/// sidecar.start(|| Ok(server.stats_json()));
/// ```
pub trait StatsSource: Send + 'static {
    /// Captures the current snapshot as serialized text.
    fn fetch(&self) -> io::Result<String>;
}

impl<F> StatsSource for F
where
    F: Fn() -> io::Result<String> + Send + 'static,
{
    fn fetch(&self) -> io::Result<String> {
        self()
    }
}

/// Handle to the background sampling thread.
///
/// The thread waits the schedule's initial delay, then repeats:
/// fetch a snapshot, normalize it, emit the six gauges, wait the
/// inter-cycle delay. A failing cycle is logged and absorbed; the loop
/// itself only exits on [`Sampler::shutdown`] or drop, both of which are
/// observed at the two delay points rather than mid-cycle.
pub struct Sampler {
    shutdown: Arc<(Mutex<bool>, Condvar)>,
    worker: Option<JoinHandle<()>>,
}

impl Sampler {
    pub(crate) fn spawn<S: StatsSource>(source: S, sink: MetricsSink, schedule: Schedule) -> Self {
        let shutdown = Arc::new((Mutex::new(false), Condvar::new()));

        let worker_shutdown = shutdown.clone();
        let worker = std::thread::Builder::new()
            .name("statsd-sidecar".into())
            .spawn(move || {
                if wait_shutdown(&worker_shutdown, schedule.initial_delay) {
                    return;
                }
                loop {
                    debug!("sampling server stats");
                    if let Err(err) = run_cycle(&source, &sink) {
                        error!("sampling cycle failed: {}", error_chain(&err));
                    }
                    if wait_shutdown(&worker_shutdown, schedule.interval) {
                        return;
                    }
                }
            })
            .expect("failed to spawn thread");

        Self {
            shutdown,
            worker: Some(worker),
        }
    }

    /// Stops the loop at the next delay point and joins the thread.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        let (lock, cvar) = self.shutdown.as_ref();
        *lock.lock().unwrap() = true;
        cvar.notify_all();

        if let Some(worker) = self.worker.take() {
            worker.join().ok();
        }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("running", &self.worker.is_some())
            .finish()
    }
}

/// One sampling cycle: fetch, decode, normalize, emit.
///
/// Emission stops at the first transport failure; the remaining gauges of
/// that cycle are skipped rather than retried.
fn run_cycle<S: StatsSource>(source: &S, sink: &MetricsSink) -> Result<(), Error> {
    let raw = source.fetch().map_err(Error::SourceUnavailable)?;
    let snapshot: Value = serde_json::from_str(&raw)?;
    let gauges = GaugeSet::from_snapshot(&snapshot);
    for (name, value) in gauges.iter() {
        sink.emit_gauge(name, value)?;
    }
    Ok(())
}

/// Waits up to `timeout`, returning early with `true` once shutdown is
/// requested.
fn wait_shutdown(shutdown: &(Mutex<bool>, Condvar), timeout: Duration) -> bool {
    let (lock, cvar) = shutdown;
    let deadline = Instant::now() + timeout;

    let mut stop = lock.lock().unwrap();
    loop {
        if *stop {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        stop = cvar.wait_timeout(stop, deadline - now).unwrap().0;
    }
}

fn error_chain(err: &Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        write!(&mut out, "\n  caused by: {cause}").ok();
        source = cause.source();
    }
    out
}
