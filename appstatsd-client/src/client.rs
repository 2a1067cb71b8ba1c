use std::{sync::Arc, time::Duration};

use indexmap::IndexMap;
use tracing::{debug, error, trace};

use crate::{
    builder::{AppStatsdBuilder, BuildError},
    destination::DatagramSink,
    level::LogLevel,
    recorder::AppStatsdRecorder,
    sampler::{Sampler, Sampling},
    writer::{write_log, write_metric, MetricValue},
};

/// Shared client state.
pub(crate) struct Inner {
    pub namespace: String,
    pub metrics: DatagramSink,
    pub logs: DatagramSink,
    pub sampler: Sampler,
}

impl Inner {
    /// Sends one batch of metric lines, subject to a single sampling decision for the whole batch.
    ///
    /// Keys are deduplicated, keeping the position of the first occurrence and the value of the last.
    pub fn send_stats<I, K>(&self, stats: I, sample_rate: f64)
    where
        I: IntoIterator<Item = (K, MetricValue)>,
        K: AsRef<str>,
    {
        let stats = stats.into_iter().collect::<Vec<_>>();
        if stats.is_empty() {
            return;
        }

        let mut batch = IndexMap::with_capacity(stats.len());
        for (key, value) in &stats {
            batch.insert(key.as_ref(), *value);
        }

        let maybe_sample_rate = match self.sampler.decide(sample_rate) {
            Sampling::Unsampled => None,
            Sampling::Sampled(rate) => Some(rate),
            Sampling::Dropped => {
                trace!(sample_rate, batch_len = batch.len(), "Batch not selected by sampling.");
                return;
            }
        };

        let mut buf = Vec::new();
        for (key, value) in batch {
            buf.clear();
            write_metric(&mut buf, &self.namespace, key, value, maybe_sample_rate);
            send_datagram(&self.metrics, &buf);
        }
    }

    pub fn send_log(&self, level: LogLevel, id: &str, message: &str) {
        let mut buf = Vec::new();
        write_log(&mut buf, &self.namespace, level, id, message);
        send_datagram(&self.logs, &buf);
    }
}

fn send_datagram(sink: &DatagramSink, payload: &[u8]) {
    match sink.send(payload) {
        Ok(len) => trace!(destination = %sink.destination(), len, "Sent datagram."),
        Err(e) => error!(error = %e, destination = %sink.destination(), "Failed to send datagram."),
    }
}

/// A client that sends metrics and log lines to appstatsd collectors over UDP.
///
/// Every metric key is prefixed with the client's namespace. Reporting methods never fail: lines that cannot be sent
/// are logged and dropped.
///
/// Cloning the client is cheap, and all clones share the same sockets.
#[derive(Clone)]
pub struct AppStatsdClient {
    inner: Arc<Inner>,
}

impl AppStatsdClient {
    pub(crate) fn from_inner(inner: Arc<Inner>) -> Self {
        AppStatsdClient { inner }
    }

    /// Creates a client sending metrics to `metrics_host:metrics_port` and log lines to `log_host:log_port`.
    ///
    /// A destination that cannot be opened is logged and left unopened; the client is still returned.
    ///
    /// # Errors
    ///
    /// If the namespace is empty or contains `.`, an error will be returned.
    pub fn new<N, M, L>(
        namespace: N,
        metrics_host: M,
        metrics_port: u16,
        log_host: L,
        log_port: u16,
    ) -> Result<Self, BuildError>
    where
        N: Into<String>,
        M: Into<String>,
        L: Into<String>,
    {
        AppStatsdBuilder::new(namespace)
            .with_metrics_destination(metrics_host, metrics_port)
            .with_log_destination(log_host, log_port)
            .build()
    }

    /// Creates a client sending metrics to `localhost:8125` and log lines to `localhost:8126`.
    ///
    /// # Errors
    ///
    /// If the namespace is empty or contains `.`, an error will be returned.
    pub fn local<N>(namespace: N) -> Result<Self, BuildError>
    where
        N: Into<String>,
    {
        AppStatsdBuilder::new(namespace).build()
    }

    /// Returns a builder for a client with the given namespace.
    pub fn builder<N>(namespace: N) -> AppStatsdBuilder
    where
        N: Into<String>,
    {
        AppStatsdBuilder::new(namespace)
    }

    /// Returns the namespace prepended to every metric key.
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// Returns `true` if the metrics destination was opened successfully.
    pub fn is_metrics_open(&self) -> bool {
        self.inner.metrics.is_open()
    }

    /// Returns `true` if the log destination was opened successfully.
    pub fn is_log_open(&self) -> bool {
        self.inner.logs.is_open()
    }

    /// Increments a counter by `amount`.
    pub fn increment(&self, key: &str, amount: i64) {
        self.update_stats([key], amount, 1.0);
    }

    /// Increments a counter by `amount`, sampled at `sample_rate`.
    pub fn increment_sampled(&self, key: &str, amount: i64, sample_rate: f64) {
        self.update_stats([key], amount, sample_rate);
    }

    /// Decrements a counter by `amount`.
    pub fn decrement(&self, key: &str, amount: i64) {
        self.update_stats([key], amount.saturating_neg(), 1.0);
    }

    /// Decrements a counter by `amount`, sampled at `sample_rate`.
    pub fn decrement_sampled(&self, key: &str, amount: i64, sample_rate: f64) {
        self.update_stats([key], amount.saturating_neg(), sample_rate);
    }

    /// Applies the same counter `delta` to every key.
    ///
    /// All keys form one batch: the sampling decision is made once, and either every key is sent or none are.
    pub fn update_stats<I, K>(&self, keys: I, delta: i64, sample_rate: f64)
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        self.inner.send_stats(
            keys.into_iter().map(|key| (key, MetricValue::Counter(delta))),
            sample_rate,
        );
    }

    /// Reports a timing, in milliseconds.
    pub fn timing(&self, key: &str, millis: u64) {
        self.send_stats([(key, MetricValue::Timing(millis))], 1.0);
    }

    /// Reports a timing, in milliseconds, sampled at `sample_rate`.
    pub fn timing_sampled(&self, key: &str, millis: u64, sample_rate: f64) {
        self.send_stats([(key, MetricValue::Timing(millis))], sample_rate);
    }

    /// Reports a timing, truncated to whole milliseconds.
    pub fn timing_duration(&self, key: &str, duration: Duration) {
        self.timing(key, duration_millis(duration));
    }

    /// Reports a timing, truncated to whole milliseconds, sampled at `sample_rate`.
    pub fn timing_duration_sampled(&self, key: &str, duration: Duration, sample_rate: f64) {
        self.timing_sampled(key, duration_millis(duration), sample_rate);
    }

    /// Sends a batch of metric values.
    ///
    /// When `sample_rate` is less than 1.0, one random draw decides for the whole batch. Every line of a batch that is
    /// sent carries the `|@<rate>` suffix. Each key is written as its own datagram.
    pub fn send_stats<I, K>(&self, stats: I, sample_rate: f64)
    where
        I: IntoIterator<Item = (K, MetricValue)>,
        K: AsRef<str>,
    {
        self.inner.send_stats(stats, sample_rate);
    }

    /// Sends a log line with an empty message ID.
    pub fn log(&self, level: LogLevel, message: &str) {
        self.inner.send_log(level, "", message);
    }

    /// Sends a log line with the given message ID.
    pub fn log_with_id(&self, level: LogLevel, id: &str, message: &str) {
        self.inner.send_log(level, id, message);
    }

    /// Returns a [`metrics::Recorder`] that reports through this client.
    pub fn recorder(&self) -> AppStatsdRecorder {
        AppStatsdRecorder::new(Arc::clone(&self.inner))
    }

    /// Closes this handle to the client.
    ///
    /// Both sockets are released once the last clone of the client, and any recorder created from it, has been closed
    /// or dropped.
    pub fn close(self) {
        let remaining = Arc::strong_count(&self.inner) - 1;
        debug!(namespace = %self.inner.namespace, remaining, "Closing client handle.");
    }
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
