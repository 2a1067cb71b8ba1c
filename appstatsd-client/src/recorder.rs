use std::sync::Arc;

use metrics::{
    Counter, CounterFn, Gauge, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder, SharedString, Unit,
};
use tracing::debug;

use crate::{client::Inner, writer::MetricValue};

/// A recorder that sends [`metrics`] counters and histograms through an appstatsd client.
///
/// Counter increments are sent as counter deltas, and histogram values are sent as timings in milliseconds. Each
/// update is sent immediately, unsampled. Labels are not part of the wire format and are ignored, as are gauges.
pub struct AppStatsdRecorder {
    inner: Arc<Inner>,
}

impl AppStatsdRecorder {
    pub(crate) fn new(inner: Arc<Inner>) -> Self {
        AppStatsdRecorder { inner }
    }
}

impl Recorder for AppStatsdRecorder {
    fn describe_counter(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_gauge(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}
    fn describe_histogram(&self, _: KeyName, _: Option<Unit>, _: SharedString) {}

    fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(KeyHandle::new(&self.inner, key)))
    }

    fn register_gauge(&self, key: &Key, _: &Metadata<'_>) -> Gauge {
        debug!(metric_name = key.name(), "Gauges are not supported; updates will be discarded.");
        Gauge::noop()
    }

    fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(KeyHandle::new(&self.inner, key)))
    }
}

struct KeyHandle {
    inner: Arc<Inner>,
    name: String,
}

impl KeyHandle {
    fn new(inner: &Arc<Inner>, key: &Key) -> Self {
        Self { inner: Arc::clone(inner), name: key.name().to_string() }
    }

    fn send(&self, value: MetricValue) {
        self.inner.send_stats([(self.name.as_str(), value)], 1.0);
    }
}

impl CounterFn for KeyHandle {
    fn increment(&self, value: u64) {
        self.send(MetricValue::Counter(i64::try_from(value).unwrap_or(i64::MAX)));
    }

    fn absolute(&self, value: u64) {
        debug!(metric_name = %self.name, value, "Absolute counter values are not supported; update discarded.");
    }
}

impl HistogramFn for KeyHandle {
    fn record(&self, value: f64) {
        if !value.is_finite() || value < 0.0 {
            debug!(metric_name = %self.name, value, "Discarding timing that is negative or not finite.");
            return;
        }

        self.send(MetricValue::Timing(value.round() as u64));
    }
}
