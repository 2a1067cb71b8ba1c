use std::fmt;

use crate::level::LogLevel;

const NAMESPACE_SEPARATOR: u8 = b'.';
const RATE_FRACTIONAL_DIGITS: usize = 6;
const RATE_SCALE: u64 = 1_000_000;

#[derive(Clone, Copy)]
enum MetricType {
    Counter,
    Timing,
}

impl MetricType {
    fn as_bytes(self) -> &'static [u8] {
        match self {
            MetricType::Counter => b"|c",
            MetricType::Timing => b"|ms",
        }
    }
}

/// The value portion of a metric line, tagged with its type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricValue {
    /// A counter delta, rendered as `<delta>|c`.
    Counter(i64),

    /// A timing in whole milliseconds, rendered as `<millis>|ms`.
    Timing(u64),
}

impl MetricValue {
    fn metric_type(self) -> MetricType {
        match self {
            MetricValue::Counter(_) => MetricType::Counter,
            MetricValue::Timing(_) => MetricType::Timing,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Counter(delta) => write!(f, "{delta}|c"),
            MetricValue::Timing(millis) => write!(f, "{millis}|ms"),
        }
    }
}

/// Appends `<namespace>.<key>:<value>|<type>[|@<rate>]` to `buf`.
///
/// The sample rate suffix is only written when `maybe_sample_rate` is present, which the caller does for batches that
/// survived a sampling decision.
pub(crate) fn write_metric(
    buf: &mut Vec<u8>,
    namespace: &str,
    key: &str,
    value: MetricValue,
    maybe_sample_rate: Option<f64>,
) {
    buf.extend_from_slice(namespace.as_bytes());
    buf.push(NAMESPACE_SEPARATOR);
    buf.extend_from_slice(key.as_bytes());
    buf.push(b':');

    let mut int_writer = itoa::Buffer::new();
    let value_str = match value {
        MetricValue::Counter(delta) => int_writer.format(delta),
        MetricValue::Timing(millis) => int_writer.format(millis),
    };
    buf.extend_from_slice(value_str.as_bytes());
    buf.extend_from_slice(value.metric_type().as_bytes());

    if let Some(sample_rate) = maybe_sample_rate {
        buf.extend_from_slice(b"|@");
        write_sample_rate(buf, sample_rate);
    }
}

/// Appends `<namespace>:<level>:<id>:<message>` to `buf`.
pub(crate) fn write_log(buf: &mut Vec<u8>, namespace: &str, level: LogLevel, id: &str, message: &str) {
    let mut int_writer = itoa::Buffer::new();

    buf.extend_from_slice(namespace.as_bytes());
    buf.push(b':');
    buf.extend_from_slice(int_writer.format(level.as_u8()).as_bytes());
    buf.push(b':');
    buf.extend_from_slice(id.as_bytes());
    buf.push(b':');
    buf.extend_from_slice(message.as_bytes());
}

/// Writes the rate in fixed-point form with six fractional digits, such as `0.200000`.
fn write_sample_rate(buf: &mut Vec<u8>, sample_rate: f64) {
    let scaled = (sample_rate.clamp(0.0, 1.0) * RATE_SCALE as f64).round() as u64;
    let whole = scaled / RATE_SCALE;
    let fraction = scaled % RATE_SCALE;

    let mut int_writer = itoa::Buffer::new();
    buf.extend_from_slice(int_writer.format(whole).as_bytes());
    buf.push(b'.');

    let fraction_str = int_writer.format(fraction);
    for _ in fraction_str.len()..RATE_FRACTIONAL_DIGITS {
        buf.push(b'0');
    }
    buf.extend_from_slice(fraction_str.as_bytes());
}
