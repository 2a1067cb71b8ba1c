//! A client for sending statsd-style metrics and log lines to appstatsd collectors over UDP.
//!
//! # Usage
//!
//! ```no_run
//! # use appstatsd_client::{AppStatsdClient, LogLevel};
//! // Metrics go to `localhost:8125`, and log lines go to `localhost:8126`.
//! let client = AppStatsdClient::local("my-app").expect("namespace must not contain '.'");
//!
//! client.increment("requests.served", 1);
//! client.timing("requests.latency", 1250);
//! client.log(LogLevel::Warning, "cache is cold");
//!
//! client.close();
//! ```
//!
//! Every metric key is prefixed with the client's namespace, so the calls above send the datagrams
//! `my-app.requests.served:1|c`, `my-app.requests.latency:1250|ms` and `my-app:3::cache is cold`.
//!
//! For anything beyond the two destinations, use [`AppStatsdBuilder`]:
//!
//! ```no_run
//! # use std::time::Duration;
//! # use appstatsd_client::AppStatsdBuilder;
//! let client = AppStatsdBuilder::new("my-app")
//!     .with_metrics_destination("statsd.internal", 8125)
//!     .with_log_destination("statsd.internal", 8126)
//!     .with_write_timeout(Duration::from_millis(250))
//!     .build()
//!     .expect("failed to build client");
//! # drop(client);
//! ```
//!
//! # Delivery
//!
//! Each line is written as a single UDP datagram, with no acknowledgement, retry or buffering. Reporting methods never
//! return an error: failures are logged through [`tracing`] and otherwise ignored, so that telemetry never interferes
//! with the application's own control flow.
//!
//! If a destination cannot be resolved or opened when the client is built, the failure is logged and the client is
//! built anyway, with lines for that destination being dropped. [`AppStatsdBuilder::with_strict_destinations`] turns
//! this into a build error instead.
//!
//! # Sampling
//!
//! Counters and timings can be reported with a sample rate below 1.0. A single random draw is made for the whole batch
//! of keys passed to one call: either every key in the batch is sent, each annotated with `|@<rate>`, or none are.
//!
//! The random generator is owned by the client and seeded once. A seeded generator can be supplied through
//! [`AppStatsdBuilder::with_rng`] to make sampling reproducible.
//!
//! # `metrics` integration
//!
//! [`AppStatsdClient::recorder`] returns a [`metrics::Recorder`], and [`AppStatsdBuilder::install`] installs it as the
//! global recorder, so that the `counter!` and `histogram!` macros report through the client.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod builder;
pub use self::builder::{AppStatsdBuilder, BuildError};

mod client;
pub use self::client::AppStatsdClient;

mod destination;
pub use self::destination::Destination;

mod level;
pub use self::level::LogLevel;

mod recorder;
pub use self::recorder::AppStatsdRecorder;

mod sampler;

mod writer;
pub use self::writer::MetricValue;
