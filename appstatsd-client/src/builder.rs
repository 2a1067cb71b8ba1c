use std::{io, sync::Arc, time::Duration};

use rand::RngCore;
use thiserror::Error;

use crate::{
    client::{AppStatsdClient, Inner},
    destination::{DatagramSink, Destination},
    sampler::Sampler,
};

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_METRICS_PORT: u16 = 8125;
const DEFAULT_LOG_PORT: u16 = 8126;
const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors that could occur while building or installing an appstatsd client.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The namespace was empty or contained the `.` separator.
    #[error("invalid namespace '{namespace}': must be non-empty and must not contain '.'")]
    InvalidNamespace {
        /// The rejected namespace.
        namespace: String,
    },

    /// A destination could not be resolved or opened while strict destinations were enabled.
    #[error("failed to open destination {destination}: {source}")]
    Destination {
        /// The destination that failed.
        destination: Destination,

        /// The underlying I/O error.
        source: io::Error,
    },

    /// Failed to install the recorder due to an existing global recorder already being installed.
    #[error("failed to install client as global recorder")]
    FailedToInstall,
}

/// Builder for an appstatsd client.
pub struct AppStatsdBuilder {
    namespace: String,
    metrics_destination: Destination,
    log_destination: Destination,
    write_timeout: Duration,
    strict_destinations: bool,
    sampler: Option<Sampler>,
}

impl AppStatsdBuilder {
    /// Creates a new `AppStatsdBuilder` for the given application namespace.
    ///
    /// The namespace is prepended to every metric key and log line. It is validated when the client is built.
    pub fn new<N>(namespace: N) -> Self
    where
        N: Into<String>,
    {
        AppStatsdBuilder {
            namespace: namespace.into(),
            metrics_destination: Destination::new(DEFAULT_HOST, DEFAULT_METRICS_PORT),
            log_destination: Destination::new(DEFAULT_HOST, DEFAULT_LOG_PORT),
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            strict_destinations: false,
            sampler: None,
        }
    }

    /// Set the destination that metric lines are sent to.
    ///
    /// Defaults to `localhost:8125`.
    #[must_use]
    pub fn with_metrics_destination<H>(mut self, host: H, port: u16) -> Self
    where
        H: Into<String>,
    {
        self.metrics_destination = Destination::new(host, port);
        self
    }

    /// Set the destination that log lines are sent to.
    ///
    /// Defaults to `localhost:8126`.
    #[must_use]
    pub fn with_log_destination<H>(mut self, host: H, port: u16) -> Self
    where
        H: Into<String>,
    {
        self.log_destination = Destination::new(host, port);
        self
    }

    /// Set the write timeout for each datagram.
    ///
    /// When the write timeout is reached, the datagram being sent at the time is dropped without retrying.
    ///
    /// Defaults to 1 second.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Sets whether or not a destination that fails to open is a build error.
    ///
    /// When disabled, the failure is logged and the client is still built: lines sent to that destination are dropped
    /// and the failure is logged on every send. When enabled, [`build`][Self::build] returns
    /// [`BuildError::Destination`] instead.
    ///
    /// Defaults to `false`.
    #[must_use]
    pub fn with_strict_destinations(mut self, strict: bool) -> Self {
        self.strict_destinations = strict;
        self
    }

    /// Set the random number generator used for sampling decisions.
    ///
    /// The generator is owned by the client and is never reseeded. Supplying a seeded generator makes sampling
    /// decisions reproducible.
    ///
    /// Defaults to a `Xoshiro256StarStar` generator seeded from the thread-local RNG at build time.
    #[must_use]
    pub fn with_rng<R>(mut self, rng: R) -> Self
    where
        R: RngCore + Send + 'static,
    {
        self.sampler = Some(Sampler::from_rng(rng));
        self
    }

    fn open(&self, destination: Destination) -> Result<DatagramSink, BuildError> {
        if self.strict_destinations {
            DatagramSink::open_strict(destination, self.write_timeout)
                .map_err(|(destination, source)| BuildError::Destination { destination, source })
        } else {
            Ok(DatagramSink::open_lenient(destination, self.write_timeout))
        }
    }

    /// Builds the client.
    ///
    /// Both destinations are resolved and opened before this returns.
    ///
    /// # Errors
    ///
    /// If the namespace is empty or contains `.`, or if strict destinations are enabled and either destination cannot
    /// be opened, an error will be returned.
    pub fn build(self) -> Result<AppStatsdClient, BuildError> {
        validate_namespace(&self.namespace)?;

        let metrics = self.open(self.metrics_destination.clone())?;
        let logs = self.open(self.log_destination.clone())?;
        let sampler = self.sampler.unwrap_or_else(Sampler::new);

        let inner = Inner { namespace: self.namespace, metrics, logs, sampler };
        Ok(AppStatsdClient::from_inner(Arc::new(inner)))
    }

    /// Builds the client and installs it as the global [`metrics`] recorder.
    ///
    /// The returned client shares its sockets with the installed recorder, and can still be used directly, such as for
    /// sending log lines.
    ///
    /// # Errors
    ///
    /// If the client cannot be built, or if a global recorder is already installed, an error will be returned.
    pub fn install(self) -> Result<AppStatsdClient, BuildError> {
        let client = self.build()?;

        metrics::set_global_recorder(client.recorder()).map_err(|_| BuildError::FailedToInstall)?;
        Ok(client)
    }
}

fn validate_namespace(namespace: &str) -> Result<(), BuildError> {
    if namespace.is_empty() || namespace.contains('.') {
        return Err(BuildError::InvalidNamespace { namespace: namespace.to_string() });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;

    use proptest::prelude::*;

    use super::{validate_namespace, AppStatsdBuilder, BuildError};

    #[test]
    fn namespace_validation() {
        // Cases are defined as: namespace, whether it is accepted.
        let cases = [
            ("app", true),
            ("apdc-test", true),
            ("my_app#1", true),
            ("", false),
            (".", false),
            ("my.app", false),
            ("app.", false),
            (".app", false),
        ];

        for (namespace, accepted) in cases {
            assert_eq!(validate_namespace(namespace).is_ok(), accepted, "namespace {namespace:?}");
        }
    }

    #[test]
    fn build_rejects_dotted_namespace() {
        let err = AppStatsdBuilder::new("my.app").build().err().unwrap();
        assert!(matches!(err, BuildError::InvalidNamespace { ref namespace } if namespace == "my.app"));
        assert_eq!(
            err.to_string(),
            "invalid namespace 'my.app': must be non-empty and must not contain '.'"
        );
    }

    #[test]
    fn lenient_destinations_still_build() {
        let client = AppStatsdBuilder::new("app")
            .with_metrics_destination("host.invalid", 8125)
            .with_log_destination("host.invalid", 8126)
            .build()
            .unwrap();

        assert!(!client.is_metrics_open());
        assert!(!client.is_log_open());

        // Sends against unopened destinations are swallowed.
        client.increment("x", 1);
        client.log(crate::LogLevel::Info, "nobody is listening");
    }

    #[test]
    fn strict_destinations_fail_build() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = receiver.local_addr().unwrap().port();

        let err = AppStatsdBuilder::new("app")
            .with_metrics_destination("127.0.0.1", port)
            .with_log_destination("host.invalid", 8126)
            .with_strict_destinations(true)
            .build()
            .err()
            .unwrap();

        match err {
            BuildError::Destination { destination, .. } => {
                assert_eq!(destination.host(), "host.invalid");
                assert_eq!(destination.port(), 8126);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn strict_destinations_build_when_reachable() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let port = receiver.local_addr().unwrap().port();

        let client = AppStatsdBuilder::new("app")
            .with_metrics_destination("127.0.0.1", port)
            .with_log_destination("127.0.0.1", port)
            .with_strict_destinations(true)
            .build()
            .unwrap();

        assert!(client.is_metrics_open());
        assert!(client.is_log_open());
        assert_eq!(client.namespace(), "app");
    }

    proptest! {
        #[test]
        fn dotted_namespaces_rejected(prefix in "[a-z0-9_-]{0,8}", suffix in "[a-z0-9_-]{0,8}") {
            let namespace = format!("{prefix}.{suffix}");
            prop_assert!(validate_namespace(&namespace).is_err());
        }

        #[test]
        fn undotted_namespaces_accepted(namespace in "[^.]{1,32}") {
            prop_assert!(validate_namespace(&namespace).is_ok());
        }
    }
}
