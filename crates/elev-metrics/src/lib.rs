//! Metrics for the elevation client.
//!
//! Every metric emitted by the ingestion client, the status channel, the
//! layer directory and the selection engine is declared once in
//! [`metric_defs`]; call sites use the constant's name so a typo cannot
//! create a new series. The `metrics` crate is re-exported for those call
//! sites.
//!
//! Recording is a no-op until the host installs a recorder; the `prometheus`
//! feature pulls in an exporter for binaries that want one.
//!
//! ```rust,ignore
//! use elev_metrics::{metric_defs, metrics};
//!
//! metrics::counter!(metric_defs::STATUS_EVENTS.name, "kind" => "running").increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// Counter, gauge or histogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Only goes up.
    Counter,
    /// Goes up and down.
    Gauge,
    /// Distribution of observed values.
    Histogram,
}

/// One declared metric.
#[derive(Debug, Clone)]
pub struct Metric {
    /// Series name, always `elev.`-prefixed.
    pub name: &'static str,
    /// Kind of series.
    pub kind: MetricKind,
    /// Help text handed to the recorder.
    pub description: &'static str,
    /// Unit of the recorded values.
    pub unit: Unit,
}

impl Metric {
    const fn new(kind: MetricKind, name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            unit: Unit::Count,
        }
    }

    /// A counter of events.
    pub const fn counter(name: &'static str, description: &'static str) -> Self {
        Self::new(MetricKind::Counter, name, description)
    }

    /// A gauge of things currently held.
    pub const fn gauge(name: &'static str, description: &'static str) -> Self {
        Self::new(MetricKind::Gauge, name, description)
    }

    /// A histogram of observed values.
    pub const fn histogram(name: &'static str, description: &'static str) -> Self {
        Self::new(MetricKind::Histogram, name, description)
    }

    /// Record values in `unit` instead of plain counts.
    pub const fn in_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    /// Hand this metric's unit and help text to the installed recorder.
    pub fn describe(&self) {
        match self.kind {
            MetricKind::Counter => describe_counter!(self.name, self.unit, self.description),
            MetricKind::Gauge => describe_gauge!(self.name, self.unit, self.description),
            MetricKind::Histogram => describe_histogram!(self.name, self.unit, self.description),
        }
    }
}

/// Every metric the client emits. Label keys are listed per metric.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels: `mode` (remote|upload), `outcome` (accepted|rejected|transport_error).
    pub const INGEST_SUBMISSIONS: Metric = Metric::counter(
        "elev.ingest.submissions",
        "Ingestion requests sent to the backend",
    );

    /// Labels: `field`.
    pub const INGEST_VALIDATION_FAILURES: Metric = Metric::counter(
        "elev.ingest.validation_failures",
        "Requests refused client-side before any network call",
    );

    pub const INGEST_UPLOAD_SIZE: Metric = Metric::histogram(
        "elev.ingest.upload_size_bytes",
        "Size of uploaded elevation files",
    )
    .in_unit(Unit::Bytes);

    /// Labels: `kind` (queued|running|succeeded|failed).
    pub const STATUS_EVENTS: Metric = Metric::counter(
        "elev.status.events",
        "Status events delivered to callers",
    );

    pub const STATUS_DECODE_DROPS: Metric = Metric::counter(
        "elev.status.decode_drops",
        "Status frames dropped because they could not be decoded",
    );

    pub const STATUS_TRANSPORT_FAILURES: Metric = Metric::counter(
        "elev.status.transport_failures",
        "Transport failures surfaced as terminal FAILED events",
    );

    pub const STATUS_OPEN_CHANNELS: Metric = Metric::gauge(
        "elev.status.open_channels",
        "Status channels holding a live transport",
    );

    /// Labels: `outcome` (fetched|retained).
    pub const DIRECTORY_REFRESHES: Metric = Metric::counter(
        "elev.directory.refreshes",
        "Layer directory refresh attempts",
    );

    pub const DIRECTORY_LAYERS: Metric = Metric::gauge(
        "elev.directory.layers",
        "Terrain layers currently cached",
    );

    /// Labels: `trigger` (mode|camera|directory|broadcast).
    pub const SELECTION_EVALUATIONS: Metric = Metric::counter(
        "elev.selection.evaluations",
        "Terrain selection evaluations",
    );

    pub const SELECTION_PROVIDER_SWITCHES: Metric = Metric::counter(
        "elev.selection.provider_switches",
        "Terrain provider installs performed on the viewer",
    );

    pub const ALL: &[&Metric] = &[
        &INGEST_SUBMISSIONS,
        &INGEST_VALIDATION_FAILURES,
        &INGEST_UPLOAD_SIZE,
        &STATUS_EVENTS,
        &STATUS_DECODE_DROPS,
        &STATUS_TRANSPORT_FAILURES,
        &STATUS_OPEN_CHANNELS,
        &DIRECTORY_REFRESHES,
        &DIRECTORY_LAYERS,
        &SELECTION_EVALUATIONS,
        &SELECTION_PROVIDER_SWITCHES,
    ];
}

/// Describe every metric to the installed recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

/// Serve Prometheus metrics on `addr`.
#[cfg(feature = "prometheus")]
pub fn install_prometheus(
    addr: std::net::SocketAddr,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    describe_metrics();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::INGEST_SUBMISSIONS.kind, MetricKind::Counter);
        assert_eq!(metric_defs::INGEST_SUBMISSIONS.unit, Unit::Count);
        assert_eq!(metric_defs::STATUS_OPEN_CHANNELS.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::INGEST_UPLOAD_SIZE.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::INGEST_UPLOAD_SIZE.unit, Unit::Bytes);
    }

    #[test]
    fn test_all_names_unique_and_prefixed() {
        let mut seen = HashSet::new();
        for metric in metric_defs::ALL {
            assert!(metric.name.starts_with("elev."), "{}", metric.name);
            assert!(seen.insert(metric.name), "duplicate metric {}", metric.name);
            assert!(!metric.description.is_empty(), "{} has no description", metric.name);
        }
        assert_eq!(metric_defs::ALL.len(), 11);
    }

    #[test]
    fn test_describe_without_recorder_is_noop() {
        describe_metrics();
    }
}
