//! The aggregator is the primary internal storage type.
//!
//! Envelopes are folded into a `Series` keyed by their `MetricKey`. Points
//! accumulate for the life of a window, tags are replaced on every ingest.
//! Alongside the series the aggregator keeps two counters that live for the
//! whole process, used to self-report health on each flush.

use envelope::{Envelope, EventType};
use std::collections::BTreeMap;
use std::error;
use std::fmt;
use time;

/// Name of the slow consumer alert internal metric.
pub const SLOW_CONSUMER_ALERT: &str = "slowConsumerAlert";
/// Name of the messages received internal metric.
pub const TOTAL_MESSAGES_RECEIVED: &str = "totalMessagesReceived";
/// Name of the metrics sent internal metric.
pub const TOTAL_METRICS_SENT: &str = "totalMetricsSent";

/// Identity of a series.
///
/// Two observations with equal keys are folded into the same `Series`.
/// Internal metrics have no `kind`, which also keeps them from colliding with
/// a data series of the same name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MetricKey {
    pub kind: Option<EventType>,
    pub name: String,
    pub deployment: String,
    pub job: String,
    pub index: String,
    pub ip: String,
}

/// A single observation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    /// Seconds since the unix epoch.
    pub timestamp: i64,
    pub value: f64,
}

/// Accumulated state of one `MetricKey` within a window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Series {
    /// Rendered `key=value` tags, in emission order.
    pub tags: Vec<String>,
    /// Observations in ingestion order. Never empty once stored.
    pub points: Vec<Point>,
}

/// Reasons an envelope could not be aggregated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IngestError {
    /// The envelope's kind demands a payload the envelope does not carry.
    MissingPayload(EventType),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            IngestError::MissingPayload(kind) => {
                write!(f, "{:?} envelope is missing its payload", kind)
            }
        }
    }
}

impl error::Error for IngestError {
    fn description(&self) -> &str {
        "envelope missing payload"
    }
}

/// In-memory aggregate of one window, plus process lifetime counters.
pub struct Aggregator {
    entries: BTreeMap<MetricKey, Series>,
    total_messages_received: u64,
    total_metrics_sent: u64,
    deployment: String,
    ip: String,
}

impl Aggregator {
    /// Create an empty Aggregator
    ///
    /// `deployment` and `ip` identify this process and are attached to every
    /// internal metric.
    pub fn new<S>(deployment: S, ip: S) -> Aggregator
    where
        S: Into<String>,
    {
        Aggregator {
            entries: BTreeMap::new(),
            total_messages_received: 0,
            total_metrics_sent: 0,
            deployment: deployment.into(),
            ip: ip.into(),
        }
    }

    /// Fold an envelope into the aggregate.
    ///
    /// Every envelope counts as received. Kinds other than `ValueMetric` and
    /// `CounterEvent` are dropped without error. A value or counter envelope
    /// lacking its payload is refused and leaves the entries untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use firehose_influxdb::aggregator::Aggregator;
    /// use firehose_influxdb::envelope::Envelope;
    ///
    /// let mut aggr = Aggregator::new("cf", "10.0.0.1");
    /// aggr.ingest(&Envelope::value_metric("router", "latency", 2.0)).unwrap();
    ///
    /// assert_eq!(1, aggr.total_messages_received());
    /// assert_eq!(1, aggr.entries().len());
    /// ```
    pub fn ingest(&mut self, envelope: &Envelope) -> Result<(), IngestError> {
        self.total_messages_received = self.total_messages_received.wrapping_add(1);

        let (metric_name, value) = match envelope.event_type {
            EventType::ValueMetric => match envelope.value_metric {
                Some(ref vm) => (&vm.name, vm.value),
                None => return Err(IngestError::MissingPayload(envelope.event_type)),
            },
            EventType::CounterEvent => match envelope.counter_event {
                Some(ref ce) => (&ce.name, ce.total as f64),
                None => return Err(IngestError::MissingPayload(envelope.event_type)),
            },
            _ => return Ok(()),
        };

        let key = MetricKey {
            kind: Some(envelope.event_type),
            name: format!("{}.{}", envelope.origin, metric_name),
            deployment: envelope.deployment.clone(),
            job: envelope.job.clone(),
            index: envelope.index.clone(),
            ip: envelope.ip.clone(),
        };
        let point = Point {
            timestamp: time::ns_to_seconds(envelope.timestamp),
            value: value,
        };

        let series = self.entries.entry(key).or_insert_with(Series::default);
        series.tags = envelope_tags(envelope);
        series.points.push(point);
        Ok(())
    }

    /// Raise the slow consumer alert for the current window.
    pub fn record_alert(&mut self) {
        self.set_internal(SLOW_CONSUMER_ALERT, 1);
    }

    /// Add the self-health metrics to the current window.
    ///
    /// The two lifetime counters are always (re)set. The slow consumer alert
    /// is set to 0 only if `record_alert` has not already been called in this
    /// window.
    pub fn snapshot_internal_metrics(&mut self) {
        let received = self.total_messages_received;
        let sent = self.total_metrics_sent;
        self.set_internal(TOTAL_MESSAGES_RECEIVED, received);
        self.set_internal(TOTAL_METRICS_SENT, sent);

        let alert_key = self.internal_key(SLOW_CONSUMER_ALERT);
        if !self.entries.contains_key(&alert_key) {
            self.set_internal(SLOW_CONSUMER_ALERT, 0);
        }
    }

    /// Start a new window. Lifetime counters are preserved.
    ///
    /// # Examples
    ///
    /// ```
    /// use firehose_influxdb::aggregator::Aggregator;
    /// use firehose_influxdb::envelope::Envelope;
    ///
    /// let mut aggr = Aggregator::new("cf", "10.0.0.1");
    /// aggr.ingest(&Envelope::value_metric("router", "latency", 2.0)).unwrap();
    /// aggr.reset();
    ///
    /// assert!(aggr.entries().is_empty());
    /// assert_eq!(1, aggr.total_messages_received());
    /// ```
    pub fn reset(&mut self) {
        self.entries = BTreeMap::new();
    }

    /// Record that `count` metrics were delivered.
    pub fn mark_sent(&mut self, count: u64) {
        self.total_metrics_sent = self.total_metrics_sent.wrapping_add(count);
    }

    pub fn entries(&self) -> &BTreeMap<MetricKey, Series> {
        &self.entries
    }

    pub fn total_messages_received(&self) -> u64 {
        self.total_messages_received
    }

    pub fn total_metrics_sent(&self) -> u64 {
        self.total_metrics_sent
    }

    fn internal_key(&self, name: &str) -> MetricKey {
        MetricKey {
            kind: None,
            name: name.to_string(),
            deployment: self.deployment.clone(),
            job: String::new(),
            index: String::new(),
            ip: self.ip.clone(),
        }
    }

    // Internal metrics replace their series outright, they never accumulate.
    fn set_internal(&mut self, name: &str, value: u64) {
        let key = self.internal_key(name);
        let series = Series {
            tags: vec![
                format!("ip={}", self.ip),
                format!("deployment={}", self.deployment),
            ],
            points: vec![
                Point {
                    timestamp: time::now(),
                    value: value as f64,
                },
            ],
        };
        self.entries.insert(key, series);
    }
}

fn envelope_tags(envelope: &Envelope) -> Vec<String> {
    let mut tags = Vec::with_capacity(4);
    push_tag_if_not_empty(&mut tags, "deployment", &envelope.deployment);
    push_tag_if_not_empty(&mut tags, "job", &envelope.job);
    push_tag_if_not_empty(&mut tags, "index", &envelope.index);
    push_tag_if_not_empty(&mut tags, "ip", &envelope.ip);
    tags
}

#[inline]
fn push_tag_if_not_empty(tags: &mut Vec<String>, key: &str, value: &str) {
    if !value.is_empty() {
        tags.push(format!("{}={}", key, value));
    }
}
