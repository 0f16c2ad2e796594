//! Inbound firehose events.
//!
//! An `Envelope` is one discrete event off the firehose. Only two kinds carry
//! telemetry this crate cares about, `ValueMetric` and `CounterEvent`; the
//! rest are counted and otherwise ignored by the aggregator.

use serde_json;

/// The kind of event an `Envelope` carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
pub enum EventType {
    /// An HTTP request/response pair.
    HttpStartStop,
    /// A log line emitted by an application or component.
    LogMessage,
    /// An instantaneous measurement.
    ValueMetric,
    /// A monotonic counter, carries both the delta and running total.
    CounterEvent,
    /// An error reported by a component.
    Error,
    /// Resource usage of a single container.
    ContainerMetric,
}

/// Payload of a `EventType::ValueMetric` envelope.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ValueMetric {
    /// Metric name, without the origin.
    #[serde(default)]
    pub name: String,
    /// The observed value.
    #[serde(default)]
    pub value: f64,
    /// Unit of `value`. Informational only.
    #[serde(default)]
    pub unit: String,
}

/// Payload of a `EventType::CounterEvent` envelope.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct CounterEvent {
    /// Counter name, without the origin.
    #[serde(default)]
    pub name: String,
    /// Increment since the last event for this counter.
    #[serde(default)]
    pub delta: u64,
    /// Running total of the counter.
    #[serde(default)]
    pub total: u64,
}

/// A single firehose event.
///
/// String fields that are absent on the wire decode as empty strings. The
/// payload matching `event_type` may be missing; it is up to the consumer to
/// decide what that means.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// The component that emitted the event, for instance `gorouter`.
    #[serde(default)]
    pub origin: String,
    /// Kind of the event.
    pub event_type: EventType,
    /// Emission time, nanoseconds since the unix epoch.
    #[serde(default)]
    pub timestamp: i64,
    /// Deployment the emitter belongs to.
    #[serde(default)]
    pub deployment: String,
    /// Job name of the emitter.
    #[serde(default)]
    pub job: String,
    /// Instance index of the emitter within its job.
    #[serde(default)]
    pub index: String,
    /// IP address of the emitter.
    #[serde(default)]
    pub ip: String,
    /// Set for `EventType::ValueMetric`.
    #[serde(default)]
    pub value_metric: Option<ValueMetric>,
    /// Set for `EventType::CounterEvent`.
    #[serde(default)]
    pub counter_event: Option<CounterEvent>,
}

impl Envelope {
    /// Make an envelope of the given kind with no payload and empty
    /// identification fields.
    pub fn new<S>(origin: S, event_type: EventType) -> Envelope
    where
        S: Into<String>,
    {
        Envelope {
            origin: origin.into(),
            event_type: event_type,
            timestamp: 0,
            deployment: String::new(),
            job: String::new(),
            index: String::new(),
            ip: String::new(),
            value_metric: None,
            counter_event: None,
        }
    }

    /// Make a `ValueMetric` envelope
    ///
    /// # Examples
    ///
    /// ```
    /// use firehose_influxdb::envelope::{Envelope, EventType};
    ///
    /// let e = Envelope::value_metric("router", "latency", 1.5);
    ///
    /// assert_eq!(e.event_type, EventType::ValueMetric);
    /// assert_eq!(e.value_metric.unwrap().value, 1.5);
    /// ```
    pub fn value_metric<S, N>(origin: S, name: N, value: f64) -> Envelope
    where
        S: Into<String>,
        N: Into<String>,
    {
        let mut envelope = Envelope::new(origin, EventType::ValueMetric);
        envelope.value_metric = Some(ValueMetric {
            name: name.into(),
            value: value,
            unit: String::new(),
        });
        envelope
    }

    /// Make a `CounterEvent` envelope with the given running total
    pub fn counter_event<S, N>(origin: S, name: N, delta: u64, total: u64) -> Envelope
    where
        S: Into<String>,
        N: Into<String>,
    {
        let mut envelope = Envelope::new(origin, EventType::CounterEvent);
        envelope.counter_event = Some(CounterEvent {
            name: name.into(),
            delta: delta,
            total: total,
        });
        envelope
    }

    /// Set the emission time, in nanoseconds
    pub fn timestamp(mut self, ns: i64) -> Envelope {
        self.timestamp = ns;
        self
    }

    /// Set deployment, job, index and ip in one go
    pub fn origin_of<S>(mut self, deployment: S, job: S, index: S, ip: S) -> Envelope
    where
        S: Into<String>,
    {
        self.deployment = deployment.into();
        self.job = job.into();
        self.index = index.into();
        self.ip = ip.into();
        self
    }

    /// Decode a single JSON encoded envelope.
    ///
    /// # Examples
    ///
    /// ```
    /// use firehose_influxdb::envelope::{Envelope, EventType};
    ///
    /// let line = r#"{"origin":"router","eventType":"CounterEvent",
    ///                "counterEvent":{"name":"requests","delta":1,"total":12}}"#;
    /// let e = Envelope::from_json(line).unwrap();
    ///
    /// assert_eq!(e.event_type, EventType::CounterEvent);
    /// assert_eq!(e.counter_event.unwrap().total, 12);
    /// ```
    pub fn from_json(line: &str) -> Result<Envelope, serde_json::Error> {
        serde_json::from_str(line)
    }
}
