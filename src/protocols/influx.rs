//! InfluxDB line protocol encoding of an aggregation window.
//!
//! Each record looks like:
//!
//! ```text
//! <prefix><name>,<tag>,<tag> value=<f64>[,value=<f64>...] <timestamp_ns>
//! ```
//!
//! The measurement is always followed by a comma, even when no tags follow.

use aggregator::{MetricKey, Series};
use std::collections::BTreeMap;
use std::fmt::Write;
use time;

/// How the points of one series are laid out in a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// One record per series. Every point becomes a `value=` field of that
    /// record and the record is stamped with the first point's time.
    PerSeries,
    /// One record per point, each stamped with its own time.
    PerPoint,
}

impl Default for Layout {
    fn default() -> Layout {
        Layout::PerPoint
    }
}

/// Builder for a single line protocol record.
#[derive(Debug, Default)]
pub struct LineBuilder {
    measurement: String,
    tags: Vec<String>,
    fields: Vec<String>,
    timestamp: i64,
}

impl LineBuilder {
    /// Start a record for the given measurement.
    pub fn new<S>(measurement: S) -> LineBuilder
    where
        S: Into<String>,
    {
        LineBuilder {
            measurement: measurement.into(),
            ..Default::default()
        }
    }

    /// Append pre-rendered `key=value` tags, order preserved.
    pub fn tags<'a, I>(mut self, tags: I) -> LineBuilder
    where
        I: IntoIterator<Item = &'a String>,
    {
        self.tags.extend(tags.into_iter().cloned());
        self
    }

    /// Append a float field.
    pub fn field(mut self, key: &str, value: f64) -> LineBuilder {
        self.fields.push(format!("{}={}", key, value));
        self
    }

    /// Set the record time, nanoseconds since the unix epoch.
    pub fn timestamp(mut self, ns: i64) -> LineBuilder {
        self.timestamp = ns;
        self
    }

    /// Write the newline-terminated record onto `buf`.
    pub fn write_to(&self, buf: &mut String) {
        buf.push_str(&self.measurement);
        buf.push(',');
        buf.push_str(&self.tags.join(","));
        buf.push(' ');
        buf.push_str(&self.fields.join(","));
        buf.push(' ');
        // Writing into a String cannot fail.
        let _ = write!(buf, "{}", self.timestamp);
        buf.push('\n');
    }
}

/// Render the window into a line protocol batch.
///
/// Returns the batch and the number of series it holds. The count is the
/// number of series regardless of `layout`.
///
/// # Examples
///
/// ```
/// use firehose_influxdb::aggregator::{MetricKey, Point, Series};
/// use firehose_influxdb::protocols::influx::{format_batch, Layout};
/// use std::collections::BTreeMap;
///
/// let mut entries = BTreeMap::new();
/// entries.insert(
///     MetricKey {
///         kind: None,
///         name: "name".to_string(),
///         deployment: "prod".to_string(),
///         job: String::new(),
///         index: String::new(),
///         ip: "1.2.3.4".to_string(),
///     },
///     Series {
///         tags: vec!["ip=1.2.3.4".to_string(), "deployment=prod".to_string()],
///         points: vec![Point { timestamp: 1000, value: 3.5 }],
///     },
/// );
/// let (batch, count) = format_batch("app.", &entries, Layout::PerSeries);
///
/// assert_eq!(
///     "app.name,ip=1.2.3.4,deployment=prod value=3.5 1000000000000\n",
///     String::from_utf8(batch).unwrap()
/// );
/// assert_eq!(1, count);
/// ```
pub fn format_batch(
    prefix: &str,
    entries: &BTreeMap<MetricKey, Series>,
    layout: Layout,
) -> (Vec<u8>, u64) {
    let mut buf = String::with_capacity(entries.len() * 128);
    for (key, series) in entries {
        let measurement = format!("{}{}", prefix, key.name);
        match layout {
            Layout::PerSeries => {
                let mut line = LineBuilder::new(measurement).tags(&series.tags);
                for point in &series.points {
                    line = line.field("value", point.value);
                }
                line.timestamp(series_timestamp(series)).write_to(&mut buf);
            }
            Layout::PerPoint => for point in &series.points {
                LineBuilder::new(measurement.as_str())
                    .tags(&series.tags)
                    .field("value", point.value)
                    .timestamp(time::seconds_to_ns(point.timestamp))
                    .write_to(&mut buf);
            },
        }
    }
    (buf.into_bytes(), entries.len() as u64)
}

#[inline]
fn series_timestamp(series: &Series) -> i64 {
    match series.points.first() {
        Some(point) => time::seconds_to_ns(point.timestamp),
        None => time::now_ns(),
    }
}
