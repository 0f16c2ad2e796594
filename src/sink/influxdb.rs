use aggregator::Aggregator;
use envelope::Envelope;
use protocols::influx::{format_batch, Layout};
use sink::{Sink, SinkError};
use source;
use source::Event;
use std::sync::mpsc::Receiver;
use url;
use url::Url;

/// Configuration for the InfluxDB client
#[derive(Debug, Clone, PartialEq)]
pub struct InfluxDBConfig {
    /// Base URL of the InfluxDB HTTP API, for instance
    /// `http://localhost:8086`.
    pub url: String,
    /// The database points are written into.
    pub db: String,
    /// User for HTTP basic auth. Empty disables authentication.
    pub user: String,
    /// Password for HTTP basic auth.
    pub password: String,
    /// Prepended verbatim to every measurement name.
    pub prefix: String,
    /// Deployment tag of this process' internal metrics.
    pub deployment: String,
    /// IP tag of this process' internal metrics.
    pub ip: String,
    /// Seconds to wait on each half of a write request.
    pub timeout: u64,
    /// How series are laid out in a batch.
    pub layout: Layout,
}

impl Default for InfluxDBConfig {
    fn default() -> InfluxDBConfig {
        InfluxDBConfig {
            url: "http://localhost:8086".to_string(),
            db: "firehose".to_string(),
            user: String::new(),
            password: String::new(),
            prefix: String::new(),
            deployment: String::new(),
            ip: "127.0.0.1".to_string(),
            timeout: 10,
            layout: Layout::default(),
        }
    }
}

/// Build the write endpoint `<base>/write?db=<db>`.
///
/// A trailing slash on `base` is dropped and `db` is percent-encoded.
///
/// # Examples
///
/// ```
/// use firehose_influxdb::sink::write_url;
///
/// assert_eq!(
///     "http://localhost:8086/write?db=firehose",
///     write_url("http://localhost:8086", "firehose").unwrap()
/// );
/// ```
pub fn write_url(base: &str, db: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(&format!("{}/write", base.trim_end_matches('/')))?;
    url.query_pairs_mut().append_pair("db", db);
    Ok(url.into_string())
}

/// The InfluxDB client.
///
/// Owns the aggregation window and drives the flush cycle: snapshot internal
/// metrics, render, POST, reset. Refer to `InfluxDBConfig` for the knobs.
pub struct InfluxDB<S> {
    aggrs: Aggregator,
    sink: S,
    prefix: String,
    layout: Layout,
    url: String,
}

impl<S> InfluxDB<S>
where
    S: Sink,
{
    /// Construct a new InfluxDB client delivering through `sink`.
    pub fn new(config: InfluxDBConfig, sink: S) -> Result<InfluxDB<S>, url::ParseError> {
        let url = write_url(&config.url, &config.db)?;
        Ok(InfluxDB {
            aggrs: Aggregator::new(config.deployment, config.ip),
            sink: sink,
            prefix: config.prefix,
            layout: config.layout,
            url: url,
        })
    }

    /// Fold an envelope into the current window. Envelopes that cannot be
    /// aggregated are logged and dropped.
    pub fn deliver(&mut self, envelope: &Envelope) {
        if let Err(e) = self.aggrs.ingest(envelope) {
            warn!("Dropping envelope from {:?}: {}", envelope.origin, e);
        }
    }

    /// Flag the current window as having fallen behind the firehose.
    pub fn alert_slow_consumer(&mut self) {
        self.aggrs.record_alert();
    }

    /// Ship the current window.
    ///
    /// On success the window is reset and the number of series sent is
    /// returned. On failure nothing is reset, the next flush carries this
    /// window's points along with whatever arrives in the meantime.
    pub fn flush(&mut self) -> Result<u64, SinkError> {
        self.aggrs.snapshot_internal_metrics();
        info!("Posting {} metrics", self.aggrs.entries().len());
        debug!("Using the following influx URL {}", self.url);

        let (batch, count) = format_batch(&self.prefix, self.aggrs.entries(), self.layout);
        trace!("BODY: {:?}", String::from_utf8_lossy(&batch));
        self.sink.post(&self.url, &batch)?;

        self.aggrs.mark_sent(count);
        self.aggrs.reset();
        Ok(count)
    }

    /// Consume events until `Event::Shutdown` or until every sender has hung
    /// up.
    ///
    /// Flush failures are logged and never end the loop. A final flush is
    /// attempted on the way out.
    pub fn run(&mut self, recv: Receiver<Event>) {
        for event in recv.iter() {
            match event {
                Event::Envelope(envelope) => self.deliver(&envelope),
                Event::TimerFlush => self.timer_flush(),
                Event::Shutdown => {
                    info!("shutting down, final flush");
                    self.timer_flush();
                    return;
                }
            }
        }
        self.timer_flush();
    }

    fn timer_flush(&mut self) {
        let slow = source::take_slow_consumer();
        if slow > 0 {
            warn!("event queue was full {} times since the last flush", slow);
            self.alert_slow_consumer();
        }
        match self.flush() {
            Ok(count) => debug!("flushed {} metrics", count),
            Err(e) => error!("Error while flushing metrics: {}", e),
        }
    }

    pub fn series_url(&self) -> &str {
        &self.url
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggrs
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}
