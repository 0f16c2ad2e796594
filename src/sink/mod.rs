//! A 'sink' is the far end of a flush: it takes a rendered batch and ships it
//! to a URL.

use hyper;
use std::error;
use std::fmt;

mod http;
mod influxdb;

pub use self::http::Http;
pub use self::influxdb::{write_url, InfluxDB, InfluxDBConfig};

/// Failure to deliver a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkError {
    /// The request never produced a response: connection refused, timed out
    /// and the like.
    Transport(String),
    /// The remote answered with a non-2xx status. Carries the status text.
    Status(String),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            SinkError::Transport(ref e) => write!(f, "transport failure: {}", e),
            SinkError::Status(ref s) => {
                write!(f, "InfluxDB request returned HTTP response: {}", s)
            }
        }
    }
}

impl error::Error for SinkError {
    fn description(&self) -> &str {
        match *self {
            SinkError::Transport(_) => "transport failure",
            SinkError::Status(_) => "unexpected HTTP status",
        }
    }
}

impl From<hyper::Error> for SinkError {
    fn from(e: hyper::Error) -> SinkError {
        SinkError::Transport(e.to_string())
    }
}

/// Delivery of a batch to a remote endpoint.
///
/// One best-effort attempt per call. Implementations must not retry; the
/// caller keeps the data around for the next flush when this fails.
pub trait Sink {
    /// POST `body` to `url`.
    fn post(&mut self, url: &str, body: &[u8]) -> Result<(), SinkError>;
}
