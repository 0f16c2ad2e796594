//! firehose-influxdb aggregates the metric envelopes of a firehose stream
//! and ships them to InfluxDB.
//!
//! Value metrics and counter events are folded, per identity, into an
//! in-memory window. On every flush the window is rendered as InfluxDB line
//! protocol, along with a handful of self-health metrics, and POSTed to the
//! database's write endpoint. A successful write starts a new window; a
//! failed one keeps the data for the next attempt.
#![allow(unknown_lints)]
#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]
extern crate chrono;
extern crate clap;
extern crate hyper;
extern crate hyper_native_tls;
extern crate serde;
extern crate serde_json;
extern crate toml;
extern crate url;

#[macro_use]
extern crate log;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate serde_derive;

#[cfg(test)]
extern crate quickcheck;

pub mod aggregator;
pub mod config;
pub mod envelope;
pub mod protocols;
pub mod sink;
pub mod source;
pub mod time;
pub mod util;
