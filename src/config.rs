//! Provides the CLI option parser
//!
//! Used to parse the argv/config file into a struct that
//! the server can consume and use as configuration data.

use clap::{App, Arg};
use protocols::influx::Layout;
use sink::{write_url, InfluxDBConfig};
use source::TcpConfig;
use std::env;
use std::error;
use std::fmt;
use std::fs::File;
use std::io;
use std::io::Read;
use std::path::Path;
use toml;
use url::Url;
use util;

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

/// Reasons a configuration could not be loaded.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    Io(io::Error),
    /// The configuration file is not valid TOML.
    Toml(toml::de::Error),
    /// A key is present but its value is unusable. Carries the dotted key
    /// path and what was wrong with it.
    Invalid(String, &'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::Io(ref e) => write!(f, "could not read config file: {}", e),
            ConfigError::Toml(ref e) => write!(f, "could not parse config file: {}", e),
            ConfigError::Invalid(ref key, why) => write!(f, "invalid {}: {}", key, why),
        }
    }
}

impl error::Error for ConfigError {
    fn description(&self) -> &str {
        match *self {
            ConfigError::Io(_) => "config file unreadable",
            ConfigError::Toml(_) => "config file not TOML",
            ConfigError::Invalid(_, why) => why,
        }
    }
}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> ConfigError {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> ConfigError {
        ConfigError::Toml(e)
    }
}

fn invalid(key: &str, why: &'static str) -> ConfigError {
    ConfigError::Invalid(key.to_string(), why)
}

/// Configuration of a firehose-influxdb process.
///
/// This struct is what we construct from parsing the configuration. Please see
/// documentation on `parse_args` in this module for more details.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    /// Seconds between flushes.
    pub flush_interval: u64,
    /// Capacity of the event queue between the sources and the consumer. A
    /// full queue raises the slow consumer alert.
    pub queue_depth: usize,
    /// The verbosity setting. The higher the value the more chatty we get.
    pub verbose: u64,
    /// Version string. This is set automatically.
    pub version: String,
    /// See `sink::InfluxDB` for more.
    pub influxdb: InfluxDBConfig,
    /// See `source::Tcp` for more.
    pub source: TcpConfig,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            flush_interval: 15,
            queue_depth: 4096,
            verbose: 0,
            version: VERSION.unwrap_or("unknown").to_string(),
            influxdb: InfluxDBConfig::default(),
            source: TcpConfig::default(),
        }
    }
}

/// Parse the configuration arguments
///
/// This function will read the environment arguments and construct an
/// `Args`. Most configuration will be stored in an on-disk file. See
/// `firehose-influxdb --help` for more information.
pub fn parse_args() -> Result<Args, ConfigError> {
    let args = App::new("firehose-influxdb")
        .version(VERSION.unwrap_or("unknown"))
        .about("aggregates firehose envelopes and ships them to InfluxDB")
        .arg(
            Arg::with_name("config-file")
                .long("config")
                .short("C")
                .value_name("config")
                .required(true)
                .help("The config file to feed in.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Turn on verbose output."),
        )
        .get_matches();

    let verb = args.occurrences_of("verbose");
    match args.value_of("config-file") {
        Some(filename) => parse_config_path(filename, verb),
        None => Err(invalid("config-file", "is required")),
    }
}

/// Read and parse the configuration file at `path`.
pub fn parse_config_path<P>(path: P, verbosity: u64) -> Result<Args, ConfigError>
where
    P: AsRef<Path>,
{
    let mut fp = File::open(path)?;
    let mut buffer = String::new();
    fp.read_to_string(&mut buffer)?;
    parse_config_file(&buffer, verbosity)
}

/// Parse the configuration file.
///
/// Absent keys take their defaults. A string value may instead be given as
/// `{ environment = true, value = "VAR" }` to read it from the environment.
///
/// ```toml
/// flush-interval = 15
/// queue-depth = 4096
///
/// [influxdb]
/// url = "http://localhost:8086"
/// database = "firehose"
/// user = "nozzle"
/// password = { environment = true, value = "INFLUXDB_PASSWORD" }
/// prefix = "cf."
/// deployment = "cf"
/// ip = "10.0.0.3"
/// timeout = 10
/// layout = "point"
///
/// [source]
/// host = "127.0.0.1"
/// port = 8090
/// ```
pub fn parse_config_file(buffer: &str, verbosity: u64) -> Result<Args, ConfigError> {
    let mut args = Args::default();
    let value: toml::Value = toml::from_str(buffer)?;

    args.verbose = verbosity;

    if let Some(fi) = get_integer(&value, "flush-interval", "flush-interval")? {
        if fi < 1 {
            return Err(invalid("flush-interval", "must be at least 1 second"));
        }
        args.flush_interval = fi as u64;
    }

    if let Some(qd) = get_integer(&value, "queue-depth", "queue-depth")? {
        if qd < 1 {
            return Err(invalid("queue-depth", "must be at least 1"));
        }
        args.queue_depth = qd as usize;
    }

    let mut influxdb = InfluxDBConfig::default();
    let mut ip = None;
    if let Some(snk) = value.get("influxdb") {
        if let Some(url) = get_string(snk, "url", "influxdb.url")? {
            influxdb.url = url;
        }
        if let Some(db) = get_string(snk, "database", "influxdb.database")? {
            influxdb.db = db;
        }
        if let Some(user) = get_string(snk, "user", "influxdb.user")? {
            influxdb.user = user;
        }
        if let Some(password) = get_string(snk, "password", "influxdb.password")? {
            influxdb.password = password;
        }
        if let Some(prefix) = get_string(snk, "prefix", "influxdb.prefix")? {
            influxdb.prefix = prefix;
        }
        if let Some(deployment) = get_string(snk, "deployment", "influxdb.deployment")? {
            influxdb.deployment = deployment;
        }
        ip = get_string(snk, "ip", "influxdb.ip")?;
        if let Some(timeout) = get_integer(snk, "timeout", "influxdb.timeout")? {
            if timeout < 1 {
                return Err(invalid("influxdb.timeout", "must be at least 1 second"));
            }
            influxdb.timeout = timeout as u64;
        }
        if let Some(layout) = get_string(snk, "layout", "influxdb.layout")? {
            influxdb.layout = match layout.as_str() {
                "point" => Layout::PerPoint,
                "series" => Layout::PerSeries,
                _ => return Err(invalid("influxdb.layout", "must be \"point\" or \"series\"")),
            };
        }
    }
    match Url::parse(&influxdb.url) {
        Ok(ref url) if url.scheme() == "http" || url.scheme() == "https" => {}
        Ok(_) => return Err(invalid("influxdb.url", "scheme must be http or https")),
        Err(_) => return Err(invalid("influxdb.url", "must be an absolute URL")),
    }
    if write_url(&influxdb.url, &influxdb.db).is_err() {
        return Err(invalid("influxdb.url", "must be an absolute URL"));
    }
    influxdb.ip = match ip {
        Some(ip) => ip,
        None => util::local_ip().unwrap_or(influxdb.ip),
    };
    args.influxdb = influxdb;

    if let Some(src) = value.get("source") {
        if let Some(host) = get_string(src, "host", "source.host")? {
            args.source.host = host;
        }
        if let Some(port) = get_integer(src, "port", "source.port")? {
            if port < 0 || port > i64::from(u16::max_value()) {
                return Err(invalid("source.port", "must be a valid port number"));
            }
            args.source.port = port as u16;
        }
    }

    Ok(args)
}

fn get_integer(tbl: &toml::Value, key: &str, path: &str) -> Result<Option<i64>, ConfigError> {
    match tbl.get(key) {
        Some(v) => v.as_integer()
            .map(Some)
            .ok_or_else(|| invalid(path, "must be an integer")),
        None => Ok(None),
    }
}

fn get_string(tbl: &toml::Value, key: &str, path: &str) -> Result<Option<String>, ConfigError> {
    let v = match tbl.get(key) {
        Some(v) => v,
        None => return Ok(None),
    };
    if let Some(s) = v.as_str() {
        return Ok(Some(s.to_string()));
    }
    let ktbl = v.as_table()
        .ok_or_else(|| invalid(path, "must be a string or a table"))?;
    let from_env = ktbl.get("environment")
        .map_or(false, |ev| ev.as_bool().unwrap_or(false));
    if !from_env {
        return Err(invalid(path, "table must have environment / value keys"));
    }
    let env_key = ktbl.get("value")
        .and_then(|v| v.as_str())
        .ok_or_else(|| invalid(path, "value key must be a string"))?;
    env::var(env_key)
        .map(Some)
        .map_err(|_| invalid(path, "value could not be read from the environment"))
}
