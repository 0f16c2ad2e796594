extern crate chan_signal;
extern crate chrono;
extern crate fern;
extern crate firehose_influxdb;
extern crate openssl_probe;

#[macro_use]
extern crate log;

use chrono::Utc;
use firehose_influxdb::config;
use firehose_influxdb::sink::{Http, InfluxDB};
use firehose_influxdb::source::{self, Event, FlushTimer, Source, Tcp};
use std::process;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

fn main() {
    let args = match config::parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("firehose-influxdb: {}", e);
            process::exit(1);
        }
    };

    let level = match args.verbose {
        0 => log::LevelFilter::Error,
        1 => log::LevelFilter::Warn,
        2 => log::LevelFilter::Info,
        3 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    // Must be set up before any other thread is spawned.
    let signal =
        chan_signal::notify(&[chan_signal::Signal::INT, chan_signal::Signal::TERM]);

    let logging = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}][{}] {}",
                record.target(),
                record.line().unwrap_or(0),
                Utc::now().to_rfc3339(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .apply();
    if let Err(e) = logging {
        eprintln!("firehose-influxdb: could not set up logging: {}", e);
        process::exit(1);
    }

    info!("firehose-influxdb - {}", args.version);
    openssl_probe::init_ssl_cert_env_vars();

    let (snd, rcv) = mpsc::sync_channel(args.queue_depth);

    let mut tcp = match Tcp::new(&args.source) {
        Ok(tcp) => tcp,
        Err(e) => {
            error!(
                "Unable to listen on {}:{}: {}",
                args.source.host, args.source.port, e
            );
            process::exit(1);
        }
    };
    let tcp_snd = snd.clone();
    thread::spawn(move || tcp.run(tcp_snd));

    let flush_interval = args.flush_interval;
    let flush_snd = snd.clone();
    thread::spawn(move || FlushTimer::new(flush_interval).run(flush_snd));

    thread::spawn(move || {
        if let Some(sig) = signal.recv() {
            info!("received {:?}", sig);
            source::send(&snd, Event::Shutdown);
        }
    });

    let http = match Http::new(
        args.influxdb.user.as_str(),
        args.influxdb.password.as_str(),
        Duration::from_secs(args.influxdb.timeout),
    ) {
        Ok(http) => http,
        Err(e) => {
            error!("Unable to set up the HTTP client: {}", e);
            process::exit(1);
        }
    };
    let mut influxdb = match InfluxDB::new(args.influxdb, http) {
        Ok(influxdb) => influxdb,
        Err(e) => {
            error!("Unable to build InfluxDB write URL: {}", e);
            process::exit(1);
        }
    };
    info!("writing to {}", influxdb.series_url());

    influxdb.run(rcv);
}
