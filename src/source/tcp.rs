use envelope::Envelope;
use source::{send, Event, Source};
use std::io;
use std::io::prelude::*;
use std::io::BufReader;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::SyncSender;
use std::thread;
use std::time::Duration;

/// Longest pause, in milliseconds, between failed accepts.
const MAX_ACCEPT_BACKOFF_MS: u64 = 2_048;

/// Configuration for the `Tcp` envelope source.
#[derive(Debug, Clone, PartialEq)]
pub struct TcpConfig {
    /// The host that the source will listen on. May be an IP address or a DNS
    /// hostname.
    pub host: String,
    /// The port that the source will listen on.
    pub port: u16,
}

impl Default for TcpConfig {
    fn default() -> TcpConfig {
        TcpConfig {
            host: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}

/// Newline delimited JSON envelopes over TCP.
///
/// Each accepted connection is served by its own thread. Every line is one
/// JSON encoded `Envelope`; lines that do not decode are logged and skipped.
pub struct Tcp {
    listener: TcpListener,
}

impl Tcp {
    /// Bind the listener. Accepting starts with `run`.
    pub fn new(config: &TcpConfig) -> io::Result<Tcp> {
        let listener = TcpListener::bind((config.host.as_str(), config.port))?;
        info!("envelope source listening on {}", listener.local_addr()?);
        Ok(Tcp { listener: listener })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Source for Tcp {
    fn run(&mut self, chan: SyncSender<Event>) {
        // Back off while accept keeps failing, on EMFILE for instance.
        let mut backoff_cap: u64 = 1;
        for stream in self.listener.incoming() {
            match stream {
                Ok(stream) => {
                    backoff_cap = 1;
                    let chan = chan.clone();
                    thread::spawn(move || handle_client(chan, stream));
                }
                Err(e) => {
                    warn!(
                        "Unable to accept connection, retrying in {}ms: {}",
                        backoff_cap, e
                    );
                    thread::sleep(Duration::from_millis(backoff_cap));
                    backoff_cap = next_backoff(backoff_cap);
                }
            }
        }
    }
}

fn next_backoff(backoff_cap: u64) -> u64 {
    let lim = backoff_cap.saturating_mul(2);
    if lim > MAX_ACCEPT_BACKOFF_MS {
        MAX_ACCEPT_BACKOFF_MS
    } else {
        lim
    }
}

fn handle_client(chan: SyncSender<Event>, stream: TcpStream) {
    let peer = stream.peer_addr().ok();
    let line_reader = BufReader::new(stream);
    for line in line_reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                debug!("closing connection from {:?}: {}", peer, e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match Envelope::from_json(&line) {
            Ok(envelope) => {
                if !send(&chan, Event::Envelope(envelope)) {
                    return;
                }
            }
            Err(e) => warn!("BAD PACKET from {:?}: {} -- {:?}", peer, e, line),
        }
    }
}
