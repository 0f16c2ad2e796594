//! Sources feed the single consumer that owns the aggregation window.
//!
//! Every source pushes `Event`s into one bounded channel. A source that finds
//! the channel full records the fact in `SLOW_CONSUMER` before blocking, the
//! consumer turns that into the slow consumer alert on its next flush.

use envelope::Envelope;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{SyncSender, TrySendError};
use std::sync::Arc;

mod flush;
mod tcp;

pub use self::flush::FlushTimer;
pub use self::tcp::{Tcp, TcpConfig};

lazy_static! {
    /// Total sends that found the event queue full
    pub static ref SLOW_CONSUMER: Arc<AtomicUsize> = Arc::new(AtomicUsize::new(0));
}

/// What travels from the sources to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A decoded firehose envelope.
    Envelope(Envelope),
    /// Time to flush the current window.
    TimerFlush,
    /// Flush one last time and stop.
    Shutdown,
}

/// Push an `Event` to the consumer.
///
/// Blocks while the queue is full. Returns false once the consumer has hung
/// up, at which point the source should stop.
pub fn send(chan: &SyncSender<Event>, event: Event) -> bool {
    match chan.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            SLOW_CONSUMER.fetch_add(1, Ordering::Relaxed);
            chan.send(event).is_ok()
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}

/// Read and clear the count of sends that found the queue full.
pub fn take_slow_consumer() -> usize {
    SLOW_CONSUMER.swap(0, Ordering::Relaxed)
}

/// A 'source' produces `Event`s until told otherwise.
pub trait Source {
    fn run(&mut self, chan: SyncSender<Event>) -> ();
}
