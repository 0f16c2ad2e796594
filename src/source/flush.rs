use source::{send, Event, Source};
use std::sync::mpsc::SyncSender;
use std::thread::sleep;
use std::time::Duration;

/// The source of all flush pulses. See `FlushTimer::run` for more details.
pub struct FlushTimer {
    interval: Duration,
}

impl FlushTimer {
    /// Create a new FlushTimer. This will not produce a new thread, that must
    /// be managed by the end-user.
    pub fn new(interval_seconds: u64) -> FlushTimer {
        FlushTimer {
            interval: Duration::from_secs(interval_seconds),
        }
    }
}

impl Source for FlushTimer {
    /// Emit `Event::TimerFlush` once per interval until the consumer hangs
    /// up.
    fn run(&mut self, chan: SyncSender<Event>) {
        loop {
            sleep(self.interval);
            if !send(&chan, Event::TimerFlush) {
                trace!("flush timer exiting, consumer gone");
                return;
            }
        }
    }
}
