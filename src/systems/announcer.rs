use std::time::{Duration, SystemTime};

/// Timer for periodic full-state re-announcement. Lives outside the
/// tracker: it only decides *when* to re-send the last committed snapshot.
pub struct PeriodicAnnouncer {
    interval: Option<Duration>,
    last_sent: SystemTime,
}

impl PeriodicAnnouncer {
    /// An interval of zero disables announcements
    pub fn new(interval_ms: u64) -> Self {
        PeriodicAnnouncer {
            interval: if interval_ms == 0 {
                None
            } else {
                Some(Duration::from_millis(interval_ms))
            },
            last_sent: SystemTime::now(),
        }
    }

    pub fn get_elapsed(&self) -> Duration {
        self.last_sent.elapsed().unwrap_or_default()
    }

    pub fn is_due(&self) -> bool {
        match self.interval {
            Some(interval) => self.get_elapsed() >= interval,
            None => false,
        }
    }

    pub fn reset_timer(&mut self) {
        self.last_sent = SystemTime::now();
    }
}
