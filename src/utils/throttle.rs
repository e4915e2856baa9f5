//! Log throttling utility
//!
//! A stream polling a broken device fails every few milliseconds. The
//! throttler lets the first failure through, then at most one line per
//! interval carrying the number of repeats swallowed in between.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct Entry {
    last_logged: Instant,
    suppressed: u64,
}

/// Limits how often the same message key is logged
pub struct LogThrottler {
    entries: Mutex<HashMap<&'static str, Entry>>,
    interval: Duration,
}

impl LogThrottler {
    pub fn new(interval: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            interval,
        }
    }

    pub fn with_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    /// Returns `Some(repeats suppressed since the last log)` when the message
    /// should be logged now, `None` when it is throttled
    pub fn check(&self, key: &'static str) -> Option<u64> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        match entries.get_mut(key) {
            Some(entry) if now.duration_since(entry.last_logged) < self.interval => {
                entry.suppressed = entry.suppressed.saturating_add(1);
                None
            }
            Some(entry) => {
                let suppressed = entry.suppressed;
                entry.last_logged = now;
                entry.suppressed = 0;
                Some(suppressed)
            }
            None => {
                entries.insert(
                    key,
                    Entry {
                        last_logged: now,
                        suppressed: 0,
                    },
                );
                Some(0)
            }
        }
    }

    /// Forget a key once its condition has recovered, so the next failure
    /// is logged immediately
    pub fn clear(&self, key: &'static str) {
        self.entries.lock().remove(key);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for LogThrottler {
    fn default() -> Self {
        Self::with_secs(5)
    }
}

/// Throttled `tracing::warn!`, appending the suppressed repeat count
#[macro_export]
macro_rules! warn_throttled {
    ($throttler:expr, $key:expr, $($arg:tt)*) => {
        if let Some(suppressed) = $throttler.check($key) {
            if suppressed > 0 {
                tracing::warn!("{} (suppressed {} repeats)", format!($($arg)*), suppressed);
            } else {
                tracing::warn!($($arg)*);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_first_call_logs() {
        let throttler = LogThrottler::with_secs(1);
        assert_eq!(throttler.check("read_miss"), Some(0));
    }

    #[test]
    fn test_counts_suppressed_repeats() {
        let throttler = LogThrottler::new(Duration::from_millis(100));

        assert_eq!(throttler.check("read_miss"), Some(0));
        assert_eq!(throttler.check("read_miss"), None);
        assert_eq!(throttler.check("read_miss"), None);

        thread::sleep(Duration::from_millis(150));
        assert_eq!(throttler.check("read_miss"), Some(2));
        assert_eq!(throttler.check("read_miss"), None);
    }

    #[test]
    fn test_keys_are_independent() {
        let throttler = LogThrottler::with_secs(10);

        assert!(throttler.check("a").is_some());
        assert!(throttler.check("b").is_some());
        assert!(throttler.check("a").is_none());
        assert_eq!(throttler.len(), 2);
    }

    #[test]
    fn test_clear() {
        let throttler = LogThrottler::default();

        assert!(throttler.check("read_miss").is_some());
        assert!(throttler.check("read_miss").is_none());
        throttler.clear("read_miss");
        assert!(throttler.is_empty());
        assert_eq!(throttler.check("read_miss"), Some(0));
    }
}
