//! Reception health, shared with status indicators

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, Default)]
pub struct ReceptionStatus {
    last_received: RwLock<Option<DateTime<Utc>>>,
    messages: AtomicU64,
}

impl ReceptionStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_received(&self, now: DateTime<Utc>) {
        self.messages.fetch_add(1, Ordering::Relaxed);
        let mut last = self
            .last_received
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // Concurrent producers may hand in slightly older timestamps
        if last.map_or(true, |t| t < now) {
            *last = Some(now);
        }
    }

    /// Time of the last successfully handled message
    pub fn last_received(&self) -> Option<DateTime<Utc>> {
        *self
            .last_received
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn message_count(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    /// Something was received within `window` of `now`
    pub fn is_receiving(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        self.last_received().is_some_and(|t| now - t <= window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_latest_reception() {
        let status = ReceptionStatus::new();
        let now = Utc::now();
        assert!(!status.is_receiving(now, TimeDelta::seconds(60)));

        status.mark_received(now);
        status.mark_received(now - TimeDelta::seconds(5));
        assert_eq!(status.last_received(), Some(now));
        assert_eq!(status.message_count(), 2);
        assert!(status.is_receiving(now + TimeDelta::seconds(60), TimeDelta::seconds(60)));
        assert!(!status.is_receiving(now + TimeDelta::seconds(61), TimeDelta::seconds(60)));
    }
}
