//! Redelivery filter keyed on `webhookEventId`
//!
//! LINE retries webhooks that were not acknowledged in time and marks them
//! with `deliveryContext.isRedelivery`. The event id stays stable across
//! retries, so an id seen within the window is answered only once.

use std::time::Duration;

use mini_moka::sync::Cache;

/// How long an event id is remembered
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(300);

/// Most event ids kept at once
pub const DEFAULT_CAPACITY: u64 = 2000;

/// Recently accepted webhook event ids
#[derive(Clone)]
pub struct EventDedup {
    seen: Cache<String, ()>,
}

impl Default for EventDedup {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_CAPACITY)
    }
}

impl EventDedup {
    #[must_use]
    pub fn new(window: Duration, capacity: u64) -> Self {
        Self {
            seen: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(window)
                .build(),
        }
    }

    /// Record `event_id`, returning `true` if it was already accepted
    /// within the window
    pub fn is_duplicate(&self, event_id: &str) -> bool {
        let key = event_id.to_string();
        if self.seen.get(&key).is_some() {
            return true;
        }
        self.seen.insert(key, ());
        false
    }
}
