use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::task::TaskId;

/// Hands out task ids derived from the clock in milliseconds.
///
/// When the clock does not advance between two calls (same tick, or a clock
/// that stepped backwards) the next id is `last + 1`, so ids are strictly
/// increasing for the lifetime of the allocator. Once `u64::MAX` has been
/// handed out the allocator is exhausted and returns `None`.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    last: Option<u64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn after(last: u64) -> Self {
        Self { last: Some(last) }
    }

    pub fn next_at(&mut self, now: DateTime<Utc>) -> Option<TaskId> {
        let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let id = match self.last {
            Some(last) if millis <= last => {
                let Some(bumped) = last.checked_add(1) else {
                    warn!(last, "task ids exhausted");
                    return None;
                };
                debug!(clock = millis, last, "clock did not advance; bumping id");
                bumped
            }
            _ => millis,
        };
        self.last = Some(id);
        Some(TaskId(id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::IdAllocator;
    use crate::task::TaskId;

    #[test]
    fn follows_the_clock_when_it_advances() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 16, 5, 0, 0)
            .single()
            .expect("valid time");
        let mut ids = IdAllocator::new();

        let first = ids.next_at(now).expect("first id");
        let second = ids
            .next_at(now + Duration::milliseconds(250))
            .expect("second id");

        assert_eq!(first, TaskId(now.timestamp_millis() as u64));
        assert_eq!(second.0, first.0 + 250);
    }

    #[test]
    fn same_tick_and_backwards_clock_still_increase() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 16, 5, 0, 0)
            .single()
            .expect("valid time");
        let mut ids = IdAllocator::new();

        let a = ids.next_at(now).expect("a");
        let b = ids.next_at(now).expect("b");
        let c = ids.next_at(now - Duration::seconds(10)).expect("c");

        assert!(a < b);
        assert!(b < c);
        assert_eq!(c.0, b.0 + 1);
    }

    #[test]
    fn pre_epoch_clock_is_clamped() {
        let before_epoch = Utc
            .with_ymd_and_hms(1960, 1, 1, 0, 0, 0)
            .single()
            .expect("valid time");
        let mut ids = IdAllocator::new();

        assert_eq!(ids.next_at(before_epoch), Some(TaskId(0)));
        assert_eq!(ids.next_at(before_epoch), Some(TaskId(1)));
    }

    #[test]
    fn exhausted_allocator_never_repeats_an_id() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 16, 5, 0, 0)
            .single()
            .expect("valid time");
        let mut ids = IdAllocator::after(u64::MAX - 1);

        assert_eq!(ids.next_at(now), Some(TaskId(u64::MAX)));
        assert_eq!(ids.next_at(now), None);
        assert_eq!(ids.next_at(now), None);
    }
}
