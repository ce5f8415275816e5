// Time Provider Port (for testability)

use chrono::{DateTime, FixedOffset, Local, Offset, TimeZone, Utc};

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64;

    /// Offset of the local calendar used for paths, subjects and "today"
    fn utc_offset(&self) -> FixedOffset {
        *Local::now().offset()
    }

    /// Current time in the local calendar
    fn now_local(&self) -> DateTime<FixedOffset> {
        to_local(self.now_millis(), self.utc_offset())
    }
}

/// Convert epoch ms into a local timestamp with the given offset
pub fn to_local(millis: i64, offset: FixedOffset) -> DateTime<FixedOffset> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_default()
        .with_timezone(&offset)
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};

    /// Manually driven clock with a fixed offset
    pub struct FixedTimeProvider {
        now: AtomicI64,
        offset: FixedOffset,
    }

    impl FixedTimeProvider {
        pub fn new(now_millis: i64, offset: FixedOffset) -> Self {
            Self {
                now: AtomicI64::new(now_millis),
                offset,
            }
        }

        /// Clock pinned to a local wall-clock time (UTC offset)
        pub fn at_utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Self {
            let offset = Utc.fix();
            let at = offset
                .with_ymd_and_hms(y, mo, d, h, mi, s)
                .single()
                .unwrap_or_default();
            Self::new(at.timestamp_millis(), offset)
        }

        pub fn advance_millis(&self, delta: i64) {
            self.now.fetch_add(delta, Ordering::SeqCst);
        }
    }

    impl TimeProvider for FixedTimeProvider {
        fn now_millis(&self) -> i64 {
            self.now.load(Ordering::SeqCst)
        }

        fn utc_offset(&self) -> FixedOffset {
            self.offset
        }
    }
}
