//! Wall-clock access and local calendar helpers.
//!
//! Everything persisted or handed to the delivery port is UTC. "Today",
//! active windows and the replan hour are local-time notions, so the helpers
//! here take the caller's time zone explicitly.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use parking_lot::Mutex;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// The local instant for `date` at `hour:minute:second` in `tz`.
///
/// Returns `None` for wall-clock times skipped by a DST transition. Ambiguous
/// times resolve to the earlier instant.
pub fn local_at<Tz: TimeZone>(
    tz: &Tz,
    date: NaiveDate,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<DateTime<Tz>> {
    let naive = date.and_hms_opt(hour, minute, second)?;
    tz.from_local_datetime(&naive).earliest()
}

/// Longest DST gap the `local_at_or_*` helpers step across.
const GAP_SEARCH_MINUTES: i32 = 3 * 60;

/// Like [`local_at`], but a wall-clock time skipped by a DST transition
/// resolves to the first valid minute after the gap.
pub fn local_at_or_after<Tz: TimeZone>(
    tz: &Tz,
    date: NaiveDate,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<DateTime<Tz>> {
    nearest_valid(tz, date.and_hms_opt(hour, minute, second)?, Duration::minutes(1))
}

/// Like [`local_at`], but a wall-clock time skipped by a DST transition
/// resolves to the last valid minute before the gap.
pub fn local_at_or_before<Tz: TimeZone>(
    tz: &Tz,
    date: NaiveDate,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<DateTime<Tz>> {
    nearest_valid(tz, date.and_hms_opt(hour, minute, second)?, Duration::minutes(-1))
}

fn nearest_valid<Tz: TimeZone>(
    tz: &Tz,
    naive: NaiveDateTime,
    step: Duration,
) -> Option<DateTime<Tz>> {
    (0..=GAP_SEARCH_MINUTES)
        .find_map(|i| tz.from_local_datetime(&(naive + step * i)).earliest())
}

/// First instant of the local day after `date`.
pub fn end_of_local_day<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    date.succ_opt()
        .and_then(|next| local_at(tz, next, 0, 0, 0))
        .or_else(|| local_at(tz, date, 23, 59, 59).map(|t| t + Duration::seconds(1)))
}

/// Whether `instant` falls on the same local calendar day as `as_of`.
pub fn same_local_day<Tz: TimeZone>(instant: &DateTime<Utc>, as_of: &DateTime<Tz>) -> bool {
    instant.with_timezone(&as_of.timezone()).date_naive() == as_of.date_naive()
}

/// The Sunday that starts the local week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let back = i64::from(date.weekday().num_days_from_sunday());
    date - Duration::days(back)
}


#[cfg(test)]
mod tests {
    use super::test_zones::SpringForward;
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn gap_times_resolve_to_the_nearest_valid_side() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 30).unwrap();
        assert!(local_at(&SpringForward, date, 2, 0, 0).is_none());

        let after = local_at_or_after(&SpringForward, date, 2, 0, 0).unwrap();
        assert_eq!(after, SpringForward.with_ymd_and_hms(2025, 3, 30, 3, 0, 0).unwrap());
        assert_eq!(after.with_timezone(&Utc), Utc.with_ymd_and_hms(2025, 3, 30, 1, 0, 0).unwrap());

        let before = local_at_or_before(&SpringForward, date, 2, 59, 59).unwrap();
        assert_eq!(before, SpringForward.with_ymd_and_hms(2025, 3, 30, 1, 59, 59).unwrap());

        // outside the gap both agree with local_at
        assert_eq!(
            local_at_or_after(&SpringForward, date, 7, 0, 0),
            local_at(&SpringForward, date, 7, 0, 0)
        );
    }

    #[test]
    fn same_local_day_uses_offset_of_reference() {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let as_of = tz.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();

        // 2025-03-09 17:00 UTC is 2025-03-10 01:00 at +08:00
        let early = Utc.with_ymd_and_hms(2025, 3, 9, 17, 0, 0).unwrap();
        assert!(same_local_day(&early, &as_of));

        // 2025-03-09 15:59 UTC is still the 9th locally
        let before = Utc.with_ymd_and_hms(2025, 3, 9, 15, 59, 0).unwrap();
        assert!(!same_local_day(&before, &as_of));
    }

    #[test]
    fn end_of_day_is_next_midnight() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 12, 31).unwrap();
        let end = end_of_local_day(&tz, date).unwrap();
        assert_eq!(end, tz.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn week_starts_on_sunday() {
        let wednesday = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        assert_eq!(week_start(wednesday), NaiveDate::from_ymd_opt(2025, 3, 9).unwrap());
        let sunday = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(week_start(sunday), sunday);
    }

    #[test]
    fn manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(Duration::minutes(90));
        assert_eq!(clock.now(), start + Duration::minutes(90));
    }
}
