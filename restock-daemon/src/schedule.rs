//! When the next daily run is due.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveTime, TimeDelta, TimeZone, Utc};

/// A fixed local wall-clock time, evaluated at a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub at: NaiveTime,
    pub offset: FixedOffset,
}

impl Schedule {
    pub fn new(at: NaiveTime, offset: FixedOffset) -> Self {
        Schedule { at, offset }
    }

    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        next_run_after(now, self.at, self.offset)
    }

    /// Time left until the next run. Never negative.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        (self.next_after(now) - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// First instant strictly after `now` whose local time at `offset` is `at`.
pub fn next_run_after(now: DateTime<Utc>, at: NaiveTime, offset: FixedOffset) -> DateTime<Utc> {
    let local_date = now.with_timezone(&offset).date_naive();
    let shift = TimeDelta::seconds(i64::from(offset.local_minus_utc()));
    let candidate = Utc.from_utc_datetime(&(local_date.and_time(at) - shift));
    if candidate > now {
        candidate
    } else {
        candidate + TimeDelta::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[rstest]
    // 2024-10-19 08:00 JST -> 18:00 JST same day
    #[case(utc(2024, 10, 18, 23, 0), utc(2024, 10, 19, 9, 0))]
    // 2024-10-19 17:59 JST -> 18:00 JST same day
    #[case(utc(2024, 10, 19, 8, 59), utc(2024, 10, 19, 9, 0))]
    // exactly 18:00 JST -> tomorrow
    #[case(utc(2024, 10, 19, 9, 0), utc(2024, 10, 20, 9, 0))]
    // 2024-10-19 23:30 JST (still the 19th locally, already the 19th in UTC)
    #[case(utc(2024, 10, 19, 14, 30), utc(2024, 10, 20, 9, 0))]
    // 2024-12-31 20:00 JST -> crosses the year
    #[case(utc(2024, 12, 31, 11, 0), utc(2025, 1, 1, 9, 0))]
    fn next_run_at_six_pm_jst(#[case] now: DateTime<Utc>, #[case] expected: DateTime<Utc>) {
        let at = NaiveTime::from_hms_opt(18, 0, 0).unwrap();
        assert_eq!(next_run_after(now, at, jst()), expected);
    }

    #[test]
    fn early_morning_run_uses_local_date() {
        // 00:30 JST on the 20th is 15:30 UTC on the 19th.
        let at = NaiveTime::from_hms_opt(0, 30, 0).unwrap();
        let now = utc(2024, 10, 19, 12, 0);
        assert_eq!(next_run_after(now, at, jst()), utc(2024, 10, 19, 15, 30));
    }

    #[test]
    fn delay_is_time_until_next_run() {
        let schedule = Schedule::new(NaiveTime::from_hms_opt(18, 0, 0).unwrap(), jst());
        let now = utc(2024, 10, 19, 8, 0);
        assert_eq!(schedule.delay_from(now), Duration::from_secs(3600));
    }
}
