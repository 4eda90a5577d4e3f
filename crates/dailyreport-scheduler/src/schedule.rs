//! Daily target-window arithmetic.

use chrono::{DateTime, Days, Duration, Local, LocalResult, NaiveTime};
use rand::Rng;

use crate::InvalidWindow;

/// The daily submission window: a target local time plus a jitter bound.
///
/// The jitter varies the submission timestamp from day to day so the portal
/// never sees the exact same time twice in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    target: NaiveTime,
    jitter: Duration,
}

impl Schedule {
    /// Create a schedule targeting `hour:minute` local time every day, with a
    /// uniformly random offset of up to `jitter_minutes` added on top.
    pub fn new(hour: u32, minute: u32, jitter_minutes: u32) -> Result<Self, InvalidWindow> {
        let target =
            NaiveTime::from_hms_opt(hour, minute, 0).ok_or(InvalidWindow { hour, minute })?;
        Ok(Self {
            target,
            jitter: Duration::minutes(i64::from(jitter_minutes)),
        })
    }

    /// Compute the attempt window on the calendar day after `now`.
    ///
    /// The result lies within `[target, target + jitter]`, jitter drawn at
    /// seconds granularity.
    pub fn next_after(&self, now: DateTime<Local>, rng: &mut impl Rng) -> DateTime<Local> {
        let day = now.date_naive() + Days::new(1);
        let mut naive = day.and_time(self.target);
        let base = loop {
            match naive.and_local_timezone(Local) {
                LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => break t,
                // The target fell into a DST gap; slide forward until the
                // local time exists.
                LocalResult::None => naive = naive + Duration::hours(1),
            }
        };
        base + self.jitter_offset(rng)
    }

    fn jitter_offset(&self, rng: &mut impl Rng) -> Duration {
        let bound = self.jitter.num_seconds();
        if bound == 0 {
            return Duration::zero();
        }
        Duration::seconds(rng.gen_range(0..=bound))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn zero_jitter_lands_exactly_on_tomorrow_target() {
        let schedule = Schedule::new(7, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let next = schedule.next_after(local(2022, 4, 1, 6, 0), &mut rng);
        assert_eq!(next, local(2022, 4, 2, 7, 0));
    }

    #[test]
    fn attempt_late_in_the_day_still_schedules_tomorrow() {
        let schedule = Schedule::new(7, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        // 23:59 attempt: the next window is tomorrow morning, not the day after.
        let next = schedule.next_after(local(2022, 4, 1, 23, 59), &mut rng);
        assert_eq!(next, local(2022, 4, 2, 7, 0));
    }

    #[test]
    fn out_of_range_window_is_rejected() {
        assert!(Schedule::new(24, 0, 180).is_err());
        assert!(Schedule::new(7, 60, 180).is_err());
        assert!(Schedule::new(23, 59, 0).is_ok());
    }

    #[test]
    fn seeded_rng_makes_jitter_reproducible() {
        let schedule = Schedule::new(7, 0, 180).unwrap();
        let now = local(2022, 4, 1, 8, 30);

        let a = schedule.next_after(now, &mut StdRng::seed_from_u64(17));
        let b = schedule.next_after(now, &mut StdRng::seed_from_u64(17));
        assert_eq!(a, b);
    }

    proptest! {
        // The jittered window always lies within [target, target + jitter]
        // on the calendar day after the attempt.
        #[test]
        fn next_window_is_within_jitter_bound(
            hour in 0u32..24,
            minute in 0u32..60,
            jitter_minutes in 0u32..=180,
            day_offset in 0u64..400,
            seed in any::<u64>(),
        ) {
            let schedule = Schedule::new(hour, minute, jitter_minutes).unwrap();
            let exact = Schedule::new(hour, minute, 0).unwrap();
            let now = local(2022, 1, 15, 12, 0) + Duration::days(day_offset as i64);

            let base = exact.next_after(now, &mut StdRng::seed_from_u64(seed));
            let next = schedule.next_after(now, &mut StdRng::seed_from_u64(seed));

            prop_assert_eq!(base.date_naive(), now.date_naive() + Days::new(1));
            prop_assert!(next >= base);
            prop_assert!(next <= base + Duration::minutes(i64::from(jitter_minutes)));
        }

        // The pre-jitter base always hits the configured wall-clock target.
        #[test]
        fn base_window_matches_configured_time(
            hour in 0u32..24,
            minute in 0u32..60,
            day_offset in 0u64..400,
        ) {
            let exact = Schedule::new(hour, minute, 0).unwrap();
            let now = local(2022, 1, 15, 12, 0) + Duration::days(day_offset as i64);

            let base = exact.next_after(now, &mut StdRng::seed_from_u64(0));
            prop_assert_eq!((base.hour(), base.minute(), base.second()), (hour, minute, 0));
        }
    }
}
