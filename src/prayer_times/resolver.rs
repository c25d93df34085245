use chrono::{Duration, NaiveDateTime};
use std::fmt::Display;
use std::time::Duration as StdDuration;

use crate::models::{PrayerStatus, PrayerTimetable};
use crate::utils::time::{on_date, remaining};

/// Current and next prayer for `now`.
///
/// Every entry of the timetable, Sunrise included, is pinned to the date of
/// `now`. The first entry strictly after `now` is next and the one before it
/// is current; before Fajr the current prayer wraps to Isha. Once Isha has
/// started the next prayer is Fajr a day later.
pub fn resolve(timetable: &PrayerTimetable, now: NaiveDateTime) -> PrayerStatus {
    let today = now.date();
    let day: Vec<_> = timetable
        .entries()
        .into_iter()
        .map(|(prayer, time)| (prayer, on_date(today, time)))
        .collect();
    let last = day.len() - 1;

    let (current, (next, next_time)) = match day.iter().position(|(_, at)| *at > now) {
        Some(0) => (day[last].0, day[0]),
        Some(idx) => (day[idx - 1].0, day[idx]),
        None => {
            let (first, at) = day[0];
            (day[last].0, (first, at + Duration::days(1)))
        }
    };

    PrayerStatus {
        current,
        next,
        next_time,
        remaining: remaining(now, next_time),
    }
}

/// How long a watcher waits before retrying a failed timetable fetch.
pub const FETCH_RETRY: StdDuration = StdDuration::from_secs(30);

/// What a watcher should show right now.
#[derive(Debug, PartialEq)]
pub enum TrackerView<'a> {
    /// No timetable has ever loaded. Carries the last failure, if any.
    NotLoaded { error: Option<&'a str> },
    Ready(&'a PrayerStatus),
    /// The latest refresh failed; the previous status is still shown.
    Stale {
        status: &'a PrayerStatus,
        error: &'a str,
    },
}

/// Holds the last good timetable and keeps the derived status fresh.
#[derive(Debug, Default)]
pub struct PrayerTracker {
    timetable: Option<PrayerTimetable>,
    status: Option<PrayerStatus>,
    error: Option<String>,
}

impl PrayerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold the outcome of a fetch into the tracker. Failures never clear a
    /// previously loaded timetable.
    pub fn apply<E: Display>(&mut self, fetched: Result<PrayerTimetable, E>, now: NaiveDateTime) {
        match fetched {
            Ok(timetable) => {
                self.timetable = Some(timetable);
                self.error = None;
                self.tick(now);
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    /// Recompute the status for `now`.
    pub fn tick(&mut self, now: NaiveDateTime) -> Option<&PrayerStatus> {
        if let Some(t) = &self.timetable {
            self.status = Some(resolve(t, now));
        }
        self.status.as_ref()
    }

    /// True when nothing is loaded or the loaded day is no longer today.
    pub fn needs_refresh(&self, now: NaiveDateTime) -> bool {
        self.timetable
            .as_ref()
            .is_none_or(|t| t.date != now.date())
    }

    /// Whether to fetch now, given the time since the last attempt. A refresh
    /// is due at most once per `FETCH_RETRY`.
    pub fn should_fetch(&self, now: NaiveDateTime, since_last_attempt: Option<StdDuration>) -> bool {
        self.needs_refresh(now) && since_last_attempt.is_none_or(|d| d >= FETCH_RETRY)
    }

    pub fn view(&self) -> TrackerView<'_> {
        match (&self.status, &self.error) {
            (None, error) => TrackerView::NotLoaded {
                error: error.as_deref(),
            },
            (Some(status), None) => TrackerView::Ready(status),
            (Some(status), Some(error)) => TrackerView::Stale { status, error },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrayerName;
    use chrono::{NaiveDate, NaiveTime, Timelike};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, s).unwrap()
    }

    fn timetable() -> PrayerTimetable {
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();
        PrayerTimetable {
            date: day(),
            hijri: String::new(),
            fajr: t(4, 55),
            sunrise: t(6, 14),
            dhuhr: t(11, 58),
            asr: t(15, 59),
            maghrib: t(17, 41),
            isha: t(18, 57),
        }
    }

    #[test]
    fn between_two_prayers() {
        let status = resolve(&timetable(), at(13, 0, 0));
        assert_eq!(status.current, PrayerName::Dhuhr);
        assert_eq!(status.next, PrayerName::Asr);
        assert_eq!(status.next_time, at(15, 59, 0));
        assert_eq!(status.remaining_hms(), "02:59:00");
    }

    #[test]
    fn exact_prayer_time_belongs_to_that_prayer() {
        let status = resolve(&timetable(), at(15, 59, 0));
        assert_eq!(status.current, PrayerName::Asr);
        assert_eq!(status.next, PrayerName::Maghrib);
    }

    #[test]
    fn before_fajr_current_wraps_to_isha() {
        let status = resolve(&timetable(), at(2, 30, 0));
        assert_eq!(status.current, PrayerName::Isha);
        assert_eq!(status.next, PrayerName::Fajr);
        assert_eq!(status.next_time, at(4, 55, 0));
    }

    #[test]
    fn after_isha_next_is_tomorrows_fajr() {
        let now = at(22, 15, 0);
        let status = resolve(&timetable(), now);
        assert_eq!(status.current, PrayerName::Isha);
        assert_eq!(status.next, PrayerName::Fajr);
        assert_eq!(status.next_time.date(), day().succ_opt().unwrap());
        assert!(status.remaining > Duration::zero());
        assert!(status.remaining < Duration::days(1));
        assert_eq!(status.remaining_hms(), "06:40:00");
    }

    #[test]
    fn one_hour_two_minutes_three_seconds() {
        let status = resolve(&timetable(), at(14, 56, 57));
        assert_eq!(status.remaining_hms(), "01:02:03");
    }

    #[test]
    fn current_and_next_are_always_adjacent() {
        let order = PrayerName::all();
        for minute in 0..(24 * 60) {
            let now = at(minute / 60, minute % 60, 30);
            let status = resolve(&timetable(), now);
            let cur = order.iter().position(|p| *p == status.current).unwrap();
            let next = order.iter().position(|p| *p == status.next).unwrap();
            assert_eq!((cur + 1) % order.len(), next, "at {}", now);
            assert!(status.next_time > now);
            assert!(status.remaining <= Duration::days(1));
        }
    }

    #[test]
    fn tracker_reports_not_loaded_until_first_success() {
        let mut tracker = PrayerTracker::new();
        assert_eq!(tracker.view(), TrackerView::NotLoaded { error: None });
        assert!(tracker.needs_refresh(at(9, 0, 0)));

        tracker.apply::<&str>(Err("location unavailable"), at(9, 0, 0));
        assert_eq!(
            tracker.view(),
            TrackerView::NotLoaded {
                error: Some("location unavailable")
            }
        );
    }

    #[test]
    fn tracker_keeps_stale_status_after_failure() {
        let mut tracker = PrayerTracker::new();
        tracker.apply::<&str>(Ok(timetable()), at(9, 0, 0));
        assert!(matches!(tracker.view(), TrackerView::Ready(s) if s.next == PrayerName::Dhuhr));
        assert!(!tracker.needs_refresh(at(9, 0, 0)));

        tracker.apply::<&str>(Err("network down"), at(9, 0, 1));
        match tracker.view() {
            TrackerView::Stale { status, error } => {
                assert_eq!(status.current, PrayerName::Sunrise);
                assert_eq!(error, "network down");
            }
            other => panic!("expected stale view, got {:?}", other),
        }

        let status = tracker.tick(at(12, 0, 0)).unwrap();
        assert_eq!(status.current, PrayerName::Dhuhr);
        assert_eq!(status.next_time.second(), 0);
    }

    #[test]
    fn tracker_wants_refresh_after_midnight() {
        let mut tracker = PrayerTracker::new();
        tracker.apply::<&str>(Ok(timetable()), at(23, 0, 0));
        let tomorrow = day().succ_opt().unwrap().and_hms_opt(0, 0, 5).unwrap();
        assert!(tracker.needs_refresh(tomorrow));
    }

    #[test]
    fn failed_fetches_are_retried_at_most_every_thirty_seconds() {
        let mut tracker = PrayerTracker::new();
        let now = at(9, 0, 0);
        assert!(tracker.should_fetch(now, None));

        tracker.apply::<&str>(Err("network down"), now);
        assert!(!tracker.should_fetch(now, Some(StdDuration::from_secs(1))));
        assert!(!tracker.should_fetch(now, Some(StdDuration::from_secs(29))));
        assert!(tracker.should_fetch(now, Some(FETCH_RETRY)));
    }

    #[test]
    fn loaded_day_is_refetched_only_after_rollover() {
        let mut tracker = PrayerTracker::new();
        tracker.apply::<&str>(Ok(timetable()), at(23, 59, 0));
        let long_ago = Some(StdDuration::from_secs(3600));
        assert!(!tracker.should_fetch(at(23, 59, 59), long_ago));

        let tomorrow = day().succ_opt().unwrap().and_hms_opt(0, 0, 1).unwrap();
        assert!(tracker.should_fetch(tomorrow, long_ago));
        assert!(!tracker.should_fetch(tomorrow, Some(StdDuration::from_secs(5))));
    }
}
