use anyhow::Result;
use chrono::{Duration, Local, NaiveDateTime};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::notifier::Notifier;
use crate::db::{
    self,
    repository::{CacheRepo, NotificationRepo, PrefsRepo},
    SharedConn,
};
use crate::models::{
    NotificationCommand, NotificationPreferences, PrayerNotification, PrayerTimetable,
    ScheduledNotification,
};
use crate::prayer_times::{load_timetable, LocationProvider, TimetableSource};
use crate::utils::time::on_date;

/// A prayer that began this recently is announced immediately on the next
/// pass, covering a process that was asleep across the boundary.
pub const JUST_STARTED_SECS: i64 = 60;

/// Commands for one pass, after the unconditional cancel.
///
/// At most one `ScheduleAt` is produced: the earliest enabled prayer strictly
/// after `now`. Enabled prayers that began within the last minute get a
/// `PresentNow`.
pub fn plan_notifications(
    timetable: &PrayerTimetable,
    prefs: &NotificationPreferences,
    location_name: &str,
    now: NaiveDateTime,
) -> Vec<NotificationCommand> {
    let today = now.date();
    let mut commands = Vec::new();
    let mut next: Option<ScheduledNotification> = None;

    for (prayer, time) in timetable.entries() {
        if !prefs.allows(prayer) {
            continue;
        }
        let at = on_date(today, time);
        let notification = PrayerNotification::for_prayer(prayer, today, location_name);

        if at <= now && now - at < Duration::seconds(JUST_STARTED_SECS) {
            commands.push(NotificationCommand::PresentNow(notification));
        } else if at > now && next.as_ref().is_none_or(|n| at < n.fire_at) {
            next = Some(ScheduledNotification {
                notification,
                fire_at: at,
            });
        }
    }

    if let Some(s) = next {
        commands.push(NotificationCommand::ScheduleAt(s));
    }
    commands
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The global gate is off; nothing is pending.
    Disabled,
    /// No enabled prayer is left today.
    NothingScheduled,
    Scheduled(ScheduledNotification),
}

impl SyncOutcome {
    pub fn scheduled(&self) -> bool {
        matches!(self, SyncOutcome::Scheduled(_))
    }
}

/// Result reported by a periodic background pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundFetchResult {
    NewData,
    NoData,
    Failed,
}

impl From<&Result<SyncOutcome>> for BackgroundFetchResult {
    fn from(result: &Result<SyncOutcome>) -> Self {
        match result {
            Ok(outcome) if outcome.scheduled() => BackgroundFetchResult::NewData,
            Ok(_) => BackgroundFetchResult::NoData,
            Err(_) => BackgroundFetchResult::Failed,
        }
    }
}

/// Keeps pending prayer notifications in line with the timetable and the
/// user's preferences.
///
/// Every pass is a full resynchronisation: cancel everything, then rebuild
/// from scratch. Passes are serialised; a second caller waits for the first
/// to finish rather than interleaving cancel and schedule.
pub struct NotificationScheduler {
    conn: SharedConn,
    location: Arc<dyn LocationProvider>,
    source: Arc<dyn TimetableSource>,
    notifier: Arc<dyn Notifier>,
    in_flight: Mutex<()>,
}

impl NotificationScheduler {
    pub fn new(
        conn: SharedConn,
        location: Arc<dyn LocationProvider>,
        source: Arc<dyn TimetableSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            conn,
            location,
            source,
            notifier,
            in_flight: Mutex::new(()),
        }
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub async fn sync(&self) -> Result<SyncOutcome> {
        self.sync_at(Local::now().naive_local()).await
    }

    pub async fn sync_at(&self, now: NaiveDateTime) -> Result<SyncOutcome> {
        let _pass = self.in_flight.lock().await;

        self.notifier.apply(&NotificationCommand::CancelAll).await?;

        let prefs = {
            let conn = db::lock(&self.conn)?;
            let stale_days = CacheRepo::prune_before(&conn, now.date())?;
            let stale_deliveries = NotificationRepo::prune_delivered_before(&conn, now.date())?;
            if stale_days + stale_deliveries > 0 {
                debug!("pruned {} cached days, {} deliveries", stale_days, stale_deliveries);
            }
            PrefsRepo::notification_preferences(&conn)?
        };
        if !prefs.enabled {
            debug!("notifications disabled, nothing to schedule");
            return Ok(SyncOutcome::Disabled);
        }

        let (here, timetable) =
            match load_timetable(self.location.as_ref(), self.source.as_ref(), now.date()).await {
                Ok(loaded) => loaded,
                Err(e) => {
                    warn!("notification pass aborted: {:#}", e);
                    return Err(e);
                }
            };

        let mut outcome = SyncOutcome::NothingScheduled;
        for command in plan_notifications(&timetable, &prefs, &here.name, now) {
            self.notifier.apply(&command).await?;
            if let NotificationCommand::ScheduleAt(s) = command {
                outcome = SyncOutcome::Scheduled(s);
            }
        }

        match &outcome {
            SyncOutcome::Scheduled(s) => info!("next notification: {} at {}", s.notification.id, s.fire_at),
            _ => info!("no prayer left to notify today"),
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrayerName;
    use crate::prayer_times::{Location, TimetableError};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};
    use std::sync::Mutex as StdMutex;

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

    fn here() -> Location {
        Location {
            latitude: 33.69,
            longitude: 73.06,
            name: "Islamabad".to_string(),
        }
    }

    struct FixedSource(Option<PrayerTimetable>);

    #[async_trait]
    impl TimetableSource for FixedSource {
        async fn timetable(
            &self,
            _date: NaiveDate,
            _location: &Location,
        ) -> Result<PrayerTimetable, TimetableError> {
            self.0
                .clone()
                .ok_or_else(|| TimetableError::Malformed("offline".to_string()))
        }
    }

    /// Keeps pending notifications in memory, like a device would.
    #[derive(Default)]
    struct RecordingNotifier {
        pending: StdMutex<Vec<ScheduledNotification>>,
        presented: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn cancel_all(&self) -> Result<()> {
            self.pending.lock().unwrap().clear();
            Ok(())
        }

        async fn present(&self, notification: &PrayerNotification) -> Result<()> {
            self.presented.lock().unwrap().push(notification.id.clone());
            Ok(())
        }

        async fn schedule(&self, scheduled: &ScheduledNotification) -> Result<()> {
            let mut pending = self.pending.lock().unwrap();
            pending.retain(|p| p.notification.id != scheduled.notification.id);
            pending.push(scheduled.clone());
            Ok(())
        }
    }

    fn scheduler(
        source: FixedSource,
    ) -> (NotificationScheduler, Arc<RecordingNotifier>, SharedConn) {
        let conn = db::test_conn();
        let notifier = Arc::new(RecordingNotifier::default());
        let scheduler = NotificationScheduler::new(
            Arc::clone(&conn),
            Arc::new(here()),
            Arc::new(source),
            notifier.clone(),
        );
        (scheduler, notifier, conn)
    }

    #[test]
    fn plans_the_earliest_enabled_future_prayer() {
        let commands = plan_notifications(
            &timetable(),
            &NotificationPreferences::default(),
            "Islamabad",
            at(12, 30, 0),
        );
        assert_eq!(commands.len(), 1);
        match &commands[0] {
            NotificationCommand::ScheduleAt(s) => {
                assert_eq!(s.notification.id, "Asr-2026-10-16");
                assert_eq!(s.fire_at, at(15, 59, 0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn skips_disabled_prayers_and_sunrise() {
        let mut prefs = NotificationPreferences::default();
        prefs.set(PrayerName::Dhuhr, false);

        let commands = plan_notifications(&timetable(), &prefs, "Islamabad", at(5, 30, 0));
        assert_eq!(
            commands,
            vec![NotificationCommand::ScheduleAt(ScheduledNotification {
                notification: PrayerNotification::for_prayer(PrayerName::Asr, day(), "Islamabad"),
                fire_at: at(15, 59, 0),
            })]
        );
    }

    #[test]
    fn presents_a_prayer_that_just_began() {
        let commands = plan_notifications(
            &timetable(),
            &NotificationPreferences::default(),
            "Islamabad",
            at(17, 41, 40),
        );
        assert_eq!(commands.len(), 2);
        assert!(matches!(
            &commands[0],
            NotificationCommand::PresentNow(n) if n.id == "Maghrib-2026-10-16"
        ));
        assert!(matches!(
            &commands[1],
            NotificationCommand::ScheduleAt(s) if s.notification.prayer == PrayerName::Isha
        ));

        let late = plan_notifications(
            &timetable(),
            &NotificationPreferences::default(),
            "Islamabad",
            at(17, 42, 0),
        );
        assert!(!late.iter().any(|c| matches!(c, NotificationCommand::PresentNow(_))));
    }

    #[test]
    fn nothing_left_after_isha() {
        let commands = plan_notifications(
            &timetable(),
            &NotificationPreferences::default(),
            "Islamabad",
            at(21, 0, 0),
        );
        assert!(commands.is_empty());
    }

    #[tokio::test]
    async fn repeated_passes_leave_one_pending_notification() {
        let (scheduler, notifier, _conn) = scheduler(FixedSource(Some(timetable())));

        let first = scheduler.sync_at(at(9, 0, 0)).await.unwrap();
        let second = scheduler.sync_at(at(9, 0, 0)).await.unwrap();
        assert!(first.scheduled());
        assert_eq!(first, second);

        let pending = notifier.pending.lock().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].notification.id, "Dhuhr-2026-10-16");
    }

    #[tokio::test]
    async fn global_gate_off_schedules_nothing() {
        let (scheduler, notifier, conn) = scheduler(FixedSource(Some(timetable())));
        scheduler.sync_at(at(9, 0, 0)).await.unwrap();
        assert_eq!(notifier.pending.lock().unwrap().len(), 1);

        PrefsRepo::set_notifications_enabled(&db::lock(&conn).unwrap(), false).unwrap();
        let outcome = scheduler.sync_at(at(9, 0, 0)).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Disabled);
        assert!(!outcome.scheduled());
        assert!(notifier.pending.lock().unwrap().is_empty());
        assert!(notifier.presented.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_leaves_everything_cancelled() {
        let (scheduler, notifier, _conn) = scheduler(FixedSource(None));
        notifier
            .schedule(&ScheduledNotification {
                notification: PrayerNotification::for_prayer(PrayerName::Isha, day(), "x"),
                fire_at: at(18, 57, 0),
            })
            .await
            .unwrap();

        let result = scheduler.sync_at(at(9, 0, 0)).await;
        assert!(result.is_err());
        assert_eq!(BackgroundFetchResult::from(&result), BackgroundFetchResult::Failed);
        assert!(notifier.pending.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn background_result_reflects_outcome() {
        let (scheduler, _notifier, _conn) = scheduler(FixedSource(Some(timetable())));
        let morning = scheduler.sync_at(at(9, 0, 0)).await;
        assert_eq!(BackgroundFetchResult::from(&morning), BackgroundFetchResult::NewData);

        let night = scheduler.sync_at(at(23, 0, 0)).await;
        assert_eq!(BackgroundFetchResult::from(&night), BackgroundFetchResult::NoData);
    }

    #[tokio::test]
    async fn each_pass_prunes_earlier_days() {
        let (scheduler, _notifier, conn) = scheduler(FixedSource(Some(timetable())));
        let yesterday = day().pred_opt().unwrap();
        {
            let conn = db::lock(&conn).unwrap();
            CacheRepo::store_timetable(&conn, &PrayerTimetable { date: yesterday, ..timetable() })
                .unwrap();
            NotificationRepo::mark_delivered(&conn, "Isha-2026-10-15").unwrap();
            NotificationRepo::mark_delivered(&conn, "Fajr-2026-10-16").unwrap();
            PrefsRepo::set_notifications_enabled(&conn, false).unwrap();
        }

        scheduler.sync_at(at(9, 0, 0)).await.unwrap();

        let conn = db::lock(&conn).unwrap();
        assert!(CacheRepo::get_timetable(&conn, yesterday).unwrap().is_none());
        assert!(NotificationRepo::mark_delivered(&conn, "Isha-2026-10-15").unwrap());
        assert!(!NotificationRepo::mark_delivered(&conn, "Fajr-2026-10-16").unwrap());
    }
}
