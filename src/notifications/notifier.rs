use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use log::{debug, info};

use crate::config::NotificationsConfig;
use crate::db::{self, repository::NotificationRepo, SharedConn};
use crate::models::{NotificationCommand, PrayerNotification, ScheduledNotification};

/// Platform side of prayer notifications. The scheduler only decides; a
/// notifier carries the decision out.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn cancel_all(&self) -> Result<()>;

    async fn present(&self, notification: &PrayerNotification) -> Result<()>;

    /// Arm a notification. Scheduling an id that is already pending replaces it.
    async fn schedule(&self, scheduled: &ScheduledNotification) -> Result<()>;

    /// Present everything whose time has come. Platforms that fire scheduled
    /// notifications on their own leave this as a no-op.
    async fn deliver_due(&self, _now: NaiveDateTime) -> Result<usize> {
        Ok(0)
    }

    async fn apply(&self, command: &NotificationCommand) -> Result<()> {
        match command {
            NotificationCommand::CancelAll => self.cancel_all().await,
            NotificationCommand::PresentNow(n) => self.present(n).await,
            NotificationCommand::ScheduleAt(s) => self.schedule(s).await,
        }
    }
}

/// Terminal notifier: pending notifications live in SQLite and are printed
/// to the console when due.
pub struct ConsoleNotifier {
    conn: SharedConn,
    channel: String,
    sound: String,
    priority: String,
}

impl ConsoleNotifier {
    pub fn new(conn: SharedConn, config: &NotificationsConfig) -> Self {
        Self {
            conn,
            channel: config.channel.clone(),
            sound: config.sound.clone(),
            priority: config.priority.clone(),
        }
    }

    pub fn pending(&self) -> Result<Vec<ScheduledNotification>> {
        let conn = db::lock(&self.conn)?;
        NotificationRepo::pending(&conn)
    }
}

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn cancel_all(&self) -> Result<()> {
        let conn = db::lock(&self.conn)?;
        let removed = NotificationRepo::clear_scheduled(&conn)?;
        debug!("cancelled {} pending notification(s)", removed);
        Ok(())
    }

    async fn present(&self, notification: &PrayerNotification) -> Result<()> {
        let first_time = {
            let conn = db::lock(&self.conn)?;
            NotificationRepo::mark_delivered(&conn, &notification.id)?
        };
        if !first_time {
            debug!("{} already delivered, skipping", notification.id);
            return Ok(());
        }
        info!(
            "[{}] {} (sound={}, priority={})",
            self.channel, notification.id, self.sound, self.priority
        );
        println!("\x07\x1b[38;2;196;160;68m  🕌 {}\x1b[0m · {}", notification.title, notification.body);
        Ok(())
    }

    async fn schedule(&self, scheduled: &ScheduledNotification) -> Result<()> {
        let conn = db::lock(&self.conn)?;
        NotificationRepo::upsert(&conn, scheduled)?;
        info!(
            "scheduled {} for {}",
            scheduled.notification.id, scheduled.fire_at
        );
        Ok(())
    }

    async fn deliver_due(&self, now: NaiveDateTime) -> Result<usize> {
        let due = {
            let conn = db::lock(&self.conn)?;
            NotificationRepo::due(&conn, now)?
        };
        for s in &due {
            self.present(&s.notification).await?;
            let conn = db::lock(&self.conn)?;
            NotificationRepo::remove(&conn, &s.notification.id)?;
        }
        Ok(due.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrayerName;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    fn notifier() -> ConsoleNotifier {
        ConsoleNotifier::new(db::test_conn(), &NotificationsConfig::default())
    }

    fn maghrib_at(h: u32, m: u32) -> ScheduledNotification {
        ScheduledNotification {
            notification: PrayerNotification::for_prayer(PrayerName::Maghrib, day(), "Lahore"),
            fire_at: day().and_hms_opt(h, m, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn scheduling_the_same_key_twice_keeps_one() {
        let n = notifier();
        n.apply(&NotificationCommand::ScheduleAt(maghrib_at(17, 41)))
            .await
            .unwrap();
        n.apply(&NotificationCommand::ScheduleAt(maghrib_at(17, 41)))
            .await
            .unwrap();
        assert_eq!(n.pending().unwrap().len(), 1);

        n.apply(&NotificationCommand::CancelAll).await.unwrap();
        assert!(n.pending().unwrap().is_empty());
    }

    #[tokio::test]
    async fn delivers_due_notifications_once() {
        let n = notifier();
        n.schedule(&maghrib_at(17, 41)).await.unwrap();

        assert_eq!(n.deliver_due(day().and_hms_opt(17, 40, 0).unwrap()).await.unwrap(), 0);
        assert_eq!(n.deliver_due(day().and_hms_opt(17, 41, 5).unwrap()).await.unwrap(), 1);
        assert!(n.pending().unwrap().is_empty());

        // An immediate notification for the same prayer/day is suppressed.
        let conn = db::lock(&n.conn).unwrap();
        assert!(!NotificationRepo::mark_delivered(&conn, "Maghrib-2026-10-16").unwrap());
    }
}
