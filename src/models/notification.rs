use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::prayer::PrayerName;

/// Global gate plus one toggle per notifiable prayer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub enabled: bool,
    pub prayers: HashMap<PrayerName, bool>,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            prayers: PrayerName::notifiable()
                .into_iter()
                .map(|p| (p, true))
                .collect(),
        }
    }
}

impl NotificationPreferences {
    /// Whether a notification for `prayer` may be shown. Sunrise never is.
    pub fn allows(&self, prayer: PrayerName) -> bool {
        prayer.is_notifiable() && self.prayers.get(&prayer).copied().unwrap_or(true)
    }

    pub fn set(&mut self, prayer: PrayerName, enabled: bool) {
        self.prayers.insert(prayer, enabled);
    }
}

/// A single prayer alert, identified by `{Prayer}-{YYYY-MM-DD}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerNotification {
    pub id: String,
    pub prayer: PrayerName,
    pub title: String,
    pub body: String,
}

impl PrayerNotification {
    pub fn key(prayer: PrayerName, date: NaiveDate) -> String {
        format!("{}-{}", prayer.display_name(), date.format("%Y-%m-%d"))
    }

    pub fn for_prayer(prayer: PrayerName, date: NaiveDate, location: &str) -> Self {
        Self {
            id: Self::key(prayer, date),
            prayer,
            title: format!("{} time", prayer.display_name()),
            body: format!("It is time for {} in {}", prayer.display_name(), location),
        }
    }
}

/// A pending notification as held by the notifier adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledNotification {
    pub notification: PrayerNotification,
    pub fire_at: NaiveDateTime,
}

/// Side effects decided by the scheduler and carried out by a `Notifier`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationCommand {
    CancelAll,
    PresentNow(PrayerNotification),
    ScheduleAt(ScheduledNotification),
}
