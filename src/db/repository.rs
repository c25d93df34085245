use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension};
use std::str::FromStr;

use crate::models::{
    NotificationPreferences, PrayerName, PrayerNotification, PrayerTimetable,
    ScheduledNotification,
};

const DATE_FMT: &str = "%Y-%m-%d";
const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

fn parse_time(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| anyhow!("Bad time '{}': {}", s, e))
}

// ─── Cached prayer times ────────────────────────────────────────────────────

pub struct CacheRepo;

impl CacheRepo {
    pub fn get_timetable(conn: &Connection, date: NaiveDate) -> Result<Option<PrayerTimetable>> {
        let row = conn
            .query_row(
                "SELECT hijri, fajr, sunrise, dhuhr, asr, maghrib, isha
                 FROM prayer_times_cache WHERE date = ?1",
                params![date.format(DATE_FMT).to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((hijri, fajr, sunrise, dhuhr, asr, maghrib, isha)) => Ok(Some(PrayerTimetable {
                date,
                hijri,
                fajr: parse_time(&fajr)?,
                sunrise: parse_time(&sunrise)?,
                dhuhr: parse_time(&dhuhr)?,
                asr: parse_time(&asr)?,
                maghrib: parse_time(&maghrib)?,
                isha: parse_time(&isha)?,
            })),
        }
    }

    pub fn clear_all(conn: &Connection) -> Result<()> {
        conn.execute("DELETE FROM prayer_times_cache", [])?;
        Ok(())
    }

    /// Drop cached days before `date`.
    pub fn prune_before(conn: &Connection, date: NaiveDate) -> Result<usize> {
        let removed = conn.execute(
            "DELETE FROM prayer_times_cache WHERE date < ?1",
            params![date.format(DATE_FMT).to_string()],
        )?;
        Ok(removed)
    }

    pub fn store_timetable(conn: &Connection, t: &PrayerTimetable) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO prayer_times_cache
                (date, hijri, fajr, sunrise, dhuhr, asr, maghrib, isha)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                t.date.format(DATE_FMT).to_string(),
                t.hijri,
                t.fajr.format("%H:%M").to_string(),
                t.sunrise.format("%H:%M").to_string(),
                t.dhuhr.format("%H:%M").to_string(),
                t.asr.format("%H:%M").to_string(),
                t.maghrib.format("%H:%M").to_string(),
                t.isha.format("%H:%M").to_string(),
            ],
        )?;
        Ok(())
    }
}

// ─── Scheduled / delivered notifications ────────────────────────────────────

pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert or overwrite by id, so a repeated pass never yields two rows
    /// for the same prayer and day.
    pub fn upsert(conn: &Connection, scheduled: &ScheduledNotification) -> Result<()> {
        let n = &scheduled.notification;
        conn.execute(
            "INSERT OR REPLACE INTO scheduled_notifications (id, prayer, title, body, fire_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                n.id,
                n.prayer.as_str(),
                n.title,
                n.body,
                scheduled.fire_at.format(DATETIME_FMT).to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn clear_scheduled(conn: &Connection) -> Result<usize> {
        Ok(conn.execute("DELETE FROM scheduled_notifications", [])?)
    }

    pub fn pending(conn: &Connection) -> Result<Vec<ScheduledNotification>> {
        Self::query(
            conn,
            "SELECT id, prayer, title, body, fire_at FROM scheduled_notifications
             ORDER BY fire_at",
            None,
        )
    }

    pub fn due(conn: &Connection, now: NaiveDateTime) -> Result<Vec<ScheduledNotification>> {
        Self::query(
            conn,
            "SELECT id, prayer, title, body, fire_at FROM scheduled_notifications
             WHERE fire_at <= ?1 ORDER BY fire_at",
            Some(now.format(DATETIME_FMT).to_string()),
        )
    }

    pub fn remove(conn: &Connection, id: &str) -> Result<()> {
        conn.execute("DELETE FROM scheduled_notifications WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Record a delivery. Returns false when `id` had already been delivered.
    pub fn mark_delivered(conn: &Connection, id: &str) -> Result<bool> {
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO delivered_notifications (id) VALUES (?1)",
            params![id],
        )?;
        Ok(inserted == 1)
    }

    /// Forget deliveries of days before `date`. Ids end with their `YYYY-MM-DD` day.
    pub fn prune_delivered_before(conn: &Connection, date: NaiveDate) -> Result<usize> {
        let removed = conn.execute(
            "DELETE FROM delivered_notifications WHERE substr(id, -10) < ?1",
            params![date.format(DATE_FMT).to_string()],
        )?;
        Ok(removed)
    }

    fn query(
        conn: &Connection,
        sql: &str,
        bound: Option<String>,
    ) -> Result<Vec<ScheduledNotification>> {
        let mut stmt = conn.prepare(sql)?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(String, String, String, String, String)> {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        };
        let rows = match &bound {
            Some(value) => stmt.query_map(params![value], map_row)?.collect::<Vec<_>>(),
            None => stmt.query_map([], map_row)?.collect::<Vec<_>>(),
        };

        let mut result = Vec::new();
        for r in rows {
            let (id, prayer, title, body, fire_at) = r?;
            result.push(ScheduledNotification {
                notification: PrayerNotification {
                    id,
                    prayer: PrayerName::from_str(&prayer)?,
                    title,
                    body,
                },
                fire_at: NaiveDateTime::parse_from_str(&fire_at, DATETIME_FMT)
                    .map_err(|e| anyhow!("Bad fire_at '{}': {}", fire_at, e))?,
            });
        }
        Ok(result)
    }
}

// ─── API response cache ─────────────────────────────────────────────────────

pub struct ApiCacheRepo;

impl ApiCacheRepo {
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT body FROM api_cache WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(anyhow::Error::from)
    }

    pub fn put(conn: &Connection, key: &str, body: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO api_cache (key, body, fetched_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET body = ?2, fetched_at = datetime('now')",
            params![key, body],
        )?;
        Ok(())
    }
}

// ─── Key-value meta ─────────────────────────────────────────────────────────

pub struct MetaRepo;

impl MetaRepo {
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        conn.query_row(
            "SELECT value FROM app_meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(anyhow::Error::from)
    }

    pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO app_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn delete(conn: &Connection, key: &str) -> Result<()> {
        conn.execute("DELETE FROM app_meta WHERE key = ?1", params![key])?;
        Ok(())
    }
}

// ─── Preferences on top of app_meta ─────────────────────────────────────────

pub const KEY_SETUP_DONE: &str = "setup_done";
pub const KEY_FIRST_LAUNCH_DONE: &str = "first_launch_done";
pub const KEY_AUTH_TOKEN: &str = "auth_token";
pub const KEY_AUTH_USER: &str = "auth_user";
pub const KEY_LANGUAGE: &str = "language";
pub const KEY_THEME: &str = "theme";
const KEY_NOTIFY_ENABLED: &str = "notify.enabled";

fn notify_key(prayer: PrayerName) -> String {
    format!("notify.{}", prayer.as_str())
}

fn flag(value: Option<String>, default: bool) -> bool {
    match value.as_deref() {
        Some("1") => true,
        Some("0") => false,
        _ => default,
    }
}

pub struct PrefsRepo;

impl PrefsRepo {
    pub fn notification_preferences(conn: &Connection) -> Result<NotificationPreferences> {
        let mut prefs = NotificationPreferences {
            enabled: flag(MetaRepo::get(conn, KEY_NOTIFY_ENABLED)?, true),
            ..Default::default()
        };
        for prayer in PrayerName::notifiable() {
            prefs.set(prayer, flag(MetaRepo::get(conn, &notify_key(prayer))?, true));
        }
        Ok(prefs)
    }

    pub fn set_notifications_enabled(conn: &Connection, enabled: bool) -> Result<()> {
        MetaRepo::set(conn, KEY_NOTIFY_ENABLED, if enabled { "1" } else { "0" })
    }

    pub fn set_prayer_enabled(conn: &Connection, prayer: PrayerName, enabled: bool) -> Result<()> {
        if !prayer.is_notifiable() {
            return Err(anyhow!("{} does not have a notification", prayer));
        }
        MetaRepo::set(conn, &notify_key(prayer), if enabled { "1" } else { "0" })
    }

    /// True exactly once: the first call marks the launch as seen.
    pub fn take_first_launch(conn: &Connection) -> Result<bool> {
        if flag(MetaRepo::get(conn, KEY_FIRST_LAUNCH_DONE)?, false) {
            return Ok(false);
        }
        MetaRepo::set(conn, KEY_FIRST_LAUNCH_DONE, "1")?;
        Ok(true)
    }
}
