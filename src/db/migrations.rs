use anyhow::Result;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch("
        CREATE TABLE IF NOT EXISTS prayer_times_cache (
            date     TEXT PRIMARY KEY,
            hijri    TEXT NOT NULL DEFAULT '',
            fajr     TEXT NOT NULL,
            sunrise  TEXT NOT NULL,
            dhuhr    TEXT NOT NULL,
            asr      TEXT NOT NULL,
            maghrib  TEXT NOT NULL,
            isha     TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS scheduled_notifications (
            id       TEXT PRIMARY KEY,
            prayer   TEXT NOT NULL
                     CHECK(prayer IN ('fajr','sunrise','dhuhr','asr','maghrib','isha')),
            title    TEXT NOT NULL,
            body     TEXT NOT NULL,
            fire_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS delivered_notifications (
            id            TEXT PRIMARY KEY,
            delivered_at  TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS api_cache (
            key         TEXT PRIMARY KEY,
            body        TEXT NOT NULL,
            fetched_at  TEXT DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS app_meta (
            key   TEXT PRIMARY KEY,
            value TEXT
        );
    ")?;
    Ok(())
}
