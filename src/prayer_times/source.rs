use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use thiserror::Error;

use super::location::Location;
use crate::db::{self, repository::CacheRepo, SharedConn};
use crate::models::PrayerTimetable;

#[derive(Debug, Error)]
pub enum TimetableError {
    #[error("prayer time request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("prayer time service returned HTTP {0}")]
    Status(u16),
    #[error("unexpected prayer time response: {0}")]
    Malformed(String),
    #[error("prayer calculation failed: {0}")]
    Calculation(String),
    #[error("timetable cache: {0}")]
    Cache(#[from] anyhow::Error),
}

/// Produces a day's timetable for a position. Implementations never retry;
/// the caller decides when to try again.
#[async_trait]
pub trait TimetableSource: Send + Sync {
    async fn timetable(
        &self,
        date: NaiveDate,
        location: &Location,
    ) -> Result<PrayerTimetable, TimetableError>;
}

/// Day cache in front of another source. The cache is keyed by date only and
/// is cleared whenever the location or calculation settings change.
pub struct CachedSource {
    inner: Box<dyn TimetableSource>,
    conn: SharedConn,
}

impl CachedSource {
    pub fn new(inner: Box<dyn TimetableSource>, conn: SharedConn) -> Self {
        Self { inner, conn }
    }
}

#[async_trait]
impl TimetableSource for CachedSource {
    async fn timetable(
        &self,
        date: NaiveDate,
        location: &Location,
    ) -> Result<PrayerTimetable, TimetableError> {
        let cached = {
            let conn = db::lock(&self.conn)?;
            CacheRepo::get_timetable(&conn, date)?
        };
        if let Some(t) = cached {
            debug!("timetable for {} served from cache", date);
            return Ok(t);
        }

        let fresh = self.inner.timetable(date, location).await?;
        let conn = db::lock(&self.conn)?;
        CacheRepo::store_timetable(&conn, &fresh)?;
        Ok(fresh)
    }
}
