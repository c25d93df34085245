pub mod aladhan;
pub mod calculator;
pub mod location;
pub mod resolver;
pub mod source;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::config::{AppConfig, TimetableSourceKind};
use crate::db::SharedConn;
use crate::models::PrayerTimetable;

pub use aladhan::AladhanClient;
pub use calculator::OfflineCalculator;
pub use location::{ConfiguredLocation, Location, LocationError, LocationProvider};
pub use resolver::{resolve, PrayerTracker, TrackerView};
pub use source::{CachedSource, TimetableError, TimetableSource};

/// The configured timetable source behind the SQLite day cache.
pub fn build_source(config: &AppConfig, conn: SharedConn) -> Result<Arc<dyn TimetableSource>> {
    let inner: Box<dyn TimetableSource> = match config.salah.source {
        TimetableSourceKind::Offline => Box::new(
            OfflineCalculator::from_config(&config.salah).context("Building prayer calculator")?,
        ),
        TimetableSourceKind::Aladhan => Box::new(
            AladhanClient::new(&config.timetable_api, &config.salah)
                .context("Building Aladhan client")?,
        ),
    };
    Ok(Arc::new(CachedSource::new(inner, conn)))
}

/// Locate the device and fetch the timetable for `date`.
pub async fn load_timetable(
    location: &dyn LocationProvider,
    source: &dyn TimetableSource,
    date: NaiveDate,
) -> Result<(Location, PrayerTimetable)> {
    let here = location.locate()?;
    let timetable = source
        .timetable(date, &here)
        .await
        .with_context(|| format!("Fetching prayer times for {}", date))?;
    Ok((here, timetable))
}
