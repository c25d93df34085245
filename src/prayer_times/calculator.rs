use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{FixedOffset, NaiveDate, NaiveTime};
use salah::prelude::*;

use super::location::Location;
use super::source::{TimetableError, TimetableSource};
use crate::config::SalahConfig;
use crate::models::PrayerTimetable;
use crate::utils::hijri::hijri_string;

/// Computes timetables locally from coordinates; needs no network.
pub struct OfflineCalculator {
    method_str: String,
    madhab_str: String,
    tz_offset_minutes: i32,
    hijri_offset: i32,
}

impl OfflineCalculator {
    pub fn new(method: &str, madhab: &str, tz_offset_minutes: i32, hijri_offset: i32) -> Result<Self> {
        // Validate method + madhab early
        parse_method(method)?;
        parse_madhab(madhab)?;
        FixedOffset::east_opt(tz_offset_minutes * 60)
            .ok_or_else(|| anyhow!("Invalid timezone offset: {}", tz_offset_minutes))?;
        Ok(Self {
            method_str: method.to_string(),
            madhab_str: madhab.to_string(),
            tz_offset_minutes,
            hijri_offset,
        })
    }

    pub fn from_config(salah: &SalahConfig) -> Result<Self> {
        Self::new(
            &salah.calc_method,
            &salah.madhab,
            salah.timezone_offset,
            salah.hijri_offset,
        )
    }

    pub fn compute(&self, date: NaiveDate, location: &Location) -> Result<PrayerTimetable> {
        let coords = Coordinates::new(location.latitude, location.longitude);
        let method = parse_method(&self.method_str)?;
        let madhab = parse_madhab(&self.madhab_str)?;
        let params = Configuration::with(method, madhab);

        let times = PrayerSchedule::new()
            .on(date)
            .for_location(coords)
            .with_configuration(params)
            .calculate()
            .map_err(|e| anyhow!("Prayer calculation failed: {}", e))?;

        let offset = FixedOffset::east_opt(self.tz_offset_minutes * 60)
            .ok_or_else(|| anyhow!("Invalid timezone offset: {}", self.tz_offset_minutes))?;

        let to_local = |utc: chrono::DateTime<chrono::Utc>| -> NaiveTime {
            utc.with_timezone(&offset).time()
        };

        Ok(PrayerTimetable {
            date,
            hijri: hijri_string(date, self.hijri_offset).unwrap_or_default(),
            fajr: to_local(times.time(Prayer::Fajr)),
            sunrise: to_local(times.time(Prayer::Sunrise)),
            dhuhr: to_local(times.time(Prayer::Dhuhr)),
            asr: to_local(times.time(Prayer::Asr)),
            maghrib: to_local(times.time(Prayer::Maghrib)),
            isha: to_local(times.time(Prayer::Isha)),
        })
    }
}

#[async_trait]
impl TimetableSource for OfflineCalculator {
    async fn timetable(
        &self,
        date: NaiveDate,
        location: &Location,
    ) -> Result<PrayerTimetable, TimetableError> {
        self.compute(date, location)
            .map_err(|e| TimetableError::Calculation(e.to_string()))
    }
}

fn parse_method(s: &str) -> Result<Method> {
    match s {
        "MuslimWorldLeague" => Ok(Method::MuslimWorldLeague),
        "Egyptian" => Ok(Method::Egyptian),
        "Karachi" => Ok(Method::Karachi),
        "UmmAlQura" => Ok(Method::UmmAlQura),
        "Dubai" => Ok(Method::Dubai),
        "MoonsightingCommittee" => Ok(Method::MoonsightingCommittee),
        "NorthAmerica" => Ok(Method::NorthAmerica),
        "Kuwait" => Ok(Method::Kuwait),
        "Qatar" => Ok(Method::Qatar),
        "Singapore" => Ok(Method::Singapore),
        "Tehran" => Ok(Method::Tehran),
        "Turkey" => Ok(Method::Turkey),
        "Other" => Ok(Method::Other),
        _ => Err(anyhow!("Unknown calculation method: '{}'", s)),
    }
}

fn parse_madhab(s: &str) -> Result<Madhab> {
    match s {
        "Hanafi" => Ok(Madhab::Hanafi),
        "Shafi" | "Shafi'i" => Ok(Madhab::Shafi),
        _ => Err(anyhow!("Unknown madhab: '{}'", s)),
    }
}

pub const CALC_METHODS: &[&str] = &[
    "MuslimWorldLeague",
    "Egyptian",
    "Karachi",
    "UmmAlQura",
    "Dubai",
    "MoonsightingCommittee",
    "NorthAmerica",
    "Kuwait",
    "Qatar",
    "Singapore",
    "Tehran",
    "Turkey",
    "Other",
];
