use thiserror::Error;

use crate::config::SalahConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Human-readable place name shown next to the times.
    pub name: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum LocationError {
    #[error("location unavailable: no coordinates configured (run `hisn setup`)")]
    NotConfigured,
    #[error("invalid coordinates: {0}, {1}")]
    Invalid(f64, f64),
}

/// Supplies the device position used for prayer-time lookups.
pub trait LocationProvider: Send + Sync {
    fn locate(&self) -> Result<Location, LocationError>;
}

/// Reads the coordinates saved by `hisn setup`.
pub struct ConfiguredLocation {
    latitude: Option<f64>,
    longitude: Option<f64>,
    name: String,
}

impl ConfiguredLocation {
    pub fn from_config(salah: &SalahConfig) -> Self {
        Self {
            latitude: salah.latitude,
            longitude: salah.longitude,
            name: salah.location_name.clone(),
        }
    }
}

impl LocationProvider for ConfiguredLocation {
    fn locate(&self) -> Result<Location, LocationError> {
        let (Some(lat), Some(lng)) = (self.latitude, self.longitude) else {
            return Err(LocationError::NotConfigured);
        };
        validate(lat, lng)?;
        Ok(Location {
            latitude: lat,
            longitude: lng,
            name: self.name.clone(),
        })
    }
}

/// A fixed position is its own provider.
impl LocationProvider for Location {
    fn locate(&self) -> Result<Location, LocationError> {
        validate(self.latitude, self.longitude)?;
        Ok(self.clone())
    }
}

pub fn validate(lat: f64, lng: f64) -> Result<(), LocationError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(LocationError::Invalid(lat, lng));
    }
    Ok(())
}
