//! Environmental capture through an external weather provider.
//!
//! Geocoding and current-conditions lookups are network services outside
//! this crate. They are consumed through [`WeatherProvider`]; whatever goes
//! wrong inside a provider reaches callers as
//! [`FieldpackError::WeatherUnavailable`] and leaves the job untouched.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::FieldpackError;
use crate::model::{Address, Environment, Job, JobId};
use crate::store::{ChangeSet, EntityStore};

/// A geographic position in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// Conditions reported by a provider, in imperial units.
#[derive(Clone, Debug, PartialEq)]
pub struct Conditions {
    pub temp_f: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    pub wind_mph: f64,
    pub condition_text: String,
}

/// Port for geocoding and weather lookups.
pub trait WeatherProvider: Send + Sync {
    /// Resolves a street address to a coordinate.
    fn geocode(&self, address: &Address) -> Result<Coordinate, FieldpackError>;

    /// Current conditions at a coordinate.
    fn current_conditions(&self, at: Coordinate) -> Result<Conditions, FieldpackError>;
}

fn unavailable(e: FieldpackError) -> FieldpackError {
    match e {
        FieldpackError::WeatherUnavailable { .. } => e,
        other => FieldpackError::WeatherUnavailable {
            message: other.to_string(),
        },
    }
}

/// Looks up current conditions at `address`.
pub fn lookup_conditions<P: WeatherProvider + ?Sized>(
    provider: &P,
    address: &Address,
) -> Result<Conditions, FieldpackError> {
    let at = provider.geocode(address).map_err(unavailable)?;
    if !at.latitude.is_finite() || !at.longitude.is_finite() {
        return Err(FieldpackError::WeatherUnavailable {
            message: format!("geocoder returned an invalid position for {address}"),
        });
    }
    debug!(lat = at.latitude, lon = at.longitude, "address geocoded");

    let conditions = provider.current_conditions(at).map_err(unavailable)?;
    if ![conditions.temp_f, conditions.humidity, conditions.wind_mph]
        .iter()
        .all(|v| v.is_finite())
    {
        return Err(FieldpackError::WeatherUnavailable {
            message: "provider returned non-numeric conditions".into(),
        });
    }
    Ok(conditions)
}

/// Fetches conditions for a job's address and stores them on the job.
pub fn capture_environment<S, P>(
    store: &S,
    provider: &P,
    job_id: &JobId,
) -> Result<Job, FieldpackError>
where
    S: EntityStore + ?Sized,
    P: WeatherProvider + ?Sized,
{
    let mut job = store
        .job(job_id)?
        .ok_or_else(|| FieldpackError::JobNotFound {
            job_id: job_id.to_string(),
        })?;

    let conditions = lookup_conditions(provider, &job.address)?;
    job.environment = Environment {
        temperature: Some(conditions.temp_f),
        weather_condition: Some(conditions.condition_text),
        humidity: Some(conditions.humidity),
        wind_speed: Some(conditions.wind_mph),
        captured_at: Some(Utc::now()),
    };
    job.touch();

    let mut changes = ChangeSet::new();
    changes.upsert_job(job.clone());
    store.commit(changes)?;
    info!(job_id = %job.job_id, "environment captured");
    Ok(job)
}
