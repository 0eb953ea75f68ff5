use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use log::warn;
use serde::Deserialize;

use crate::error::Error;
use crate::Result;

/// Timestamp layout shared by the dashboard manifest and the sensor logs.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Static per-experiment configuration, immutable once resolved.
///
/// All times are unix epoch seconds. `current` is the fixed setpoint in
/// amperes, zero for an unpowered control run. `air_flow_rate` is the
/// volumetric air flow in litres per minute.
#[derive(Clone, Debug)]
pub struct ExperimentMetadata {
    pub label: String,
    pub start_time: f64,
    pub stop_time: f64,
    pub current: f64,
    pub air_flow_rate: f64,
    pub amine: String,
    pub co2_log: PathBuf,
    pub voltage_log: PathBuf,
    pub ic_log: Option<PathBuf>,
    pub contactor: Option<ContactorConfig>,
}

impl ExperimentMetadata {
    /// Experiment duration in seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.stop_time - self.start_time
    }
}

/// Geometry of a permeable-contactor capture configuration.
///
/// `face_velocity` is the air velocity at the inlet pipe in m/s;
/// `contacting_area` the gas-liquid contacting area in m².
#[derive(Clone, Debug, Deserialize)]
pub struct ContactorConfig {
    pub contacting_area: f64,
    pub face_velocity: f64,
    pub outlet_co2_log: PathBuf,
}

/// One dashboard row, before required fields have been checked.
#[derive(Clone, Debug, Deserialize)]
pub struct ManifestEntry {
    pub label: String,
    pub start_time: String,
    pub stop_time: String,
    #[serde(default)]
    pub current: f64,
    #[serde(default)]
    pub air_flow_rate: f64,
    #[serde(default)]
    pub amine: String,
    pub co2_log: Option<PathBuf>,
    pub voltage_log: Option<PathBuf>,
    pub ic_log: Option<PathBuf>,
    pub contactor: Option<ContactorConfig>,
}

impl ManifestEntry {
    /// Check required logfiles and convert timestamps to epoch seconds.
    ///
    /// # Errors
    /// [`Error::MissingLogfile`] when the CO2 or voltage log is absent,
    /// [`Error::Timestamp`] when a time field does not parse.
    pub fn resolve(self) -> Result<ExperimentMetadata> {
        let co2_log = self.co2_log.ok_or_else(|| Error::MissingLogfile {
            label: self.label.clone(),
            kind: "CO2",
        })?;
        let voltage_log = self.voltage_log.ok_or_else(|| Error::MissingLogfile {
            label: self.label.clone(),
            kind: "voltage",
        })?;

        Ok(ExperimentMetadata {
            start_time: parse_timestamp(&self.start_time)?,
            stop_time: parse_timestamp(&self.stop_time)?,
            label: self.label,
            current: self.current,
            air_flow_rate: self.air_flow_rate,
            amine: self.amine,
            co2_log,
            voltage_log,
            ic_log: self.ic_log,
            contactor: self.contactor,
        })
    }
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    experiment: Vec<ManifestEntry>,
}

/// Load and resolve an experiment manifest.
///
/// Entries lacking a required logfile are excluded with a warning rather
/// than failing the whole run.
///
/// # Errors
/// Fails on unreadable or malformed TOML only.
pub fn load_manifest(path: &Path) -> Result<Vec<ExperimentMetadata>> {
    let raw = std::fs::read_to_string(path)?;
    let manifest: Manifest = toml::from_str(&raw)?;

    let mut experiments = Vec::with_capacity(manifest.experiment.len());
    for entry in manifest.experiment {
        match entry.resolve() {
            Ok(meta) => experiments.push(meta),
            Err(e) => warn!("{e}"),
        }
    }
    Ok(experiments)
}

/// Sort experiments into chronological order by start time.
pub fn sort_chronological(experiments: &mut [ExperimentMetadata]) {
    experiments.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
}

/// Parse a `"%Y-%m-%d %H:%M:%S"` timestamp into unix epoch seconds.
///
/// # Errors
/// Returns [`Error::Timestamp`] when the string does not match the layout.
#[allow(clippy::cast_precision_loss)]
pub fn parse_timestamp(raw: &str) -> Result<f64> {
    let parsed = NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT)?;
    Ok(parsed.and_utc().timestamp() as f64)
}
