//! Parsers for the three fixed sensor-log schemas.
//!
//! Each reader aligns timestamps to the experiment start, discards rows
//! outside `[start, stop]` and hands back an in-memory series; nothing
//! downstream of this module touches the filesystem.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::warn;
use ndarray::Array1;
use serde::Deserialize;

use crate::metadata::{parse_timestamp, ExperimentMetadata};
use crate::series::TimeSeries;
use crate::Result;

/// Lines the CO2 logger writes before its column header.
const CO2_PREAMBLE_LINES: usize = 9;
/// Lines the voltage logger writes before its column header.
const VOLTAGE_PREAMBLE_LINES: usize = 3;

#[derive(Debug, Deserialize)]
struct Co2Row {
    timestamp: String,
    co2_ppm: f64,
}

// data_index and the alarm flags are parsed and dropped.
#[derive(Debug, Deserialize)]
struct VoltageRow {
    #[allow(dead_code)]
    data_index: u64,
    timestamp: String,
    voltage_v: f64,
    #[allow(dead_code)]
    high_alarm: String,
    #[allow(dead_code)]
    low_alarm: String,
}

#[derive(Debug, Deserialize)]
struct IcRow {
    time_min: f64,
    #[allow(dead_code)]
    amine_area: f64,
    #[serde(rename = "k+_area")]
    #[allow(dead_code)]
    potassium_area: f64,
    #[allow(dead_code)]
    amine_ppm: f64,
    #[serde(rename = "amine_mol/kg")]
    amine_mol_per_kg: f64,
    amine_mol: f64,
}

/// Ion-chromatography samples from the release-side reservoir.
///
/// `time_min` is minutes since experiment start. The molar columns are
/// clamped at zero during parsing; a negative amine quantity is a
/// chromatograph artefact, not a physical state.
#[derive(Clone, Debug)]
pub struct IcSeries {
    pub time_min: Array1<f64>,
    pub amine_mol_per_kg: Array1<f64>,
    pub amine_mol: Array1<f64>,
}

impl IcSeries {
    #[must_use]
    pub fn len(&self) -> usize {
        self.time_min.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time_min.is_empty()
    }
}

/// All raw series for one experiment, time-aligned to its start.
#[derive(Clone, Debug)]
pub struct ExperimentLogs {
    pub co2: TimeSeries,
    pub voltage: TimeSeries,
    pub ic: Option<IcSeries>,
    pub outlet_co2: Option<TimeSeries>,
}

/// Materialize every log the metadata points at.
///
/// # Errors
/// Fails when any referenced file is unreadable or malformed.
pub fn load(meta: &ExperimentMetadata) -> Result<ExperimentLogs> {
    let co2 = read_co2_log(&meta.co2_log, meta)?;
    let voltage = read_voltage_log(&meta.voltage_log, meta)?;
    let ic = meta
        .ic_log
        .as_deref()
        .map(read_ic_log)
        .transpose()?;
    let outlet_co2 = meta
        .contactor
        .as_ref()
        .map(|config| read_co2_log(&config.outlet_co2_log, meta))
        .transpose()?;

    Ok(ExperimentLogs {
        co2,
        voltage,
        ic,
        outlet_co2,
    })
}

/// Read a CO2 concentration log (`timestamp, co2_ppm`).
///
/// # Errors
/// Fails on I/O problems, malformed CSV or unparseable timestamps.
pub fn read_co2_log(path: &Path, meta: &ExperimentMetadata) -> Result<TimeSeries> {
    let mut reader = BufReader::new(File::open(path)?);
    skip_preamble(&mut reader, CO2_PREAMBLE_LINES)?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(reader);

    let mut samples = Vec::new();
    for row in csv_reader.deserialize() {
        let row: Co2Row = row?;
        if let Some(runtime) = runtime_within_window(&row.timestamp, meta)? {
            samples.push((runtime, row.co2_ppm));
        }
    }

    if samples.is_empty() {
        warn!(
            "CO2 log {} holds no samples inside the experiment window",
            path.display()
        );
    }
    Ok(TimeSeries::from_samples(samples))
}

/// Read a voltage log (`data_index, timestamp, voltage_v, high_alarm,
/// low_alarm`), keeping only timestamp and voltage.
///
/// # Errors
/// Fails on I/O problems, malformed CSV or unparseable timestamps.
pub fn read_voltage_log(path: &Path, meta: &ExperimentMetadata) -> Result<TimeSeries> {
    let mut reader = BufReader::new(File::open(path)?);
    skip_preamble(&mut reader, VOLTAGE_PREAMBLE_LINES)?;

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(reader);

    let mut samples = Vec::new();
    for row in csv_reader.deserialize() {
        let row: VoltageRow = row?;
        if let Some(runtime) = runtime_within_window(&row.timestamp, meta)? {
            samples.push((runtime, row.voltage_v));
        }
    }

    if samples.is_empty() {
        warn!(
            "voltage log {} holds no samples inside the experiment window",
            path.display()
        );
    }
    Ok(TimeSeries::from_samples(samples))
}

/// Read an ion-chromatography log, clamping the molar columns at zero.
///
/// # Errors
/// Fails on I/O problems or malformed CSV.
pub fn read_ic_log(path: &Path) -> Result<IcSeries> {
    let reader = BufReader::new(File::open(path)?);
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let mut time_min = Vec::new();
    let mut amine_mol_per_kg = Vec::new();
    let mut amine_mol = Vec::new();
    for row in csv_reader.deserialize() {
        let row: IcRow = row?;
        time_min.push(row.time_min);
        amine_mol_per_kg.push(row.amine_mol_per_kg.max(0.0));
        amine_mol.push(row.amine_mol.max(0.0));
    }

    Ok(IcSeries {
        time_min: Array1::from_vec(time_min),
        amine_mol_per_kg: Array1::from_vec(amine_mol_per_kg),
        amine_mol: Array1::from_vec(amine_mol),
    })
}

/// Seconds since experiment start, or `None` when the row falls outside
/// `[start, stop]`.
fn runtime_within_window(timestamp: &str, meta: &ExperimentMetadata) -> Result<Option<f64>> {
    let runtime = parse_timestamp(timestamp)? - meta.start_time;
    if runtime >= 0.0 && runtime <= meta.duration() {
        Ok(Some(runtime))
    } else {
        Ok(None)
    }
}

fn skip_preamble<R: BufRead>(reader: &mut R, lines: usize) -> Result<()> {
    let mut discard = String::new();
    for _ in 0..lines {
        discard.clear();
        reader.read_line(&mut discard)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempdir::TempDir;

    use crate::metadata::ExperimentMetadata;

    use super::{read_co2_log, read_ic_log, read_voltage_log};

    fn meta(dir: &TempDir) -> ExperimentMetadata {
        ExperimentMetadata {
            label: "test".to_owned(),
            start_time: 1_714_557_600.0, // 2024-05-01 10:00:00 UTC
            stop_time: 1_714_561_200.0,  // one hour later
            current: 2.0,
            air_flow_rate: 5.0,
            amine: "MEA".to_owned(),
            co2_log: dir.path().join("co2.csv"),
            voltage_log: dir.path().join("voltage.csv"),
            ic_log: None,
            contactor: None,
        }
    }

    fn write_file(dir: &TempDir, name: &str, contents: &str) {
        let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn co2_rows_outside_the_experiment_window_are_discarded() {
        let dir = TempDir::new("co2_log").unwrap();
        let preamble = "vendor\n".repeat(8) + "timestamp,co2_ppm\n";
        let rows = "\
2024-05-01 09:59:00,410.0
2024-05-01 10:00:00,420.0
2024-05-01 10:30:00,850.0
2024-05-01 11:00:00,430.0
2024-05-01 11:01:00,400.0
";
        write_file(&dir, "co2.csv", &(preamble + rows));

        let meta = meta(&dir);
        let series = read_co2_log(&meta.co2_log, &meta).unwrap();

        assert_eq!(series.len(), 3);
        approx::assert_relative_eq!(series.times()[0], 0.0);
        approx::assert_relative_eq!(series.times()[2], 3600.0);
        approx::assert_relative_eq!(series.values()[1], 850.0);
    }

    #[test]
    fn voltage_rows_drop_index_and_alarm_columns() {
        let dir = TempDir::new("voltage_log").unwrap();
        let preamble = "logger model\nserial 0001\ndata_index,timestamp,voltage_v,high_alarm,low_alarm\n";
        let rows = "\
1,2024-05-01 10:00:00,11.9,,
2,2024-05-01 10:00:10,12.1,,
3,2024-05-01 10:00:20,12.0,HIGH,
";
        write_file(&dir, "voltage.csv", &(preamble.to_owned() + rows));

        let meta = meta(&dir);
        let series = read_voltage_log(&meta.voltage_log, &meta).unwrap();

        assert_eq!(series.len(), 3);
        approx::assert_relative_eq!(series.values()[1], 12.1);
        approx::assert_relative_eq!(series.times()[2], 20.0);
    }

    #[test]
    fn ic_molar_columns_are_clamped_at_zero() {
        let dir = TempDir::new("ic_log").unwrap();
        let contents = "\
time_min,amine_area,k+_area,amine_ppm,amine_mol/kg,amine_mol
0.0,12.0,5.0,100.0,-0.001,-0.002
30.0,13.0,5.1,140.0,0.010,0.020
";
        write_file(&dir, "ic.csv", contents);

        let series = read_ic_log(&dir.path().join("ic.csv")).unwrap();
        assert_eq!(series.len(), 2);
        approx::assert_relative_eq!(series.amine_mol_per_kg[0], 0.0);
        approx::assert_relative_eq!(series.amine_mol[0], 0.0);
        approx::assert_relative_eq!(series.amine_mol[1], 0.02);
    }
}
