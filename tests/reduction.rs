//! End-to-end reduction over synthetic on-disk logs: manifest in, metric
//! records out.

use std::fmt::Write as _;
use std::path::Path;

use chrono::DateTime;
use tempdir::TempDir;

use capture_metrics::metadata;
use capture_metrics::reduction;
use capture_metrics::Result;

const START_EPOCH: i64 = 1_714_557_600; // 2024-05-01 10:00:00 UTC
const DURATION_S: i64 = 3600;

fn format_epoch(epoch: i64) -> String {
    DateTime::from_timestamp(epoch, 0)
        .unwrap()
        .naive_utc()
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// CO2 logger format: 8 preamble lines, a header, then rows every 10 s.
fn write_co2_log(path: &Path, ppm: impl Fn(i64) -> f64) {
    let mut contents = String::new();
    for n in 0..8 {
        writeln!(contents, "# vaisala preamble line {n}").unwrap();
    }
    writeln!(contents, "timestamp,co2_ppm").unwrap();
    for offset in (0..=DURATION_S).step_by(10) {
        writeln!(
            contents,
            "{},{}",
            format_epoch(START_EPOCH + offset),
            ppm(offset)
        )
        .unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

/// Voltage logger format: 2 preamble lines, a header, then indexed rows
/// with alarm columns.
fn write_voltage_log(path: &Path, volts: impl Fn(i64) -> f64) {
    let mut contents = String::new();
    writeln!(contents, "EasyLog USB").unwrap();
    writeln!(contents, "serial,0001").unwrap();
    writeln!(contents, "data_index,timestamp,voltage_v,high_alarm,low_alarm").unwrap();
    for (index, offset) in (0..=DURATION_S).step_by(10).enumerate() {
        writeln!(
            contents,
            "{},{},{},,",
            index + 1,
            format_epoch(START_EPOCH + offset),
            volts(offset)
        )
        .unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

fn write_ic_log(path: &Path) {
    let mut contents = String::new();
    writeln!(contents, "time_min,amine_area,k+_area,amine_ppm,amine_mol/kg,amine_mol").unwrap();
    for n in 0..4 {
        let minutes = f64::from(n) * 20.0;
        writeln!(
            contents,
            "{minutes},12.0,5.0,100.0,{},{}",
            0.10 + 0.001 * minutes,
            0.001 * minutes
        )
        .unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

fn write_manifest(dir: &TempDir, entries: &[(&str, f64, bool)]) -> std::path::PathBuf {
    let mut contents = String::new();
    for (label, current, with_ic) in entries {
        writeln!(contents, "[[experiment]]").unwrap();
        writeln!(contents, "label = \"{label}\"").unwrap();
        writeln!(contents, "start_time = \"{}\"", format_epoch(START_EPOCH)).unwrap();
        writeln!(
            contents,
            "stop_time = \"{}\"",
            format_epoch(START_EPOCH + DURATION_S)
        )
        .unwrap();
        writeln!(contents, "current = {current}").unwrap();
        writeln!(contents, "air_flow_rate = 5.0").unwrap();
        writeln!(contents, "amine = \"MEA\"").unwrap();
        writeln!(contents, "co2_log = \"{label}_co2.csv\"").unwrap();
        writeln!(contents, "voltage_log = \"{label}_voltage.csv\"").unwrap();
        if *with_ic {
            writeln!(contents, "ic_log = \"{label}_ic.csv\"").unwrap();
        }
        writeln!(contents).unwrap();
    }

    let path = dir.path().join("experiments.toml");
    std::fs::write(&path, contents).unwrap();
    path
}

fn write_experiment_logs(dir: &TempDir, label: &str, with_ic: bool) {
    write_co2_log(&dir.path().join(format!("{label}_co2.csv")), |_| 900.0);
    write_voltage_log(&dir.path().join(format!("{label}_voltage.csv")), |_| 12.0);
    if with_ic {
        write_ic_log(&dir.path().join(format!("{label}_ic.csv")));
    }
}

fn load_rooted(dir: &TempDir, manifest: &Path) -> Vec<metadata::ExperimentMetadata> {
    // Manifest paths are relative to the manifest itself.
    metadata::load_manifest(manifest)
        .unwrap()
        .into_iter()
        .map(|mut meta| {
            meta.co2_log = dir.path().join(&meta.co2_log);
            meta.voltage_log = dir.path().join(&meta.voltage_log);
            meta.ic_log = meta.ic_log.map(|p| dir.path().join(p));
            meta
        })
        .collect()
}

#[test]
fn an_energized_experiment_produces_every_stack_metric() -> Result<()> {
    let dir = TempDir::new("energized").unwrap();
    write_experiment_logs(&dir, "run-1", true);
    let manifest = write_manifest(&dir, &[("run-1", 2.0, true)]);

    let output = reduction::run(load_rooted(&dir, &manifest))?;

    assert_eq!(output.processed.len(), 1);
    let record = &output.processed[0];
    assert_eq!(record.label, "run-1");

    // 12 V at a 2 A setpoint.
    approx::assert_relative_eq!(record.stack_resistance.value(), 6.0);
    assert!(record.current_efficiency.value() > 0.0);
    assert!(record.power_consumption.value() > 0.0);
    assert!(record.co2_flux.value() > 0.0);
    assert!(record.crossover_flux.value() > 0.0);

    // Hour-long run, 900 s centre step: windows at 2.5, 17.5, 32.5, 47.5 min.
    assert_eq!(output.time_resolved.len(), 4);
    assert!(output
        .time_resolved
        .iter()
        .all(|row| row.power_consumption.value() > 0.0 && row.release_concentration > 0.0));
    Ok(())
}

#[test]
fn an_unpowered_control_run_still_yields_a_co2_flux() -> Result<()> {
    let dir = TempDir::new("control").unwrap();
    write_experiment_logs(&dir, "control-1", false);
    let manifest = write_manifest(&dir, &[("control-1", 0.0, false)]);

    let output = reduction::run(load_rooted(&dir, &manifest))?;

    let record = &output.processed[0];
    assert_eq!(record.stack_resistance.value(), 0.0);
    assert_eq!(record.stack_resistance.error(), 0.0);
    assert_eq!(record.current_efficiency.value(), 0.0);
    assert_eq!(record.power_consumption.value(), 0.0);
    assert!(record.co2_flux.value() > 0.0);
    assert!(output.time_resolved.is_empty());
    Ok(())
}

#[test]
fn experiments_with_unreadable_logs_are_excluded_not_fatal() -> Result<()> {
    let dir = TempDir::new("partial").unwrap();
    write_experiment_logs(&dir, "good", false);
    // "broken" is listed in the manifest but its files never exist.
    let manifest = write_manifest(&dir, &[("good", 2.0, false), ("broken", 2.0, false)]);

    let output = reduction::run(load_rooted(&dir, &manifest))?;

    assert_eq!(output.processed.len(), 1);
    assert_eq!(output.processed[0].label, "good");
    Ok(())
}

#[test]
fn a_run_without_any_usable_experiment_fails() {
    let dir = TempDir::new("empty").unwrap();
    let manifest = write_manifest(&dir, &[("ghost", 2.0, false)]);

    let result = reduction::run(load_rooted(&dir, &manifest));
    assert!(matches!(
        result,
        Err(capture_metrics::Error::NoExperiments)
    ));
}

#[test]
fn spiky_sensor_data_is_cleaned_before_metrics_are_derived() -> Result<()> {
    let dir = TempDir::new("spiky").unwrap();
    // A single 60% spike half way through the run.
    write_co2_log(&dir.path().join("spiky_co2.csv"), |offset| {
        if offset == 1800 {
            1440.0
        } else {
            900.0
        }
    });
    write_voltage_log(&dir.path().join("spiky_voltage.csv"), |_| 12.0);
    let manifest = write_manifest(&dir, &[("spiky", 2.0, false)]);

    let clean_dir = TempDir::new("clean").unwrap();
    write_experiment_logs(&clean_dir, "clean", false);
    let clean_manifest = write_manifest(&clean_dir, &[("clean", 2.0, false)]);

    let spiky = reduction::run(load_rooted(&dir, &manifest))?;
    let clean = reduction::run(load_rooted(&clean_dir, &clean_manifest))?;

    // The rejected spike leaves the mass balance untouched.
    approx::assert_relative_eq!(
        spiky.processed[0].co2_flux.value(),
        clean.processed[0].co2_flux.value(),
        max_relative = 1e-6
    );
    Ok(())
}
