//! Time-resolved re-derivation of power consumption over fixed-width
//! sub-windows of an experiment.

use log::warn;

use crate::electrodialysis::{ExperimentWindow, StackCalculator};
use crate::metadata::ExperimentMetadata;
use crate::reduction::TimeResolvedMetricRecord;
use crate::regression::LinearFit;
use crate::uncertain::Uncertain;

/// Spacing between consecutive window centres, seconds.
pub const WINDOW_STEP_S: f64 = 900.0;
/// Width of each window, seconds.
pub const WINDOW_WIDTH_S: f64 = 300.0;

/// Recompute power consumption over sliding fixed-width windows, pairing
/// each with the release-amine concentration interpolated at the window
/// midpoint.
///
/// Windows are skipped silently when either the CO2 or the voltage series
/// has no samples inside them, and with a diagnostic when the interpolated
/// concentration is negative (outside the physically valid range of the
/// regression, deliberately not clamped to zero).
#[must_use]
pub fn aggregate(
    window: &ExperimentWindow,
    meta: &ExperimentMetadata,
    concentration: &LinearFit<f64>,
) -> Vec<TimeResolvedMetricRecord> {
    let duration = meta.duration();
    let half_width = WINDOW_WIDTH_S / 2.0;

    let mut records = Vec::new();
    let mut centre = half_width;
    while centre + half_width <= duration {
        if let Some(record) = reduce_window(window, meta, concentration, centre) {
            records.push(record);
        }
        centre += WINDOW_STEP_S;
    }
    records
}

fn reduce_window(
    window: &ExperimentWindow,
    meta: &ExperimentMetadata,
    concentration: &LinearFit<f64>,
    centre: f64,
) -> Option<TimeResolvedMetricRecord> {
    let half_width = WINDOW_WIDTH_S / 2.0;
    let sub = window.slice(centre - half_width, centre + half_width);
    if sub.co2.is_empty() || sub.voltage.is_empty() {
        return None;
    }

    let midpoint_min = centre / 60.0;
    let release_concentration = concentration.evaluate(midpoint_min);
    if release_concentration < 0.0 {
        warn!(
            "skipping window at {midpoint_min:.1} min for \"{}\": interpolated concentration is negative",
            meta.label
        );
        return None;
    }

    let calculator = StackCalculator::new(sub, meta.current, meta.air_flow_rate);
    let power_consumption = match calculator.power_consumption() {
        Ok(power) if power.value().is_finite() && power.error().is_finite() => power,
        Ok(_) => {
            warn!(
                "windowed power consumption is not finite for \"{}\"",
                meta.label
            );
            Uncertain::exact(0.0)
        }
        Err(e) => {
            warn!(
                "windowed power consumption failed for \"{}\": {e}",
                meta.label
            );
            Uncertain::exact(0.0)
        }
    };

    Some(TimeResolvedMetricRecord {
        label: meta.label.clone(),
        time_min: midpoint_min,
        power_consumption,
        release_concentration,
    })
}
