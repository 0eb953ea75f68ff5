//! Per-experiment reduction: outlier filtering, metric derivation in a
//! fixed order, then windowed aggregation. No failure here escapes the
//! experiment it belongs to; a run only fails outright when no experiment
//! produces a record at all.

use log::warn;

use crate::contactor::ContactorCalculator;
use crate::crossover::{concentration_trend, crossing_flux, crossover_rate};
use crate::electrodialysis::{ExperimentWindow, StackCalculator};
use crate::error::Error;
use crate::filter::MedianFilter;
use crate::logs::{self, ExperimentLogs};
use crate::metadata::{sort_chronological, ExperimentMetadata};
use crate::uncertain::Uncertain;
use crate::windowed;
use crate::Result;

/// One row of scalar metrics per experiment. Finalized by
/// [`RecordBuilder`]; immutable afterwards.
#[derive(Clone, Debug)]
pub struct ProcessedMetricRecord {
    pub label: String,
    pub stack_resistance: Uncertain<f64>,
    pub current_efficiency: Uncertain<f64>,
    pub power_consumption: Uncertain<f64>,
    pub co2_flux: Uncertain<f64>,
    pub capture_flux: Uncertain<f64>,
    pub crossover_flux: Uncertain<f64>,
}

/// One row per sub-window of an experiment with ion-chromatography data.
#[derive(Clone, Debug)]
pub struct TimeResolvedMetricRecord {
    pub label: String,
    /// Window midpoint, minutes since experiment start.
    pub time_min: f64,
    pub power_consumption: Uncertain<f64>,
    /// Release-side amine concentration interpolated at the midpoint,
    /// mol/kg.
    pub release_concentration: f64,
}

/// Accumulates metrics for one experiment and finalizes into an immutable
/// record. Unset metrics finalize as `(0.0, 0.0)`.
pub struct RecordBuilder {
    record: ProcessedMetricRecord,
}

impl RecordBuilder {
    #[must_use]
    pub fn new(label: &str) -> Self {
        let zero = Uncertain::exact(0.0);
        Self {
            record: ProcessedMetricRecord {
                label: label.to_owned(),
                stack_resistance: zero,
                current_efficiency: zero,
                power_consumption: zero,
                co2_flux: zero,
                capture_flux: zero,
                crossover_flux: zero,
            },
        }
    }

    /// Record a derived metric, recovering from failure.
    ///
    /// An `Err` or a non-finite value leaves the metric at `(0.0, 0.0)`
    /// and emits a diagnostic; sibling metrics are unaffected.
    pub fn metric(
        mut self,
        name: &str,
        result: Result<Uncertain<f64>>,
        slot: fn(&mut ProcessedMetricRecord) -> &mut Uncertain<f64>,
    ) -> Self {
        match result {
            Ok(value) if value.value().is_finite() && value.error().is_finite() => {
                *slot(&mut self.record) = value;
            }
            Ok(_) => {
                warn!(
                    "error in calculating {name} for experiment labelled \"{}\": non-finite result",
                    self.record.label
                );
            }
            Err(e) => {
                warn!(
                    "error in calculating {name} for experiment labelled \"{}\": {e}",
                    self.record.label
                );
            }
        }
        self
    }

    #[must_use]
    pub fn finish(self) -> ProcessedMetricRecord {
        self.record
    }
}

/// Everything a run hands to the plotting collaborator.
#[derive(Clone, Debug, Default)]
pub struct ReductionOutput {
    pub processed: Vec<ProcessedMetricRecord>,
    pub time_resolved: Vec<TimeResolvedMetricRecord>,
}

/// Reduce a whole batch of experiments, chronologically, one at a time.
///
/// Experiments whose logs cannot be read are excluded with a warning.
///
/// # Errors
/// [`Error::NoExperiments`] when no experiment survives to produce a
/// record.
pub fn run(mut experiments: Vec<ExperimentMetadata>) -> Result<ReductionOutput> {
    sort_chronological(&mut experiments);

    let mut output = ReductionOutput::default();
    for meta in &experiments {
        let logs = match logs::load(meta) {
            Ok(logs) => logs,
            Err(e) => {
                warn!("excluding experiment \"{}\": {e}", meta.label);
                continue;
            }
        };

        let (record, time_resolved) = reduce_experiment(meta, &logs);
        output.processed.push(record);
        output.time_resolved.extend(time_resolved);
    }

    if output.processed.is_empty() {
        return Err(Error::NoExperiments);
    }
    Ok(output)
}

/// Reduce a single experiment from its raw, time-aligned logs.
///
/// Metrics are derived in a fixed order: stack resistance, current
/// efficiency, power consumption, CO2 flux, then crossover flux. The
/// energized-stack metrics (the first three) stay at `(0.0, 0.0)` for an
/// unpowered control run; CO2 flux is computed from the concentration data
/// alone either way.
#[must_use]
pub fn reduce_experiment(
    meta: &ExperimentMetadata,
    logs: &ExperimentLogs,
) -> (ProcessedMetricRecord, Vec<TimeResolvedMetricRecord>) {
    let filter = MedianFilter::default();
    let window = ExperimentWindow {
        co2: filter.clean(&logs.co2),
        voltage: filter.clean_voltage(&logs.voltage, meta.current),
    };

    let calculator = StackCalculator::new(window.clone(), meta.current, meta.air_flow_rate);
    let energized = meta.current != 0.0;

    let mut builder = RecordBuilder::new(&meta.label);
    if energized {
        builder = builder
            .metric("stack resistance", calculator.stack_resistance(), |r| {
                &mut r.stack_resistance
            })
            .metric("current efficiency", calculator.current_efficiency(), |r| {
                &mut r.current_efficiency
            })
            .metric("power consumption", calculator.power_consumption(), |r| {
                &mut r.power_consumption
            });
    }
    builder = builder.metric("CO2 flux", calculator.co2_flux(), |r| &mut r.co2_flux);

    if let (Some(config), Some(outlet)) = (&meta.contactor, &logs.outlet_co2) {
        let capture = ContactorCalculator::new(
            window.co2.clone(),
            filter.clean(outlet),
            config.contacting_area,
            config.face_velocity,
        );
        builder = builder.metric("capture flux", capture.co2_flux(), |r| &mut r.capture_flux);
    }

    let mut time_resolved = Vec::new();
    if let Some(ic) = &logs.ic {
        builder = builder.metric(
            "crossover flux",
            crossover_rate(ic)
                .map(|fit| Uncertain::exact(crossing_flux(fit.slope, &meta.amine))),
            |r| &mut r.crossover_flux,
        );

        if energized {
            match concentration_trend(ic) {
                Ok(trend) => {
                    time_resolved = windowed::aggregate(&window, meta, &trend);
                }
                Err(e) => warn!(
                    "no release-concentration trend for experiment \"{}\": {e}",
                    meta.label
                ),
            }
        }
    }

    (builder.finish(), time_resolved)
}
