//! Metric calculator for the electrodialysis stack configuration.
//!
//! One calculator is built per (sub-)window of an experiment. Construction
//! derives the total moles of CO2 evolved, since every downstream metric
//! except stack resistance consumes it.

use log::warn;

use crate::error::Error;
use crate::series::{integrate, TimeSeries};
use crate::uncertain::Uncertain;
use crate::Result;

/// Active area of a single membrane, m².
pub const MEMBRANE_AREA: f64 = 0.0036;
/// Faraday constant, C/mol.
pub const FARADAY_CONSTANT: f64 = 96485.0;
/// Density of CO2 at operating conditions, g/L.
pub const CO2_DENSITY: f64 = 1.815;
/// Cell pairs in the stack.
pub const MEMBRANE_PAIRS: f64 = 10.0;
/// Molar mass of CO2, g/mol.
pub const CO2_MOLAR_MASS: f64 = 44.01;
/// Atmospheric CO2 baseline subtracted from the sensor reading, ppm.
pub const ATMOSPHERIC_CO2_PPM: f64 = 400.0;

/// Seconds per hour times watts per kilowatt: J → kWh.
const JOULES_PER_KWH: f64 = 3_600_000.0;

/// A contiguous slice of the aligned per-experiment series.
///
/// Exclusively owned by the calculation constructed over it; windowed
/// aggregation clones sub-slices rather than sharing.
#[derive(Clone, Debug)]
pub struct ExperimentWindow {
    pub co2: TimeSeries,
    pub voltage: TimeSeries,
}

impl ExperimentWindow {
    /// The sub-window covering `[from, to]` seconds.
    #[must_use]
    pub fn slice(&self, from: f64, to: f64) -> Self {
        Self {
            co2: self.co2.slice_time(from, to),
            voltage: self.voltage.slice_time(from, to),
        }
    }

    /// Elapsed time covered by the mass-balance (CO2) series, seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.co2.duration()
    }
}

pub struct StackCalculator {
    window: ExperimentWindow,
    /// Current setpoint, A.
    current: f64,
    /// Cached mass-balance intermediate; `None` records a failed
    /// derivation, already reported at construction.
    total_moles_co2: Option<Uncertain<f64>>,
}

impl StackCalculator {
    /// Build a calculator over a cleaned window.
    ///
    /// `air_flow_rate` is in litres per minute. A failed moles-of-CO2
    /// derivation is reported here once; the metrics that need it fail
    /// individually later.
    #[must_use]
    pub fn new(window: ExperimentWindow, current: f64, air_flow_rate: f64) -> Self {
        let total_moles_co2 = match derive_total_moles(&window.co2, air_flow_rate) {
            Ok(moles) => Some(moles),
            Err(e) => {
                warn!("total moles of CO2 could not be derived: {e}");
                None
            }
        };

        Self {
            window,
            current,
            total_moles_co2,
        }
    }

    /// Total moles of CO2 evolved over the window.
    ///
    /// # Errors
    /// [`Error::MissingIntermediate`] when the construction-time
    /// derivation failed.
    pub fn total_moles_co2(&self) -> Result<Uncertain<f64>> {
        self.total_moles_co2
            .ok_or(Error::MissingIntermediate("total moles of CO2"))
    }

    /// Mean stack voltage over the current setpoint, Ω.
    ///
    /// # Errors
    /// Fails on a zero setpoint, or on a voltage series with fewer than
    /// two samples, where the spread is undefined.
    pub fn stack_resistance(&self) -> Result<Uncertain<f64>> {
        if self.window.voltage.len() < 2 {
            return Err(Error::EmptySeries);
        }
        let mean = self.window.voltage.mean().ok_or(Error::EmptySeries)?;
        let voltage = Uncertain::new(mean, self.window.voltage.std());
        voltage.try_div(&Uncertain::exact(self.current))
    }

    /// Moles of CO2 per mole of electrons passed, as a percentage per
    /// cell pair.
    ///
    /// # Errors
    /// Fails when the moles intermediate is unavailable or when the
    /// charge passed is zero.
    pub fn current_efficiency(&self) -> Result<Uncertain<f64>> {
        let moles = self.total_moles_co2()?;

        let total_coulombs = self.window.duration() * self.current;
        let mol_electrons =
            Uncertain::exact(total_coulombs).try_div(&Uncertain::exact(FARADAY_CONSTANT))?;

        moles
            .try_div(&mol_electrons)?
            .try_mul(&Uncertain::exact(100.0))?
            .try_div(&Uncertain::exact(MEMBRANE_PAIRS))
    }

    /// Electrical energy spent per metric ton of CO2 evolved, kWh/t.
    ///
    /// # Errors
    /// Fails when the moles intermediate is unavailable or the energy
    /// integral is zero.
    pub fn power_consumption(&self) -> Result<Uncertain<f64>> {
        let moles = self.total_moles_co2()?;

        // Power at the fixed setpoint: P(t) = V(t) * I, integrated to J.
        let power = self.window.voltage.values().mapv(|v| v * self.current);
        let total_energy = integrate(self.window.voltage.times(), power.view());
        let total_energy = total_energy.try_div(&Uncertain::exact(JOULES_PER_KWH))?;

        let mass_co2 = moles
            .try_mul(&Uncertain::exact(CO2_MOLAR_MASS))?
            .try_div(&Uncertain::exact(1_000_000.0))?; // g -> t

        total_energy.try_div(&mass_co2)
    }

    /// CO2 evolution rate per unit membrane area, mg·m⁻²·s⁻¹.
    ///
    /// # Errors
    /// Fails when the moles intermediate is unavailable or the window has
    /// zero duration.
    pub fn co2_flux(&self) -> Result<Uncertain<f64>> {
        let moles = self.total_moles_co2()?;
        let duration = self.window.duration();

        let mass_mg = moles
            .try_mul(&Uncertain::exact(CO2_MOLAR_MASS))?
            .try_mul(&Uncertain::exact(1000.0))?;
        let rate = mass_mg.try_div(&Uncertain::exact(duration))?;

        let total_area = Uncertain::exact(MEMBRANE_PAIRS * MEMBRANE_AREA);
        rate.try_div(&total_area)
    }
}

/// Mass balance over the CO2 series: ppm excess over the atmospheric
/// baseline × volumetric air flow, integrated and converted through
/// density and molar mass.
fn derive_total_moles(co2: &TimeSeries, air_flow_rate: f64) -> Result<Uncertain<f64>> {
    // L/min -> L/s
    let air_flow_per_second = air_flow_rate / 60.0;
    // ppm above baseline -> CO2 volume flow, L/s
    let co2_volume_flow = co2
        .values()
        .mapv(|ppm| (ppm - ATMOSPHERIC_CO2_PPM) / 1e6 * air_flow_per_second);

    let total_litres = integrate(co2.times(), co2_volume_flow.view());
    total_litres
        .try_mul(&Uncertain::exact(CO2_DENSITY))? // L -> g
        .try_div(&Uncertain::exact(CO2_MOLAR_MASS)) // g -> mol
}
