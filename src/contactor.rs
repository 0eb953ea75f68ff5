//! Capture-flux calculator for the permeable-contactor configuration.
//!
//! Unlike the stack mass balance, capture is sensed differentially: the
//! drop between the inlet and outlet CO2 sensors is integrated and scaled
//! by the volumetric air flow through the contactor face.

use std::f64::consts::PI;

use log::warn;
use ndarray::Array1;

use crate::electrodialysis::CO2_DENSITY;
use crate::series::{integrate, TimeSeries};
use crate::uncertain::Uncertain;
use crate::Result;

/// Inlet pipe diameter, m.
pub const AIR_INLET_DIAMETER: f64 = 0.1;

pub struct ContactorCalculator {
    inlet: TimeSeries,
    outlet: TimeSeries,
    /// Gas-liquid contacting area, m².
    contacting_area: f64,
    /// Volumetric air flow through the inlet cross-section, m³/s.
    air_volumetric_flow: f64,
}

impl ContactorCalculator {
    /// `face_velocity` is the air velocity at the inlet pipe in m/s.
    #[must_use]
    pub fn new(
        inlet: TimeSeries,
        outlet: TimeSeries,
        contacting_area: f64,
        face_velocity: f64,
    ) -> Self {
        let air_volumetric_flow = PI * (AIR_INLET_DIAMETER / 2.0).powi(2) * face_velocity;
        Self {
            inlet,
            outlet,
            contacting_area,
            air_volumetric_flow,
        }
    }

    /// CO2 captured per unit contacting area and time, mg·m⁻²·s⁻¹.
    ///
    /// # Errors
    /// Fails when the sensed delta integrates to zero or the window has no
    /// duration.
    pub fn co2_flux(&self) -> Result<Uncertain<f64>> {
        if self.inlet.len() != self.outlet.len() {
            warn!(
                "contactor: inlet and outlet CO2 series lengths differ ({} vs {})",
                self.inlet.len(),
                self.outlet.len()
            );
        }

        // Fractional concentration drop across the contactor.
        let (times, delta): (Vec<f64>, Vec<f64>) = self
            .inlet
            .times()
            .iter()
            .zip(self.inlet.values().iter())
            .zip(self.outlet.values().iter())
            .map(|((&t, &inlet_ppm), &outlet_ppm)| (t, (inlet_ppm - outlet_ppm) / 1e6))
            .unzip();
        let times = Array1::from_vec(times);
        let delta = Array1::from_vec(delta);

        let duration = if times.len() < 2 {
            0.0
        } else {
            times[times.len() - 1] - times[0]
        };

        integrate(times.view(), delta.view()) // fraction * s
            .try_mul(&Uncertain::exact(self.air_volumetric_flow))? // m^3
            .try_mul(&Uncertain::exact(1000.0))? // dm^3
            .try_mul(&Uncertain::exact(CO2_DENSITY))? // g
            .try_mul(&Uncertain::exact(1000.0))? // mg
            .try_div(&Uncertain::exact(self.contacting_area))? // mg m^{-2}
            .try_div(&Uncertain::exact(duration)) // mg m^{-2} s^{-1}
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use itertools::Itertools;

    use crate::electrodialysis::CO2_DENSITY;
    use crate::series::TimeSeries;

    use super::ContactorCalculator;

    fn flat(ppm: f64, samples: usize) -> TimeSeries {
        TimeSeries::from_samples(
            (0..samples)
                .map(|i| (i as f64 * 10.0, ppm))
                .collect_vec(),
        )
    }

    #[test]
    fn constant_delta_matches_the_closed_form() {
        // 100 ppm drop over 1000 s at 1.2 m/s face velocity.
        let calculator = ContactorCalculator::new(flat(500.0, 101), flat(400.0, 101), 0.01, 1.2);
        let flux = calculator.co2_flux().unwrap();

        let air_flow = PI * 0.05f64.powi(2) * 1.2;
        let grams = 100.0 / 1e6 * 1000.0 * air_flow * 1000.0 * CO2_DENSITY;
        let expected = grams * 1000.0 / 0.01 / 1000.0;
        approx::assert_relative_eq!(flux.value(), expected, max_relative = 1e-12);
    }

    #[test]
    fn zero_delta_is_an_error_not_a_zero_flux() {
        let calculator = ContactorCalculator::new(flat(400.0, 10), flat(400.0, 10), 0.01, 1.2);
        assert!(calculator.co2_flux().is_err());
    }
}
