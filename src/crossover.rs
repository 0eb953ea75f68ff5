//! Amine crossover through the stack membranes, estimated from the
//! ion-chromatography series of the capture-side reservoir.

use log::warn;

use crate::logs::IcSeries;
use crate::regression::{fit_line, LinearFit};
use crate::Result;

/// Membrane area the crossover flux is normalized against, m².
pub const CROSSOVER_MEMBRANE_AREA: f64 = 0.006;

/// Molar mass of an amine species, g/mol.
fn molar_mass(amine: &str) -> Option<f64> {
    match amine {
        "MEA" => Some(61.08),
        "MDEA" => Some(119.16),
        // PEI molar mass is per repeat unit, independent of chain length.
        "PEI" | "PEI-800" | "PEI-2000" => Some(43.07),
        "T2HPED" => Some(292.41),
        "Arginine" => Some(174.2),
        "MPA" => Some(75.11),
        _ => None,
    }
}

/// Convert a crossing rate in mol/min into a mass flux in mg·m⁻²·s⁻¹.
///
/// An amine missing from the molar-mass table yields a zero flux with a
/// warning rather than a failure, so one unknown species cannot abort a
/// run.
///
/// # Examples
///
/// ```
/// use capture_metrics::crossover::crossing_flux;
///
/// let flux = crossing_flux(1.0, "MEA");
/// assert!((flux - 1.0 / 60.0 / 0.006 * 61.08 * 1000.0).abs() < 1e-9);
/// ```
#[must_use]
pub fn crossing_flux(mol_per_minute: f64, amine: &str) -> f64 {
    let molar_mass = molar_mass(amine).unwrap_or_else(|| {
        warn!("molar mass of \"{amine}\" was not found");
        0.0
    });

    // mol/min -> mol/s, normalize by area, mol -> mg.
    mol_per_minute / 60.0 / CROSSOVER_MEMBRANE_AREA * (molar_mass * 1000.0)
}

/// Linear crossing rate of the amine in mol/min: the slope of the molar
/// quantity against time.
///
/// # Errors
/// Propagates a degenerate or empty fit.
pub fn crossover_rate(ic: &IcSeries) -> Result<LinearFit<f64>> {
    fit_line(ic.time_min.view(), ic.amine_mol.view())
}

/// Linear trend of the release-side amine concentration (mol/kg against
/// minutes), used to interpolate concentrations at window midpoints.
///
/// # Errors
/// Propagates a degenerate or empty fit.
pub fn concentration_trend(ic: &IcSeries) -> Result<LinearFit<f64>> {
    fit_line(ic.time_min.view(), ic.amine_mol_per_kg.view())
}
