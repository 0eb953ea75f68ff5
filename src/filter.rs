use log::debug;

use crate::series::TimeSeries;

/// Default sliding-window size for the rolling median.
pub const DEFAULT_WINDOW: usize = 5;
/// Default fractional tolerance around the rolling median.
pub const DEFAULT_TOLERANCE: f64 = 0.15;
/// Leading voltage samples at or below this are treated as the supply
/// still being off.
pub const STARTUP_VOLTAGE_THRESHOLD: f64 = 0.01;

/// Rolling-median outlier rejection for a raw measurement series.
///
/// A fixed-size circular buffer is seeded with the first `window` samples.
/// Every later sample is compared against the median of the buffer; samples
/// outside `median * (1 ± tolerance)` are dropped and never enter the
/// buffer, so a burst of consecutive outliers cannot drag the median with
/// it. The flip side is that a genuine sustained shift beyond tolerance
/// keeps rejecting until some value lands back within tolerance of the
/// stale median. That trade-off is accepted behaviour.
///
/// Rejected rows are removed outright: row identity is compacted but the
/// surviving timestamps are untouched.
#[derive(Clone, Copy, Debug)]
pub struct MedianFilter {
    window: usize,
    tolerance: f64,
}

impl Default for MedianFilter {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl MedianFilter {
    /// # Panics
    /// Panics if `window` is zero.
    #[must_use]
    pub fn new(window: usize, tolerance: f64) -> Self {
        assert!(window > 0, "median window must hold at least one sample");
        Self { window, tolerance }
    }

    /// Remove spurious samples from `series`.
    ///
    /// Series no longer than the window pass through unchanged.
    #[must_use]
    pub fn clean(&self, series: &TimeSeries) -> TimeSeries {
        if series.len() <= self.window {
            return series.clone();
        }

        let times = series.times();
        let values = series.values();

        let mut buffer: Vec<f64> = values.iter().take(self.window).copied().collect();
        let mut kept: Vec<(f64, f64)> = times
            .iter()
            .zip(values.iter())
            .take(self.window)
            .map(|(&t, &v)| (t, v))
            .collect();
        let mut insertions = self.window;
        let mut dropped = 0usize;

        for (&t, &s) in times.iter().zip(values.iter()).skip(self.window) {
            let median = median_of(&buffer);
            if s > median * (1.0 + self.tolerance) || s < median * (1.0 - self.tolerance) {
                dropped += 1;
                continue;
            }

            buffer[insertions % self.window] = s;
            insertions += 1;
            kept.push((t, s));
        }

        if dropped > 0 {
            debug!("median filter dropped {dropped} of {} samples", series.len());
        }

        TimeSeries::from_samples(kept)
    }

    /// Clean a voltage series, first discarding the startup transient.
    ///
    /// Leading samples at or below [`STARTUP_VOLTAGE_THRESHOLD`] are
    /// dropped before the buffer is seeded; they record the supply still
    /// being off, not the stack. A control run with a zero current
    /// setpoint keeps them, since there the supply is off by design.
    #[must_use]
    pub fn clean_voltage(&self, series: &TimeSeries, current_setpoint: f64) -> TimeSeries {
        if current_setpoint == 0.0 {
            return self.clean(series);
        }

        let leading = series
            .values()
            .iter()
            .take_while(|&&v| v <= STARTUP_VOLTAGE_THRESHOLD)
            .count();

        if leading > 0 {
            debug!("discarding {leading} startup voltage samples");
        }

        let trimmed = TimeSeries::from_samples(
            series
                .times()
                .iter()
                .zip(series.values().iter())
                .skip(leading)
                .map(|(&t, &v)| (t, v))
                .collect(),
        );

        self.clean(&trimmed)
    }
}

/// Median of a buffer: sort a copy, take the middle element.
fn median_of(buffer: &[f64]) -> f64 {
    let mut sorted = buffer.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted[sorted.len() / 2]
}
