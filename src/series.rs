use log::warn;
use ndarray::{Array1, ArrayView1};
use num_traits::{Float, FromPrimitive};

use crate::uncertain::Uncertain;

/// An ordered sequence of `(seconds since experiment start, value)` samples.
///
/// Timestamps are strictly increasing and relative to a shared origin. Gaps
/// are permitted; nothing is ever interpolated. The two arrays always have
/// equal length.
#[derive(Clone, Debug, Default)]
pub struct TimeSeries {
    times: Array1<f64>,
    values: Array1<f64>,
}

impl TimeSeries {
    /// # Panics
    /// Panics if the two arrays differ in length.
    pub fn new(times: Array1<f64>, values: Array1<f64>) -> Self {
        assert_eq!(
            times.len(),
            values.len(),
            "time and value arrays must have equal length"
        );
        Self { times, values }
    }

    pub fn from_samples(samples: Vec<(f64, f64)>) -> Self {
        let (times, values) = samples.into_iter().unzip::<_, _, Vec<_>, Vec<_>>();
        Self {
            times: Array1::from_vec(times),
            values: Array1::from_vec(values),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn times(&self) -> ArrayView1<'_, f64> {
        self.times.view()
    }

    pub fn values(&self) -> ArrayView1<'_, f64> {
        self.values.view()
    }

    pub fn mean(&self) -> Option<f64> {
        self.values.mean()
    }

    /// Sample standard deviation (n - 1 denominator). `NaN` for fewer than
    /// two samples.
    #[must_use]
    pub fn std(&self) -> f64 {
        if self.len() < 2 {
            return f64::NAN;
        }
        self.values.std(1.0)
    }

    /// Elapsed time between the first and last sample, zero when fewer than
    /// two samples exist.
    #[must_use]
    pub fn duration(&self) -> f64 {
        if self.len() < 2 {
            return 0.0;
        }
        self.times[self.len() - 1] - self.times[0]
    }

    /// The contiguous sub-series with timestamps in `[from, to]`, both ends
    /// inclusive.
    #[must_use]
    pub fn slice_time(&self, from: f64, to: f64) -> Self {
        let times = self.times.as_slice().unwrap_or(&[]);
        let start = times.partition_point(|&t| t < from);
        let end = times.partition_point(|&t| t <= to);
        Self {
            times: self.times.slice(ndarray::s![start..end]).to_owned(),
            values: self.values.slice(ndarray::s![start..end]).to_owned(),
        }
    }
}

/// Integrate `y` with respect to `x` by summing trapezium areas between
/// consecutive samples.
///
/// A length mismatch between the two series is a tolerated inconsistency:
/// the longer is truncated and a diagnostic is logged. Fewer than two
/// usable samples integrate to `(0.0, 0.0)`.
///
/// The error estimate is `n * stddev(y)` with `n` the full length of `y`,
/// a coarse dispersion-proportional indicator rather than a confidence
/// interval. Downstream consumers compare its magnitude between
/// experiments, so its semantics are fixed.
pub fn integrate<E: Float + FromPrimitive>(x: ArrayView1<E>, y: ArrayView1<E>) -> Uncertain<E> {
    let mut length = x.len();
    if x.len() != y.len() {
        warn!(
            "integration: lengths of x and y series do not match ({} vs {})",
            x.len(),
            y.len()
        );
        length = x.len().min(y.len());
    }

    if length <= 1 {
        return Uncertain::exact(E::zero());
    }

    let two = E::one() + E::one();
    let mut integral = E::zero();
    for n in 1..length {
        let area = (y[n - 1] + y[n]) / two * (x[n] - x[n - 1]);
        integral = integral + area;
    }

    let n = E::from(y.len()).expect("series length fits in a float");
    let error = n * sample_std(y);
    Uncertain::new(integral, error)
}

fn sample_std<E: Float + FromPrimitive>(y: ArrayView1<E>) -> E {
    if y.len() < 2 {
        return E::nan();
    }
    y.std(E::one())
}
