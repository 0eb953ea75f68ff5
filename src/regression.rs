use ndarray::ArrayView1;
use num_traits::Float;

use crate::error::Error;
use crate::Result;

/// Slope and intercept of an ordinary least-squares line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearFit<E> {
    pub slope: E,
    pub intercept: E,
}

impl<E: Float> LinearFit<E> {
    pub fn evaluate(&self, x: E) -> E {
        self.slope * x + self.intercept
    }
}

/// Fit a straight line through `(x, y)` by ordinary least squares.
///
/// Uses the first `min(len(x), len(y))` samples of each series.
///
/// # Errors
/// Returns [`Error::EmptySeries`] when no samples are available and
/// [`Error::DegenerateFit`] when all `x` values are identical.
///
/// # Examples
///
/// ```
/// use capture_metrics::regression::fit_line;
/// use ndarray::array;
///
/// let x = array![0.0f64, 1.0, 2.0, 3.0];
/// let y = array![3.0f64, 5.0, 7.0, 9.0];
/// let fit = fit_line(x.view(), y.view()).unwrap();
///
/// assert!((fit.slope - 2.0).abs() < 1e-12);
/// assert!((fit.intercept - 3.0).abs() < 1e-12);
/// ```
pub fn fit_line<E: Float>(x: ArrayView1<E>, y: ArrayView1<E>) -> Result<LinearFit<E>> {
    let length = x.len().min(y.len());
    if length == 0 {
        return Err(Error::EmptySeries);
    }

    let mut x_total = E::zero();
    let mut y_total = E::zero();
    let mut x_squared_total = E::zero();
    let mut xy_total = E::zero();

    for n in 0..length {
        x_total = x_total + x[n];
        y_total = y_total + y[n];
        x_squared_total = x_squared_total + x[n] * x[n];
        xy_total = xy_total + x[n] * y[n];
    }

    let n = E::from(length).expect("series length fits in a float");
    let x_bar = x_total / n;
    let y_bar = y_total / n;

    let sxx = x_squared_total - n * x_bar * x_bar;
    let sxy = xy_total - n * x_bar * y_bar;

    if sxx.is_zero() {
        return Err(Error::DegenerateFit);
    }

    let slope = sxy / sxx;
    let intercept = y_bar - slope * x_bar;

    Ok(LinearFit { slope, intercept })
}
