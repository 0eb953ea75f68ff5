use num_traits::Float;

use crate::error::Error;
use crate::Result;

/// A measured or derived quantity with an absolute uncertainty.
///
/// The error component carries the same units as the value and is always
/// non-negative on construction. Instances are never mutated; every
/// operation builds a new one.
///
/// Propagation is first-order worst-case: relative errors of the two
/// operands add, for multiplication and division alike. This is
/// deliberately conservative and deliberately not quadrature.
///
/// # Examples
///
/// ```
/// use capture_metrics::uncertain::Uncertain;
///
/// let voltage = Uncertain::new(12.0, 0.6);
/// let current = Uncertain::exact(2.0);
/// let resistance = voltage.try_div(&current).unwrap();
///
/// assert_eq!(resistance.value(), 6.0);
/// assert_eq!(resistance.error(), 0.3);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Uncertain<E> {
    value: E,
    error: E,
}

impl<E: Float> Uncertain<E> {
    /// A quantity with a known absolute uncertainty.
    pub fn new(value: E, error: E) -> Self {
        debug_assert!(error >= E::zero(), "uncertainty must be non-negative");
        Self { value, error }
    }

    /// A constant with no measurement uncertainty.
    pub fn exact(value: E) -> Self {
        Self {
            value,
            error: E::zero(),
        }
    }

    pub const fn value(&self) -> E {
        self.value
    }

    pub const fn error(&self) -> E {
        self.error
    }

    /// Multiply two uncertain quantities, combining their relative errors.
    ///
    /// # Errors
    /// Returns [`Error::UndefinedOperation`] when either operand has a zero
    /// value, since its relative error is then undefined.
    pub fn try_mul(&self, rhs: &Self) -> Result<Self> {
        if self.value.is_zero() || rhs.value.is_zero() {
            return Err(Error::UndefinedOperation);
        }

        let value = self.value * rhs.value;
        let error = value * self.combined_relative_error(rhs);
        Ok(Self { value, error })
    }

    /// Divide two uncertain quantities, combining their relative errors.
    ///
    /// # Errors
    /// Returns [`Error::DivisionByZero`] when the divisor value is zero and
    /// [`Error::UndefinedOperation`] when the dividend value is zero.
    pub fn try_div(&self, rhs: &Self) -> Result<Self> {
        if rhs.value.is_zero() {
            return Err(Error::DivisionByZero);
        }
        if self.value.is_zero() {
            return Err(Error::UndefinedOperation);
        }

        let value = self.value / rhs.value;
        let error = value * self.combined_relative_error(rhs);
        Ok(Self { value, error })
    }

    fn combined_relative_error(&self, rhs: &Self) -> E {
        self.error / self.value + rhs.error / rhs.value
    }
}
