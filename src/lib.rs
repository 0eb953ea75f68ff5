//! Reduction of raw time-series logs from electrochemical CO2-capture
//! experiments into scalar and time-resolved performance metrics with
//! propagated measurement uncertainty.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod contactor;
pub mod crossover;
pub mod electrodialysis;
pub mod error;
pub mod filter;
pub mod logs;
pub mod metadata;
pub mod reduction;
pub mod regression;
pub mod series;
pub mod uncertain;
pub mod windowed;

pub use error::Error;

pub type Result<T> = ::std::result::Result<T, Error>;
