//! Forecast-driven load transfer recommendations for interconnected feeders.
//!
//! Given forecasts for an overloaded feeder and each of its adjacent partners,
//! the advisory engine computes hourly transfer amounts, labels the resulting
//! risk and ranks partners from safest to riskiest.

pub mod advisor;
pub mod config;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod repo;
pub mod telemetry;

pub use error::{AdvisorError, AdvisorResult};
