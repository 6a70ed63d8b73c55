//! Hydrogen-like orbital probability densities on a polar (radius x polar
//! angle) grid.
//!
//! The core is [`grid::compute_density_field`]: given quantum numbers and a
//! grid it returns the density |psi|^2 at every sample of the phi = 0
//! meridian plane. Everything else serializes or samples that field.

pub mod config;
pub mod error;
pub mod export;
pub mod grid;
pub mod logging;
pub mod physics;
pub mod sampling;

pub use error::{DensityError, Result};
pub use grid::{compute_density_field, DensityEngine, DensityField, GridSpec, HydrogenEngine};
pub use physics::QuantumNumbers;
