//! Polar sampling grid and the density field computed over it.
//!
//! The grid covers a single meridian half-plane (phi = 0): radius along one
//! axis, polar angle along the other. It is not a 3D volume.

use std::f64::consts::PI;

use log::{debug, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{DensityError, Result};
use crate::physics::{angular_wavefunction, radial_wavefunction, QuantumNumbers};

/// Azimuthal angle of the sampled meridian plane.
pub const MERIDIAN_PHI: f64 = 0.0;

/// gridSize x gridSize lattice over [0, max_radius) x [0, pi)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub size: usize,
    pub max_radius: f64,
}

impl GridSpec {
    pub fn new(size: usize, max_radius: f64) -> Result<Self> {
        if size == 0 {
            return Err(DensityError::InvalidParameter(
                "grid size must be at least 1".to_string(),
            ));
        }
        if !(max_radius.is_finite() && max_radius > 0.0) {
            return Err(DensityError::InvalidParameter(format!(
                "max radius must be a positive finite number, got {max_radius}"
            )));
        }
        Ok(GridSpec { size, max_radius })
    }

    pub fn radial_step(&self) -> f64 {
        self.max_radius / self.size as f64
    }

    /// r_i = i * (max_radius / size)
    pub fn radius_at(&self, i: usize) -> f64 {
        i as f64 * self.radial_step()
    }

    /// theta_j = pi * j / size
    pub fn theta_at(&self, j: usize) -> f64 {
        PI * j as f64 / self.size as f64
    }

    pub fn cell_count(&self) -> usize {
        self.size * self.size
    }
}

/// Row-major grid of probability densities, indexed by (radius, angle)
///
/// `values` always holds exactly `grid.size * grid.size` cells; the only ways
/// in are [`compute_density_field`] and [`DensityField::from_values`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityField {
    state: QuantumNumbers,
    grid: GridSpec,
    values: Vec<f64>,
}

impl DensityField {
    /// Wraps precomputed densities, e.g. a field cached by a caller.
    pub fn from_values(state: QuantumNumbers, grid: GridSpec, values: Vec<f64>) -> Result<Self> {
        let state = QuantumNumbers::new(state.n, state.l, state.m)?;
        let grid = GridSpec::new(grid.size, grid.max_radius)?;
        if values.len() != grid.cell_count() {
            return Err(DensityError::InvalidParameter(format!(
                "expected {} density values for a {}x{} grid, got {}",
                grid.cell_count(),
                grid.size,
                grid.size,
                values.len()
            )));
        }
        Ok(DensityField { state, grid, values })
    }

    pub fn state(&self) -> QuantumNumbers {
        self.state
    }

    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        if i >= self.grid.size || j >= self.grid.size {
            return None;
        }
        self.values.get(i * self.grid.size + j).copied()
    }

    /// All angle samples at radius index `i`.
    pub fn row(&self, i: usize) -> Option<&[f64]> {
        let size = self.grid.size;
        if i >= size {
            return None;
        }
        self.values.get(i * size..(i + 1) * size)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.values.chunks(self.grid.size.max(1))
    }

    pub fn size(&self) -> usize {
        self.grid.size
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

/// Anything that can turn quantum numbers and a grid into a density field.
///
/// Implementations hold no mutable state, so one instance can be shared by
/// every caller (renderers, the web service, tests).
pub trait DensityEngine: Send + Sync {
    fn density_field(&self, state: QuantumNumbers, grid: GridSpec) -> Result<DensityField>;
}

/// Hydrogen-like density over the meridian grid.
#[derive(Debug, Clone, Copy, Default)]
pub struct HydrogenEngine {
    /// Compute radius rows on the rayon pool instead of the calling thread.
    pub parallel: bool,
}

impl HydrogenEngine {
    pub fn sequential() -> Self {
        Self { parallel: false }
    }

    pub fn parallel() -> Self {
        Self { parallel: true }
    }
}

impl DensityEngine for HydrogenEngine {
    fn density_field(&self, state: QuantumNumbers, grid: GridSpec) -> Result<DensityField> {
        compute_density_field(state, grid, self.parallel)
    }
}

fn validate(state: QuantumNumbers, grid: GridSpec) -> Result<()> {
    // Both types are constructible field-by-field, so re-check here.
    QuantumNumbers::new(state.n, state.l, state.m)?;
    GridSpec::new(grid.size, grid.max_radius)?;

    if state.legendre_divisor_vanishes() {
        return Err(DensityError::Domain {
            l: state.l,
            m: state.m,
            k: state.m as u32,
        });
    }
    Ok(())
}

/// density[i, j] = R(r_i)^2 * |Y(theta_j, phi=0)|^2
///
/// Fails before touching any cell if the inputs are invalid, and rejects
/// the whole field if any cell comes out non-finite.
pub fn compute_density_field(
    state: QuantumNumbers,
    grid: GridSpec,
    parallel: bool,
) -> Result<DensityField> {
    validate(state, grid)?;
    debug!(
        "computing {} density (n={}, l={}, m={}) on {}x{} grid, r_max={}, parallel={}",
        state.name(),
        state.n,
        state.l,
        state.m,
        grid.size,
        grid.size,
        grid.max_radius,
        parallel
    );

    let size = grid.size;

    // Radial and angular factors are separable; evaluate each axis once.
    let radial: Vec<f64> = (0..size)
        .map(|i| radial_wavefunction(state.n, state.l, grid.radius_at(i)))
        .collect();
    let angular = (0..size)
        .map(|j| {
            angular_wavefunction(state.l, state.m, grid.theta_at(j), MERIDIAN_PHI).map(|y| y.norm())
        })
        .collect::<Result<Vec<f64>>>()?;

    let fill_row = |(i, row): (usize, &mut [f64])| -> Result<()> {
        let radial_part = radial[i];
        for (j, cell) in row.iter_mut().enumerate() {
            let magnitude = angular[j];
            let psi = radial_part * radial_part * magnitude * magnitude;
            if !psi.is_finite() {
                return Err(DensityError::NonFinite { i, j, value: psi });
            }
            *cell = psi;
        }
        Ok(())
    };

    let mut values = vec![0.0; grid.cell_count()];
    if parallel {
        values.par_chunks_mut(size).enumerate().try_for_each(fill_row)?;
    } else {
        values.chunks_mut(size).enumerate().try_for_each(fill_row)?;
    }

    let field = DensityField {
        state,
        grid,
        values,
    };
    trace!("density field ready, max={:e}", field.max());
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(n: u32, l: u32, m: i32) -> QuantumNumbers {
        QuantumNumbers::new(n, l, m).unwrap()
    }

    #[test]
    fn test_grid_spec_validation() {
        assert!(GridSpec::new(1, 0.5).is_ok());
        assert!(matches!(GridSpec::new(0, 1.0), Err(DensityError::InvalidParameter(_))));
        assert!(matches!(GridSpec::new(10, 0.0), Err(DensityError::InvalidParameter(_))));
        assert!(matches!(GridSpec::new(10, -2.0), Err(DensityError::InvalidParameter(_))));
        assert!(GridSpec::new(10, f64::NAN).is_err());
        assert!(GridSpec::new(10, f64::INFINITY).is_err());
    }

    #[test]
    fn test_grid_coordinates() {
        let grid = GridSpec::new(4, 2.0).unwrap();
        assert_eq!(grid.radius_at(0), 0.0);
        assert_eq!(grid.radius_at(3), 1.5);
        assert_eq!(grid.theta_at(0), 0.0);
        assert_eq!(grid.theta_at(2), PI / 2.0);
        assert!(grid.theta_at(3) < PI);
    }

    #[test]
    fn test_field_shape_and_accessors() {
        let grid = GridSpec::new(6, 3.0).unwrap();
        let field = compute_density_field(state(2, 0, 0), grid, false).unwrap();
        assert_eq!(field.len(), 36);
        assert_eq!(field.rows().count(), 6);
        assert_eq!(field.row(2).unwrap().len(), 6);
        assert_eq!(field.get(2, 5), Some(field.values()[2 * 6 + 5]));
        assert_eq!(field.get(6, 0), None);
        assert_eq!(field.get(0, 6), None);
        assert!(field.row(6).is_none());
    }

    #[test]
    fn test_s_orbital_is_isotropic() {
        let grid = GridSpec::new(8, 4.0).unwrap();
        let field = compute_density_field(state(1, 0, 0), grid, false).unwrap();
        for row in field.rows() {
            assert!(row.iter().all(|&v| v == row[0]));
        }
        // 1s density falls off monotonically with r
        let first_column: Vec<f64> = field.rows().map(|row| row[0]).collect();
        assert!(first_column.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let grid = GridSpec::new(17, 9.0).unwrap();
        for qn in [state(1, 0, 0), state(3, 1, -1), state(4, 3, 1), state(4, 2, -2)] {
            let seq = compute_density_field(qn, grid, false).unwrap();
            let par = compute_density_field(qn, grid, true).unwrap();
            assert_eq!(seq, par);
        }
    }

    #[test]
    fn test_domain_error_before_computation() {
        let grid = GridSpec::new(5, 1.0).unwrap();
        let err = compute_density_field(state(3, 2, 2), grid, false).unwrap_err();
        assert!(matches!(err, DensityError::Domain { l: 2, m: 2, k: 2 }));
    }

    #[test]
    fn test_unvalidated_inputs_are_rejected() {
        let bad_state = QuantumNumbers { n: 1, l: 1, m: 0 };
        let grid = GridSpec::new(5, 1.0).unwrap();
        assert!(matches!(
            compute_density_field(bad_state, grid, false),
            Err(DensityError::InvalidParameter(_))
        ));

        let bad_grid = GridSpec { size: 0, max_radius: 1.0 };
        assert!(matches!(
            HydrogenEngine::sequential().density_field(state(1, 0, 0), bad_grid),
            Err(DensityError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_engine_as_trait_object() {
        let engines: Vec<Box<dyn DensityEngine>> = vec![
            Box::new(HydrogenEngine::sequential()),
            Box::new(HydrogenEngine::parallel()),
        ];
        let grid = GridSpec::new(3, 1.0).unwrap();
        let fields: Vec<DensityField> = engines
            .iter()
            .map(|e| e.density_field(state(2, 1, 0), grid).unwrap())
            .collect();
        assert_eq!(fields[0], fields[1]);
    }

    #[test]
    fn test_field_from_values_checks_shape() {
        let grid = GridSpec::new(3, 1.0).unwrap();
        let field = DensityField::from_values(state(2, 1, 0), grid, vec![0.5; 9]).unwrap();
        assert_eq!(field.state(), state(2, 1, 0));
        assert_eq!(field.grid(), grid);
        assert_eq!(field.row(2), Some(&[0.5, 0.5, 0.5][..]));
        assert_eq!(field.get(2, 2), Some(0.5));

        // A short buffer must never reach the row/get accessors.
        assert!(matches!(
            DensityField::from_values(state(2, 1, 0), grid, vec![0.5; 2]),
            Err(DensityError::InvalidParameter(_))
        ));
        assert!(matches!(
            DensityField::from_values(state(2, 1, 0), GridSpec { size: 0, max_radius: 1.0 }, vec![]),
            Err(DensityError::InvalidParameter(_))
        ));
        assert!(matches!(
            DensityField::from_values(QuantumNumbers { n: 1, l: 3, m: 0 }, grid, vec![0.5; 9]),
            Err(DensityError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_states_past_integer_factorials() {
        // (l+m)! and (l-m)! exceed u64 for these; the field must still come back.
        let grid = GridSpec::new(6, 40.0).unwrap();
        for qn in [state(22, 21, 0), state(12, 11, -10), state(22, 21, -1)] {
            let field = compute_density_field(qn, grid, false).unwrap();
            assert_eq!(field.len(), 36);
            assert!(field.values().iter().all(|v| v.is_finite() && *v >= 0.0));
            assert!(field.max() > 0.0);
        }
    }
}
