//! Point clouds drawn from a computed density field.
//!
//! Points live in the sampled meridian half-plane: x = r sin(theta),
//! z = r cos(theta), y = 0.

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::grid::DensityField;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CloudPoint {
    pub position: [f64; 3],
    pub density: f64,
}

fn meridian_point(r: f64, theta: f64) -> [f64; 3] {
    [r * theta.sin(), 0.0, r * theta.cos()]
}

/// Every grid cell whose density is strictly above `threshold`.
pub fn points_above(field: &DensityField, threshold: f64) -> Vec<CloudPoint> {
    let grid = field.grid();
    field
        .rows()
        .enumerate()
        .flat_map(|(i, row)| {
            row.iter().enumerate().filter_map(move |(j, &density)| {
                (density > threshold).then(|| CloudPoint {
                    position: meridian_point(grid.radius_at(i), grid.theta_at(j)),
                    density,
                })
            })
        })
        .collect()
}

/// Rejection sampling over grid cells, accepting a cell with probability
/// density / max. Accepted points are jittered uniformly inside their cell.
/// The same seed always yields the same cloud.
pub fn sample_points(field: &DensityField, count: usize, seed: u64) -> Vec<CloudPoint> {
    let max = field.max();
    if max <= 0.0 || count == 0 {
        return Vec::new();
    }

    let grid = field.grid();
    let size = grid.size;
    let dr = grid.radial_step();
    let dtheta = std::f64::consts::PI / size as f64;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = Vec::with_capacity(count);
    let max_attempts = count * 100; // Prevent infinite loops
    let mut attempts = 0;

    while samples.len() < count && attempts < max_attempts {
        attempts += 1;

        let i = rng.gen_range(0..size);
        let j = rng.gen_range(0..size);
        let density = field.get(i, j).unwrap_or(0.0);

        if rng.gen::<f64>() * max < density {
            let r = grid.radius_at(i) + rng.gen::<f64>() * dr;
            let theta = grid.theta_at(j) + rng.gen::<f64>() * dtheta;
            samples.push(CloudPoint {
                position: meridian_point(r, theta),
                density,
            });
        }
    }

    debug!(
        "sampled {} of {} requested points in {} attempts",
        samples.len(),
        count,
        attempts
    );
    samples
}
