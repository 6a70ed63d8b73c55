//! Hydrogen atom quantum physics calculations
//! Based on the Schrödinger equation for hydrogen-like atoms
//!
//! All quantities are dimensionless (distances in units of a₀). The radial
//! part carries no factorial normalization: only its shape across r matters.

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::error::{DensityError, Result};

/// Represents quantum numbers (n, l, m)
/// n: Principal quantum number (1, 2, 3, ...)
/// l: Azimuthal quantum number (0 to n-1)
/// m: Magnetic quantum number (-l to l)
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct QuantumNumbers {
    pub n: u32,
    pub l: u32,
    pub m: i32,
}

impl QuantumNumbers {
    pub fn new(n: u32, l: u32, m: i32) -> Result<Self> {
        if n == 0 {
            return Err(DensityError::InvalidParameter(
                "principal quantum number n must be at least 1".to_string(),
            ));
        }
        if l >= n {
            return Err(DensityError::InvalidParameter(format!(
                "angular quantum number l={l} must be below n={n}"
            )));
        }
        if m.unsigned_abs() > l {
            return Err(DensityError::InvalidParameter(format!(
                "magnetic quantum number m={m} must satisfy |m| <= l={l}"
            )));
        }
        Ok(QuantumNumbers { n, l, m })
    }

    /// Spectroscopic label without m, e.g. "2p".
    pub fn name(&self) -> String {
        let l_char = match self.l {
            0 => 's',
            1 => 'p',
            2 => 'd',
            3 => 'f',
            4 => 'g',
            _ => 'h',
        };
        format!("{}{}", self.n, l_char)
    }

    /// Orbital presets by label. `m` is taken from the caller.
    pub fn preset(label: &str, m: i32) -> Result<Self> {
        let (n, l) = match label.trim().to_lowercase().as_str() {
            "1s" => (1, 0),
            "2s" => (2, 0),
            "2p" => (2, 1),
            "3s" => (3, 0),
            "3p" => (3, 1),
            "3d" => (3, 2),
            "4f" => (4, 3),
            other => {
                return Err(DensityError::InvalidParameter(format!(
                    "unknown orbital preset '{other}'"
                )))
            }
        };
        Self::new(n, l, m)
    }

    /// True when the Legendre recurrence hits a zero divisor (k == m for
    /// some k in 2..=l), which happens exactly for 2 <= m <= l.
    pub fn legendre_divisor_vanishes(&self) -> bool {
        self.m >= 2 && self.m as u32 <= self.l
    }
}

/// Radial wavefunction R_nl(r), unnormalized:
/// sqrt((2/n) * (2/n)^(l+1)) * rho^l * e^(-rho/2) * L^(2l+1)_(n-l-1)(rho), rho = 2r/n
///
/// Requires l < n; `QuantumNumbers::new` enforces it.
pub fn radial_wavefunction(n: u32, l: u32, r: f64) -> f64 {
    let n_f = n as f64;
    let rho = 2.0 * r / n_f;

    let envelope = rho.powf(l as f64) * (-rho / 2.0).exp();
    let poly = laguerre_polynomial(n - l - 1, 2 * l + 1, rho);
    let prefactor = ((2.0 / n_f) * (2.0 / n_f).powf((l + 1) as f64)).sqrt();

    prefactor * envelope * poly
}

/// Generalized Laguerre polynomial L^alpha_k(x)
///
/// Bottom-up form of the three-term recurrence
/// L_k = ((2k + alpha - 1 - x) L_{k-1} - (k - 1 + alpha) L_{k-2}) / k,
/// keeping only the last two terms.
pub fn laguerre_polynomial(k: u32, alpha: u32, x: f64) -> f64 {
    if k == 0 {
        return 1.0;
    }

    let mut l0 = 1.0;
    let mut l1 = (1 + alpha) as f64 - x;

    for i in 2..=k {
        let l_new =
            (((2 * i + alpha - 1) as f64 - x) * l1 - (i - 1 + alpha) as f64 * l0) / i as f64;
        l0 = l1;
        l1 = l_new;
    }

    l1
}

/// Associated Legendre value P_l^m(x) from the simplified recurrence
/// P_k = ((2k-1) x P_{k-1} - (k+m-1) P_{k-2}) / (k-m), seeded with P0 = 1, P1 = x.
///
/// This is not the textbook associated-Legendre recurrence and downstream
/// densities depend on it, so it is kept as is. A zero divisor (k == m)
/// is reported as a domain error instead of producing inf/NaN. For l = 0
/// the value is P0 = 1.
pub fn associated_legendre(l: u32, m: i32, x: f64) -> Result<f64> {
    if l == 0 {
        return Ok(1.0);
    }

    let mut p0 = 1.0;
    let mut p1 = x;

    for k in 2..=l as i64 {
        let divisor = k - m as i64;
        if divisor == 0 {
            return Err(DensityError::Domain { l, m, k: k as u32 });
        }
        let pk = ((2 * k - 1) as f64 * x * p1 - (k + m as i64 - 1) as f64 * p0) / divisor as f64;
        p0 = p1;
        p1 = pk;
    }

    Ok(p1)
}

/// Angular wavefunction
/// Y(l,m,theta,phi) = sqrt((2l+1)/(4pi) * (l-m)!/(l+m)!) * P_l^m(cos theta) * e^(i m phi)
pub fn angular_wavefunction(l: u32, m: i32, theta: f64, phi: f64) -> Result<Complex64> {
    if m.unsigned_abs() > l {
        return Err(DensityError::InvalidParameter(format!(
            "magnetic quantum number m={m} must satisfy |m| <= l={l}"
        )));
    }
    let plm = associated_legendre(l, m, theta.cos())?;

    let l_i = l as i64;
    let (upper, lower) = (l_i - m as i64, l_i + m as i64);
    let weight = (2 * l + 1) as f64 / (4.0 * PI);
    let norm = match (factorial(upper), factorial(lower)) {
        (Ok(num), Ok(den)) => (weight * num as f64 / den as f64).sqrt(),
        // Past 20! the integer factorials overflow; take the ratio in floating point.
        _ => (weight * factorial_ratio(upper as u64, lower as u64)).sqrt(),
    };

    let phase = Complex64::new(0.0, m as f64 * phi).exp();
    Ok(norm * plm * phase)
}

/// a! / b! as a floating-point product over the non-shared factors.
fn factorial_ratio(a: u64, b: u64) -> f64 {
    let span = |lo: u64, hi: u64| (lo + 1..=hi).map(|k| k as f64).product::<f64>();
    if a >= b {
        span(b, a)
    } else {
        1.0 / span(a, b)
    }
}

/// Probability density |psi|^2 = R^2 |Y|^2 at a point in spherical coordinates
pub fn probability_density(qn: QuantumNumbers, r: f64, theta: f64, phi: f64) -> Result<f64> {
    let radial = radial_wavefunction(qn.n, qn.l, r);
    let angular = angular_wavefunction(qn.l, qn.m, theta, phi)?.norm();

    Ok(radial * radial * angular * angular)
}

/// Factorial n! for 0 <= n <= 20
pub fn factorial(n: i64) -> Result<u64> {
    if n < 0 {
        return Err(DensityError::InvalidParameter(format!(
            "factorial of negative number {n}"
        )));
    }

    (1..=n as u64).try_fold(1u64, |acc, i| {
        acc.checked_mul(i)
            .ok_or(DensityError::FactorialOverflow(n as u32))
    })
}
