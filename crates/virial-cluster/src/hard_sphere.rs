//! Known hard-sphere virial coefficients used as reference integrals.

use std::f64::consts::{PI, SQRT_2};

use virial_core::{ErrorInfo, VirialError};

/// Second virial coefficient `2πσ³/3`.
pub fn b2(sigma: f64) -> f64 {
    2.0 * PI * sigma.powi(3) / 3.0
}

/// Hard-sphere virial coefficient `B_n` for diameter `sigma`, n = 2..=12.
///
/// B2..B4 are exact; higher orders are literature Monte Carlo values in
/// units of `b0 = B2`.
pub fn reference_value(points: usize, sigma: f64) -> Result<f64, VirialError> {
    let b0 = b2(sigma);
    let value = match points {
        2 => b0,
        3 => 5.0 / 8.0 * b0 * b0,
        4 => {
            (219.0 * SQRT_2 / (2240.0 * PI) - 89.0 / 280.0
                + 4131.0 / (2240.0 * PI) * SQRT_2.atan())
                * b0.powi(3)
        }
        5 => 28.22445 * (b0 / 4.0).powi(4),
        6 => 39.81550 * (b0 / 4.0).powi(5),
        7 => 53.3413 * (b0 / 4.0).powi(6),
        8 => 68.540 * (b0 / 4.0).powi(7),
        9 => 0.0013094 * b0.powi(8),
        10 => 0.0004035 * b0.powi(9),
        11 => 0.198 * sigma.powi(30),
        12 => 0.090 * sigma.powi(33),
        _ => {
            return Err(VirialError::Config(
                ErrorInfo::new("hs-order", "no tabulated hard-sphere coefficient")
                    .with_context("points", points.to_string())
                    .with_hint("tabulated orders are 2 through 12"),
            ))
        }
    };
    Ok(value)
}
