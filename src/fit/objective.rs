//! Chi-square-style objective.
//!
//! The statistic divides each squared residual by the *model* value rather
//! than by a measurement variance:
//!
//! ```text
//! χ² = Σ_i (μ_obs,i − μ(z_i; θ))² / μ(z_i; θ)
//! ```
//!
//! Per-point model values are computed in parallel; the sum runs sequentially
//! in input order so the result is deterministic.

use rayon::prelude::*;

use crate::domain::{CosmoParams, QuadSettings};
use crate::error::AppError;
use crate::models::distance_modulus;

/// Objective value of `params` against paired `(z, μ_obs)` sequences.
///
/// An empty input scores zero.
pub fn chi_square(params: &CosmoParams, mu_obs: &[f64], z: &[f64], quad: &QuadSettings) -> Result<f64, AppError> {
    chi_square_normalized(params, params, mu_obs, z, quad)
}

/// Like [`chi_square`], but each term is divided by `normalizer`'s μ instead
/// of `params`' own.
pub fn chi_square_normalized(
    params: &CosmoParams,
    normalizer: &CosmoParams,
    mu_obs: &[f64],
    z: &[f64],
    quad: &QuadSettings,
) -> Result<f64, AppError> {
    if mu_obs.len() != z.len() {
        return Err(AppError::config(format!(
            "Objective inputs differ in length: {} observations vs {} redshifts.",
            mu_obs.len(),
            z.len()
        )));
    }

    let terms: Vec<f64> = z
        .par_iter()
        .zip(mu_obs.par_iter())
        .map(|(&zi, &obs)| {
            let model = distance_modulus(zi, params, quad)?;
            let scale = if normalizer == params {
                model
            } else {
                distance_modulus(zi, normalizer, quad)?
            };
            let r = obs - model;
            Ok(r * r / scale)
        })
        .collect::<Result<_, AppError>>()?;

    Ok(terms.iter().sum())
}
