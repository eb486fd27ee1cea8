//! Reporting utilities: residuals, reference-model comparisons, and formatted
//! terminal output.

pub mod format;

pub use format::*;

use rayon::prelude::*;

use crate::domain::{
    BinnedObservation, CosmoParams, CurvePoint, Observation, QuadSettings, ReferenceNormalizer, Residual,
};
use crate::error::AppError;
use crate::fit::chi_square_normalized;
use crate::models::{REFERENCE_MODELS, distance_modulus, reference_normalizers};

/// Chi-square of a fixed comparison model over a dataset.
#[derive(Debug, Clone)]
pub struct ReferenceChiSquare {
    pub label: String,
    pub params: CosmoParams,
    /// Model whose μ divides each squared residual.
    pub normalizer: CosmoParams,
    pub chi_square: f64,
}

/// Observations furthest from the fit on each side (top-N each).
#[derive(Debug, Clone)]
pub struct Outliers {
    /// Positive residual: fainter than the fit predicts.
    pub above: Vec<Residual>,
    /// Negative residual: brighter than the fit predicts.
    pub below: Vec<Residual>,
}

/// Fitted distance modulus and residual for each observation (input order).
pub fn compute_residuals(
    observations: &[Observation],
    params: &CosmoParams,
    quad: &QuadSettings,
) -> Result<Vec<Residual>, AppError> {
    observations
        .par_iter()
        .map(|o| {
            let mu_fit = distance_modulus(o.z, params, quad)?;
            Ok(Residual {
                observation: *o,
                mu_fit,
                residual: o.mu - mu_fit,
            })
        })
        .collect()
}

/// Residuals of the binned means, as `(z, μ_bin − μ_fit)` points.
pub fn bin_residuals(
    bins: &[BinnedObservation],
    params: &CosmoParams,
    quad: &QuadSettings,
) -> Result<Vec<CurvePoint>, AppError> {
    bins.par_iter()
        .map(|b| {
            let mu_fit = distance_modulus(b.z, params, quad)?;
            Ok(CurvePoint {
                z: b.z,
                mu: b.mu - mu_fit,
            })
        })
        .collect()
}

/// Chi-square of every reference model over the given observations.
pub fn reference_chi_squares(
    observations: &[Observation],
    normalizer: ReferenceNormalizer,
    quad: &QuadSettings,
) -> Result<Vec<ReferenceChiSquare>, AppError> {
    let z: Vec<f64> = observations.iter().map(|o| o.z).collect();
    let mu: Vec<f64> = observations.iter().map(|o| o.mu).collect();

    REFERENCE_MODELS
        .iter()
        .zip(reference_normalizers(normalizer))
        .map(|((label, params), norm)| {
            Ok(ReferenceChiSquare {
                label: label.to_string(),
                params: *params,
                normalizer: norm,
                chi_square: chi_square_normalized(params, &norm, &mu, &z, quad)?,
            })
        })
        .collect()
}

/// Distance modulus of each reference model minus the best fit, on `zs`.
pub fn reference_offsets(
    zs: &[f64],
    best: &CosmoParams,
    quad: &QuadSettings,
) -> Result<Vec<(String, Vec<CurvePoint>)>, AppError> {
    let fitted: Vec<f64> = zs
        .par_iter()
        .map(|&z| distance_modulus(z, best, quad))
        .collect::<Result<_, AppError>>()?;

    REFERENCE_MODELS
        .iter()
        .map(|(label, params)| {
            let offsets = zs
                .par_iter()
                .zip(fitted.par_iter())
                .map(|(&z, &mu_best)| {
                    let mu = distance_modulus(z, params, quad)?;
                    Ok(CurvePoint { z, mu: mu - mu_best })
                })
                .collect::<Result<Vec<_>, AppError>>()?;
            Ok((label.to_string(), offsets))
        })
        .collect()
}

/// Largest positive and negative residuals.
pub fn rank_outliers(residuals: &[Residual], top_n: usize) -> Outliers {
    let mut sorted = residuals.to_vec();
    sorted.sort_by(|a, b| b.residual.total_cmp(&a.residual));

    let above = sorted.iter().take(top_n).filter(|r| r.residual > 0.0).cloned().collect();
    let below = sorted
        .iter()
        .rev()
        .take(top_n)
        .filter(|r| r.residual < 0.0)
        .cloned()
        .collect();

    Outliers { above, below }
}
