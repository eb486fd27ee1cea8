//! Redshift sorting and fixed-size binning.
//!
//! The fit runs on bin means rather than on raw observations: the sorted
//! sequence is cut into contiguous chunks of `bin_size` and each chunk becomes
//! one `(mean z, mean μ)` pair. The number of bins is `floor(n / bin_size)`;
//! a trailing partial chunk is dropped.

use crate::domain::{BinnedObservation, DatasetStats, Observation};
use crate::error::AppError;

/// Observations per bin used by the reference analysis.
pub const DEFAULT_BIN_SIZE: usize = 47;

/// Return a copy of `observations` sorted by ascending redshift.
///
/// The sort is stable so equal redshifts keep their input order.
pub fn sort_by_redshift(observations: &[Observation]) -> Vec<Observation> {
    let mut sorted = observations.to_vec();
    sorted.sort_by(|a, b| a.z.total_cmp(&b.z));
    sorted
}

/// Bin redshift-sorted observations into contiguous chunks of `bin_size`.
pub fn bin_observations(sorted: &[Observation], bin_size: usize) -> Result<Vec<BinnedObservation>, AppError> {
    if bin_size == 0 {
        return Err(AppError::config("Bin size must be > 0."));
    }

    Ok(sorted
        .chunks_exact(bin_size)
        .map(|chunk| {
            let n = chunk.len() as f64;
            let z = chunk.iter().map(|o| o.z).sum::<f64>() / n;
            let mu = chunk.iter().map(|o| o.mu).sum::<f64>() / n;
            BinnedObservation {
                z,
                mu,
                count: chunk.len(),
            }
        })
        .collect())
}

/// Range statistics over a set of observations.
pub fn compute_stats(observations: &[Observation]) -> Option<DatasetStats> {
    let mut z_min = f64::INFINITY;
    let mut z_max = f64::NEG_INFINITY;
    let mut mu_min = f64::INFINITY;
    let mut mu_max = f64::NEG_INFINITY;

    for o in observations {
        z_min = z_min.min(o.z);
        z_max = z_max.max(o.z);
        mu_min = mu_min.min(o.mu);
        mu_max = mu_max.max(o.mu);
    }

    if !z_min.is_finite() || !z_max.is_finite() || !mu_min.is_finite() || !mu_max.is_finite() {
        return None;
    }

    Some(DatasetStats {
        n_points: observations.len(),
        z_min,
        z_max,
        mu_min,
        mu_max,
    })
}
