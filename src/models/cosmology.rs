//! Distance-modulus model for the constant-w dark-energy family.
//!
//! The fitter relies on three primitive operations:
//! - the inverse Hubble rate `1 / H(z)`
//! - the luminosity distance, a quadrature of `1 / H` over `[0, z]`
//! - the distance modulus `5 · log10(d_L / 1e-5)`
//!
//! `H0` and `c` are calibration constants of the fitted dataset, not SI values;
//! the `/ 1000` scaling of `c` is part of that calibration.

use rayon::prelude::*;

use crate::domain::{AxisScale, CosmoParams, CurvePoint, QuadSettings, ReferenceNormalizer};
use crate::error::AppError;
use crate::math::integrate;

/// Hubble constant.
pub const H0: f64 = 71.0;

/// Speed of light as used by the distance scaling.
pub const SPEED_OF_LIGHT: f64 = 3e8;

/// Luminosity distance corresponding to μ = 0.
const MU_REFERENCE_DISTANCE: f64 = 1e-5;

/// `1 / H(z)` with `H(z) = H0 · sqrt(Ω_M (1+z)³ + Ω_Λ (1+z)^(3+3w))`.
///
/// Fails with a domain error when the radicand is not strictly positive.
pub fn inverse_hubble(z: f64, params: &CosmoParams) -> Result<f64, AppError> {
    let a = 1.0 + z;
    let radicand = params.omega_m * a.powi(3) + params.omega_lambda * a.powf(3.0 + 3.0 * params.w);
    if !(radicand.is_finite() && radicand > 0.0) {
        return Err(AppError::domain(
            z,
            format!("Hubble radicand {radicand} is not positive for {params}"),
        ));
    }
    Ok(1.0 / (H0 * radicand.sqrt()))
}

/// Luminosity distance `(1+z) · c / 1000 · ∫_0^z dz' / H(z')`.
pub fn luminosity_distance(z: f64, params: &CosmoParams, quad: &QuadSettings) -> Result<f64, AppError> {
    if !z.is_finite() || z < 0.0 {
        return Err(AppError::domain(z, "redshift must be finite and non-negative"));
    }
    let est = integrate(|x| inverse_hubble(x, params), 0.0, z, quad)?;
    Ok((1.0 + z) * SPEED_OF_LIGHT / 1000.0 * est.value)
}

/// Distance modulus `5 · log10(d_L / 1e-5)`.
///
/// Undefined at `z = 0` (zero distance); that and any other non-positive
/// distance is a domain error.
pub fn distance_modulus(z: f64, params: &CosmoParams, quad: &QuadSettings) -> Result<f64, AppError> {
    let dl = luminosity_distance(z, params, quad)?;
    if !(dl.is_finite() && dl > 0.0) {
        return Err(AppError::domain(
            z,
            format!("luminosity distance {dl} is not positive; distance modulus undefined"),
        ));
    }
    Ok(5.0 * (dl / MU_REFERENCE_DISTANCE).log10())
}

/// Sample the distance modulus at each redshift (order preserved).
pub fn model_curve(params: &CosmoParams, zs: &[f64], quad: &QuadSettings) -> Result<Vec<CurvePoint>, AppError> {
    zs.par_iter()
        .map(|&z| distance_modulus(z, params, quad).map(|mu| CurvePoint { z, mu }))
        .collect()
}

/// Comparison models reported next to every fit.
pub const REFERENCE_MODELS: [(&str, CosmoParams); 3] = [
    ("matter only", CosmoParams::MATTER_ONLY),
    ("partial matter", CosmoParams::PARTIAL_MATTER),
    ("ΛCDM", CosmoParams::LAMBDA_CDM),
];

/// Normalizer of each reference model, in `REFERENCE_MODELS` order, under the
/// given convention.
pub fn reference_normalizers(mode: ReferenceNormalizer) -> [CosmoParams; 3] {
    match mode {
        ReferenceNormalizer::Faithful => [
            CosmoParams::MATTER_ONLY,
            CosmoParams::MATTER_ONLY,
            CosmoParams::SWAPPED_LAMBDA_CDM,
        ],
        ReferenceNormalizer::Own => REFERENCE_MODELS.map(|(_, params)| params),
    }
}

/// `n` redshifts spanning `[z_min, z_max]`, evenly spaced on the given scale.
///
/// A degenerate or invalid range falls back to `[0.01, 2.0]`.
pub fn redshift_grid(z_min: f64, z_max: f64, n: usize, scale: AxisScale) -> Vec<f64> {
    let n = n.max(2);
    let (mut z0, mut z1) = (z_min, z_max);
    if !(z0.is_finite() && z1.is_finite() && z0 > 0.0) || z1 <= z0 {
        z0 = 0.01;
        z1 = 2.0;
    }

    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            match scale {
                AxisScale::Linear => z0 + u * (z1 - z0),
                AxisScale::Log => (z0.ln() + u * (z1.ln() - z0.ln())).exp(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> QuadSettings {
        QuadSettings::default()
    }

    #[test]
    fn inverse_hubble_at_zero_depends_only_on_density_sum() {
        for &(ol, om) in &[(0.7, 0.3), (0.0, 1.0), (1.2, 0.4), (0.05, 0.05)] {
            for &w in &[-1.5, -1.0, -0.3, 0.0, 0.8] {
                let p = CosmoParams::new(ol, om, w);
                let v = inverse_hubble(0.0, &p).unwrap();
                assert_eq!(v, 1.0 / (H0 * (om + ol).sqrt()), "ΩΛ={ol} ΩM={om} w={w}");
            }
        }
    }

    #[test]
    fn cosmological_constant_alone_gives_constant_rate() {
        let p = CosmoParams::new(1.0, 0.0, -1.0);
        for &z in &[0.0, 0.5, 2.0, 10.0] {
            assert_eq!(inverse_hubble(z, &p).unwrap(), 1.0 / H0);
        }
    }

    #[test]
    fn negative_radicand_is_domain_error() {
        let p = CosmoParams::new(-2.0, 0.3, -1.0);
        let err = inverse_hubble(0.0, &p).unwrap_err();
        assert!(matches!(err, AppError::Domain { .. }));

        let err = distance_modulus(0.5, &p, &quad()).unwrap_err();
        assert!(matches!(err, AppError::Domain { .. }));
    }

    #[test]
    fn matter_only_distance_modulus_matches_analytic_integral() {
        // ∫_0^z (1+x)^{-3/2} dx = 2 (1 - 1/sqrt(1+z))
        let p = CosmoParams::MATTER_ONLY;
        let z: f64 = 1.0;
        let integral = 2.0 * (1.0 - 1.0 / (1.0 + z).sqrt()) / H0;
        let dl_ref = (1.0 + z) * SPEED_OF_LIGHT / 1000.0 * integral;
        let mu_ref = 5.0 * (dl_ref / 1e-5).log10();

        let mu = distance_modulus(z, &p, &quad()).unwrap();
        assert!(((mu - mu_ref) / mu_ref).abs() < 1e-6, "mu={mu} ref={mu_ref}");
        assert!((mu - 43.4732).abs() < 1e-3, "mu={mu}");
    }

    #[test]
    fn luminosity_distance_increases_with_redshift() {
        for p in [CosmoParams::LAMBDA_CDM, CosmoParams::MATTER_ONLY, CosmoParams::new(0.4, 0.9, -0.6)] {
            let mut prev = luminosity_distance(0.0, &p, &quad()).unwrap();
            assert_eq!(prev, 0.0);
            for i in 1..=60 {
                let z = i as f64 * 0.05;
                let dl = luminosity_distance(z, &p, &quad()).unwrap();
                assert!(dl > prev, "d_L not increasing at z={z} for {p}");
                prev = dl;
            }
        }
    }

    #[test]
    fn distance_modulus_undefined_at_zero_redshift() {
        let err = distance_modulus(0.0, &CosmoParams::LAMBDA_CDM, &quad()).unwrap_err();
        assert!(matches!(err, AppError::Domain { .. }));
    }

    #[test]
    fn negative_redshift_is_rejected() {
        let err = luminosity_distance(-0.1, &CosmoParams::LAMBDA_CDM, &quad()).unwrap_err();
        assert!(matches!(err, AppError::Domain { .. }));
    }

    #[test]
    fn model_curve_preserves_order() {
        let zs = [0.01, 0.1, 0.5, 1.0, 1.5];
        let curve = model_curve(&CosmoParams::LAMBDA_CDM, &zs, &quad()).unwrap();
        assert_eq!(curve.len(), zs.len());
        for (pt, &z) in curve.iter().zip(zs.iter()) {
            assert_eq!(pt.z, z);
            assert_eq!(pt.mu, distance_modulus(z, &CosmoParams::LAMBDA_CDM, &quad()).unwrap());
        }
        assert!(curve.windows(2).all(|w| w[1].mu > w[0].mu));
    }

    #[test]
    fn redshift_grid_spans_range() {
        let lin = redshift_grid(0.1, 1.1, 11, AxisScale::Linear);
        assert_eq!(lin.len(), 11);
        assert!((lin[5] - 0.6).abs() < 1e-12);
        assert!((lin[10] - 1.1).abs() < 1e-12);

        let log = redshift_grid(0.01, 1.0, 3, AxisScale::Log);
        assert!((log[1] - 0.1).abs() < 1e-12);

        let fallback = redshift_grid(0.0, 0.0, 2, AxisScale::Linear);
        assert_eq!(fallback[0], 0.01);
        assert!((fallback[1] - 2.0).abs() < 1e-12);
    }
}
