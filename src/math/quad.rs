//! Adaptive Gauss–Kronrod quadrature.
//!
//! Each interval is integrated with the 15-point Kronrod rule; the embedded
//! 7-point Gauss rule provides the error estimate. While the summed error
//! exceeds `max(abs_tol, rel_tol · |I|)` the interval with the largest error is
//! bisected.
//!
//! Numerical notes:
//! - The error estimate uses the QUADPACK scaling
//!   `resasc · min(1, (200 · |K − G| / resasc)^1.5)`, which is far less
//!   pessimistic than `|K − G|` on smooth integrands.
//! - The integrand is fallible so model domain errors surface unchanged.

use crate::domain::QuadSettings;
use crate::error::AppError;

/// Kronrod abscissae on `[0, 1]` (descending); index 7 is the center.
const XGK: [f64; 8] = [
    0.991_455_371_120_812_639_206_854_697_526_329,
    0.949_107_912_342_758_524_526_189_684_047_851,
    0.864_864_423_359_769_072_789_712_788_640_926,
    0.741_531_185_599_394_439_863_864_773_280_788,
    0.586_087_235_467_691_130_294_144_845_693_013,
    0.405_845_151_377_397_166_906_606_412_076_961,
    0.207_784_955_007_898_467_600_689_403_773_245,
    0.0,
];

/// Kronrod weights matching `XGK`.
const WGK: [f64; 8] = [
    0.022_935_322_010_529_224_963_732_008_058_970,
    0.063_092_092_629_978_553_290_700_663_189_204,
    0.104_790_010_322_250_183_839_876_322_541_518,
    0.140_653_259_715_525_918_745_189_590_510_238,
    0.169_004_726_639_267_902_826_583_426_598_550,
    0.190_350_578_064_785_409_913_256_402_421_014,
    0.204_432_940_075_298_892_414_161_999_234_649,
    0.209_482_141_084_727_828_012_999_174_891_714,
];

/// Gauss weights for the odd Kronrod nodes `XGK[1], XGK[3], XGK[5]` and the center.
const WG: [f64; 4] = [
    0.129_484_966_168_869_693_270_611_432_679_082,
    0.279_705_391_489_276_667_901_467_771_423_780,
    0.381_830_050_505_118_944_950_369_775_488_975,
    0.417_959_183_673_469_387_755_102_040_816_327,
];

/// Result of an adaptive integration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadEstimate {
    pub value: f64,
    pub abs_err: f64,
    pub intervals: usize,
    pub evaluations: usize,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    a: f64,
    b: f64,
    value: f64,
    err: f64,
}

/// Integrate `f` over `[a, b]`.
///
/// `b < a` is allowed and yields the negated integral over `[b, a]`.
pub fn integrate<F>(mut f: F, a: f64, b: f64, settings: &QuadSettings) -> Result<QuadEstimate, AppError>
where
    F: FnMut(f64) -> Result<f64, AppError>,
{
    if !(a.is_finite() && b.is_finite()) {
        return Err(AppError::config(format!(
            "Quadrature bounds must be finite (got [{a}, {b}])."
        )));
    }
    if settings.max_intervals == 0 {
        return Err(AppError::config("Quadrature needs at least one subinterval."));
    }
    if a == b {
        return Ok(QuadEstimate {
            value: 0.0,
            abs_err: 0.0,
            intervals: 0,
            evaluations: 0,
        });
    }

    let mut evaluations = 0usize;
    let first = kronrod15(&mut f, a, b, &mut evaluations)?;
    let mut segments = vec![first];

    loop {
        let value: f64 = segments.iter().map(|s| s.value).sum();
        let abs_err: f64 = segments.iter().map(|s| s.err).sum();

        if !(value.is_finite() && abs_err.is_finite()) {
            return Err(AppError::Integration {
                lower: a,
                upper: b,
                abs_err,
                intervals: segments.len(),
            });
        }

        let tolerance = settings.abs_tol.max(settings.rel_tol * value.abs());
        if abs_err <= tolerance {
            return Ok(QuadEstimate {
                value,
                abs_err,
                intervals: segments.len(),
                evaluations,
            });
        }

        if segments.len() >= settings.max_intervals {
            return Err(AppError::Integration {
                lower: a,
                upper: b,
                abs_err,
                intervals: segments.len(),
            });
        }

        // Bisect the worst segment.
        let worst = segments
            .iter()
            .enumerate()
            .max_by(|x, y| x.1.err.total_cmp(&y.1.err))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let seg = segments.swap_remove(worst);
        let mid = 0.5 * (seg.a + seg.b);
        if mid == seg.a || mid == seg.b {
            // Interval can no longer be split in floating point.
            return Err(AppError::Integration {
                lower: a,
                upper: b,
                abs_err,
                intervals: segments.len() + 1,
            });
        }
        segments.push(kronrod15(&mut f, seg.a, mid, &mut evaluations)?);
        segments.push(kronrod15(&mut f, mid, seg.b, &mut evaluations)?);
    }
}

fn kronrod15<F>(f: &mut F, a: f64, b: f64, evaluations: &mut usize) -> Result<Segment, AppError>
where
    F: FnMut(f64) -> Result<f64, AppError>,
{
    let center = 0.5 * (a + b);
    let half = 0.5 * (b - a);
    let abs_half = half.abs();

    let fc = f(center)?;
    let mut res_g = fc * WG[3];
    let mut res_k = fc * WGK[7];
    let mut res_abs = res_k.abs();

    let mut fv1 = [0.0; 7];
    let mut fv2 = [0.0; 7];

    for j in 0..7 {
        let absc = half * XGK[j];
        let f1 = f(center - absc)?;
        let f2 = f(center + absc)?;
        fv1[j] = f1;
        fv2[j] = f2;
        res_k += WGK[j] * (f1 + f2);
        res_abs += WGK[j] * (f1.abs() + f2.abs());
        if j % 2 == 1 {
            res_g += WG[j / 2] * (f1 + f2);
        }
    }
    *evaluations += 15;

    let mean = res_k * 0.5;
    let mut res_asc = WGK[7] * (fc - mean).abs();
    for j in 0..7 {
        res_asc += WGK[j] * ((fv1[j] - mean).abs() + (fv2[j] - mean).abs());
    }

    let value = res_k * half;
    res_abs *= abs_half;
    res_asc *= abs_half;

    let mut err = ((res_k - res_g) * half).abs();
    if res_asc != 0.0 && err != 0.0 {
        err = res_asc * (200.0 * err / res_asc).powf(1.5).min(1.0);
    }
    if res_abs > f64::MIN_POSITIVE / (50.0 * f64::EPSILON) {
        err = err.max(50.0 * f64::EPSILON * res_abs);
    }

    Ok(Segment { a, b, value, err })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrates_polynomial_exactly() {
        // GK15 is exact for polynomials up to degree 22.
        let est = integrate(|x| Ok(3.0 * x * x + 2.0 * x + 1.0), 0.0, 2.0, &QuadSettings::default()).unwrap();
        assert!((est.value - 14.0).abs() < 1e-12, "got {}", est.value);
        assert_eq!(est.intervals, 1);
        assert_eq!(est.evaluations, 15);
    }

    #[test]
    fn integrates_smooth_transcendental() {
        let est = integrate(|x| Ok(x.sin()), 0.0, std::f64::consts::PI, &QuadSettings::default()).unwrap();
        assert!((est.value - 2.0).abs() < 1e-10);
    }

    #[test]
    fn reversed_bounds_negate() {
        let s = QuadSettings::default();
        let fwd = integrate(|x| Ok(x.exp()), 0.0, 1.0, &s).unwrap();
        let rev = integrate(|x| Ok(x.exp()), 1.0, 0.0, &s).unwrap();
        assert!((fwd.value + rev.value).abs() < 1e-14);
    }

    #[test]
    fn empty_interval_is_zero_without_evaluation() {
        let est = integrate(|_| Err(AppError::domain(0.0, "must not be called")), 1.0, 1.0, &QuadSettings::default())
            .unwrap();
        assert_eq!(est.value, 0.0);
        assert_eq!(est.evaluations, 0);
    }

    #[test]
    fn subdivides_near_singularity() {
        // ∫_0^1 x^{-1/2} dx = 2; the endpoint singularity forces bisection.
        let s = QuadSettings {
            abs_tol: 1e-10,
            rel_tol: 1e-10,
            max_intervals: 200,
        };
        let est = integrate(|x| Ok(1.0 / x.sqrt()), 0.0, 1.0, &s).unwrap();
        assert!((est.value - 2.0).abs() < 1e-8, "got {}", est.value);
        assert!(est.intervals > 1);
    }

    #[test]
    fn interval_budget_exhaustion_is_integration_error() {
        let s = QuadSettings {
            abs_tol: 1e-14,
            rel_tol: 1e-14,
            max_intervals: 2,
        };
        let err = integrate(|x| Ok(1.0 / x.sqrt()), 0.0, 1.0, &s).unwrap_err();
        assert!(matches!(err, AppError::Integration { intervals: 2, .. }), "got {err:?}");
    }

    #[test]
    fn integrand_errors_propagate() {
        let err = integrate(
            |x| if x > 0.5 { Err(AppError::domain(x, "bad")) } else { Ok(1.0) },
            0.0,
            1.0,
            &QuadSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Domain { .. }));
    }
}
