//! Read/write curve JSON files.
//!
//! Curve JSON is the portable representation of a fit:
//! - fitted parameters and chi-square figures
//! - the fitted distance modulus on a redshift grid
//! - the reference models sampled on the same grid
//!
//! The schema is defined by `domain::CurveFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{AxisScale, CurveFile, CurveGrid, DatasetStats, FitSummary, QuadSettings, ReferenceCurve};
use crate::error::AppError;
use crate::models::{REFERENCE_MODELS, model_curve, redshift_grid};

/// Points in the exported redshift grid.
const GRID_POINTS: usize = 101;

/// Sample the fit and the reference models over the observed redshift range.
pub fn build_curve_file(summary: &FitSummary, stats: &DatasetStats, quad: &QuadSettings) -> Result<CurveFile, AppError> {
    let z = redshift_grid(stats.z_min, stats.z_max, GRID_POINTS, AxisScale::Log);
    let mu = model_curve(&summary.params, &z, quad)?.into_iter().map(|p| p.mu).collect();

    let references = REFERENCE_MODELS
        .iter()
        .map(|(label, params)| {
            Ok(ReferenceCurve {
                label: label.to_string(),
                params: *params,
                mu: model_curve(params, &z, quad)?.into_iter().map(|p| p.mu).collect(),
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    Ok(CurveFile {
        tool: "cosmofit".to_string(),
        created: Utc::now(),
        fit: summary.clone(),
        grid: CurveGrid { z, mu },
        references,
    })
}

/// Write a curve JSON file.
pub fn write_curve_json(path: &Path, curve: &CurveFile) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create curve JSON '{}': {e}", path.display())))?;

    serde_json::to_writer_pretty(file, curve).map_err(|e| AppError::io(format!("Failed to write curve JSON: {e}")))?;

    Ok(())
}

/// Read a curve JSON file.
pub fn read_curve_json(path: &Path) -> Result<CurveFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open curve JSON '{}': {e}", path.display())))?;
    let curve: CurveFile =
        serde_json::from_reader(file).map_err(|e| AppError::io(format!("Invalid curve JSON: {e}")))?;

    if curve.grid.z.len() != curve.grid.mu.len() || curve.references.iter().any(|r| r.mu.len() != curve.grid.z.len()) {
        return Err(AppError::io("Invalid curve JSON: grid arrays differ in length."));
    }
    Ok(curve)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConstraintMode, CosmoParams};

    fn summary() -> FitSummary {
        FitSummary {
            params: CosmoParams::new(0.72, 0.28, -1.0),
            chi_square: 0.004,
            chi_square_full: 0.31,
            n_fit_points: 14,
            constraint_mode: ConstraintMode::FaithfulBug,
            flat: false,
            iterations: 80,
            evaluations: 170,
        }
    }

    fn stats() -> DatasetStats {
        DatasetStats {
            n_points: 658,
            z_min: 0.01,
            z_max: 2.3,
            mu_min: 33.0,
            mu_max: 46.0,
        }
    }

    #[test]
    fn curve_file_carries_grid_and_references() {
        let curve = build_curve_file(&summary(), &stats(), &QuadSettings::default()).unwrap();
        assert_eq!(curve.grid.z.len(), GRID_POINTS);
        assert_eq!(curve.grid.mu.len(), GRID_POINTS);
        assert!((curve.grid.z[0] - 0.01).abs() < 1e-12);
        assert_eq!(curve.references.len(), 3);
        assert_eq!(curve.references[2].label, "ΛCDM");
    }

    #[test]
    fn json_round_trip_through_file() {
        let curve = build_curve_file(&summary(), &stats(), &QuadSettings::default()).unwrap();
        let path = std::env::temp_dir().join(format!("cosmofit-curve-{}.json", std::process::id()));
        write_curve_json(&path, &curve).unwrap();
        let back = read_curve_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert!((back.fit.params.omega_lambda - 0.72).abs() < 1e-12);
        assert_eq!(back.fit.params.w, -1.0);
        assert_eq!(back.grid.z.len(), curve.grid.z.len());
        for (a, b) in back.grid.mu.iter().zip(&curve.grid.mu) {
            assert!((a - b).abs() < 1e-9);
        }
        assert_eq!(back.references[0].label, "matter only");
        assert_eq!(back.fit.constraint_mode, ConstraintMode::FaithfulBug);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_curve_json(Path::new("/nonexistent/cosmofit.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
