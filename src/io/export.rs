//! CSV exports.
//!
//! - per-observation residuals against the best fit
//! - observation tables (the `simulate` output), readable back by `fit --format csv`

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::domain::{FitSummary, Observation, Residual};
use crate::error::AppError;

/// Write per-observation residuals to a CSV file.
pub fn write_results_csv(path: &Path, residuals: &[Residual], summary: &FitSummary) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_results(file, residuals, summary)
}

fn write_results<W: Write>(mut out: W, residuals: &[Residual], summary: &FitSummary) -> Result<(), AppError> {
    writeln!(out, "z,mu_obs,mu_err,mu_fit,residual,omega_lambda,omega_m,w")
        .map_err(|e| AppError::io(format!("Failed to write export CSV header: {e}")))?;

    let p = &summary.params;
    for r in residuals {
        let o = &r.observation;
        writeln!(
            out,
            "{:.6},{:.6},{},{:.6},{:.6},{:.8},{:.8},{:.8}",
            o.z,
            o.mu,
            o.mu_err.map(|v| format!("{v:.6}")).unwrap_or_default(),
            r.mu_fit,
            r.residual,
            p.omega_lambda,
            p.omega_m,
            p.w,
        )
        .map_err(|e| AppError::io(format!("Failed to write export CSV row: {e}")))?;
    }

    Ok(())
}

/// Write observations as a `z,mu,mu_err` CSV.
pub fn write_observations_csv(path: &Path, observations: &[Observation]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create observation CSV '{}': {e}", path.display())))?;
    write_observations(file, observations)
}

pub fn write_observations<W: Write>(out: W, observations: &[Observation]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(["z", "mu", "mu_err"])
        .map_err(|e| AppError::io(format!("Failed to write observation CSV header: {e}")))?;

    for o in observations {
        let mu_err = o.mu_err.map(|v| v.to_string()).unwrap_or_default();
        writer
            .write_record([o.z.to_string(), o.mu.to_string(), mu_err])
            .map_err(|e| AppError::io(format!("Failed to write observation CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::io(format!("Failed to flush observation CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConstraintMode, CosmoParams, TableFormat, TableSpec};
    use crate::io::read_observations;

    #[test]
    fn observation_csv_reads_back_exactly() {
        let obs = vec![
            Observation {
                z: 0.123456789,
                mu: 38.987654321,
                mu_err: Some(0.15),
            },
            Observation {
                z: 1.2,
                mu: 44.1,
                mu_err: None,
            },
        ];
        let mut buf = Vec::new();
        write_observations(&mut buf, &obs).unwrap();

        let table = TableSpec {
            format: TableFormat::Csv,
            ..TableSpec::default()
        };
        let data = read_observations(buf.as_slice(), &table).unwrap();
        assert_eq!(data.observations, obs);
    }

    #[test]
    fn results_csv_has_one_row_per_residual() {
        let summary = FitSummary {
            params: CosmoParams::LAMBDA_CDM,
            chi_square: 0.01,
            chi_square_full: 0.2,
            n_fit_points: 14,
            constraint_mode: ConstraintMode::FaithfulBug,
            flat: false,
            iterations: 10,
            evaluations: 30,
        };
        let residuals = vec![Residual {
            observation: Observation {
                z: 0.5,
                mu: 42.3,
                mu_err: None,
            },
            mu_fit: 42.25,
            residual: 0.05,
        }];

        let mut buf = Vec::new();
        write_results(&mut buf, &residuals, &summary).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("z,mu_obs,mu_err"));
        assert_eq!(lines[1], "0.500000,42.300000,,42.250000,0.050000,0.70000000,0.30000000,-1.00000000");
    }
}
