//! Shared fit pipeline used by the CLI commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load -> sort -> bin -> reference check -> optimize -> residuals
//!
//! The commands can then focus on presentation (printing, plots, exports).

use tracing::info;

use crate::data::{bin_observations, sort_by_redshift};
use crate::domain::{BinnedObservation, CurvePoint, FitConfig, FitSummary, Residual};
use crate::error::AppError;
use crate::fit::{FitData, FitOutcome, chi_square, constraint_set, minimize_chi_square};
use crate::io::ingest::{IngestedData, load_observations};
use crate::report::{ReferenceChiSquare, bin_residuals, compute_residuals, reference_chi_squares};

/// All computed outputs of a single `cosmofit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Ingested data with observations sorted by redshift.
    pub ingest: IngestedData,
    pub bins: Vec<BinnedObservation>,
    pub references: Vec<ReferenceChiSquare>,
    pub outcome: FitOutcome,
    pub summary: FitSummary,
    pub residuals: Vec<Residual>,
    pub bin_residuals: Vec<CurvePoint>,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let ingest = load_observations(&config.data_path, &config.table)?;
    run_fit_on(ingest, config)
}

/// Execute the fitting pipeline on already ingested data.
pub fn run_fit_on(mut ingest: IngestedData, config: &FitConfig) -> Result<RunOutput, AppError> {
    ingest.observations = sort_by_redshift(&ingest.observations);

    let bins = bin_observations(&ingest.observations, config.bin_size)?;
    if bins.is_empty() {
        return Err(AppError::input(format!(
            "Need at least {} observations to form one bin (have {}).",
            config.bin_size,
            ingest.observations.len()
        )));
    }
    info!(bins = bins.len(), bin_size = config.bin_size, "binned observations");

    let references = reference_chi_squares(&ingest.observations, config.reference_normalizer, &config.quad)?;
    for r in &references {
        info!(model = %r.label, chi_square = r.chi_square, "reference model");
    }

    let z: Vec<f64> = bins.iter().map(|b| b.z).collect();
    let mu: Vec<f64> = bins.iter().map(|b| b.mu).collect();
    let constraints = constraint_set(config.constraint_mode, config.flat);

    let outcome = minimize_chi_square(
        FitData { z: &z, mu: &mu },
        &config.initial,
        &constraints,
        &config.quad,
        &config.optimizer,
    )?;
    info!(
        params = %outcome.params,
        chi_square = outcome.chi_square,
        iterations = outcome.iterations,
        evaluations = outcome.evaluations,
        "fit converged"
    );

    let all_z: Vec<f64> = ingest.observations.iter().map(|o| o.z).collect();
    let all_mu: Vec<f64> = ingest.observations.iter().map(|o| o.mu).collect();
    let chi_square_full = chi_square(&outcome.params, &all_mu, &all_z, &config.quad)?;

    let summary = FitSummary {
        params: outcome.params,
        chi_square: outcome.chi_square,
        chi_square_full,
        n_fit_points: bins.len(),
        constraint_mode: config.constraint_mode,
        flat: config.flat,
        iterations: outcome.iterations,
        evaluations: outcome.evaluations,
    };

    let residuals = compute_residuals(&ingest.observations, &outcome.params, &config.quad)?;
    let bin_residuals = bin_residuals(&bins, &outcome.params, &config.quad)?;

    Ok(RunOutput {
        ingest,
        bins,
        references,
        outcome,
        summary,
        residuals,
        bin_residuals,
    })
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::data::{SyntheticSpec, compute_stats, generate_observations};
    use crate::domain::{
        AxisScale, ConstraintMode, CosmoParams, OptimizerSettings, QuadSettings, ReferenceNormalizer, TableFormat,
        TableSpec,
    };

    fn config(bin_size: usize) -> FitConfig {
        FitConfig {
            data_path: PathBuf::from("unused.csv"),
            table: TableSpec {
                format: TableFormat::Csv,
                ..TableSpec::default()
            },
            bin_size,
            initial: CosmoParams::new(0.6, 0.4, -1.0),
            constraint_mode: ConstraintMode::FaithfulBug,
            reference_normalizer: ReferenceNormalizer::Faithful,
            flat: false,
            quad: QuadSettings::default(),
            optimizer: OptimizerSettings::default(),
            plot: false,
            plot_width: 80,
            plot_height: 20,
            x_scale: AxisScale::Log,
            export_results: None,
            export_curve: None,
        }
    }

    fn ingest(count: usize) -> IngestedData {
        let spec = SyntheticSpec {
            params: CosmoParams::LAMBDA_CDM,
            count,
            z_min: 0.02,
            z_max: 1.4,
            noise_sigma: 0.0,
            log_spaced: false,
            seed: 3,
        };
        let observations = generate_observations(&spec, &QuadSettings::default()).unwrap();
        let stats = compute_stats(&observations).unwrap();
        IngestedData {
            rows_read: count,
            rows_used: count,
            observations,
            stats,
            row_errors: Vec::new(),
        }
    }

    #[test]
    fn recovers_generating_parameters_end_to_end() {
        let run = run_fit_on(ingest(30), &config(1)).unwrap();

        assert_eq!(run.bins.len(), 30);
        assert_eq!(run.summary.params.w, -1.0);
        assert!((run.summary.params.omega_lambda - 0.7).abs() < 1e-3);
        assert!((run.summary.params.omega_m - 0.3).abs() < 1e-3);
        assert!(run.ingest.observations.windows(2).all(|w| w[0].z <= w[1].z));
        assert_eq!(run.references[2].chi_square, 0.0);
        assert_eq!(run.residuals.len(), 30);
    }

    #[test]
    fn bins_of_47_drop_the_tail() {
        let run = run_fit_on(ingest(100), &config(47)).unwrap();
        assert_eq!(run.bins.len(), 2);
        assert_eq!(run.summary.n_fit_points, 2);
        assert_eq!(run.references[1].normalizer, CosmoParams::MATTER_ONLY);
        assert_eq!(run.residuals.len(), 100);
        assert_eq!(run.summary.params.w, -1.0);
    }

    #[test]
    fn too_few_observations_is_input_error() {
        let err = run_fit_on(ingest(20), &config(47)).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }
}
