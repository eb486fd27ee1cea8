//! Command-line parsing for the cosmological parameter fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the modeling/math code.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{AxisScale, ConstraintMode, ReferenceNormalizer, TableFormat};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "cosmofit", version, about = "Supernova distance-modulus fitter for constant-w dark energy")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit (ΩΛ, ΩM, w) to binned observations and print diagnostics.
    Fit(FitArgs),
    /// Chi-square of the reference models over the full dataset.
    Sanity(SanityArgs),
    /// Evaluate the distance modulus for given parameters on a redshift grid.
    Curve(CurveArgs),
    /// Write a synthetic observation CSV drawn from given parameters.
    Simulate(SimulateArgs),
    /// Plot a previously exported curve JSON.
    Plot(PlotArgs),
}

/// Where the observations come from and how to read them.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Observation table (falls back to `COSMOFIT_DATA`, also read from `.env`).
    #[arg(short = 'd', long, env = "COSMOFIT_DATA", value_name = "FILE")]
    pub data: PathBuf,

    /// Table layout.
    #[arg(long, value_enum, default_value_t = TableFormat::Mrt)]
    pub format: TableFormat,

    /// Leading non-blank lines to skip before data rows (mrt).
    #[arg(long, default_value_t = 127)]
    pub skip_lines: usize,

    /// Zero-based redshift column (mrt).
    #[arg(long, default_value_t = 10)]
    pub z_col: usize,

    /// Zero-based distance-modulus column (mrt).
    #[arg(long, default_value_t = 47)]
    pub mu_col: usize,

    /// Zero-based distance-modulus uncertainty column (mrt).
    #[arg(long, default_value_t = 48)]
    pub mu_err_col: usize,

    /// Ignore the uncertainty column.
    #[arg(long)]
    pub no_mu_err: bool,
}

/// Quadrature tolerances shared by every command that evaluates the model.
#[derive(Debug, Args, Clone)]
pub struct QuadArgs {
    /// Absolute tolerance of the distance integral.
    #[arg(long, default_value_t = 1.49e-8)]
    pub quad_abs_tol: f64,

    /// Relative tolerance of the distance integral.
    #[arg(long, default_value_t = 1.49e-8)]
    pub quad_rel_tol: f64,

    /// Maximum number of quadrature subintervals.
    #[arg(long, default_value_t = 50)]
    pub quad_max_intervals: usize,
}

/// Options for fitting.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub quad: QuadArgs,

    /// Observations per redshift bin.
    #[arg(long, default_value_t = 47)]
    pub bin_size: usize,

    /// Initial ΩΛ.
    #[arg(long, default_value_t = 0.7, allow_negative_numbers = true)]
    pub omega_lambda: f64,

    /// Initial ΩM.
    #[arg(long, default_value_t = 0.3, allow_negative_numbers = true)]
    pub omega_m: f64,

    /// Initial w.
    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    pub w: f64,

    /// Which constraint set to enforce.
    #[arg(long, value_enum, default_value_t = ConstraintMode::FaithfulBug)]
    pub constraints: ConstraintMode,

    /// Also enforce flatness (ΩΛ + ΩM = 1).
    #[arg(long)]
    pub flat: bool,

    /// Normalizers for the reference-model chi-squares.
    #[arg(long, value_enum, default_value_t = ReferenceNormalizer::Faithful)]
    pub reference_normalizer: ReferenceNormalizer,

    /// Nelder-Mead iteration cap per penalty round.
    #[arg(long, default_value_t = 5000)]
    pub max_iters: u64,

    /// Simplex convergence tolerance (std. dev. of vertex costs).
    #[arg(long, default_value_t = 1e-12)]
    pub tol: f64,

    /// Maximum number of inequality penalty rounds.
    #[arg(long, default_value_t = 6)]
    pub penalty_rounds: usize,

    /// Largest constraint violation accepted at the solution.
    #[arg(long, default_value_t = 1e-6)]
    pub feasibility_tol: f64,

    /// Show the N largest residuals on each side.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    /// Disable the terminal plots.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Redshift axis scale in plots.
    #[arg(long, value_enum, default_value_t = AxisScale::Log)]
    pub x_scale: AxisScale,

    /// Export per-observation residuals to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export fit + fitted/reference grids to JSON.
    #[arg(long = "export-curve")]
    pub export_curve: Option<PathBuf>,
}

/// Options for the reference-model check.
#[derive(Debug, Args, Clone)]
pub struct SanityArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Normalizers for the reference-model chi-squares.
    #[arg(long, value_enum, default_value_t = ReferenceNormalizer::Faithful)]
    pub reference_normalizer: ReferenceNormalizer,

    #[command(flatten)]
    pub quad: QuadArgs,
}

/// Options for evaluating a model curve.
#[derive(Debug, Args, Clone)]
pub struct CurveArgs {
    #[arg(long, default_value_t = 0.7, allow_negative_numbers = true)]
    pub omega_lambda: f64,

    #[arg(long, default_value_t = 0.3, allow_negative_numbers = true)]
    pub omega_m: f64,

    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    pub w: f64,

    /// Explicit redshifts (comma-separated); overrides the grid.
    #[arg(long, value_delimiter = ',')]
    pub z: Vec<f64>,

    #[arg(long, default_value_t = 0.01)]
    pub z_min: f64,

    #[arg(long, default_value_t = 2.0)]
    pub z_max: f64,

    /// Grid points between `--z-min` and `--z-max`.
    #[arg(long, default_value_t = 20)]
    pub points: usize,

    #[arg(long, value_enum, default_value_t = AxisScale::Log)]
    pub scale: AxisScale,

    #[command(flatten)]
    pub quad: QuadArgs,
}

/// Options for synthetic data generation.
#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Output CSV path.
    #[arg(short, long, value_name = "CSV")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 0.7, allow_negative_numbers = true)]
    pub omega_lambda: f64,

    #[arg(long, default_value_t = 0.3, allow_negative_numbers = true)]
    pub omega_m: f64,

    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    pub w: f64,

    /// Number of observations.
    #[arg(short = 'n', long, default_value_t = 658)]
    pub count: usize,

    #[arg(long, default_value_t = 0.01)]
    pub z_min: f64,

    #[arg(long, default_value_t = 2.3)]
    pub z_max: f64,

    /// Gaussian noise on μ (magnitudes).
    #[arg(long, default_value_t = 0.15)]
    pub noise: f64,

    /// Draw redshifts log-uniformly.
    #[arg(long)]
    pub log_spaced: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[command(flatten)]
    pub quad: QuadArgs,
}

/// Options for plotting a saved curve.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Curve JSON file produced by `cosmofit fit --export-curve`.
    #[arg(long, value_name = "JSON")]
    pub curve: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    #[arg(long, value_enum, default_value_t = AxisScale::Log)]
    pub x_scale: AxisScale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_defaults() {
        let cli = Cli::try_parse_from(["cosmofit", "fit", "--data", "sn.txt"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.data.data, PathBuf::from("sn.txt"));
        assert_eq!(args.data.skip_lines, 127);
        assert_eq!(args.bin_size, 47);
        assert_eq!(args.w, -1.0);
        assert_eq!(args.constraints, ConstraintMode::FaithfulBug);
        assert!(!args.flat);
        assert_eq!(args.reference_normalizer, ReferenceNormalizer::Faithful);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn global_verbosity_and_negative_values() {
        let cli = Cli::try_parse_from([
            "cosmofit",
            "-vv",
            "fit",
            "-d",
            "sn.csv",
            "--format",
            "csv",
            "--w",
            "-0.8",
            "--constraints",
            "last-entry",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.w, -0.8);
        assert_eq!(args.data.format, TableFormat::Csv);
        assert_eq!(args.constraints, ConstraintMode::LastEntry);
    }

    #[test]
    fn sanity_accepts_own_normalizer() {
        let cli =
            Cli::try_parse_from(["cosmofit", "sanity", "-d", "sn.txt", "--reference-normalizer", "own"]).unwrap();
        let Command::Sanity(args) = cli.command else {
            panic!("expected sanity");
        };
        assert_eq!(args.reference_normalizer, ReferenceNormalizer::Own);
    }

    #[test]
    fn curve_accepts_explicit_redshift_list() {
        let cli = Cli::try_parse_from(["cosmofit", "curve", "--z", "0.1,0.5,1.0"]).unwrap();
        let Command::Curve(args) = cli.command else {
            panic!("expected curve");
        };
        assert_eq!(args.z, vec![0.1, 0.5, 1.0]);
    }
}
