//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - reloaded later for plotting or comparisons

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Parameters of the constant-w dark-energy family.
///
/// Flattened to a vector the order is `(Ω_Λ, Ω_M, w)`; the optimizer and the
/// constraint definitions rely on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CosmoParams {
    pub omega_lambda: f64,
    pub omega_m: f64,
    pub w: f64,
}

impl CosmoParams {
    /// Number of entries in the flattened parameter vector.
    pub const LEN: usize = 3;

    /// Flat ΛCDM with a cosmological constant.
    pub const LAMBDA_CDM: CosmoParams = CosmoParams {
        omega_lambda: 0.7,
        omega_m: 0.3,
        w: -1.0,
    };

    /// Einstein–de Sitter: matter only, no dark energy.
    pub const MATTER_ONLY: CosmoParams = CosmoParams {
        omega_lambda: 0.0,
        omega_m: 1.0,
        w: 0.0,
    };

    /// Open matter-only universe with `Ω_M = 0.7`.
    pub const PARTIAL_MATTER: CosmoParams = CosmoParams {
        omega_lambda: 0.0,
        omega_m: 0.7,
        w: 0.0,
    };

    /// ΛCDM with the two densities exchanged (`Ω_Λ = 0.3`, `Ω_M = 0.7`).
    pub const SWAPPED_LAMBDA_CDM: CosmoParams = CosmoParams {
        omega_lambda: 0.3,
        omega_m: 0.7,
        w: -1.0,
    };

    pub fn new(omega_lambda: f64, omega_m: f64, w: f64) -> Self {
        Self {
            omega_lambda,
            omega_m,
            w,
        }
    }

    pub fn to_vec(self) -> Vec<f64> {
        vec![self.omega_lambda, self.omega_m, self.w]
    }

    /// Rebuild from a flattened `(Ω_Λ, Ω_M, w)` slice.
    pub fn from_slice(x: &[f64]) -> Option<Self> {
        match x {
            [omega_lambda, omega_m, w] => Some(Self::new(*omega_lambda, *omega_m, *w)),
            _ => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.omega_lambda.is_finite() && self.omega_m.is_finite() && self.w.is_finite()
    }
}

impl fmt::Display for CosmoParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ΩΛ={:.4} ΩM={:.4} w={:.4}",
            self.omega_lambda, self.omega_m, self.w
        )
    }
}

/// A single supernova observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Redshift (> 0 after ingest validation).
    pub z: f64,
    /// Observed distance modulus.
    pub mu: f64,
    /// Reported uncertainty of `mu`. Carried for exports; the objective ignores it.
    pub mu_err: Option<f64>,
}

/// Mean redshift and mean distance modulus over a contiguous chunk of
/// redshift-sorted observations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinnedObservation {
    pub z: f64,
    pub mu: f64,
    pub count: usize,
}

/// One `(z, μ_model)` sample of a model curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub z: f64,
    pub mu: f64,
}

/// Observed vs fitted distance modulus for one observation.
#[derive(Debug, Clone)]
pub struct Residual {
    pub observation: Observation,
    pub mu_fit: f64,
    pub residual: f64,
}

/// Which constraint set the optimizer enforces.
///
/// The reference analysis declared its constraints in one mapping literal
/// with a repeated key, so only a single entry ever reached its optimizer.
/// The modes reproduce either reading of that declaration, or the intended
/// set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ConstraintMode {
    /// Only `w + 1 = 0` is active (w pinned to -1).
    FaithfulBug,
    /// `w + 1 = 0`, `Ω_Λ ≥ 0` and `Ω_M ≥ 0` are all active.
    Corrected,
    /// Only `Ω_M ≥ 0` is active: the last entry of the mapping literal.
    LastEntry,
}

impl ConstraintMode {
    pub fn display_name(self) -> &'static str {
        match self {
            ConstraintMode::FaithfulBug => "faithful-bug (w pinned)",
            ConstraintMode::Corrected => "corrected (w pinned, ΩΛ≥0, ΩM≥0)",
            ConstraintMode::LastEntry => "last-entry (ΩM≥0)",
        }
    }
}

/// What the reference-model chi-squares divide each squared residual by.
///
/// The reference analysis normalized two of its comparison models by a
/// different model's μ; `faithful` keeps those pairings so its printed numbers
/// can be reproduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceNormalizer {
    /// Matter-only μ for the first two models, density-swapped ΛCDM μ for ΛCDM.
    Faithful,
    /// Every model is normalized by its own μ.
    Own,
}

impl ReferenceNormalizer {
    pub fn display_name(self) -> &'static str {
        match self {
            ReferenceNormalizer::Faithful => "faithful (mixed normalizers)",
            ReferenceNormalizer::Own => "own model",
        }
    }
}

/// Layout of the observation table on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// Whitespace-delimited machine-readable table with positional columns.
    Mrt,
    /// Headered CSV (`z`, `mu`, optional `mu_err`).
    Csv,
}

/// Scale of the redshift axis in terminal plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AxisScale {
    Log,
    Linear,
}

/// How to find the observation columns in the input table.
#[derive(Debug, Clone)]
pub struct TableSpec {
    pub format: TableFormat,
    /// Leading non-blank lines to skip before data rows (`mrt` only).
    pub skip_lines: usize,
    /// Zero-based column holding the object name (`mrt` only).
    pub id_col: Option<usize>,
    /// Zero-based column of the redshift (`mrt` only).
    pub z_col: usize,
    /// Zero-based column of the distance modulus (`mrt` only).
    pub mu_col: usize,
    /// Zero-based column of the distance-modulus uncertainty (`mrt` only).
    pub mu_err_col: Option<usize>,
}

impl Default for TableSpec {
    fn default() -> Self {
        Self {
            format: TableFormat::Mrt,
            skip_lines: 127,
            id_col: Some(2),
            z_col: 10,
            mu_col: 47,
            mu_err_col: Some(48),
        }
    }
}

/// Adaptive quadrature tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadSettings {
    pub abs_tol: f64,
    pub rel_tol: f64,
    /// Maximum number of subintervals before giving up.
    pub max_intervals: usize,
}

impl Default for QuadSettings {
    fn default() -> Self {
        Self {
            abs_tol: 1.49e-8,
            rel_tol: 1.49e-8,
            max_intervals: 50,
        }
    }
}

/// Optimizer budget and tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizerSettings {
    /// Nelder–Mead iteration cap per penalty round.
    pub max_iters: u64,
    /// Convergence threshold on the standard deviation of simplex costs.
    pub sd_tolerance: f64,
    /// Penalty weight of the first round.
    pub penalty_start: f64,
    /// Factor applied to the penalty weight between rounds.
    pub penalty_growth: f64,
    /// Maximum number of penalty rounds.
    pub max_penalty_rounds: usize,
    /// Largest inequality violation accepted at the solution.
    pub feasibility_tol: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            max_iters: 5_000,
            sd_tolerance: 1e-12,
            penalty_start: 1e3,
            penalty_growth: 100.0,
            max_penalty_rounds: 6,
            feasibility_tol: 1e-6,
        }
    }
}

/// Summary stats about the observations actually used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStats {
    pub n_points: usize,
    pub z_min: f64,
    pub z_max: f64,
    pub mu_min: f64,
    pub mu_max: f64,
}

/// A full run’s configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub data_path: PathBuf,
    pub table: TableSpec,
    pub bin_size: usize,

    pub initial: CosmoParams,
    pub constraint_mode: ConstraintMode,
    pub reference_normalizer: ReferenceNormalizer,
    /// Add the flatness equality `Ω_Λ + Ω_M = 1`.
    pub flat: bool,

    pub quad: QuadSettings,
    pub optimizer: OptimizerSettings,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,
    pub x_scale: AxisScale,

    pub export_results: Option<PathBuf>,
    pub export_curve: Option<PathBuf>,
}

/// Fitted parameters plus the figures needed to judge them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSummary {
    pub params: CosmoParams,
    /// Objective value on the fitted (binned) data.
    pub chi_square: f64,
    /// Objective value of the same parameters on the full dataset.
    pub chi_square_full: f64,
    pub n_fit_points: usize,
    pub constraint_mode: ConstraintMode,
    pub flat: bool,
    pub iterations: u64,
    pub evaluations: u64,
}

/// A saved curve file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub created: DateTime<Utc>,
    pub fit: FitSummary,
    pub grid: CurveGrid,
    /// Reference models sampled on the same redshift grid.
    pub references: Vec<ReferenceCurve>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub z: Vec<f64>,
    pub mu: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceCurve {
    pub label: String,
    pub params: CosmoParams,
    pub mu: Vec<f64>,
}
