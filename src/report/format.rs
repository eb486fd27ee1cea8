//! Formatted terminal output.
//!
//! All rendering goes through plain `String` builders so the numeric code
//! stays free of presentation concerns and the output is easy to test.

use crate::domain::{CurvePoint, FitConfig, FitSummary, Residual, TableFormat};
use crate::fit::FitOutcome;
use crate::io::ingest::IngestedData;
use crate::report::{Outliers, ReferenceChiSquare};

/// Format the full run summary (dataset stats + optimizer diagnostics + best fit).
pub fn format_run_summary(
    ingest: &IngestedData,
    n_bins: usize,
    outcome: &FitOutcome,
    summary: &FitSummary,
    config: &FitConfig,
) -> String {
    let mut out = String::new();

    out.push_str("=== cosmofit - constant-w dark energy fit ===\n");
    out.push_str(&format!(
        "Data: {} ({})\n",
        config.data_path.display(),
        match config.table.format {
            TableFormat::Mrt => "mrt",
            TableFormat::Csv => "csv",
        }
    ));
    out.push_str(&format!(
        "Rows: read={} used={} skipped={}\n",
        ingest.rows_read,
        ingest.rows_used,
        ingest.row_errors.len()
    ));
    out.push_str(&format!(
        "Points: n={} | z=[{:.4}, {:.4}] | mu=[{:.3}, {:.3}]\n",
        ingest.stats.n_points, ingest.stats.z_min, ingest.stats.z_max, ingest.stats.mu_min, ingest.stats.mu_max
    ));
    out.push_str(&format!(
        "Bins: {n_bins} x {} (dropped {} tail rows)\n",
        config.bin_size,
        ingest.rows_used.saturating_sub(n_bins * config.bin_size)
    ));

    out.push_str("\nOptimizer:\n");
    out.push_str(&format!(
        "- constraints: {}{}\n",
        summary.constraint_mode.display_name(),
        if summary.flat { " + flat" } else { "" }
    ));
    out.push_str(&format!("- start: {}\n", config.initial));
    out.push_str(&format!(
        "- reference normalizers: {}\n",
        config.reference_normalizer.display_name()
    ));
    out.push_str(&format!(
        "- iterations={} evaluations={} penalty_rounds={} max_violation={:.2e}\n",
        outcome.iterations, outcome.evaluations, outcome.penalty_rounds, outcome.max_violation
    ));

    out.push_str("\nBest fit:\n");
    out.push_str(&format!("- Omega_Lambda = {:.6}\n", summary.params.omega_lambda));
    out.push_str(&format!("- Omega_M      = {:.6}\n", summary.params.omega_m));
    out.push_str(&format!("- w            = {:.6}\n", summary.params.w));
    out.push_str(&format!(
        "- chi^2 (bins, n={}) = {:.6}\n",
        summary.n_fit_points, summary.chi_square
    ));
    out.push_str(&format!("- chi^2 (all data)    = {:.6}\n", summary.chi_square_full));
    out.push('\n');

    out
}

/// Format the reference-model chi-square table.
pub fn format_reference_table(references: &[ReferenceChiSquare], n_points: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("Reference models (n={n_points}):\n"));
    out.push_str(&format!(
        "{:<16} {:>8} {:>8} {:>8} {:>14}\n",
        "model", "OmegaL", "OmegaM", "w", "chi^2"
    ));
    out.push_str(&format!("{:-<16} {:-<8} {:-<8} {:-<8} {:-<14}\n", "", "", "", "", ""));
    for r in references {
        out.push_str(&format!(
            "{:<16} {:>8.3} {:>8.3} {:>8.3} {:>14.6}",
            r.label, r.params.omega_lambda, r.params.omega_m, r.params.w, r.chi_square
        ));
        if r.normalizer != r.params {
            out.push_str(&format!("  (normalized by {})", r.normalizer));
        }
        out.push('\n');
    }
    out
}

/// Format the outlier tables.
pub fn format_outliers(outliers: &Outliers) -> String {
    let mut out = String::new();

    out.push_str("Largest positive residuals (fainter than fit):\n");
    out.push_str(&format_table(&outliers.above));
    out.push('\n');

    out.push_str("Largest negative residuals (brighter than fit):\n");
    out.push_str(&format_table(&outliers.below));

    out
}

fn format_table(rows: &[Residual]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:>10} {:>10} {:>10} {:>10} {:>10}\n",
        "z", "mu_obs", "mu_err", "mu_fit", "residual"
    ));
    out.push_str(&format!("{:-<10} {:-<10} {:-<10} {:-<10} {:-<10}\n", "", "", "", "", ""));

    for r in rows {
        let o = &r.observation;
        out.push_str(&format!(
            "{:>10.5} {:>10.4} {:>10} {:>10.4} {:>10.4}\n",
            o.z,
            o.mu,
            o.mu_err.map(|v| format!("{v:.4}")).unwrap_or_else(|| "-".to_string()),
            r.mu_fit,
            r.residual
        ));
    }
    if rows.is_empty() {
        out.push_str("(none)\n");
    }

    out
}

/// Format a `(z, mu)` table, one row per curve point.
pub fn format_curve_table(points: &[CurvePoint]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{:>12} {:>12}\n", "z", "mu"));
    for p in points {
        out.push_str(&format!("{:>12.6} {:>12.6}\n", p.z, p.mu));
    }
    out
}
