//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initializes logging
//! - dispatches to the selected command
//! - prints reports/plots and writes optional exports

use clap::Parser;
use tracing::{debug, info};

use crate::cli::{Cli, Command, CurveArgs, DataArgs, FitArgs, PlotArgs, QuadArgs, SanityArgs, SimulateArgs};
use crate::data::{SyntheticSpec, generate_observations};
use crate::domain::{CosmoParams, FitConfig, OptimizerSettings, QuadSettings, TableSpec};
use crate::error::AppError;
use crate::io::ingest::load_observations;
use crate::models::{REFERENCE_MODELS, model_curve, redshift_grid};

pub mod pipeline;

/// Entry point for the `cosmofit` binary.
pub fn run() -> Result<(), AppError> {
    // A missing `.env` is fine; it only supplies defaults such as COSMOFIT_DATA.
    let env_file = dotenvy::dotenv().ok();

    let cli = Cli::parse();
    crate::logging::init(cli.verbose);
    if let Some(path) = env_file {
        debug!(path = %path.display(), "loaded environment file");
    }

    match cli.command {
        Command::Fit(args) => handle_fit(&args),
        Command::Sanity(args) => handle_sanity(&args),
        Command::Curve(args) => handle_curve(&args),
        Command::Simulate(args) => handle_simulate(&args),
        Command::Plot(args) => handle_plot(&args),
    }
}

fn handle_fit(args: &FitArgs) -> Result<(), AppError> {
    let config = fit_config_from_args(args)?;
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.ingest, run.bins.len(), &run.outcome, &run.summary, &config)
    );
    println!(
        "{}",
        crate::report::format_reference_table(&run.references, run.ingest.stats.n_points)
    );
    println!(
        "{}",
        crate::report::format_outliers(&crate::report::rank_outliers(&run.residuals, args.top))
    );

    if config.plot {
        let zs: Vec<f64> = run.ingest.observations.iter().map(|o| o.z).collect();
        let best = model_curve(&run.summary.params, &zs, &config.quad)?;
        let references = REFERENCE_MODELS
            .iter()
            .map(|(label, params)| Ok((label.to_string(), model_curve(params, &zs, &config.quad)?)))
            .collect::<Result<Vec<_>, AppError>>()?;
        let offsets = crate::report::reference_offsets(&zs, &run.summary.params, &config.quad)?;

        println!(
            "{}",
            crate::plot::render_fit_plot(
                &run.ingest.observations,
                &run.bins,
                &best,
                &references,
                config.plot_width,
                config.plot_height,
                config.x_scale,
            )
        );
        println!(
            "{}",
            crate::plot::render_residual_plot(
                &run.residuals,
                &run.bin_residuals,
                &offsets,
                config.plot_width,
                config.plot_height,
                config.x_scale,
            )
        );
    }

    // Optional exports.
    if let Some(path) = &config.export_results {
        crate::io::export::write_results_csv(path, &run.residuals, &run.summary)?;
        info!(path = %path.display(), "wrote residual CSV");
    }
    if let Some(path) = &config.export_curve {
        let curve = crate::io::curve::build_curve_file(&run.summary, &run.ingest.stats, &config.quad)?;
        crate::io::curve::write_curve_json(path, &curve)?;
        info!(path = %path.display(), "wrote curve JSON");
    }

    Ok(())
}

fn handle_sanity(args: &SanityArgs) -> Result<(), AppError> {
    let table = table_spec_from_args(&args.data);
    let quad = quad_settings_from_args(&args.quad)?;
    let ingest = load_observations(&args.data.data, &table)?;

    let references = crate::report::reference_chi_squares(&ingest.observations, args.reference_normalizer, &quad)?;
    println!(
        "{}",
        crate::report::format_reference_table(&references, ingest.stats.n_points)
    );
    Ok(())
}

fn handle_curve(args: &CurveArgs) -> Result<(), AppError> {
    let quad = quad_settings_from_args(&args.quad)?;
    let params = CosmoParams::new(args.omega_lambda, args.omega_m, args.w);
    let zs = if args.z.is_empty() {
        if !(args.z_min > 0.0 && args.z_max > args.z_min) {
            return Err(AppError::config("Redshift grid needs 0 < --z-min < --z-max."));
        }
        redshift_grid(args.z_min, args.z_max, args.points, args.scale)
    } else {
        args.z.clone()
    };

    let curve = model_curve(&params, &zs, &quad)?;
    println!("Model: {params}");
    print!("{}", crate::report::format_curve_table(&curve));
    Ok(())
}

fn handle_simulate(args: &SimulateArgs) -> Result<(), AppError> {
    let quad = quad_settings_from_args(&args.quad)?;
    let spec = SyntheticSpec {
        params: CosmoParams::new(args.omega_lambda, args.omega_m, args.w),
        count: args.count,
        z_min: args.z_min,
        z_max: args.z_max,
        noise_sigma: args.noise,
        log_spaced: args.log_spaced,
        seed: args.seed,
    };

    let observations = generate_observations(&spec, &quad)?;
    crate::io::export::write_observations_csv(&args.output, &observations)?;
    println!(
        "Wrote {} observations drawn from {} to {}",
        observations.len(),
        spec.params,
        args.output.display()
    );
    Ok(())
}

fn handle_plot(args: &PlotArgs) -> Result<(), AppError> {
    let curve = crate::io::curve::read_curve_json(&args.curve)?;
    let plot = crate::plot::render_curve_file_plot(&curve, args.width, args.height, args.x_scale);

    println!("{plot}");
    Ok(())
}

pub fn fit_config_from_args(args: &FitArgs) -> Result<FitConfig, AppError> {
    if args.bin_size == 0 {
        return Err(AppError::config("--bin-size must be > 0."));
    }

    Ok(FitConfig {
        data_path: args.data.data.clone(),
        table: table_spec_from_args(&args.data),
        bin_size: args.bin_size,
        initial: CosmoParams::new(args.omega_lambda, args.omega_m, args.w),
        constraint_mode: args.constraints,
        reference_normalizer: args.reference_normalizer,
        flat: args.flat,
        quad: quad_settings_from_args(&args.quad)?,
        optimizer: OptimizerSettings {
            max_iters: args.max_iters,
            sd_tolerance: args.tol,
            max_penalty_rounds: args.penalty_rounds,
            feasibility_tol: args.feasibility_tol,
            ..OptimizerSettings::default()
        },
        plot: !args.no_plot,
        plot_width: args.width,
        plot_height: args.height,
        x_scale: args.x_scale,
        export_results: args.export.clone(),
        export_curve: args.export_curve.clone(),
    })
}

fn table_spec_from_args(args: &DataArgs) -> TableSpec {
    TableSpec {
        format: args.format,
        skip_lines: args.skip_lines,
        z_col: args.z_col,
        mu_col: args.mu_col,
        mu_err_col: (!args.no_mu_err).then_some(args.mu_err_col),
        ..TableSpec::default()
    }
}

fn quad_settings_from_args(args: &QuadArgs) -> Result<QuadSettings, AppError> {
    if !(args.quad_abs_tol >= 0.0 && args.quad_rel_tol >= 0.0) || (args.quad_abs_tol == 0.0 && args.quad_rel_tol == 0.0)
    {
        return Err(AppError::config("Quadrature tolerances must be >= 0 and not both zero."));
    }
    if args.quad_max_intervals == 0 {
        return Err(AppError::config("--quad-max-intervals must be > 0."));
    }
    Ok(QuadSettings {
        abs_tol: args.quad_abs_tol,
        rel_tol: args.quad_rel_tol,
        max_intervals: args.quad_max_intervals,
    })
}
