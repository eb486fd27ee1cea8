//! Constrained minimization of the chi-square objective.
//!
//! Equalities are removed exactly: the parameter vector is parametrized by the
//! free coordinates of the affine subspace they define, so every trial point
//! satisfies them bit for bit. Inequalities are handled with a quadratic
//! exterior penalty
//!
//! ```text
//! f_k(x) = χ²(x) + ρ_k · Σ_j max(0, −g_j(x))²,    ρ_{k+1} = growth · ρ_k
//! ```
//!
//! and each penalty round runs a Nelder–Mead simplex search (argmin) started
//! from the previous round's best point.
//!
//! Trial points where the model cannot be evaluated score a large finite
//! sentinel so the simplex moves away from them instead of aborting.

use std::sync::atomic::{AtomicU64, Ordering};

use argmin::core::{CostFunction, Executor, State, TerminationReason, TerminationStatus};
use argmin::solver::neldermead::NelderMead;
use tracing::{debug, warn};

use crate::domain::{CosmoParams, OptimizerSettings, QuadSettings};
use crate::error::AppError;
use crate::fit::constraints::{Constraint, ConstraintKind, equality_system, max_violation};
use crate::fit::objective::chi_square;
use crate::math::AffineSubspace;

/// Score given to trial points outside the model's domain.
const INVALID_COST: f64 = 1e300;

/// Relative simplex step per free coordinate.
const SIMPLEX_STEP: f64 = 0.05;
/// Absolute simplex step for coordinates that start at zero.
const SIMPLEX_ZERO_STEP: f64 = 0.00025;

/// Converged, feasible fit.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub params: CosmoParams,
    /// Unpenalized objective at `params`.
    pub chi_square: f64,
    /// Simplex iterations summed over all penalty rounds.
    pub iterations: u64,
    /// Objective evaluations, including the initial and final ones.
    pub evaluations: u64,
    pub penalty_rounds: usize,
    /// Largest constraint violation at `params`.
    pub max_violation: f64,
}

/// Observations the objective is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct FitData<'a> {
    pub z: &'a [f64],
    pub mu: &'a [f64],
}

/// Minimize the chi-square of `data` from `initial` under `constraints`.
///
/// The initial guess is first projected onto the equality subspace; if the
/// model cannot be evaluated there the evaluator error is returned as is.
pub fn minimize_chi_square(
    data: FitData<'_>,
    initial: &CosmoParams,
    constraints: &[Constraint],
    quad: &QuadSettings,
    settings: &OptimizerSettings,
) -> Result<FitOutcome, AppError> {
    validate_settings(settings)?;
    if !initial.is_finite() {
        return Err(AppError::config(format!("Initial guess must be finite (got {initial}).")));
    }

    let (a, b) = equality_system(constraints);
    let subspace = AffineSubspace::from_equalities(&a, &b)?;
    let inequalities: Vec<Constraint> = constraints
        .iter()
        .filter(|c| c.kind == ConstraintKind::Ineq)
        .cloned()
        .collect();

    let evaluations = AtomicU64::new(0);

    let mut free = subspace.restrict(&initial.to_vec());
    let start = params_from_free(&subspace, &free)?;
    evaluations.fetch_add(1, Ordering::Relaxed);
    let start_chi = chi_square(&start, data.mu, data.z, quad)?;
    debug!(start = %start, chi_square = start_chi, free_dim = subspace.free_dim(), "optimizer start");

    let mut iterations = 0u64;
    let mut rounds = 0usize;

    if subspace.free_dim() > 0 {
        let mut weight = if inequalities.is_empty() { 0.0 } else { settings.penalty_start };
        let max_rounds = if inequalities.is_empty() { 1 } else { settings.max_penalty_rounds };

        loop {
            rounds += 1;
            let problem = PenalizedChiSquare {
                data,
                subspace: &subspace,
                inequalities: &inequalities,
                quad,
                weight,
                evaluations: &evaluations,
            };
            let round = run_simplex(problem, &free, settings)?;
            iterations += round.iterations;
            free = round.best;

            let current = params_from_free(&subspace, &free)?;
            if round.best_cost >= INVALID_COST {
                return Err(AppError::Optimization {
                    reason: "no trial point could be evaluated".to_string(),
                    params: current,
                    objective: f64::NAN,
                });
            }
            if !round.converged {
                evaluations.fetch_add(1, Ordering::Relaxed);
                let objective = chi_square(&current, data.mu, data.z, quad).unwrap_or(f64::NAN);
                return Err(AppError::Optimization {
                    reason: format!("{} in penalty round {rounds}", round.status),
                    params: current,
                    objective,
                });
            }

            let violation = max_violation(&inequalities, &current.to_vec());
            debug!(
                round = rounds,
                weight,
                iterations = round.iterations,
                cost = round.best_cost,
                violation,
                params = %current,
                "penalty round finished"
            );

            if violation <= settings.feasibility_tol || rounds >= max_rounds {
                break;
            }
            weight *= settings.penalty_growth;
        }
    }

    let params = params_from_free(&subspace, &free)?;
    evaluations.fetch_add(1, Ordering::Relaxed);
    let chi = chi_square(&params, data.mu, data.z, quad)?;
    let violation = max_violation(constraints, &params.to_vec());

    if !chi.is_finite() {
        return Err(AppError::Optimization {
            reason: "objective is not finite at the final point".to_string(),
            params,
            objective: chi,
        });
    }
    if violation > settings.feasibility_tol {
        warn!(violation, params = %params, "final point violates constraints");
        return Err(AppError::Optimization {
            reason: format!(
                "constraint violation {violation:e} exceeds tolerance {:e} after {rounds} penalty rounds",
                settings.feasibility_tol
            ),
            params,
            objective: chi,
        });
    }

    Ok(FitOutcome {
        params,
        chi_square: chi,
        iterations,
        evaluations: evaluations.load(Ordering::Relaxed),
        penalty_rounds: rounds,
        max_violation: violation,
    })
}

fn validate_settings(s: &OptimizerSettings) -> Result<(), AppError> {
    if s.max_iters == 0 {
        return Err(AppError::config("Optimizer iteration cap must be > 0."));
    }
    if !(s.sd_tolerance.is_finite() && s.sd_tolerance > 0.0) {
        return Err(AppError::config("Simplex tolerance must be finite and > 0."));
    }
    if !(s.penalty_start.is_finite() && s.penalty_start > 0.0) {
        return Err(AppError::config("Initial penalty weight must be finite and > 0."));
    }
    if !(s.penalty_growth.is_finite() && s.penalty_growth > 1.0) {
        return Err(AppError::config("Penalty growth factor must be finite and > 1."));
    }
    if s.max_penalty_rounds == 0 {
        return Err(AppError::config("At least one penalty round is required."));
    }
    if !(s.feasibility_tol.is_finite() && s.feasibility_tol >= 0.0) {
        return Err(AppError::config("Feasibility tolerance must be finite and >= 0."));
    }
    Ok(())
}

fn params_from_free(subspace: &AffineSubspace, free: &[f64]) -> Result<CosmoParams, AppError> {
    let x = subspace.expand(free);
    CosmoParams::from_slice(&x).ok_or_else(|| {
        AppError::config(format!(
            "Parameter vector has {} entries, expected {}.",
            x.len(),
            CosmoParams::LEN
        ))
    })
}

/// Starting simplex around `x0`: one vertex per coordinate, each nudged by 5 %.
fn initial_simplex(x0: &[f64]) -> Vec<Vec<f64>> {
    let mut simplex = Vec::with_capacity(x0.len() + 1);
    simplex.push(x0.to_vec());
    for i in 0..x0.len() {
        let mut vertex = x0.to_vec();
        vertex[i] = if vertex[i] != 0.0 {
            (1.0 + SIMPLEX_STEP) * vertex[i]
        } else {
            SIMPLEX_ZERO_STEP
        };
        simplex.push(vertex);
    }
    simplex
}

struct RoundResult {
    best: Vec<f64>,
    best_cost: f64,
    iterations: u64,
    converged: bool,
    status: String,
}

fn run_simplex(
    problem: PenalizedChiSquare<'_>,
    x0: &[f64],
    settings: &OptimizerSettings,
) -> Result<RoundResult, AppError> {
    let fallback = params_from_free(problem.subspace, x0)?;
    let to_error = |e: argmin::core::Error| AppError::Optimization {
        reason: e.to_string(),
        params: fallback,
        objective: f64::NAN,
    };

    let solver = NelderMead::new(initial_simplex(x0))
        .with_sd_tolerance(settings.sd_tolerance)
        .map_err(to_error)?;
    let res = Executor::new(problem, solver)
        .configure(|state| state.max_iters(settings.max_iters))
        .run()
        .map_err(to_error)?;

    let state = res.state();
    let best = state.get_best_param().cloned().unwrap_or_else(|| x0.to_vec());
    let status = state.get_termination_status();
    let converged = matches!(
        status,
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
    );

    Ok(RoundResult {
        best,
        best_cost: state.get_best_cost(),
        iterations: state.get_iter(),
        converged,
        status: status.to_string(),
    })
}

/// Chi-square over the free coordinates plus the inequality penalty.
struct PenalizedChiSquare<'a> {
    data: FitData<'a>,
    subspace: &'a AffineSubspace,
    inequalities: &'a [Constraint],
    quad: &'a QuadSettings,
    weight: f64,
    evaluations: &'a AtomicU64,
}

impl CostFunction for PenalizedChiSquare<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, free: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        self.evaluations.fetch_add(1, Ordering::Relaxed);

        let x = self.subspace.expand(free);
        let params = CosmoParams::from_slice(&x)
            .ok_or_else(|| argmin::core::Error::msg(format!("expanded vector has {} entries", x.len())))?;

        let chi = match chi_square(&params, self.data.mu, self.data.z, self.quad) {
            Ok(v) if v.is_finite() => v,
            Ok(_) => return Ok(INVALID_COST),
            Err(e) if e.is_evaluation_failure() => return Ok(INVALID_COST),
            Err(e) => return Err(argmin::core::Error::msg(e.to_string())),
        };

        let penalty: f64 = self
            .inequalities
            .iter()
            .map(|c| {
                let v = c.violation(&x);
                v * v
            })
            .sum();

        Ok((chi + self.weight * penalty).min(INVALID_COST))
    }
}
