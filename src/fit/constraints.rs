//! Linear constraints on the flattened parameter vector `(Ω_Λ, Ω_M, w)`.
//!
//! Every constraint has the form `g(x) = a · x + b` and is either an equality
//! (`g = 0`) or an inequality (`g ≥ 0`).

use nalgebra::{DMatrix, DVector};

use crate::domain::{ConstraintMode, CosmoParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Eq,
    Ineq,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub name: &'static str,
    pub kind: ConstraintKind,
    pub coeffs: [f64; CosmoParams::LEN],
    pub constant: f64,
}

impl Constraint {
    /// `w + 1 = 0`.
    pub const PIN_W: Constraint = Constraint {
        name: "w + 1 = 0",
        kind: ConstraintKind::Eq,
        coeffs: [0.0, 0.0, 1.0],
        constant: 1.0,
    };

    /// `Ω_Λ ≥ 0`.
    pub const LAMBDA_NON_NEGATIVE: Constraint = Constraint {
        name: "ΩΛ ≥ 0",
        kind: ConstraintKind::Ineq,
        coeffs: [1.0, 0.0, 0.0],
        constant: 0.0,
    };

    /// `Ω_M ≥ 0`.
    pub const MATTER_NON_NEGATIVE: Constraint = Constraint {
        name: "ΩM ≥ 0",
        kind: ConstraintKind::Ineq,
        coeffs: [0.0, 1.0, 0.0],
        constant: 0.0,
    };

    /// `Ω_Λ + Ω_M − 1 = 0`.
    pub const FLAT: Constraint = Constraint {
        name: "ΩΛ + ΩM - 1 = 0",
        kind: ConstraintKind::Eq,
        coeffs: [1.0, 1.0, 0.0],
        constant: -1.0,
    };

    pub fn eval(&self, x: &[f64]) -> f64 {
        self.coeffs.iter().zip(x).map(|(a, v)| a * v).sum::<f64>() + self.constant
    }

    /// How far `x` is from satisfying this constraint (0 when satisfied).
    pub fn violation(&self, x: &[f64]) -> f64 {
        let g = self.eval(x);
        match self.kind {
            ConstraintKind::Eq => g.abs(),
            ConstraintKind::Ineq => (-g).max(0.0),
        }
    }
}

/// The constraints a mode activates, plus flatness when requested.
pub fn constraint_set(mode: ConstraintMode, flat: bool) -> Vec<Constraint> {
    let mut set = match mode {
        ConstraintMode::FaithfulBug => vec![Constraint::PIN_W],
        ConstraintMode::Corrected => vec![
            Constraint::PIN_W,
            Constraint::LAMBDA_NON_NEGATIVE,
            Constraint::MATTER_NON_NEGATIVE,
        ],
        ConstraintMode::LastEntry => vec![Constraint::MATTER_NON_NEGATIVE],
    };
    if flat {
        set.push(Constraint::FLAT);
    }
    set
}

/// Equalities as the linear system `A x = b` (so `b = −constant`).
pub fn equality_system(constraints: &[Constraint]) -> (DMatrix<f64>, DVector<f64>) {
    let eqs: Vec<&Constraint> = constraints.iter().filter(|c| c.kind == ConstraintKind::Eq).collect();
    let a = DMatrix::from_fn(eqs.len(), CosmoParams::LEN, |i, j| eqs[i].coeffs[j]);
    let b = DVector::from_iterator(eqs.len(), eqs.iter().map(|c| -c.constant));
    (a, b)
}

/// Largest violation over all constraints (0 for an empty set).
pub fn max_violation(constraints: &[Constraint], x: &[f64]) -> f64 {
    constraints.iter().map(|c| c.violation(x)).fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_select_expected_constraints() {
        let names = |mode, flat| -> Vec<&str> { constraint_set(mode, flat).iter().map(|c| c.name).collect() };

        assert_eq!(names(ConstraintMode::FaithfulBug, false), vec!["w + 1 = 0"]);
        assert_eq!(
            names(ConstraintMode::Corrected, false),
            vec!["w + 1 = 0", "ΩΛ ≥ 0", "ΩM ≥ 0"]
        );
        assert_eq!(names(ConstraintMode::LastEntry, false), vec!["ΩM ≥ 0"]);
        assert_eq!(
            names(ConstraintMode::LastEntry, true),
            vec!["ΩM ≥ 0", "ΩΛ + ΩM - 1 = 0"]
        );
    }

    #[test]
    fn violations() {
        let x = [-0.2, 0.5, -0.9];
        assert!((Constraint::PIN_W.violation(&x) - 0.1).abs() < 1e-15);
        assert!((Constraint::LAMBDA_NON_NEGATIVE.violation(&x) - 0.2).abs() < 1e-15);
        assert_eq!(Constraint::MATTER_NON_NEGATIVE.violation(&x), 0.0);
        let all = constraint_set(ConstraintMode::Corrected, false);
        assert!((max_violation(&all, &x) - 0.2).abs() < 1e-15);
        assert_eq!(max_violation(&[], &x), 0.0);
    }

    #[test]
    fn equality_system_skips_inequalities() {
        let (a, b) = equality_system(&constraint_set(ConstraintMode::Corrected, true));
        assert_eq!(a.nrows(), 2);
        assert_eq!(a.row(0).iter().copied().collect::<Vec<_>>(), vec![0.0, 0.0, 1.0]);
        assert_eq!(b[0], -1.0);
        assert_eq!(b[1], 1.0);
    }
}
