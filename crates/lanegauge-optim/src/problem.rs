use lanegauge_core::Real;
use nalgebra::{DMatrix, DVector};

/// Generic non-linear least squares problem with dense parameter/residual vectors.
pub trait NllsProblem {
    /// Number of parameters in the optimization vector.
    fn num_params(&self) -> usize;
    /// Number of residual rows in the problem.
    fn num_residuals(&self) -> usize;

    fn residuals(&self, x: &DVector<Real>) -> DVector<Real>;

    /// Jacobian of [`NllsProblem::residuals`]. Defaults to central differences.
    fn jacobian(&self, x: &DVector<Real>) -> DMatrix<Real> {
        central_difference_jacobian(self, x)
    }
}

/// Numerical Jacobian with a step relative to each parameter's magnitude.
pub fn central_difference_jacobian<P: NllsProblem + ?Sized>(
    problem: &P,
    x: &DVector<Real>,
) -> DMatrix<Real> {
    let m = problem.num_residuals();
    let n = x.len();
    let mut jac = DMatrix::zeros(m, n);
    let mut xp = x.clone();
    for j in 0..n {
        let step = 1e-6 * x[j].abs().max(1.0);
        let orig = xp[j];
        xp[j] = orig + step;
        let r_plus = problem.residuals(&xp);
        xp[j] = orig - step;
        let r_minus = problem.residuals(&xp);
        xp[j] = orig;
        let col = (r_plus - r_minus) / (2.0 * step);
        jac.set_column(j, &col);
    }
    jac
}

#[derive(Debug, Clone, Copy)]
pub struct SolveOptions {
    /// Maximum number of solver iterations before termination.
    ///
    /// The LM backend follows the MINPACK convention and caps function
    /// evaluations at `max_iters * (n + 1)`.
    pub max_iters: usize,
    /// Relative tolerance on the objective (cost) reduction.
    pub ftol: Real,
    /// Orthogonality/gradient tolerance.
    pub gtol: Real,
    /// Relative tolerance on parameter updates.
    pub xtol: Real,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iters: 200,
            ftol: 1e-10,
            gtol: 1e-10,
            xtol: 1e-10,
        }
    }
}

/// Outcome of one solve; costs are `0.5 * |r|^2`.
#[derive(Debug, Clone)]
pub struct SolveReport {
    /// Residual evaluations spent by the solver.
    pub evaluations: usize,
    pub initial_cost: Real,
    pub final_cost: Real,
    pub converged: bool,
}

pub trait NllsSolverBackend {
    fn solve<P: NllsProblem>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> (DVector<Real>, SolveReport);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quadratic;

    impl NllsProblem for Quadratic {
        fn num_params(&self) -> usize {
            2
        }

        fn num_residuals(&self) -> usize {
            2
        }

        fn residuals(&self, x: &DVector<Real>) -> DVector<Real> {
            DVector::from_vec(vec![x[0] * x[0], 3.0 * x[0] * x[1]])
        }
    }

    #[test]
    fn numeric_jacobian_matches_analytic() {
        let x = DVector::from_vec(vec![2.0, -1.5]);
        let j = Quadratic.jacobian(&x);
        assert!((j[(0, 0)] - 4.0).abs() < 1e-6);
        assert!(j[(0, 1)].abs() < 1e-9);
        assert!((j[(1, 0)] - 3.0 * -1.5).abs() < 1e-6);
        assert!((j[(1, 1)] - 6.0).abs() < 1e-6);
    }
}
