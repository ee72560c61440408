use crate::{NllsProblem, NllsSolverBackend, SolveOptions, SolveReport};
use lanegauge_core::Real;
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use log::debug;
use nalgebra::{storage::Owned, DMatrix, DVector, Dyn};

/// Borrowed problem plus the parameter vector the solver is moving.
///
/// Non-finite residuals or Jacobian entries are reported as `None`, which
/// ends the solve at the last good iterate.
struct Iterate<'a, P: NllsProblem> {
    problem: &'a P,
    x: DVector<Real>,
}

impl<P: NllsProblem> LeastSquaresProblem<Real, Dyn, Dyn> for Iterate<'_, P> {
    type ResidualStorage = Owned<Real, Dyn>;
    type JacobianStorage = Owned<Real, Dyn, Dyn>;
    type ParameterStorage = Owned<Real, Dyn>;

    fn set_params(&mut self, x: &DVector<Real>) {
        self.x.copy_from(x);
    }

    fn params(&self) -> DVector<Real> {
        self.x.clone()
    }

    fn residuals(&self) -> Option<DVector<Real>> {
        let r = self.problem.residuals(&self.x);
        r.iter().all(|v| v.is_finite()).then_some(r)
    }

    fn jacobian(&self) -> Option<DMatrix<Real>> {
        let j = self.problem.jacobian(&self.x);
        j.iter().all(|v| v.is_finite()).then_some(j)
    }
}

/// Half the squared residual norm, the objective the LM solver reports.
fn cost(r: &DVector<Real>) -> Real {
    0.5 * r.norm_squared()
}

/// Levenberg-Marquardt (MINPACK port from the `levenberg-marquardt` crate).
#[derive(Debug, Default, Clone, Copy)]
pub struct LmBackend;

impl NllsSolverBackend for LmBackend {
    fn solve<P: NllsProblem>(
        &self,
        problem: &P,
        x0: DVector<Real>,
        opts: &SolveOptions,
    ) -> (DVector<Real>, SolveReport) {
        let initial_cost = cost(&problem.residuals(&x0));
        let solver = LevenbergMarquardt::new()
            .with_ftol(opts.ftol)
            .with_xtol(opts.xtol)
            .with_gtol(opts.gtol)
            .with_patience(opts.max_iters.max(1));

        let (done, outcome) = solver.minimize(Iterate { problem, x: x0 });
        let report = SolveReport {
            evaluations: outcome.number_of_evaluations,
            initial_cost,
            final_cost: outcome.objective_function,
            converged: outcome.termination.was_successful(),
        };
        debug!(
            "lm: {:?}, cost {:.6e} -> {:.6e} in {} evaluations",
            outcome.termination, report.initial_cost, report.final_cost, report.evaluations
        );
        (done.x, report)
    }
}
