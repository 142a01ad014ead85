use faer::Col;

use crate::problem::Problem;
use crate::{ConvergedFlag, E, I};

/// Solver output: the best primal-dual iterate found, the objective value
/// there, iteration counters, residual measures at termination, and the
/// convergence flag.
pub struct Results {
    pub x_opt: Col<E>,
    pub lams_opt: Vec<Col<E>>,
    pub value: E,
    /// Total inner (Newton) iteration count.
    pub num_iters: I,
    pub prim_infeas: E,
    pub dual_infeas: E,
    /// Penalty parameter at termination.
    pub mu: E,
    pub converged: ConvergedFlag,
}

impl Results {
    pub fn new(nx: I, problem: &Problem) -> Self {
        Self {
            x_opt: Col::zeros(nx),
            lams_opt: (0..problem.num_constraints())
                .map(|i| Col::zeros(problem.constraint_dim(i)))
                .collect(),
            value: 0.0,
            num_iters: 0,
            prim_infeas: E::INFINITY,
            dual_infeas: E::INFINITY,
            mu: 0.0,
            converged: ConvergedFlag::Uninit,
        }
    }
}
