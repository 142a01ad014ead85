//! # Primal-Dual Augmented Lagrangian Solver
//!
//! This module implements a primal-dual augmented Lagrangian method for
//! constrained nonlinear programs of the form:
//!
//! ```text
//!   min  f(x)
//!   s.t. c_i(x) in C_i,   i = 1..m
//! ```
//!
//! over a smooth manifold, where each `C_i` is an equality or cone-like
//! constraint set handled through its dual projection.
//!
//! The outer loop maintains a penalty parameter `mu` and multiplier
//! estimates, tightening the inner tolerances on a schedule that differs
//! between successful and unsuccessful outer iterations. The inner loop
//! is a semismooth Newton method on the primal-dual KKT system, factored
//! with the block LDL^T of [`crate::linalg::block_ldlt`].
//!
//! ## Acknowledgment
//!
//! The algorithmic design follows the method of multipliers literature on
//! bound-constrained augmented Lagrangians and their primal-dual
//! variants, in particular:
//!
//! > A. Conn, N. Gould and P. Toint, "A Globally Convergent Augmented
//! > Lagrangian Algorithm for Optimization with General Constraints and
//! > Simple Bounds", *SIAM Journal on Numerical Analysis* 28(2),
//! > pp. 545-572, 1991.

pub mod merit;
pub mod results;
pub mod workspace;

use faer::{Col, ColRef};
use serde::{Deserialize, Serialize};

use crate::callback::Callback;
use crate::linalg::vector_ops::inf_norm;
use crate::manifold::Manifold;
use crate::pdal::merit::PdalMerit;
use crate::pdal::results::Results;
use crate::pdal::workspace::Workspace;
use crate::problem::Problem;
use crate::{ConvergedFlag, E, I};

/// Solver configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Target optimality tolerance on both infeasibility measures.
    pub target_tol: E,
    /// Initial penalty parameter.
    pub mu_init: E,
    /// Initial primal regularization.
    pub rho_init: E,
    /// Geometric shrink factor for the penalty, in `(0, 1)`.
    pub mu_factor: E,
    /// Geometric shrink factor for the primal regularization.
    pub rho_factor: E,
    /// Penalty floor.
    pub mu_min: E,
    /// Primal tolerance exponent applied on outer failure.
    pub alpha_prim: E,
    /// Primal tolerance exponent applied on outer success.
    pub beta_prim: E,
    /// Dual tolerance exponent applied on outer failure.
    pub alpha_dual: E,
    /// Dual tolerance exponent applied on outer success.
    pub beta_dual: E,
    /// Iteration budget, shared by the inner and outer loops.
    pub max_iters: I,
    pub verbose: bool,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            target_tol: 1e-6,
            mu_init: 1e-2,
            rho_init: 0.0,
            mu_factor: 0.1,
            rho_factor: 0.1,
            mu_min: 1e-9,
            alpha_prim: 0.1,
            beta_prim: 0.9,
            alpha_dual: 1.0,
            beta_dual: 1.0,
            max_iters: 200,
            verbose: false,
        }
    }
}

/// The primal-dual augmented Lagrangian solver.
///
/// Borrows the manifold and problem read-only; the mutable per-solve
/// state lives in the [`Workspace`] and [`Results`] passed to
/// [`PdalSolver::solve`].
pub struct PdalSolver<'a, M: Manifold> {
    manifold: &'a M,
    problem: &'a Problem,
    merit: PdalMerit<'a>,
    options: SolverOptions,

    // algorithm state evolving across outer iterations
    prim_tol: E,
    dual_tol: E,
    mu: E,
    rho: E,
}

impl<'a, M: Manifold> PdalSolver<'a, M> {
    pub fn new(manifold: &'a M, problem: &'a Problem, options: SolverOptions) -> Self {
        debug_assert!(options.target_tol > 0.0);
        debug_assert!(options.mu_init > 0.0);
        debug_assert!(options.mu_min > 0.0);
        debug_assert!(options.mu_factor > 0.0 && options.mu_factor < 1.0);
        debug_assert!(options.alpha_prim > 0.0 && options.alpha_prim <= 1.0);
        debug_assert!(options.beta_prim > 0.0 && options.beta_prim <= 1.0);
        debug_assert!(options.alpha_dual > 0.0 && options.alpha_dual <= 1.0);
        debug_assert!(options.beta_dual > 0.0 && options.beta_dual <= 1.0);
        Self {
            manifold,
            problem,
            merit: PdalMerit::new(problem, options.mu_init),
            options,
            prim_tol: 1.0,
            dual_tol: 1.0,
            mu: options.mu_init,
            rho: options.rho_init,
        }
    }

    pub fn options(&self) -> &SolverOptions {
        &self.options
    }

    /// Current penalty parameter.
    pub fn mu(&self) -> E {
        self.mu
    }

    /// Merit pieces, for driving a line search at the boundary.
    pub fn merit(&self) -> &PdalMerit<'a> {
        &self.merit
    }

    pub fn set_tolerance(&mut self, tol: E) {
        self.options.target_tol = tol;
    }

    pub fn set_max_iters(&mut self, max_iters: I) {
        self.options.max_iters = max_iters;
    }

    /// Runs the solver from the primal point `x0` and the multiplier
    /// estimates `lams0` (zero when absent). The workspace and results
    /// must be sized for this problem.
    pub fn solve(
        &mut self,
        workspace: &mut Workspace,
        results: &mut Results,
        x0: ColRef<'_, E>,
        lams0: Option<&[Col<E>]>,
        callback: &mut dyn Callback,
    ) -> Result<ConvergedFlag, problemo::Problem> {
        debug_assert_eq!(x0.nrows(), self.manifold.nx());
        debug_assert_eq!(
            workspace.kkt_dim(),
            self.manifold.ndx() + self.problem.total_constraint_dim()
        );

        results.x_opt.copy_from(x0);
        results.num_iters = 0;
        results.converged = ConvergedFlag::Uninit;
        match lams0 {
            Some(lams) => {
                debug_assert_eq!(lams.len(), self.problem.num_constraints());
                for (i, lam) in lams.iter().enumerate() {
                    results.lams_opt[i].copy_from(lam);
                    workspace.lams_prev[i].copy_from(lam);
                }
            }
            None => {
                for i in 0..self.problem.num_constraints() {
                    results.lams_opt[i].as_mut().fill(0.0);
                    workspace.lams_prev[i].as_mut().fill(0.0);
                }
            }
        }

        self.mu = self.options.mu_init;
        self.rho = self.options.rho_init;
        self.merit.set_penalty(self.mu);
        self.prim_tol = 1.0;
        self.dual_tol = 1.0;
        self.update_tolerance_failure();

        let mut outer: I = 0;
        while results.num_iters < self.options.max_iters && outer < self.options.max_iters {
            if self.options.verbose {
                println!(
                    "[outer {}] omega={:.3e}, eta={:.3e}, mu={:.3e}",
                    outer, self.dual_tol, self.prim_tol, self.mu
                );
            }

            self.solve_inner(workspace, results, callback)?;
            if results.converged != ConvergedFlag::Uninit {
                break;
            }

            // accept the new primal iterate
            workspace.x_prev.copy_from(&results.x_opt);

            if workspace.prim_infeas < self.prim_tol {
                if workspace.prim_infeas < self.options.target_tol
                    && workspace.dual_infeas < self.options.target_tol
                {
                    results.converged = ConvergedFlag::Success;
                    break;
                }
                self.accept_multipliers(workspace);
                self.update_tolerance_success();
            } else {
                self.update_penalty();
                self.update_tolerance_failure();
            }
            results.mu = self.mu;

            // safeguard the dual tolerance
            self.dual_tol = self.dual_tol.max(self.options.target_tol);
            outer += 1;
        }

        if results.converged == ConvergedFlag::Uninit {
            results.converged = ConvergedFlag::TooManyIters;
        }
        results.prim_infeas = workspace.prim_infeas;
        results.dual_infeas = workspace.dual_infeas;
        results.mu = self.mu;

        if self.options.verbose {
            println!(
                "Finished in {} iterations with status: {:?}",
                results.num_iters, results.converged
            );
        }
        Ok(results.converged)
    }

    /// Semismooth Newton iteration on the primal-dual KKT system, run
    /// until the full residual drops below the current dual tolerance or
    /// a terminal condition is hit.
    fn solve_inner(
        &mut self,
        workspace: &mut Workspace,
        results: &mut Results,
        callback: &mut dyn Callback,
    ) -> Result<(), problemo::Problem> {
        let ndx = self.manifold.ndx();
        let num_c = self.problem.num_constraints();

        for _ in 0..self.options.max_iters {
            match self.problem.cost().value(results.x_opt.as_ref()) {
                Ok(value) => results.value = value,
                Err(_) => {
                    results.converged = ConvergedFlag::OracleFailure;
                    return Ok(());
                }
            }
            self.problem
                .cost()
                .gradient(results.x_opt.as_ref(), workspace.objective_grad.as_mut());
            self.problem
                .cost()
                .hessian(results.x_opt.as_ref(), workspace.objective_hess.as_mut());

            if self
                .merit
                .compute_residuals_and_multipliers(
                    results.x_opt.as_ref(),
                    &results.lams_opt,
                    workspace,
                )
                .is_err()
            {
                results.converged = ConvergedFlag::OracleFailure;
                return Ok(());
            }
            self.merit
                .compute_residual_derivatives(results.x_opt.as_ref(), workspace);

            // rhs primal block: Lagrangian gradient at the primal-dual
            // multipliers, with the full (unprojected) Jacobians
            for c in 0..ndx {
                let mut acc = workspace.objective_grad[c];
                for i in 0..num_c {
                    let jac = &workspace.cstr_jacobians[i];
                    for r in 0..jac.nrows() {
                        acc += jac[(r, c)] * workspace.lams_pdal[i][r];
                    }
                }
                workspace.kkt_rhs[c] = acc;
            }

            self.merit.project_jacobians(workspace);

            // KKT matrix, ordered [primal | dual block 1 | dual block 2 | ..]
            workspace.kkt_matrix.as_mut().fill(0.0);
            for c in 0..ndx {
                for r in 0..ndx {
                    let mut acc = workspace.objective_hess[(r, c)];
                    for i in 0..num_c {
                        acc += workspace.cstr_vhp[i][(r, c)];
                    }
                    workspace.kkt_matrix[(r, c)] = acc;
                }
            }
            for d in 0..ndx {
                workspace.kkt_matrix[(d, d)] += self.rho;
            }

            let mut cursor = ndx;
            for i in 0..num_c {
                let nc = self.problem.constraint_dim(i);
                let jac = &workspace.cstr_jacobians[i];
                for r in 0..nc {
                    workspace.kkt_rhs[cursor + r] = workspace.aux_prox_dual_err[i][r];
                    for c in 0..ndx {
                        workspace.kkt_matrix[(cursor + r, c)] = jac[(r, c)];
                        workspace.kkt_matrix[(c, cursor + r)] = jac[(r, c)];
                    }
                    workspace.kkt_matrix[(cursor + r, cursor + r)] = -self.mu;
                }
                cursor += nc;
            }

            workspace
                .dual_residual
                .copy_from(workspace.kkt_rhs.as_ref().subrows(0, ndx));
            workspace.dual_infeas = inf_norm(workspace.dual_residual.as_ref());
            if inf_norm(workspace.kkt_rhs.as_ref()) < self.dual_tol {
                return Ok(());
            }

            if workspace.ldlt.compute(workspace.kkt_matrix.as_ref()).is_err() {
                results.converged = ConvergedFlag::FactorizationFailure;
                return Ok(());
            }
            workspace.ldlt.signature(&mut workspace.signature);

            for j in 0..workspace.kkt_rhs.nrows() {
                workspace.pd_step[j] = -workspace.kkt_rhs[j];
            }
            workspace.ldlt.solve_in_place(workspace.pd_step.as_mut())?;

            // take the unit step: retract the primal part, add the dual part
            self.manifold.integrate(
                results.x_opt.as_ref(),
                workspace.pd_step.as_ref().subrows(0, ndx),
                workspace.x_trial.as_mut(),
            );
            results.x_opt.copy_from(&workspace.x_trial);
            let mut cursor = ndx;
            for i in 0..num_c {
                let nc = self.problem.constraint_dim(i);
                for r in 0..nc {
                    results.lams_opt[i][r] += workspace.pd_step[cursor + r];
                }
                cursor += nc;
            }

            results.num_iters += 1;
            callback.call(workspace, results);
            if results.num_iters >= self.options.max_iters {
                results.converged = ConvergedFlag::TooManyIters;
                return Ok(());
            }
        }
        Ok(())
    }

    /// Shrinks the penalty (floored at `mu_min`) and the primal
    /// regularization, and propagates the new penalty into the merit.
    fn update_penalty(&mut self) {
        self.mu = (self.mu * self.options.mu_factor).max(self.options.mu_min);
        self.rho *= self.options.rho_factor;
        self.merit.set_penalty(self.mu);
    }

    fn update_tolerance_failure(&mut self) {
        self.prim_tol *= self.mu.powf(self.options.alpha_prim);
        self.dual_tol *= self.mu.powf(self.options.alpha_dual);
    }

    fn update_tolerance_success(&mut self) {
        self.prim_tol *= self.mu.powf(self.options.beta_prim);
        self.dual_tol *= self.mu.powf(self.options.beta_dual);
    }

    /// Caches the primal-dual multiplier estimates as the new shifts.
    fn accept_multipliers(&mut self, workspace: &mut Workspace) {
        for i in 0..self.problem.num_constraints() {
            let pdal = &workspace.lams_pdal[i];
            workspace.lams_prev[i].copy_from(pdal);
        }
    }
}

#[cfg(test)]
mod tests {
    use faer::Col;

    use crate::function_ops::QuadraticDistanceCost;

    use super::*;

    fn dummy_solver_parts() -> (crate::manifold::VectorSpace, Problem) {
        let manifold = crate::manifold::VectorSpace::new(2);
        let problem = Problem::unconstrained(Box::new(QuadraticDistanceCost::new(Col::zeros(2))));
        (manifold, problem)
    }

    #[test]
    fn test_tolerance_schedules_shrink() {
        let (manifold, problem) = dummy_solver_parts();
        let mut solver = PdalSolver::new(&manifold, &problem, SolverOptions::default());

        // mu in (0, 1) and exponents in (0, 1] make both schedules
        // monotone nonincreasing
        solver.prim_tol = 1.0;
        solver.dual_tol = 1.0;
        solver.update_tolerance_failure();
        assert!((solver.prim_tol - 0.01f64.powf(0.1)).abs() < 1e-15);
        assert!((solver.dual_tol - 0.01).abs() < 1e-15);

        let (prev_prim, prev_dual) = (solver.prim_tol, solver.dual_tol);
        solver.update_tolerance_success();
        assert!(solver.prim_tol <= prev_prim);
        assert!(solver.dual_tol <= prev_dual);
        assert!((solver.prim_tol - prev_prim * 0.01f64.powf(0.9)).abs() < 1e-15);
        assert!((solver.dual_tol - prev_dual * 0.01).abs() < 1e-15);
    }

    #[test]
    fn test_penalty_is_floored() {
        let (manifold, problem) = dummy_solver_parts();
        let options = SolverOptions {
            mu_init: 1e-8,
            ..Default::default()
        };
        let mut solver = PdalSolver::new(&manifold, &problem, options);

        solver.update_penalty();
        assert_eq!(solver.mu, 1e-9);
        solver.update_penalty();
        assert_eq!(solver.mu, 1e-9);
        assert_eq!(solver.merit().mu(), 1e-9);
    }

    #[test]
    fn test_accept_multipliers_caches_pdal_estimates() {
        use crate::constraint::Constraint;
        use crate::function_ops::LinearFunction;
        use faer::Mat;

        let manifold = crate::manifold::VectorSpace::new(2);
        let mut problem =
            Problem::unconstrained(Box::new(QuadraticDistanceCost::new(Col::zeros(2))));
        let a = Mat::from_fn(2, 2, |i, j| if i == j { 1.0 } else { 0.0 });
        problem.add_constraint(Constraint::equality(Box::new(LinearFunction::new(
            a,
            Col::zeros(2),
        ))));
        let mut solver = PdalSolver::new(&manifold, &problem, SolverOptions::default());
        let mut workspace = Workspace::new(2, 2, &problem);

        workspace.lams_pdal[0][0] = 1.5;
        workspace.lams_pdal[0][1] = -0.25;
        solver.accept_multipliers(&mut workspace);

        for k in 0..2 {
            assert_eq!(workspace.lams_prev[0][k], workspace.lams_pdal[0][k]);
        }
    }

    #[test]
    fn test_rho_follows_its_own_factor() {
        let (manifold, problem) = dummy_solver_parts();
        let options = SolverOptions {
            rho_init: 1.0,
            rho_factor: 0.5,
            ..Default::default()
        };
        let mut solver = PdalSolver::new(&manifold, &problem, options);

        solver.update_penalty();
        assert_eq!(solver.rho, 0.5);
        solver.update_penalty();
        assert_eq!(solver.rho, 0.25);
    }
}
