use faer::{Col, ColMut, ColRef, Mat, MatMut};
use faer::prelude::ReborrowMut;

use crate::E;
use crate::constraint::ConeSet;
use crate::linalg::vector_ops::{dot, inf_norm};
use crate::pdal::workspace::Workspace;
use crate::problem::Problem;

/// The Lagrangian `L(x, lams) = cost(x) + sum_i lams_i^T c_i(x)`.
///
/// The gradient and Hessian routines allocate their constraint scratch;
/// the solver's hot loop assembles the same quantities from workspace
/// buffers instead.
pub struct Lagrangian<'a> {
    problem: &'a Problem,
}

impl<'a> Lagrangian<'a> {
    pub fn new(problem: &'a Problem) -> Self {
        Self { problem }
    }

    pub fn value(&self, x: ColRef<'_, E>, lams: &[Col<E>]) -> Result<E, problemo::Problem> {
        let mut result = self.problem.cost().value(x)?;
        for (i, cstr) in self.problem.constraints().iter().enumerate() {
            let mut r = Col::zeros(cstr.nr());
            cstr.func().eval(x, r.as_mut())?;
            result += dot(lams[i].as_ref(), r.as_ref());
        }
        Ok(result)
    }

    /// `grad L = grad cost + sum_i J_i^T lams_i`.
    pub fn gradient(&self, x: ColRef<'_, E>, lams: &[Col<E>], mut out: ColMut<'_, E>) {
        self.problem.cost().gradient(x, out.rb_mut());
        let ndx = out.nrows();
        for (i, cstr) in self.problem.constraints().iter().enumerate() {
            let mut jac = Mat::zeros(cstr.nr(), ndx);
            cstr.func().jacobian(x, jac.as_mut());
            for r in 0..cstr.nr() {
                let w = lams[i][r];
                for c in 0..ndx {
                    out[c] += w * jac[(r, c)];
                }
            }
        }
    }

    /// `hess L = hess cost + sum_i vhp_i(x, lams_i)`.
    pub fn hessian(&self, x: ColRef<'_, E>, lams: &[Col<E>], mut out: MatMut<'_, E>) {
        self.problem.cost().hessian(x, out.rb_mut());
        let ndx = out.ncols();
        let mut vhp = Mat::zeros(ndx, ndx);
        for (i, cstr) in self.problem.constraints().iter().enumerate() {
            cstr.func().vhp(x, lams[i].as_ref(), vhp.as_mut());
            for c in 0..ndx {
                for r in 0..ndx {
                    out[(r, c)] += vhp[(r, c)];
                }
            }
        }
    }
}

/// Penalty-dependent pieces of the primal-dual augmented Lagrangian:
/// shifted multiplier estimates, proximal dual errors, projected
/// constraint Jacobians, and the scalar merit itself.
pub struct PdalMerit<'a> {
    problem: &'a Problem,
    mu: E,
    mu_inv: E,
}

impl<'a> PdalMerit<'a> {
    pub fn new(problem: &'a Problem, mu: E) -> Self {
        debug_assert!(mu > 0.0);
        Self {
            problem,
            mu,
            mu_inv: 1.0 / mu,
        }
    }

    pub fn mu(&self) -> E {
        self.mu
    }

    /// Updates the penalty parameter and its cached inverse.
    pub fn set_penalty(&mut self, mu: E) {
        debug_assert!(mu > 0.0);
        self.mu = mu;
        self.mu_inv = 1.0 / mu;
    }

    /// Evaluates the merit scalar
    ///
    /// ```text
    /// f(x) + sum_i 1/(2 mu) (|proj(mu lams_prev_i + c_i)|^2 - |mu lams_prev_i|^2)
    ///      + sum_i mu/2 |lams_plus_i - lams_i|^2
    /// ```
    ///
    /// whose x-gradient is the Lagrangian gradient at the primal-dual
    /// multiplier estimates. Allocates constraint scratch; intended for
    /// line-search probing at the solver boundary.
    pub fn value(
        &self,
        x: ColRef<'_, E>,
        lams: &[Col<E>],
        lams_prev: &[Col<E>],
    ) -> Result<E, problemo::Problem> {
        let mut result = self.problem.cost().value(x)?;
        for (i, cstr) in self.problem.constraints().iter().enumerate() {
            let nr = cstr.nr();
            let mut r = Col::zeros(nr);
            cstr.func().eval(x, r.as_mut())?;

            let shifted = Col::from_fn(nr, |k| self.mu * lams_prev[i][k] + r[k]);
            let mut proj = Col::zeros(nr);
            cstr.set().dual_projection(shifted.as_ref(), proj.as_mut());

            for k in 0..nr {
                let base = self.mu * lams_prev[i][k];
                result += 0.5 * self.mu_inv * (proj[k] * proj[k] - base * base);
                let d = proj[k] * self.mu_inv - lams[i][k];
                result += 0.5 * self.mu * d * d;
            }
        }
        Ok(result)
    }

    /// Evaluates the constraint residuals at `x` and derives the shifted
    /// multiplier estimates, the proximal dual errors, the primal-dual
    /// multipliers, and the primal infeasibility.
    pub fn compute_residuals_and_multipliers(
        &self,
        x: ColRef<'_, E>,
        lams: &[Col<E>],
        workspace: &mut Workspace,
    ) -> Result<(), problemo::Problem> {
        let num_c = self.problem.num_constraints();
        for i in 0..num_c {
            let cstr = self.problem.constraint(i);
            cstr.func().eval(x, workspace.prim_residuals[i].as_mut())?;

            // shifted estimate lams_prev + c / mu, projected on the dual cone
            for k in 0..cstr.nr() {
                workspace.aux_prox_dual_err[i][k] =
                    workspace.lams_prev[i][k] + workspace.prim_residuals[i][k] * self.mu_inv;
            }
            cstr.set().dual_projection(
                workspace.aux_prox_dual_err[i].as_ref(),
                workspace.lams_plus[i].as_mut(),
            );

            for k in 0..cstr.nr() {
                workspace.aux_prox_dual_err[i][k] =
                    self.mu * (workspace.lams_plus[i][k] - lams[i][k]);
                workspace.lams_pdal[i][k] = 2.0 * workspace.lams_plus[i][k] - lams[i][k];
            }
        }

        workspace.prim_infeas = 0.0;
        for i in 0..num_c {
            workspace.prim_infeas = workspace
                .prim_infeas
                .max(inf_norm(workspace.prim_residuals[i].as_ref()));
        }
        Ok(())
    }

    /// Evaluates the constraint Jacobians and the vector-Hessian products
    /// at the primal-dual multipliers. The Jacobians are left
    /// unprojected; see [`Self::project_jacobians`].
    pub fn compute_residual_derivatives(&self, x: ColRef<'_, E>, workspace: &mut Workspace) {
        for (i, cstr) in self.problem.constraints().iter().enumerate() {
            cstr.func().jacobian(x, workspace.cstr_jacobians[i].as_mut());
            cstr.func().vhp(
                x,
                workspace.lams_pdal[i].as_ref(),
                workspace.cstr_vhp[i].as_mut(),
            );
        }
    }

    /// Deactivates Jacobian rows whose shifted dual component lies
    /// outside the active set, using the generalized Jacobian of the
    /// dual projection.
    pub fn project_jacobians(&self, workspace: &mut Workspace) {
        for (i, cstr) in self.problem.constraints().iter().enumerate() {
            cstr.set().jdual_projection(
                workspace.lams_plus[i].as_ref(),
                workspace.jproj_diag[i].as_mut(),
            );
            let jac = &mut workspace.cstr_jacobians[i];
            for r in 0..cstr.nr() {
                let scale = workspace.jproj_diag[i][r];
                for c in 0..jac.ncols() {
                    jac[(r, c)] *= scale;
                }
            }
        }
    }
}
