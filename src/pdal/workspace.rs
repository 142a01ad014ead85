use faer::{Col, Mat};

use crate::linalg::block_ldlt::{BlockLdlt, SymbolicBlockMatrix};
use crate::problem::Problem;
use crate::{E, I};

/// Scratch buffers for a solve call.
///
/// Every buffer is sized once at construction; the solver loops never
/// allocate. A workspace is exclusively owned by one solve call at a time
/// and can be reused across calls for the same problem shape.
pub struct Workspace {
    /// Primal iterate accepted at the previous outer iteration.
    pub x_prev: Col<E>,
    /// Retraction output for the candidate iterate.
    pub x_trial: Col<E>,
    /// Objective gradient at the current iterate.
    pub objective_grad: Col<E>,
    /// Objective Hessian at the current iterate.
    pub objective_hess: Mat<E>,
    /// Constraint residuals `c_i(x)`.
    pub prim_residuals: Vec<Col<E>>,
    /// Constraint Jacobians; rows are deactivated in place by the dual
    /// projection before KKT assembly.
    pub cstr_jacobians: Vec<Mat<E>>,
    /// Constraint vector-Hessian products, evaluated at `lams_pdal`.
    pub cstr_vhp: Vec<Mat<E>>,
    /// Diagonals of the generalized dual-projection Jacobians.
    pub jproj_diag: Vec<Col<E>>,
    /// Multiplier estimates accepted at the last successful outer step.
    pub lams_prev: Vec<Col<E>>,
    /// Shifted first-order multiplier estimates.
    pub lams_plus: Vec<Col<E>>,
    /// Primal-dual multiplier estimates `2 lams_plus - lams`.
    pub lams_pdal: Vec<Col<E>>,
    /// Proximal dual errors `mu (lams_plus - lams)`.
    pub aux_prox_dual_err: Vec<Col<E>>,
    /// KKT matrix, ordered `[primal | dual block 1 | dual block 2 | ..]`.
    pub kkt_matrix: Mat<E>,
    pub kkt_rhs: Col<E>,
    /// Primal-dual Newton step.
    pub pd_step: Col<E>,
    /// Primal slice of the KKT right-hand side.
    pub dual_residual: Col<E>,
    /// Sign pattern of the diagonal factor of the last factorization.
    pub signature: Vec<i8>,
    pub ldlt: BlockLdlt,
    pub prim_infeas: E,
    pub dual_infeas: E,
}

impl Workspace {
    pub fn new(nx: I, ndx: I, problem: &Problem) -> Self {
        let nc = problem.num_constraints();
        let kkt_dim = ndx + problem.total_constraint_dim();

        let mut segs = Vec::with_capacity(nc + 1);
        segs.push(ndx);
        for i in 0..nc {
            segs.push(problem.constraint_dim(i));
        }

        let per_block_col = || -> Vec<Col<E>> {
            (0..nc)
                .map(|i| Col::zeros(problem.constraint_dim(i)))
                .collect()
        };

        Self {
            x_prev: Col::zeros(nx),
            x_trial: Col::zeros(nx),
            objective_grad: Col::zeros(ndx),
            objective_hess: Mat::zeros(ndx, ndx),
            prim_residuals: per_block_col(),
            cstr_jacobians: (0..nc)
                .map(|i| Mat::zeros(problem.constraint_dim(i), ndx))
                .collect(),
            cstr_vhp: (0..nc).map(|_| Mat::zeros(ndx, ndx)).collect(),
            jproj_diag: per_block_col(),
            lams_prev: per_block_col(),
            lams_plus: per_block_col(),
            lams_pdal: per_block_col(),
            aux_prox_dual_err: per_block_col(),
            kkt_matrix: Mat::zeros(kkt_dim, kkt_dim),
            kkt_rhs: Col::zeros(kkt_dim),
            pd_step: Col::zeros(kkt_dim),
            dual_residual: Col::zeros(ndx),
            signature: vec![0; kkt_dim],
            ldlt: BlockLdlt::new(SymbolicBlockMatrix::new(&segs)),
            prim_infeas: E::INFINITY,
            dual_infeas: E::INFINITY,
        }
    }

    /// Dimension of the KKT system, `ndx` plus the total constraint
    /// dimension.
    pub fn kkt_dim(&self) -> I {
        self.kkt_rhs.nrows()
    }
}
