use enum_dispatch::enum_dispatch;
use faer::{ColMut, ColRef};

use crate::E;
use crate::I;
use crate::function::C2Function;

/// The feasible set attached to a constraint residual.
///
/// A constraint is `c(x) in C` for a closed set `C`; the solver only ever
/// touches `C` through the projection onto its polar (dual) cone and the
/// generalized Jacobian of that projection.
#[enum_dispatch]
pub trait ConeSet {
    /// Projects `lam` onto the dual cone, writing the result into `out`.
    fn dual_projection(&self, lam: ColRef<'_, E>, out: ColMut<'_, E>);

    /// Writes the diagonal of the generalized Jacobian of the dual
    /// projection at `lam` into `diag` (entries are 0 or 1).
    fn jdual_projection(&self, lam: ColRef<'_, E>, diag: ColMut<'_, E>);
}

/// Equality constraint `c(x) = 0`: the dual cone is the whole space, so
/// the projection is the identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Equality;

impl ConeSet for Equality {
    fn dual_projection(&self, lam: ColRef<'_, E>, mut out: ColMut<'_, E>) {
        out.copy_from(lam);
    }

    fn jdual_projection(&self, lam: ColRef<'_, E>, mut diag: ColMut<'_, E>) {
        for i in 0..lam.nrows() {
            diag[i] = 1.0;
        }
    }
}

/// One-sided inequality `c(x) <= 0`: multipliers live in the nonnegative
/// orthant, so the dual projection clamps each component to zero from
/// below. Components sitting exactly at the kink are treated as inactive.
#[derive(Debug, Clone, Copy, Default)]
pub struct NegativeOrthant;

impl ConeSet for NegativeOrthant {
    fn dual_projection(&self, lam: ColRef<'_, E>, mut out: ColMut<'_, E>) {
        for i in 0..lam.nrows() {
            out[i] = lam[i].max(0.0);
        }
    }

    fn jdual_projection(&self, lam: ColRef<'_, E>, mut diag: ColMut<'_, E>) {
        for i in 0..lam.nrows() {
            diag[i] = if lam[i] > 0.0 { 1.0 } else { 0.0 };
        }
    }
}

/// The available cone sets, dispatched as a tagged variant.
#[enum_dispatch(ConeSet)]
#[derive(Debug, Clone, Copy)]
pub enum ConstraintSet {
    Equality,
    NegativeOrthant,
}

/// A constraint block: a twice-differentiable residual function paired
/// with the set its values are constrained to.
pub struct Constraint {
    func: Box<dyn C2Function>,
    set: ConstraintSet,
}

impl Constraint {
    pub fn new(func: Box<dyn C2Function>, set: ConstraintSet) -> Self {
        Self { func, set }
    }

    /// An equality constraint `c(x) = 0`.
    pub fn equality(func: Box<dyn C2Function>) -> Self {
        Self::new(func, ConstraintSet::from(Equality))
    }

    /// A one-sided inequality constraint `c(x) <= 0`.
    pub fn negative_orthant(func: Box<dyn C2Function>) -> Self {
        Self::new(func, ConstraintSet::from(NegativeOrthant))
    }

    /// Block dimension of this constraint.
    pub fn nr(&self) -> I {
        self.func.nr()
    }

    pub fn func(&self) -> &dyn C2Function {
        self.func.as_ref()
    }

    pub fn set(&self) -> &ConstraintSet {
        &self.set
    }
}
