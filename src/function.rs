use derive_more::{Display, Error};
use faer::{ColMut, ColRef, MatMut};
use problemo::Problem;

use crate::{E, I};

#[derive(Debug, Display, Error, PartialEq)]
pub enum EvalError {
    #[display("Function is not evaluable at the given point")]
    NonEvaluable,
}

/// A vector-valued residual function `x -> r(x)`.
///
/// Evaluation may fail at points outside the function's domain; the error
/// arm is recovered locally by the line search and is terminal everywhere
/// else.
pub trait Function {
    /// Residual dimension (function codimension).
    fn nr(&self) -> I;

    /// Evaluates the residual at `x`, writing it into `out`.
    fn eval(&self, x: ColRef<'_, E>, out: ColMut<'_, E>) -> Result<(), Problem>;
}

/// A continuously differentiable residual function.
pub trait C1Function: Function {
    /// Fills `jac` with the `nr x ndx` Jacobian at `x`.
    fn jacobian(&self, x: ColRef<'_, E>, jac: MatMut<'_, E>);
}

/// A twice continuously differentiable residual function.
pub trait C2Function: C1Function {
    /// Fills `out` with the `ndx x ndx` vector-Hessian product
    /// `d(J^T v)/dx` at `x`.
    fn vhp(&self, x: ColRef<'_, E>, v: ColRef<'_, E>, out: MatMut<'_, E>);
}

/// A scalar objective: the codimension-one specialization of a twice
/// differentiable function, with the gradient and Hessian surfaced
/// directly.
pub trait Cost {
    /// Evaluates the objective at `x`. May fail outside the domain.
    fn value(&self, x: ColRef<'_, E>) -> Result<E, Problem>;

    /// Fills `out` with the gradient (length `ndx`) at `x`.
    fn gradient(&self, x: ColRef<'_, E>, out: ColMut<'_, E>);

    /// Fills `out` with the `ndx x ndx` Hessian at `x`.
    fn hessian(&self, x: ColRef<'_, E>, out: MatMut<'_, E>);
}
