use faer::prelude::ReborrowMut;
use faer::{Col, ColMut, ColRef, Mat, MatMut};
use problemo::Problem;

use crate::function::{C1Function, C2Function, Cost, Function};
use crate::{E, I};

/// The affine residual `r(x) = A x + b`.
pub struct LinearFunction {
    a: Mat<E>,
    b: Col<E>,
}

impl LinearFunction {
    pub fn new(a: Mat<E>, b: Col<E>) -> Self {
        debug_assert_eq!(a.nrows(), b.nrows());
        Self { a, b }
    }
}

impl Function for LinearFunction {
    fn nr(&self) -> I {
        self.a.nrows()
    }

    fn eval(&self, x: ColRef<'_, E>, mut out: ColMut<'_, E>) -> Result<(), Problem> {
        for i in 0..self.a.nrows() {
            let mut acc = self.b[i];
            for j in 0..self.a.ncols() {
                acc += self.a[(i, j)] * x[j];
            }
            out[i] = acc;
        }
        Ok(())
    }
}

impl C1Function for LinearFunction {
    fn jacobian(&self, _x: ColRef<'_, E>, mut jac: MatMut<'_, E>) {
        jac.copy_from(&self.a);
    }
}

impl C2Function for LinearFunction {
    fn vhp(&self, _x: ColRef<'_, E>, _v: ColRef<'_, E>, mut out: MatMut<'_, E>) {
        out.fill(0.0);
    }
}

/// The squared-distance objective `f(x) = 1/2 ||x - target||^2`.
pub struct QuadraticDistanceCost {
    target: Col<E>,
}

impl QuadraticDistanceCost {
    pub fn new(target: Col<E>) -> Self {
        Self { target }
    }
}

impl Cost for QuadraticDistanceCost {
    fn value(&self, x: ColRef<'_, E>) -> Result<E, Problem> {
        let mut acc = 0.0;
        for i in 0..self.target.nrows() {
            let d = x[i] - self.target[i];
            acc += d * d;
        }
        Ok(0.5 * acc)
    }

    fn gradient(&self, x: ColRef<'_, E>, mut out: ColMut<'_, E>) {
        for i in 0..self.target.nrows() {
            out[i] = x[i] - self.target[i];
        }
    }

    fn hessian(&self, _x: ColRef<'_, E>, mut out: MatMut<'_, E>) {
        out.rb_mut().fill(0.0);
        for i in 0..self.target.nrows() {
            out[(i, i)] = 1.0;
        }
    }
}

/// The composition `left . right` of two twice-differentiable functions.
///
/// The Jacobian follows the chain rule `J = J_l(r(x)) J_r(x)` and the
/// vector-Hessian product the second-order chain rule
/// `J_r^T vhp_l(r(x), v) J_r + vhp_r(x, J_l^T v)`.
///
/// This is a boundary convenience: the derivative routines allocate their
/// intermediates and require `right` to be evaluable at `x`.
pub struct ComposeFunction {
    left: Box<dyn C2Function>,
    right: Box<dyn C2Function>,
}

impl ComposeFunction {
    pub fn new(left: Box<dyn C2Function>, right: Box<dyn C2Function>) -> Self {
        Self { left, right }
    }

    fn inner_value(&self, x: ColRef<'_, E>) -> Result<Col<E>, Problem> {
        let mut r = Col::zeros(self.right.nr());
        self.right.eval(x, r.as_mut())?;
        Ok(r)
    }
}

impl Function for ComposeFunction {
    fn nr(&self) -> I {
        self.left.nr()
    }

    fn eval(&self, x: ColRef<'_, E>, out: ColMut<'_, E>) -> Result<(), Problem> {
        let r = self.inner_value(x)?;
        self.left.eval(r.as_ref(), out)
    }
}

impl C1Function for ComposeFunction {
    fn jacobian(&self, x: ColRef<'_, E>, mut jac: MatMut<'_, E>) {
        let ndx = jac.ncols();
        let r = self.inner_value(x);
        debug_assert!(r.is_ok(), "inner function not evaluable at x");
        let Ok(r) = r else {
            jac.fill(E::NAN);
            return;
        };

        let mut jr = Mat::zeros(self.right.nr(), ndx);
        self.right.jacobian(x, jr.as_mut());
        let mut jl = Mat::zeros(self.left.nr(), self.right.nr());
        self.left.jacobian(r.as_ref(), jl.as_mut());

        jac.copy_from(&jl * &jr);
    }
}

impl C2Function for ComposeFunction {
    fn vhp(&self, x: ColRef<'_, E>, v: ColRef<'_, E>, mut out: MatMut<'_, E>) {
        let ndx = out.ncols();
        let r = self.inner_value(x);
        debug_assert!(r.is_ok(), "inner function not evaluable at x");
        let Ok(r) = r else {
            out.fill(E::NAN);
            return;
        };

        let mut jr = Mat::zeros(self.right.nr(), ndx);
        self.right.jacobian(x, jr.as_mut());
        let mut jl = Mat::zeros(self.left.nr(), self.right.nr());
        self.left.jacobian(r.as_ref(), jl.as_mut());

        // Curvature of the outer function pulled back through J_r.
        let mut hl = Mat::zeros(self.right.nr(), self.right.nr());
        self.left.vhp(r.as_ref(), v, hl.as_mut());
        let pullback = jr.transpose() * &hl * &jr;

        // Curvature of the inner function weighted by w = J_l^T v.
        let w = jl.transpose() * v;
        self.right.vhp(x, w.as_ref(), out.rb_mut());

        for j in 0..ndx {
            for i in 0..ndx {
                out[(i, j)] += pullback[(i, j)];
            }
        }
    }
}

/// Returns the composition of two twice-differentiable functions.
pub fn compose(left: Box<dyn C2Function>, right: Box<dyn C2Function>) -> ComposeFunction {
    ComposeFunction::new(left, right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_function_eval() {
        let a = Mat::from_fn(2, 3, |i, j| (i * 3 + j) as E);
        let b = Col::from_fn(2, |i| i as E);
        let f = LinearFunction::new(a, b);

        let x = Col::from_fn(3, |_| 1.0);
        let mut out = Col::zeros(2);
        f.eval(x.as_ref(), out.as_mut()).unwrap();
        assert_eq!(out[0], 3.0);
        assert_eq!(out[1], 13.0);
    }

    #[test]
    fn test_quadratic_distance_cost() {
        let cost = QuadraticDistanceCost::new(Col::from_fn(2, |i| (i + 1) as E));
        let x = Col::from_fn(2, |_| 0.0);
        assert_eq!(cost.value(x.as_ref()).unwrap(), 2.5);

        let mut grad = Col::zeros(2);
        cost.gradient(x.as_ref(), grad.as_mut());
        assert_eq!(grad[0], -1.0);
        assert_eq!(grad[1], -2.0);
    }

    #[test]
    fn test_compose_chain_rule() {
        // left(r) = [r0^2], right(x) = A x with A = [1 2].
        struct Square;
        impl Function for Square {
            fn nr(&self) -> I {
                1
            }
            fn eval(&self, x: ColRef<'_, E>, mut out: ColMut<'_, E>) -> Result<(), Problem> {
                out[0] = x[0] * x[0];
                Ok(())
            }
        }
        impl C1Function for Square {
            fn jacobian(&self, x: ColRef<'_, E>, mut jac: MatMut<'_, E>) {
                jac[(0, 0)] = 2.0 * x[0];
            }
        }
        impl C2Function for Square {
            fn vhp(&self, _x: ColRef<'_, E>, v: ColRef<'_, E>, mut out: MatMut<'_, E>) {
                out[(0, 0)] = 2.0 * v[0];
            }
        }

        let a = Mat::from_fn(1, 2, |_, j| (j + 1) as E);
        let right = LinearFunction::new(a, Col::zeros(1));
        let h = compose(Box::new(Square), Box::new(right));

        let x = Col::from_fn(2, |i| (i + 1) as E); // x = (1, 2), A x = 5
        let mut out = Col::zeros(1);
        h.eval(x.as_ref(), out.as_mut()).unwrap();
        assert_eq!(out[0], 25.0);

        // J = 2 (A x) A = 10 * [1 2]
        let mut jac = Mat::zeros(1, 2);
        h.jacobian(x.as_ref(), jac.as_mut());
        assert_eq!(jac[(0, 0)], 10.0);
        assert_eq!(jac[(0, 1)], 20.0);

        // vhp(x, v) = A^T (2 v) A for scalar v
        let v = Col::from_fn(1, |_| 1.0);
        let mut hess = Mat::zeros(2, 2);
        h.vhp(x.as_ref(), v.as_ref(), hess.as_mut());
        assert_eq!(hess[(0, 0)], 2.0);
        assert_eq!(hess[(0, 1)], 4.0);
        assert_eq!(hess[(1, 0)], 4.0);
        assert_eq!(hess[(1, 1)], 8.0);
    }
}
