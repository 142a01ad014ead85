use faer::{ColMut, ColRef};

use crate::{E, I};

/// A smooth state space with a retraction operation.
///
/// Points live in an ambient space of dimension `nx`; increments live in
/// the tangent space of dimension `ndx`. The two coincide for vector
/// spaces but differ for curved spaces such as [`So2`].
pub trait Manifold {
    /// Ambient (representation) dimension.
    fn nx(&self) -> I;

    /// Tangent space dimension.
    fn ndx(&self) -> I;

    /// Retracts the tangent increment `dx` onto the manifold at `x`,
    /// writing the result into `out`.
    fn integrate(&self, x: ColRef<'_, E>, dx: ColRef<'_, E>, out: ColMut<'_, E>);
}

/// The Euclidean space `R^n`, where `integrate` is plain addition.
pub struct VectorSpace {
    dim: I,
}

impl VectorSpace {
    pub fn new(dim: I) -> Self {
        Self { dim }
    }
}

impl Manifold for VectorSpace {
    fn nx(&self) -> I {
        self.dim
    }

    fn ndx(&self) -> I {
        self.dim
    }

    fn integrate(&self, x: ColRef<'_, E>, dx: ColRef<'_, E>, mut out: ColMut<'_, E>) {
        debug_assert_eq!(x.nrows(), self.dim);
        debug_assert_eq!(dx.nrows(), self.dim);
        for i in 0..self.dim {
            out[i] = x[i] + dx[i];
        }
    }
}

/// The unit circle, represented by `(cos t, sin t)` pairs.
///
/// The tangent space is one-dimensional; `integrate` rotates the point by
/// the tangent increment. Points stay on the circle exactly, so no
/// renormalization step is needed.
pub struct So2;

impl Manifold for So2 {
    fn nx(&self) -> I {
        2
    }

    fn ndx(&self) -> I {
        1
    }

    fn integrate(&self, x: ColRef<'_, E>, dx: ColRef<'_, E>, mut out: ColMut<'_, E>) {
        debug_assert_eq!(x.nrows(), 2);
        debug_assert_eq!(dx.nrows(), 1);
        let (c, s) = (dx[0].cos(), dx[0].sin());
        out[0] = c * x[0] - s * x[1];
        out[1] = s * x[0] + c * x[1];
    }
}

#[cfg(test)]
mod tests {
    use faer::Col;

    use super::*;

    #[test]
    fn test_vector_space_integrate() {
        let man = VectorSpace::new(3);
        let x = Col::from_fn(3, |i| i as E);
        let dx = Col::from_fn(3, |_| 0.5);
        let mut out = Col::zeros(3);
        man.integrate(x.as_ref(), dx.as_ref(), out.as_mut());
        for i in 0..3 {
            assert_eq!(out[i], i as E + 0.5);
        }
    }

    #[test]
    fn test_so2_integrate_stays_on_circle() {
        let man = So2;
        let theta: E = 0.7;
        let x = Col::from_fn(2, |i| if i == 0 { theta.cos() } else { theta.sin() });
        let dx = Col::from_fn(1, |_| 1.3);
        let mut out = Col::zeros(2);
        man.integrate(x.as_ref(), dx.as_ref(), out.as_mut());
        assert!((out[0] - (theta + 1.3).cos()).abs() < 1e-14);
        assert!((out[1] - (theta + 1.3).sin()).abs() < 1e-14);
        assert!((out[0] * out[0] + out[1] * out[1] - 1.0).abs() < 1e-14);
    }
}
