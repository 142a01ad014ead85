use faer::Col;

use crate::{E, I};

/// A dense univariate polynomial, represented by its coefficients in
/// decreasing order of degree.
#[derive(Debug, Clone)]
pub struct Polynomial {
    pub coeffs: Col<E>,
}

impl Polynomial {
    pub fn new(coeffs: Col<E>) -> Self {
        debug_assert!(coeffs.nrows() > 0);
        Self { coeffs }
    }

    /// Polynomial degree (number of coefficients minus one).
    pub fn degree(&self) -> I {
        self.coeffs.nrows() - 1
    }

    /// Evaluates the polynomial at `a` by Horner's scheme.
    pub fn eval(&self, a: E) -> E {
        let mut r = 0.0;
        for i in 0..self.coeffs.nrows() {
            r = r * a + self.coeffs[i];
        }
        r
    }

    /// Returns the derivative polynomial. The derivative of a constant
    /// is the zero polynomial of degree zero.
    pub fn derivative(&self) -> Polynomial {
        let d = self.degree();
        if d == 0 {
            return Polynomial::new(Col::zeros(1));
        }
        let out = Col::from_fn(d, |i| self.coeffs[i] * (d - i) as E);
        Polynomial::new(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_horner() {
        // p(a) = 2 a^2 - 3 a + 1
        let p = Polynomial::new(Col::from_fn(3, |i| [2.0, -3.0, 1.0][i]));
        assert_eq!(p.degree(), 2);
        assert_eq!(p.eval(0.0), 1.0);
        assert_eq!(p.eval(1.0), 0.0);
        assert_eq!(p.eval(2.0), 3.0);
    }

    #[test]
    fn test_derivative_of_constant_is_zero() {
        let p = Polynomial::new(Col::from_fn(1, |_| 5.0));
        let dp = p.derivative();
        assert_eq!(dp.degree(), 0);
        assert_eq!(dp.eval(3.0), 0.0);
    }

    #[test]
    fn test_derivative_matches_analytical() {
        // pseudo-random coefficients, several degrees and sample points
        for deg in 1..6 {
            let p = Polynomial::new(Col::from_fn(deg + 1, |i| ((i * 7 + deg) as E * 1.3).sin()));
            let dp = p.derivative();
            for s in 0..8 {
                let a = -2.0 + 0.5 * s as E;
                let mut expected = 0.0;
                for i in 0..deg {
                    let power = (deg - i - 1) as i32;
                    expected += p.coeffs[i] * (deg - i) as E * a.powi(power);
                }
                assert!((dp.eval(a) - expected).abs() <= 1e-12 * expected.abs().max(1.0));
            }
        }
    }
}
