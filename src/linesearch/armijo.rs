use faer::Col;
use problemo::Problem;

use crate::E;
use crate::linesearch::polynomial::Polynomial;
use crate::linesearch::{FunctionSample, LineSearchOptions, LsInterpolation};

/// Backtracking Armijo line search.
///
/// Drives a scalar merit oracle `phi` along a search direction until the
/// sufficient-decrease condition
/// `phi(alpha) - phi(0) <= c1 * alpha * phi'(0)` holds, proposing trial
/// steps by bisection or by safeguarded quadratic/cubic interpolation.
/// Oracle failures are absorbed by contracting the step; only a failure
/// at the minimal step is surfaced.
pub struct ArmijoLineSearch {
    options: LineSearchOptions,
    quad: Polynomial,
    cubic: Polynomial,
}

impl ArmijoLineSearch {
    pub fn new(options: LineSearchOptions) -> Self {
        debug_assert!(options.armijo_c1.is_finite() && options.armijo_c1 > 0.0);
        debug_assert!(options.alpha_min.is_finite() && options.alpha_min > 0.0);
        debug_assert!(options.dphi_thresh.is_finite() && options.dphi_thresh > 0.0);
        debug_assert!(options.max_num_steps > 0);
        debug_assert!(options.contraction_min.is_finite() && options.contraction_min > 0.0);
        debug_assert!(options.contraction_max.is_finite() && options.contraction_max > 0.0);
        debug_assert!(options.contraction_min < options.contraction_max);
        Self {
            options,
            quad: Polynomial::new(Col::zeros(3)),
            cubic: Polynomial::new(Col::zeros(4)),
        }
    }

    pub fn options(&self) -> &LineSearchOptions {
        &self.options
    }

    /// Runs the search. `phi0` and `dphi0` are the merit value and slope
    /// at zero; `alpha_try` is the in/out trial step. Returns the merit
    /// value at the last accepted probe.
    pub fn run<F>(
        &mut self,
        mut phi: F,
        phi0: E,
        dphi0: E,
        alpha_try: &mut E,
    ) -> Result<E, Problem>
    where
        F: FnMut(E) -> Result<E, Problem>,
    {
        let lower_bound = FunctionSample::with_slope(0.0, phi0, dphi0);

        *alpha_try = 1.0;
        let mut latest;
        let mut previous = FunctionSample::default();

        // try the full step; on failure, aggressively backtrack until the
        // merit is evaluable
        loop {
            match phi(*alpha_try) {
                Ok(value) => {
                    latest = FunctionSample::new(*alpha_try, value);
                    break;
                }
                Err(err) => {
                    if *alpha_try <= self.options.alpha_min {
                        // not evaluable even at the minimal step
                        return Err(err);
                    }
                    *alpha_try *= 0.5;
                    if *alpha_try <= self.options.alpha_min {
                        *alpha_try = self.options.alpha_min;
                    }
                }
            }
        }

        if dphi0.abs() < self.options.dphi_thresh {
            return Ok(latest.phi);
        }

        for _ in 0..self.options.max_num_steps {
            let dm = latest.phi - phi0;
            if dm <= self.options.armijo_c1 * *alpha_try * dphi0 {
                break;
            }

            // compute the next trial step
            if self.options.interp_type == LsInterpolation::Bisection {
                *alpha_try *= 0.5;
            } else {
                let samples = [lower_bound, latest, previous];
                let used = match self.options.interp_type {
                    LsInterpolation::Cubic if previous.valid => 3,
                    _ => 2,
                };
                *alpha_try = self.minimize_interpolant(
                    self.options.interp_type,
                    &samples[..used],
                    self.options.contraction_min * *alpha_try,
                    self.options.contraction_max * *alpha_try,
                );
            }

            if alpha_try.is_nan() {
                *alpha_try = self.options.contraction_min * previous.alpha;
            } else {
                *alpha_try = alpha_try.max(self.options.alpha_min);
            }

            previous = latest;
            match phi(*alpha_try) {
                Ok(value) => latest = FunctionSample::new(*alpha_try, value),
                Err(_) => continue,
            }

            if *alpha_try <= self.options.alpha_min {
                break;
            }
        }

        Ok(latest.phi)
    }

    /// Proposes a candidate step by minimizing an interpolant of the
    /// samples, safeguarded to the `[min_step, max_step]` bracket.
    fn minimize_interpolant(
        &mut self,
        strat: LsInterpolation,
        samples: &[FunctionSample],
        min_step: E,
        max_step: E,
    ) -> E {
        debug_assert!(samples.len() >= 2);
        let lower_bound = samples[0];
        let phi0 = lower_bound.phi;
        let dphi0 = lower_bound.dphi;

        let strat = if samples.len() == 2 {
            LsInterpolation::Quadratic
        } else {
            strat
        };

        let mut anext;
        let interp: &Polynomial = match strat {
            LsInterpolation::Quadratic => {
                // fit A a^2 + dphi0 a + phi0 through the latest sample
                let cand0 = samples[1];
                let a = (cand0.phi - phi0 - cand0.alpha * dphi0) / (cand0.alpha * cand0.alpha);
                self.quad.coeffs[0] = a;
                self.quad.coeffs[1] = dphi0;
                self.quad.coeffs[2] = phi0;
                anext = -dphi0 / (2.0 * a);
                &self.quad
            }
            LsInterpolation::Cubic => {
                let cand0 = samples[1];
                let cand1 = samples[2];
                let a0 = cand0.alpha;
                let a1 = cand1.alpha;

                // 2x2 system for (c3, c2); the right-hand side rows are
                // crossed with respect to the matrix rows
                let m00 = a0 * a0 * a0;
                let m01 = a0 * a0;
                let m10 = a1 * a1 * a1;
                let m11 = a1 * a1;
                let r0 = cand1.phi - phi0 - dphi0 * a1;
                let r1 = cand0.phi - phi0 - dphi0 * a0;

                let det = m00 * m11 - m01 * m10;
                let c3 = (r0 * m11 - m01 * r1) / det;
                let c2 = (m00 * r1 - r0 * m10) / det;
                self.cubic.coeffs[0] = c3;
                self.cubic.coeffs[1] = c2;
                self.cubic.coeffs[2] = dphi0;
                self.cubic.coeffs[3] = phi0;

                // stationary point of the cubic interpolant
                anext = (-c2 + (c2 * c2 - 3.0 * c3 * dphi0).sqrt()) / (3.0 * c3);
                &self.cubic
            }
            LsInterpolation::Bisection => unreachable!(),
        };

        if anext > max_step || anext < min_step {
            // minimizer left the bracket; take the better edge
            let pleft = interp.eval(min_step);
            let pright = interp.eval(max_step);
            anext = if pleft < pright { min_step } else { max_step };
        }

        anext
    }
}

#[cfg(test)]
mod tests {
    use crate::I;
    use crate::function::EvalError;

    use super::*;

    fn armijo_holds(options: &LineSearchOptions, phi0: E, dphi0: E, alpha: E, phi_alpha: E) -> bool {
        phi_alpha - phi0 <= options.armijo_c1 * alpha * dphi0
    }

    #[test]
    fn test_cubic_quartic_merit() {
        // phi(a) = (a - 0.3)^4, minimized near a = 0.3
        let phi = |a: E| -> Result<E, Problem> { Ok((a - 0.3_f64).powi(4)) };
        let phi0 = 0.3_f64.powi(4);
        let dphi0 = -4.0 * 0.3_f64.powi(3);

        let options = LineSearchOptions {
            interp_type: LsInterpolation::Cubic,
            ..Default::default()
        };
        let mut probes: I = 0;
        let mut search = ArmijoLineSearch::new(options);
        let mut alpha = 1.0;
        let value = search
            .run(
                |a| {
                    probes += 1;
                    phi(a)
                },
                phi0,
                dphi0,
                &mut alpha,
            )
            .unwrap();

        assert!(probes <= 5);
        assert!((0.1..=0.5).contains(&alpha));
        assert!(armijo_holds(&options, phi0, dphi0, alpha, value));
    }

    #[test]
    fn test_quadratic_merit() {
        // phi(a) = (a - 0.5)^2; the first quadratic fit is exact
        let phi = |a: E| -> Result<E, Problem> { Ok((a - 0.5_f64).powi(2)) };
        let phi0 = 0.25;
        let dphi0 = -1.0;

        let options = LineSearchOptions {
            interp_type: LsInterpolation::Quadratic,
            ..Default::default()
        };
        let mut search = ArmijoLineSearch::new(options);
        let mut alpha = 1.0;
        let value = search.run(phi, phi0, dphi0, &mut alpha).unwrap();

        assert!((alpha - 0.5).abs() < 1e-12);
        assert!(armijo_holds(&options, phi0, dphi0, alpha, value));
    }

    #[test]
    fn test_bisection_halves_the_step() {
        // sufficient decrease only appears below a = 0.25
        let phi = |a: E| -> Result<E, Problem> { Ok(if a > 0.25 { 1.0 } else { -a }) };
        let options = LineSearchOptions {
            interp_type: LsInterpolation::Bisection,
            ..Default::default()
        };
        let mut search = ArmijoLineSearch::new(options);
        let mut alpha = 1.0;
        let value = search.run(phi, 0.0, -1.0, &mut alpha).unwrap();

        assert_eq!(alpha, 0.25);
        assert_eq!(value, -0.25);
    }

    #[test]
    fn test_failed_probes_are_absorbed() {
        // the merit is only evaluable for a <= 0.6
        let phi = |a: E| -> Result<E, Problem> {
            if a > 0.6 {
                return Err(EvalError::NonEvaluable.into());
            }
            Ok((a - 0.2_f64).powi(2))
        };
        let phi0 = 0.04;
        let dphi0 = -0.4;

        let mut search = ArmijoLineSearch::new(LineSearchOptions::default());
        let mut alpha = 1.0;
        let value = search.run(phi, phi0, dphi0, &mut alpha).unwrap();

        assert!(alpha <= 0.6);
        let options = LineSearchOptions::default();
        assert!(armijo_holds(&options, phi0, dphi0, alpha, value));
    }

    #[test]
    fn test_flat_slope_accepts_first_probe() {
        let mut calls: I = 0;
        let mut search = ArmijoLineSearch::new(LineSearchOptions::default());
        let mut alpha = 1.0;
        let value = search
            .run(
                |_a| {
                    calls += 1;
                    Ok(7.0)
                },
                7.0,
                1e-15,
                &mut alpha,
            )
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(alpha, 1.0);
        assert_eq!(value, 7.0);
    }

    #[test]
    fn test_unevaluable_merit_surfaces_error() {
        let mut search = ArmijoLineSearch::new(LineSearchOptions::default());
        let mut alpha = 1.0;
        let res = search.run(
            |_a| -> Result<E, Problem> { Err(EvalError::NonEvaluable.into()) },
            1.0,
            -1.0,
            &mut alpha,
        );
        assert!(res.is_err());
    }
}
