//! Armijo backtracking line search over a fallible scalar oracle, with
//! bisection, quadratic, or safeguarded cubic interpolation.

pub mod armijo;
pub mod polynomial;

use serde::{Deserialize, Serialize};

use crate::{E, I};

/// Strategy used to propose the next trial step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LsInterpolation {
    /// Halve the step.
    Bisection,
    /// Minimize a quadratic through `(0, phi0, dphi0)` and the latest
    /// sample.
    Quadratic,
    #[default]
    /// Minimize a cubic through `(0, phi0, dphi0)` and the last two
    /// samples, falling back to quadratic while only one is available.
    Cubic,
}

/// Line search configuration. All scalar options must be finite and
/// strictly positive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LineSearchOptions {
    /// Armijo sufficient-decrease slope coefficient.
    pub armijo_c1: E,
    /// Lower clamp for any proposed step.
    pub alpha_min: E,
    /// Slope threshold under which the first successful probe is
    /// accepted immediately.
    pub dphi_thresh: E,
    /// Backtracking iteration cap.
    pub max_num_steps: I,
    /// Lower contraction bound: the next step is at least
    /// `contraction_min * alpha`.
    pub contraction_min: E,
    /// Upper contraction bound: the next step is at most
    /// `contraction_max * alpha`.
    pub contraction_max: E,
    pub interp_type: LsInterpolation,
}

impl Default for LineSearchOptions {
    fn default() -> Self {
        Self {
            armijo_c1: 1e-4,
            alpha_min: 1e-7,
            dphi_thresh: 1e-13,
            max_num_steps: 20,
            contraction_min: 0.1,
            contraction_max: 0.5,
            interp_type: LsInterpolation::default(),
        }
    }
}

/// A probe of the scalar merit: step, value, slope (when known), and a
/// validity bit distinguishing real samples from the default state.
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionSample {
    pub alpha: E,
    pub phi: E,
    pub dphi: E,
    pub valid: bool,
}

impl FunctionSample {
    pub fn new(alpha: E, phi: E) -> Self {
        Self {
            alpha,
            phi,
            dphi: 0.0,
            valid: true,
        }
    }

    pub fn with_slope(alpha: E, phi: E, dphi: E) -> Self {
        Self {
            alpha,
            phi,
            dphi,
            valid: true,
        }
    }
}
