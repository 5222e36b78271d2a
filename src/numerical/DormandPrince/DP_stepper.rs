//! # Dormand-Prince 5(4) stepping
//!
//! [`DPstepper`] computes one explicit Runge-Kutta step and returns both the 5th order
//! solution (which is propagated) and the embedded 4th order one (used only for the
//! error estimate). [`StepController`] owns the state of a run, decides whether a
//! step is accepted, adapts the step size and makes the last step land on the end
//! of the interval.
//!
//! Error of a step, component wise:
//! ```text
//!  tol_i = atol + rtol * max(|y_i|, |y5_i|)
//!  e_i   = |y5_i - y4_i| / tol_i
//!  norm  = sqrt(mean(e_i^2))      (or max(e_i))
//! ```
//! a step is accepted when `norm <= 1`, the next step size is
//! `h * clamp(safety * norm^(-1/5), min_factor, max_factor)` clamped to `[min_step, max_step]`.

use crate::numerical::DormandPrince::DP_errors::SolverError;
use crate::numerical::DormandPrince::DP_reduction::System;
use crate::numerical::DormandPrince::DP_settings::{ErrorNorm, Range, ToleranceConfig};
use crate::symbolic::symbolic_engine::EvalError;
use log::debug;
use nalgebra::DVector;
use std::sync::Arc;

// Butcher tableau of the Dormand-Prince method
pub const C: [f64; 7] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];
pub const A: [[f64; 6]; 7] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];
/// 5th order weights, the last row of A
pub const B5: [f64; 7] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];
/// embedded 4th order weights
pub const B4: [f64; 7] = [
    5179.0 / 57600.0,
    0.0,
    7571.0 / 16695.0,
    393.0 / 640.0,
    -92097.0 / 339200.0,
    187.0 / 2100.0,
    1.0 / 40.0,
];

/// relative slack within which a step is stretched to land exactly on the end
const END_SNAP: f64 = 1e-8;

/// evaluates the Dormand-Prince stages of a system
pub struct DPstepper<'a> {
    system: &'a System,
    names: Arc<Vec<String>>,
}

impl<'a> DPstepper<'a> {
    pub fn new(system: &'a System, arg: &str) -> DPstepper<'a> {
        DPstepper {
            system,
            names: system.scope_names(arg),
        }
    }

    fn f(&self, x: f64, y: &DVector<f64>) -> Result<DVector<f64>, EvalError> {
        self.system.evaluate(&self.names, x, y)
    }

    /// one step of size h from (x, y), returns (y5, y4)
    pub fn step(
        &self,
        x: f64,
        y: &DVector<f64>,
        h: f64,
    ) -> Result<(DVector<f64>, DVector<f64>), EvalError> {
        let mut k: Vec<DVector<f64>> = Vec::with_capacity(7);
        k.push(self.f(x, y)?);
        for i in 1..7 {
            let mut y_stage = y.clone();
            for (m, k_m) in k.iter().enumerate() {
                if A[i][m] != 0.0 {
                    y_stage.axpy(h * A[i][m], k_m, 1.0);
                }
            }
            k.push(self.f(x + C[i] * h, &y_stage)?);
        }

        let mut y5 = y.clone();
        let mut y4 = y.clone();
        for (m, k_m) in k.iter().enumerate() {
            if B5[m] != 0.0 {
                y5.axpy(h * B5[m], k_m, 1.0);
            }
            if B4[m] != 0.0 {
                y4.axpy(h * B4[m], k_m, 1.0);
            }
        }
        Ok((y5, y4))
    }
}

/// scaled error of a step, see the module docs
pub fn error_norm(
    y: &DVector<f64>,
    y5: &DVector<f64>,
    y4: &DVector<f64>,
    tol: &ToleranceConfig,
) -> f64 {
    let n = y.len();
    if n == 0 {
        return 0.0;
    }
    let scaled = (0..n).map(|i| {
        let sk = tol.atol + tol.rtol * y[i].abs().max(y5[i].abs());
        (y5[i] - y4[i]).abs() / sk
    });
    match tol.error_norm {
        ErrorNorm::Rms => (scaled.map(|e| e * e).sum::<f64>() / n as f64).sqrt(),
        // f64::max would swallow NaN
        ErrorNorm::Max => scaled.fold(0.0, |acc, e| if e.is_nan() || e > acc { e } else { acc }),
    }
}

/// largest component of |y5 - y4|
pub fn max_abs_difference(y5: &DVector<f64>, y4: &DVector<f64>) -> f64 {
    (y5 - y4).amax()
}

/// factor the step size is multiplied with after a step with the given error norm
pub fn step_factor(norm: f64, tol: &ToleranceConfig) -> f64 {
    if !norm.is_finite() {
        tol.min_factor
    } else if norm == 0.0 {
        tol.max_factor
    } else {
        (tol.safety_factor * norm.powf(-0.2)).clamp(tol.min_factor, tol.max_factor)
    }
}

/// true when a step of size h no longer changes x in floating point
pub fn step_too_small(x: f64, h: f64) -> bool {
    0.1 * h.abs() <= x.abs() * f64::EPSILON
}

/// what an accepted step reports
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptedStep {
    /// argument after the step
    pub x: f64,
    /// size of the step that was taken
    pub step_size: f64,
    pub error_norm: f64,
}

/// state of one run: current point, step size and the control settings
pub struct StepController<'a> {
    stepper: DPstepper<'a>,
    tol: ToleranceConfig,
    adaptive: bool,
    min_step: f64,
    max_step: f64,
    end: f64,
    x: f64,
    y: DVector<f64>,
    h: f64,
    pub accepted: usize,
    pub rejected: usize,
}

impl<'a> StepController<'a> {
    pub fn new(
        system: &'a System,
        range: &Range,
        tol: &ToleranceConfig,
        y0: DVector<f64>,
        adaptive: bool,
    ) -> Result<StepController<'a>, SolverError> {
        tol.validate()?;
        let min_step = tol.min_step();
        let max_step = tol.max_step(range);
        if min_step > max_step {
            return Err(SolverError::Configuration(format!(
                "min step {} is greater than max step {}",
                min_step, max_step
            )));
        }
        if y0.len() != system.len() {
            return Err(SolverError::Configuration(format!(
                "{} initial values given for {} variables",
                y0.len(),
                system.len()
            )));
        }
        let h = if adaptive {
            range.initial_step.clamp(min_step, max_step)
        } else {
            range.initial_step
        };
        Ok(StepController {
            stepper: DPstepper::new(system, &range.arg),
            tol: tol.clone(),
            adaptive,
            min_step,
            max_step,
            end: range.end,
            x: range.start,
            y: y0,
            h,
            accepted: 0,
            rejected: 0,
        })
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> &DVector<f64> {
        &self.y
    }

    /// step size the next attempt starts with
    pub fn h(&self) -> f64 {
        self.h
    }

    pub fn finished(&self) -> bool {
        self.x >= self.end
    }

    // the step that reaches (or nearly reaches) the end is made to land on it exactly
    fn clamp_to_end(&self, h: f64) -> (f64, bool) {
        if self.x + h * (1.0 + END_SNAP) >= self.end {
            (self.end - self.x, true)
        } else {
            (h, false)
        }
    }

    fn accept(&mut self, h: f64, last: bool, y5: DVector<f64>) {
        self.x = if last { self.end } else { self.x + h };
        self.y = y5;
        self.accepted += 1;
    }

    /// Takes the next accepted step, retrying rejected ones internally.
    ///
    /// # Errors
    /// `Evaluation` if a right-hand side fails, `Convergence` if a step of the minimum
    /// size is rejected or a step is too small to move the argument.
    pub fn advance(&mut self) -> Result<AcceptedStep, SolverError> {
        loop {
            let (h, last) = self.clamp_to_end(self.h);
            // the last step lands on the end by assignment
            if !last && step_too_small(self.x, h) {
                return Err(SolverError::Convergence {
                    x: self.x,
                    h,
                    min_step: self.min_step,
                });
            }
            let (y5, y4) = self.stepper.step(self.x, &self.y, h)?;

            if !self.adaptive {
                let norm = max_abs_difference(&y5, &y4);
                self.accept(h, last, y5);
                return Ok(AcceptedStep {
                    x: self.x,
                    step_size: h,
                    error_norm: norm,
                });
            }

            let norm = error_norm(&self.y, &y5, &y4, &self.tol);
            let factor = step_factor(norm, &self.tol);
            if norm <= 1.0 {
                self.accept(h, last, y5);
                self.h = (h * factor).clamp(self.min_step, self.max_step);
                return Ok(AcceptedStep {
                    x: self.x,
                    step_size: h,
                    error_norm: norm,
                });
            }

            self.rejected += 1;
            if h <= self.min_step {
                return Err(SolverError::Convergence {
                    x: self.x,
                    h,
                    min_step: self.min_step,
                });
            }
            let mut new_h = (h * factor).clamp(self.min_step, self.max_step);
            if new_h >= h {
                new_h = (h * self.tol.min_factor).max(self.min_step);
            }
            debug!(
                "step rejected at x = {}: h = {}, error norm = {}, retrying with h = {}",
                self.x, h, norm, new_h
            );
            self.h = new_h;
        }
    }
}
