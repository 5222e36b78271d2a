use crate::symbolic::symbolic_engine::EvalError;
use thiserror::Error;

/// Everything that can go wrong while configuring or running the solver.
///
/// Configuration problems are reported by the setter or by `run` before anything
/// changes; a rejected step is not an error.
#[derive(Debug, Error)]
pub enum SolverError {
    /// equation text that cannot be reduced: bad LHS, '=' count, RHS parse failure, duplicate base
    #[error("equation syntax error: {0}")]
    EquationSyntax(String),
    /// initial condition for a name the system does not declare
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("invalid range: {0}")]
    InvalidRange(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    /// a right-hand side could not be evaluated; fatal for the run
    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvalError),
    /// a run is already in progress on this solver
    #[error("solver is busy with another run")]
    Busy,
    /// the step fell to the minimum step, or became too small to move the argument
    #[error("step size {h} at x = {x} is too small to continue (minimum step {min_step})")]
    Convergence { x: f64, h: f64, min_step: f64 },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}
