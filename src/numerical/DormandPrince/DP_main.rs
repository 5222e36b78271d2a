//! # Dormand-Prince ODE solver
//!
//! Solves systems of ordinary differential equations of any order written as text:
//! ```text
//!  y'' = -0.1*y_1 - y
//!  z'  = y - z
//! ```
//! The equations are reduced to a first order system (see `DP_reduction`) and
//! integrated with the explicit Dormand-Prince 5(4) method with adaptive or fixed
//! step size.
//!
//! ## Example
//! ```rust
//! use RustedODE::numerical::DormandPrince::DP_main::DPsolver;
//! use std::collections::HashMap;
//!
//! let solver = DPsolver::new();
//! solver.set_equations(&["y'' = -y"]).unwrap();
//! solver
//!     .set_initial_conditions(HashMap::from([("y".to_string(), 0.0), ("y_1".to_string(), 1.0)]))
//!     .unwrap();
//! solver.set_range("t", 0.0, 3.0, 0.01).unwrap();
//! solver.set_tolerance(1e-10, 1e-8).unwrap();
//! let points = solver.run(true).unwrap();
//! let last = points.last().unwrap();
//! assert_eq!(last.x(), 3.0);
//! assert!((last.get("y").unwrap() - 3.0_f64.sin()).abs() < 1e-6);
//! ```
//!
//! ## Concurrency
//! Every method takes `&self`, so the solver can be shared through an `Arc` with event
//! subscribers and other threads. Only one run may be in flight per solver: `run` and
//! every setter fail with `Busy` while a run is going on. A run checks for
//! cancellation once per step, so `cancel` (or a [`CancelHandle`] on another thread or
//! inside a subscriber) stops it before the next step; a step in progress always
//! completes.

use crate::Utils::logger::{LogSettings, init_logger, save_solution_to_csv};
use crate::numerical::DormandPrince::DP_errors::SolverError;
use crate::numerical::DormandPrince::DP_events::SolverEvents;
use crate::numerical::DormandPrince::DP_reduction::{System, reduce};
use crate::numerical::DormandPrince::DP_settings::{
    ErrorNorm, Progress, Range, RunStatus, ToleranceChanged, ToleranceConfig, check_positive,
};
use crate::numerical::DormandPrince::DP_stepper::{StepController, step_too_small};
use log::{error, info};
use nalgebra::DVector;
use simplelog::LevelFilter;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

/// One accepted point of a solution: the argument followed by the base variables.
///
/// Auxiliary derivative variables (`y_1`, `y_2`, ...) are not part of the point.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionPoint {
    names: Arc<Vec<String>>,
    values: Vec<f64>,
}

impl SolutionPoint {
    /// `names[0]` is the argument
    pub fn new(names: Arc<Vec<String>>, values: Vec<f64>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        SolutionPoint { names, values }
    }

    /// name of the independent variable
    pub fn arg(&self) -> &str {
        &self.names[0]
    }

    pub fn x(&self) -> f64 {
        self.values[0]
    }

    /// value of the argument or of a base variable
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

struct SolverState {
    system: Option<Arc<System>>,
    initial_conditions: HashMap<String, f64>,
    range: Range,
    tolerance: ToleranceConfig,
    status: RunStatus,
    result: Vec<SolutionPoint>,
    log_settings: LogSettings,
}

// state reachable from cancel handles
#[derive(Debug, Default)]
struct Shared {
    events: SolverEvents,
    cancel_requested: AtomicBool,
}

impl Shared {
    fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
        info!("cancellation requested");
        self.events.canceled.publish(&());
    }
}

/// Cancels the run of the solver it was taken from; can be moved to other threads.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    shared: Arc<Shared>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.shared.request_cancel();
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.shared.cancel_requested.load(Ordering::SeqCst)
    }
}

// clears the running flag on every exit path of `run`
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

// everything a run needs, copied out of the state so the lock is not held while stepping
struct RunSetup {
    system: Arc<System>,
    range: Range,
    tolerance: ToleranceConfig,
    y0: DVector<f64>,
}

pub struct DPsolver {
    state: Mutex<SolverState>,
    running: AtomicBool,
    shared: Arc<Shared>,
}

impl Default for DPsolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DPsolver {
    pub fn new() -> DPsolver {
        DPsolver {
            state: Mutex::new(SolverState {
                system: None,
                initial_conditions: HashMap::new(),
                range: Range::default(),
                tolerance: ToleranceConfig::default(),
                status: RunStatus::Idle,
                result: Vec::new(),
                log_settings: LogSettings::default(),
            }),
            running: AtomicBool::new(false),
            shared: Arc::new(Shared::default()),
        }
    }

    // no code path panics while holding the lock, a poisoned state is still consistent
    fn lock(&self) -> MutexGuard<'_, SolverState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// runs `f` on the state unless a run is in flight
    fn update_state<R>(
        &self,
        f: impl FnOnce(&mut SolverState) -> Result<R, SolverError>,
    ) -> Result<R, SolverError> {
        let mut state = self.lock();
        if self.running.load(Ordering::SeqCst) {
            return Err(SolverError::Busy);
        }
        f(&mut state)
    }

    ////////////////////////////////configuration
    /// Reduces the equations and replaces the system. Initial conditions and the last
    /// result are dropped; publishes `equations_updated` with the new variable names.
    pub fn set_equations<S: AsRef<str>>(&self, equations: &[S]) -> Result<(), SolverError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(SolverError::Busy);
        }
        let system = reduce(equations)?;
        let names = system.variable_names();
        self.update_state(|state| {
            state.system = Some(Arc::new(system));
            state.initial_conditions.clear();
            state.result.clear();
            Ok(())
        })?;
        self.shared.events.equations_updated.publish(&names);
        Ok(())
    }

    /// Replaces the initial conditions. Every key must be a variable of the system.
    pub fn set_initial_conditions(
        &self,
        conditions: HashMap<String, f64>,
    ) -> Result<(), SolverError> {
        let published = self.update_state(|state| {
            let names = state
                .system
                .as_ref()
                .map(|s| s.variable_names())
                .unwrap_or_default();
            let mut keys: Vec<&String> = conditions.keys().collect();
            keys.sort();
            for key in keys {
                if !names.contains(key) {
                    return Err(SolverError::UnknownVariable(key.clone()));
                }
                if !conditions[key].is_finite() {
                    return Err(SolverError::Configuration(format!(
                        "initial condition {} = {} is not finite",
                        key, conditions[key]
                    )));
                }
            }
            state.initial_conditions = conditions.clone();
            Ok(conditions)
        })?;
        self.shared
            .events
            .initial_conditions_changed
            .publish(&published);
        Ok(())
    }

    pub fn set_range(
        &self,
        arg: &str,
        start: f64,
        end: f64,
        initial_step: f64,
    ) -> Result<(), SolverError> {
        let range = Range::new(arg, start, end, initial_step)?;
        self.update_state(|state| {
            state.range = range.clone();
            Ok(())
        })?;
        self.shared.events.range_changed.publish(&range);
        Ok(())
    }

    pub fn set_tolerance(&self, atol: f64, rtol: f64) -> Result<(), SolverError> {
        check_positive("atol", atol)?;
        check_positive("rtol", rtol)?;
        self.update_state(|state| {
            state.tolerance.atol = atol;
            state.tolerance.rtol = rtol;
            Ok(())
        })?;
        self.shared
            .events
            .tolerance_changed
            .publish(&ToleranceChanged { atol, rtol });
        Ok(())
    }

    // applies a change of the step control settings if the result validates
    fn update_step_control(
        &self,
        change: impl FnOnce(&mut ToleranceConfig),
    ) -> Result<(), SolverError> {
        let tolerance = self.update_state(|state| {
            let mut candidate = state.tolerance.clone();
            change(&mut candidate);
            candidate.validate()?;
            state.tolerance = candidate.clone();
            Ok(candidate)
        })?;
        self.shared.events.step_control_changed.publish(&tolerance);
        Ok(())
    }

    /// None restores the default bound
    pub fn set_step_bounds(
        &self,
        min_step: Option<f64>,
        max_step: Option<f64>,
    ) -> Result<(), SolverError> {
        self.update_step_control(|tol| {
            tol.min_step = min_step;
            tol.max_step = max_step;
        })
    }

    pub fn set_factor_bounds(&self, min_factor: f64, max_factor: f64) -> Result<(), SolverError> {
        self.update_step_control(|tol| {
            tol.min_factor = min_factor;
            tol.max_factor = max_factor;
        })
    }

    pub fn set_safety_factor(&self, safety_factor: f64) -> Result<(), SolverError> {
        self.update_step_control(|tol| tol.safety_factor = safety_factor)
    }

    pub fn set_error_norm(&self, error_norm: ErrorNorm) -> Result<(), SolverError> {
        self.update_step_control(|tol| tol.error_norm = error_norm)
    }

    ////////////////////////////////accessors
    /// all variables of the reduced system, empty before equations are set
    pub fn variable_names(&self) -> Vec<String> {
        self.lock()
            .system
            .as_ref()
            .map(|s| s.variable_names())
            .unwrap_or_default()
    }

    pub fn base_variable_names(&self) -> Vec<String> {
        self.lock()
            .system
            .as_ref()
            .map(|s| s.base_variable_names())
            .unwrap_or_default()
    }

    pub fn equations(&self) -> Vec<String> {
        self.lock()
            .system
            .as_ref()
            .map(|s| s.equations().to_vec())
            .unwrap_or_default()
    }

    pub fn get_range(&self) -> Range {
        self.lock().range.clone()
    }

    pub fn get_tolerance(&self) -> ToleranceConfig {
        self.lock().tolerance.clone()
    }

    pub fn get_initial_conditions(&self) -> HashMap<String, f64> {
        self.lock().initial_conditions.clone()
    }

    pub fn get_status(&self) -> RunStatus {
        self.lock().status
    }

    /// points of the last finished or canceled run
    pub fn get_result(&self) -> Vec<SolutionPoint> {
        self.lock().result.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> &SolverEvents {
        &self.shared.events
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: self.shared.clone(),
        }
    }

    /// Requests cancellation of the current run and publishes `canceled` right away.
    /// The run publishes `canceled` once more when it actually stops.
    pub fn cancel(&self) {
        self.shared.request_cancel();
    }

    ////////////////////////////////run
    fn prepare_run(state: &SolverState) -> Result<RunSetup, SolverError> {
        let system = state
            .system
            .clone()
            .ok_or_else(|| SolverError::Configuration("no equations set".to_string()))?;
        let range = state.range.clone();
        if range.start + range.initial_step >= range.end {
            return Err(SolverError::Configuration(format!(
                "initial step {} does not fit into [{}, {}]",
                range.initial_step, range.start, range.end
            )));
        }
        if step_too_small(range.start, range.initial_step) {
            return Err(SolverError::Configuration(format!(
                "initial step {} is lost in rounding at {} = {}",
                range.initial_step, range.arg, range.start
            )));
        }
        if system.variables().iter().any(|v| v.name == range.arg) {
            return Err(SolverError::Configuration(format!(
                "independent variable '{}' is also a variable of the system",
                range.arg
            )));
        }
        let tolerance = state.tolerance.clone();
        tolerance.validate()?;
        if tolerance.min_step() > tolerance.max_step(&range) {
            return Err(SolverError::Configuration(format!(
                "min step {} is greater than max step {}",
                tolerance.min_step(),
                tolerance.max_step(&range)
            )));
        }
        let names = system.variable_names();
        let missing: Vec<&String> = names
            .iter()
            .filter(|n| !state.initial_conditions.contains_key(*n))
            .collect();
        if !missing.is_empty() {
            return Err(SolverError::Configuration(format!(
                "missing initial conditions for {:?}",
                missing
            )));
        }
        let y0 = DVector::from_iterator(
            names.len(),
            names.iter().map(|n| state.initial_conditions[n]),
        );
        Ok(RunSetup {
            system,
            range,
            tolerance,
            y0,
        })
    }

    /// Integrates the system over the range.
    ///
    /// Returns every accepted point, starting with the initial one at `start`. A
    /// finished run ends exactly at `end` and publishes `completed`; a canceled run
    /// returns the points computed so far and publishes `canceled` instead.
    ///
    /// # Errors
    /// `Busy` if a run is already in flight, `Configuration` if the setup is
    /// incomplete or inconsistent (before any event is published), `Evaluation` and
    /// `Convergence` if integration fails; a failed run keeps no partial result.
    pub fn run(&self, adaptive: bool) -> Result<Vec<SolutionPoint>, SolverError> {
        let mut state = self.lock();
        if self.running.load(Ordering::SeqCst) {
            return Err(SolverError::Busy);
        }
        // the flag is cleared before the run is visible, a cancel seen as running is kept
        self.shared.cancel_requested.store(false, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        let _guard = RunGuard(&self.running);

        let setup = Self::prepare_run(&state)?;
        state.status = RunStatus::Running;
        state.result.clear();
        drop(state);
        let RunSetup {
            system,
            range,
            tolerance,
            y0,
        } = setup;
        let mut controller = match StepController::new(&system, &range, &tolerance, y0, adaptive)
        {
            Ok(controller) => controller,
            Err(e) => {
                self.lock().status = RunStatus::Failed;
                return Err(e);
            }
        };

        let mut point_names = vec![range.arg.clone()];
        point_names.extend(system.base_variable_names());
        let point_names = Arc::new(point_names);
        let base_indices = system.base_indices().to_vec();
        let project = |x: f64, y: &DVector<f64>| {
            let mut values = Vec::with_capacity(base_indices.len() + 1);
            values.push(x);
            values.extend(base_indices.iter().map(|&i| y[i]));
            SolutionPoint::new(point_names.clone(), values)
        };

        let mut points = vec![project(controller.x(), controller.y())];
        info!(
            "Dormand-Prince run over {} in [{}, {}] started, adaptive step: {}",
            range.arg, range.start, range.end, adaptive
        );
        let begin = Instant::now();
        self.shared.events.run_started.publish(&range);

        let failure = loop {
            if controller.finished() {
                break None;
            }
            std::thread::yield_now();
            if self.shared.cancel_requested.load(Ordering::SeqCst) {
                break None;
            }
            match controller.advance() {
                Ok(step) => {
                    points.push(project(step.x, controller.y()));
                    self.shared.events.progress.publish(&Progress {
                        x: step.x,
                        step_size: step.step_size,
                        error_norm: step.error_norm,
                    });
                }
                Err(e) => break Some(e),
            }
        };

        if let Some(e) = failure {
            error!("run failed at {} = {}: {}", range.arg, controller.x(), e);
            self.lock().status = RunStatus::Failed;
            return Err(e);
        }

        info!(
            "{} accepted and {} rejected steps in {} ms",
            controller.accepted,
            controller.rejected,
            begin.elapsed().as_millis()
        );
        if self.shared.cancel_requested.load(Ordering::SeqCst) {
            info!("run canceled at {} = {}", range.arg, controller.x());
            {
                let mut state = self.lock();
                state.status = RunStatus::Canceled;
                state.result = points.clone();
            }
            self.shared.events.canceled.publish(&());
        } else {
            {
                let mut state = self.lock();
                state.status = RunStatus::Finished;
                state.result = points.clone();
            }
            self.shared.events.completed.publish(&points);
        }
        Ok(points)
    }

    /// writes the result of the last run into a csv file
    pub fn save_result_to_csv(&self, filename: &str) -> Result<(), SolverError> {
        let result = self.get_result();
        save_solution_to_csv(&result, filename)?;
        info!("{} points saved to {}", result.len(), filename);
        Ok(())
    }

    ////////////////////////////////logging functions
    /// Set logging level (Off, Error, Warn, Info, Debug, Trace)
    pub fn set_log_level(&self, level: LevelFilter) {
        let settings = {
            let mut state = self.lock();
            state.log_settings.level = level;
            state.log_settings.clone()
        };
        init_logger(&settings);
    }

    /// Enable logging to file
    pub fn set_log_file(&self, filename: String) {
        let settings = {
            let mut state = self.lock();
            state.log_settings.log_file = Some(filename);
            state.log_settings.clone()
        };
        init_logger(&settings);
    }

    /// Enable/disable console logging
    pub fn set_console_logging(&self, enabled: bool) {
        let settings = {
            let mut state = self.lock();
            state.log_settings.log_to_console = enabled;
            state.log_settings.clone()
        };
        init_logger(&settings);
    }

    /// Disable logging
    pub fn disable_logging(&self) {
        self.set_log_level(LevelFilter::Off);
    }
}
