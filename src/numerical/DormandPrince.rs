/// errors of the Dormand-Prince solver
pub mod DP_errors;
/// typed event buses the solver publishes on
pub mod DP_events;
/// main solver: configuration, runs, cancellation
pub mod DP_main;
/// reduction of arbitrary order equations to a first order system
pub mod DP_reduction;
/// range, tolerance, progress and status types
pub mod DP_settings;
/// Dormand-Prince 5(4) step and step size control
pub mod DP_stepper;
/// problems described in task documents
pub mod DP_task;
