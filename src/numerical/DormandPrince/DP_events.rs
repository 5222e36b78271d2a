use crate::Utils::event_bus::EventBus;
use crate::numerical::DormandPrince::DP_main::SolutionPoint;
use crate::numerical::DormandPrince::DP_settings::{Progress, Range, ToleranceChanged, ToleranceConfig};
use std::collections::HashMap;

/// One bus per kind of notification the solver publishes.
///
/// Every bus delivers synchronously on the thread that caused the event; during a
/// run that is the thread executing `run`.
#[derive(Debug, Default)]
pub struct SolverEvents {
    /// names of the reduced variables after new equations were set
    pub equations_updated: EventBus<Vec<String>>,
    pub initial_conditions_changed: EventBus<HashMap<String, f64>>,
    pub range_changed: EventBus<Range>,
    pub tolerance_changed: EventBus<ToleranceChanged>,
    /// full tolerance settings after a change of step bounds, factors, safety factor or norm
    pub step_control_changed: EventBus<ToleranceConfig>,
    pub run_started: EventBus<Range>,
    /// one event per accepted step
    pub progress: EventBus<Progress>,
    /// published when cancellation is requested and again when the run stops because of it
    pub canceled: EventBus<()>,
    /// every point of a run that reached the end of the range
    pub completed: EventBus<Vec<SolutionPoint>>,
}

impl SolverEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// removes every subscriber from every bus
    pub fn clear_all(&self) {
        self.equations_updated.clear();
        self.initial_conditions_changed.clear();
        self.range_changed.clear();
        self.tolerance_changed.clear();
        self.step_control_changed.clear();
        self.run_started.clear();
        self.progress.clear();
        self.canceled.clear();
        self.completed.clear();
    }
}
