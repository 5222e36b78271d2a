#![allow(non_snake_case)]
use RustedODE::Utils::logger::{LogSettings, init_logger};
use RustedODE::numerical::DormandPrince::DP_errors::SolverError;
use RustedODE::numerical::DormandPrince::DP_main::{DPsolver, SolutionPoint};
use RustedODE::numerical::DormandPrince::DP_task::DPTask;
use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// usage: RustedODE [task_file]
// without a task file a damped harmonic oscillator is solved
fn main() -> ExitCode {
    init_logger(&LogSettings::default());
    let solver = DPsolver::new();
    let result = match std::env::args().nth(1) {
        Some(path) => DPTask::from_file(&path).and_then(|task| task.solve(&solver)),
        None => oscillator(&solver),
    };
    match result {
        Ok(points) => {
            print_summary(&points);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn oscillator(solver: &DPsolver) -> Result<Vec<SolutionPoint>, SolverError> {
    solver.set_equations(&["y'' = -0.1*y_1 - y"])?;
    solver.set_initial_conditions(HashMap::from([
        ("y".to_string(), 1.0),
        ("y_1".to_string(), 0.0),
    ]))?;
    solver.set_range("t", 0.0, 20.0, 0.01)?;
    solver.set_tolerance(1e-8, 1e-8)?;
    let steps = Arc::new(AtomicUsize::new(0));
    let counter = steps.clone();
    solver.events().progress.subscribe(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });
    let points = solver.run(true)?;
    println!("{} steps accepted", steps.load(Ordering::Relaxed));
    solver.save_result_to_csv("oscillator.csv")?;
    Ok(points)
}

fn print_summary(points: &[SolutionPoint]) {
    let step = (points.len() / 10).max(1);
    for point in points.iter().step_by(step).chain(points.last()) {
        let line: Vec<String> = point
            .iter()
            .map(|(name, value)| format!("{} = {:.6}", name, value))
            .collect();
        println!("{}", line.join(", "));
    }
}
