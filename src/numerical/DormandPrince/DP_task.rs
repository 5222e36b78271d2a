//! # Task documents
//!
//! A whole problem can be described in a plain text document and handed to the
//! solver in one go:
//! ```text
//! equations
//!   eq: y'' = -0.1*y_1 - y
//!   eq: z' = y - z
//! initial_conditions
//!   y: 1.0
//!   y_1: 0.0
//!   z: 0.0
//! range
//!   arg: t
//!   start: 0
//!   end: 20
//!   initial_step: 0.01
//! tolerance
//!   atol: 1e-8
//!   rtol: 1e-8
//!   error_norm: rms
//! solver
//!   adaptive: true
//!   log_level: info
//! output
//!   csv: solution.csv
//! ```
//! Only `equations` is required. Sections and keys:
//! - `equations`: `eq` (repeatable, several equations per line separated by commas)
//! - `initial_conditions`: one `name: value` line per variable
//! - `range`: `arg`, `start`, `end`, `initial_step`
//! - `tolerance`: `atol`, `rtol`, `safety_factor`, `min_factor`, `max_factor`,
//!   `min_step`, `max_step`, `error_norm` (`rms` or `max`)
//! - `solver`: `adaptive`, `log_level`, `log_file`
//! - `output`: `csv`
//!
//! Comment lines start with `#`, `//` or `%`. Unknown sections and keys are errors.

use crate::Utils::task_parser::{SectionMap, Value, parse_document_as};
use crate::numerical::DormandPrince::DP_errors::SolverError;
use crate::numerical::DormandPrince::DP_main::{DPsolver, SolutionPoint};
use crate::numerical::DormandPrince::DP_settings::{ErrorNorm, Range, ToleranceConfig};
use log::info;
use simplelog::LevelFilter;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

/// a problem read from a task document
#[derive(Debug, Clone, PartialEq)]
pub struct DPTask {
    pub equations: Vec<String>,
    pub initial_conditions: HashMap<String, f64>,
    pub range: Option<Range>,
    pub tolerance: Option<ToleranceConfig>,
    pub adaptive: bool,
    pub log_level: Option<LevelFilter>,
    pub log_file: Option<String>,
    pub csv: Option<String>,
}

impl Default for DPTask {
    fn default() -> Self {
        DPTask {
            equations: Vec::new(),
            initial_conditions: HashMap::new(),
            range: None,
            tolerance: None,
            adaptive: true,
            log_level: None,
            log_file: None,
            csv: None,
        }
    }
}

fn single<'a>(section: &str, key: &str, values: &'a [Value]) -> Result<&'a Value, SolverError> {
    match values {
        [value] => Ok(value),
        _ => Err(SolverError::Configuration(format!(
            "{}.{} expects exactly one value, got {}",
            section,
            key,
            values.len()
        ))),
    }
}

fn number(section: &str, key: &str, values: &[Value]) -> Result<f64, SolverError> {
    let value = single(section, key, values)?;
    value.as_f64().ok_or_else(|| {
        SolverError::Configuration(format!("{}.{}: '{}' is not a number", section, key, value))
    })
}

fn text(section: &str, key: &str, values: &[Value]) -> Result<String, SolverError> {
    Ok(single(section, key, values)?.to_string_value())
}

fn boolean(section: &str, key: &str, values: &[Value]) -> Result<bool, SolverError> {
    let value = single(section, key, values)?;
    value.as_boolean().ok_or_else(|| {
        SolverError::Configuration(format!(
            "{}.{}: '{}' is not true or false",
            section, key, value
        ))
    })
}

fn unknown_key(section: &str, key: &str) -> SolverError {
    SolverError::Configuration(format!("unknown key '{}' in section '{}'", key, section))
}

impl FromStr for DPTask {
    type Err = SolverError;

    fn from_str(input: &str) -> Result<DPTask, SolverError> {
        let document = parse_document_as(input).map_err(SolverError::Configuration)?;
        let mut task = DPTask::default();
        for (section, map) in &document {
            match section.as_str() {
                "equations" => task.read_equations(map)?,
                "initial_conditions" => {
                    for (name, values) in map {
                        let value = number(section, name, values)?;
                        task.initial_conditions.insert(name.clone(), value);
                    }
                }
                "range" => task.read_range(map)?,
                "tolerance" => task.read_tolerance(map)?,
                "solver" => task.read_solver(map)?,
                "output" => {
                    for (key, values) in map {
                        match key.as_str() {
                            "csv" => task.csv = Some(text(section, key, values)?),
                            _ => return Err(unknown_key(section, key)),
                        }
                    }
                }
                _ => {
                    return Err(SolverError::Configuration(format!(
                        "unknown section '{}'",
                        section
                    )));
                }
            }
        }
        if task.equations.is_empty() {
            return Err(SolverError::Configuration(
                "task has no equations".to_string(),
            ));
        }
        Ok(task)
    }
}

impl DPTask {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<DPTask, SolverError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        info!("task loaded from {}", path.as_ref().display());
        DPTask::from_str(&content)
    }

    fn read_equations(&mut self, map: &SectionMap) -> Result<(), SolverError> {
        for (key, values) in map {
            match key.as_str() {
                "eq" => self
                    .equations
                    .extend(values.iter().map(Value::to_string_value)),
                _ => return Err(unknown_key("equations", key)),
            }
        }
        Ok(())
    }

    fn read_range(&mut self, map: &SectionMap) -> Result<(), SolverError> {
        let default = Range::default();
        let mut arg = default.arg;
        let (mut start, mut end, mut initial_step) = (default.start, default.end, default.initial_step);
        for (key, values) in map {
            match key.as_str() {
                "arg" => arg = text("range", key, values)?,
                "start" => start = number("range", key, values)?,
                "end" => end = number("range", key, values)?,
                "initial_step" => initial_step = number("range", key, values)?,
                _ => return Err(unknown_key("range", key)),
            }
        }
        self.range = Some(Range::new(&arg, start, end, initial_step)?);
        Ok(())
    }

    fn read_tolerance(&mut self, map: &SectionMap) -> Result<(), SolverError> {
        let mut tol = ToleranceConfig::default();
        for (key, values) in map {
            match key.as_str() {
                "atol" => tol.atol = number("tolerance", key, values)?,
                "rtol" => tol.rtol = number("tolerance", key, values)?,
                "safety_factor" => tol.safety_factor = number("tolerance", key, values)?,
                "min_factor" => tol.min_factor = number("tolerance", key, values)?,
                "max_factor" => tol.max_factor = number("tolerance", key, values)?,
                "min_step" => tol.min_step = Some(number("tolerance", key, values)?),
                "max_step" => tol.max_step = Some(number("tolerance", key, values)?),
                "error_norm" => {
                    let name = text("tolerance", key, values)?;
                    tol.error_norm = ErrorNorm::from_str(&name).map_err(|_| {
                        SolverError::Configuration(format!("unknown error norm '{}'", name))
                    })?;
                }
                _ => return Err(unknown_key("tolerance", key)),
            }
        }
        tol.validate()?;
        self.tolerance = Some(tol);
        Ok(())
    }

    fn read_solver(&mut self, map: &SectionMap) -> Result<(), SolverError> {
        for (key, values) in map {
            match key.as_str() {
                "adaptive" => self.adaptive = boolean("solver", key, values)?,
                "log_level" => {
                    let name = text("solver", key, values)?;
                    let level = LevelFilter::from_str(&name).map_err(|_| {
                        SolverError::Configuration(format!("unknown log level '{}'", name))
                    })?;
                    self.log_level = Some(level);
                }
                "log_file" => self.log_file = Some(text("solver", key, values)?),
                _ => return Err(unknown_key("solver", key)),
            }
        }
        Ok(())
    }

    /// passes every configured part of the task to the solver
    pub fn apply(&self, solver: &DPsolver) -> Result<(), SolverError> {
        if let Some(level) = self.log_level {
            solver.set_log_level(level);
        }
        if let Some(ref log_file) = self.log_file {
            solver.set_log_file(log_file.clone());
        }
        solver.set_equations(&self.equations)?;
        if !self.initial_conditions.is_empty() {
            solver.set_initial_conditions(self.initial_conditions.clone())?;
        }
        if let Some(ref range) = self.range {
            solver.set_range(&range.arg, range.start, range.end, range.initial_step)?;
        }
        if let Some(ref tol) = self.tolerance {
            solver.set_tolerance(tol.atol, tol.rtol)?;
            solver.set_factor_bounds(tol.min_factor, tol.max_factor)?;
            solver.set_safety_factor(tol.safety_factor)?;
            solver.set_step_bounds(tol.min_step, tol.max_step)?;
            solver.set_error_norm(tol.error_norm)?;
        }
        Ok(())
    }

    /// applies the task, runs it and writes the csv output if one is configured
    pub fn solve(&self, solver: &DPsolver) -> Result<Vec<SolutionPoint>, SolverError> {
        self.apply(solver)?;
        let points = solver.run(self.adaptive)?;
        if let Some(ref csv) = self.csv {
            solver.save_result_to_csv(csv)?;
        }
        Ok(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::tempdir;

    const TASK: &str = r#"
# damped oscillator coupled with a relaxation equation
equations
  eq: y'' = -0.1*y_1 - y
  eq: z' = y - z
initial_conditions
  y: 1.0
  y_1: 0
  z: 0.0
range
  arg: t
  start: 0
  end: 2
  initial_step: 0.01
tolerance
  atol: 1e-9
  rtol: 1e-9
  error_norm: Max
solver
  adaptive: true
  log_level: warn
"#;

    #[test]
    fn test_parse_task() {
        let task = DPTask::from_str(TASK).unwrap();
        assert_eq!(task.equations, vec!["y'' = -0.1*y_1 - y", "z' = y - z"]);
        assert_eq!(task.initial_conditions.len(), 3);
        assert_eq!(task.initial_conditions["y"], 1.0);
        let range = task.range.clone().unwrap();
        assert_eq!(range.arg, "t");
        assert_eq!(range.end, 2.0);
        let tol = task.tolerance.clone().unwrap();
        assert_eq!(tol.atol, 1e-9);
        assert_eq!(tol.error_norm, ErrorNorm::Max);
        assert_eq!(tol.safety_factor, ToleranceConfig::default().safety_factor);
        assert!(task.adaptive);
        assert_eq!(task.log_level, Some(LevelFilter::Warn));
        assert!(task.csv.is_none());
    }

    #[test]
    fn test_apply_task() {
        let task = DPTask::from_str(TASK).unwrap();
        let solver = DPsolver::new();
        task.apply(&solver).unwrap();
        assert_eq!(solver.variable_names(), vec!["y", "y_1", "z"]);
        assert_eq!(solver.get_range(), task.range.clone().unwrap());
        assert_eq!(solver.get_tolerance(), task.tolerance.clone().unwrap());
        assert_eq!(solver.get_initial_conditions(), task.initial_conditions);
    }

    #[test]
    fn test_solve_task_with_csv_output() {
        let dir = tempdir().unwrap();
        let csv_path = dir.path().join("solution.csv");
        let task = format!(
            "equations\n eq: y' = -y\ninitial_conditions\n y: 1\nrange\n start: 0\n end: 1\n initial_step: 0.1\noutput\n csv: {}\n",
            csv_path.display()
        );
        let task = DPTask::from_str(&task).unwrap();
        let solver = DPsolver::new();
        let points = task.solve(&solver).unwrap();
        let last = points.last().unwrap();
        assert_eq!(last.x(), 1.0);
        assert_relative_eq!(last.get("y").unwrap(), (-1.0_f64).exp(), epsilon = 1e-5);

        let content = std::fs::read_to_string(&csv_path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("x,y"));
        assert_eq!(lines.count(), points.len());
    }

    #[test]
    fn test_rejected_tasks() {
        let cases = [
            "range\n start: 0\n end: 1\n",
            "equations\n eq: y' = y\nplot\n show: true\n",
            "equations\n eq: y' = y\nrange\n stop: 1\n",
            "equations\n eq: y' = y\nrange\n end: soon\n",
            "equations\n eq: y' = y\nrange\n start: 2\n end: 1\n",
            "equations\n eq: y' = y\ntolerance\n error_norm: l2\n",
            "equations\n eq: y' = y\ntolerance\n atol: -1\n",
            "equations\n eq: y' = y\nsolver\n adaptive: maybe\n",
            "equations\n eq: y' = y\nsolver\n log_level: loud\n",
            "equations\n eq: y' = y\ninitial_conditions\n y: 1, 2\n",
        ];
        for case in cases {
            assert!(DPTask::from_str(case).is_err(), "accepted:\n{}", case);
        }
    }

    #[test]
    fn test_unknown_initial_condition_fails_on_apply() {
        let task = DPTask::from_str("equations\n eq: y' = y\ninitial_conditions\n w: 1\n").unwrap();
        let solver = DPsolver::new();
        assert!(matches!(
            task.apply(&solver),
            Err(SolverError::UnknownVariable(name)) if name == "w"
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            DPTask::from_file(dir.path().join("absent.task")),
            Err(SolverError::Io(_))
        ));
    }
}
