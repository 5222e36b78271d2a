use crate::numerical::DormandPrince::DP_errors::SolverError;
use crate::symbolic::utils::is_identifier;
use strum_macros::{Display, EnumString};

/// smallest step the adaptive controller may take unless configured otherwise
pub const DEFAULT_MIN_STEP: f64 = 1e-10;
/// default largest step as a fraction of the integration interval
pub const DEFAULT_MAX_STEP_FRACTION: f64 = 0.1;

/// independent variable and the interval it runs over
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub arg: String,
    pub start: f64,
    pub end: f64,
    pub initial_step: f64,
}

impl Default for Range {
    fn default() -> Self {
        Range {
            arg: "x".to_string(),
            start: 0.0,
            end: 1.0,
            initial_step: 0.1,
        }
    }
}

impl Range {
    pub fn new(arg: &str, start: f64, end: f64, initial_step: f64) -> Result<Range, SolverError> {
        let arg = arg.trim();
        if !is_identifier(arg) {
            return Err(SolverError::InvalidRange(format!(
                "'{}' is not a valid variable name",
                arg
            )));
        }
        if !(start.is_finite() && end.is_finite() && initial_step.is_finite()) {
            return Err(SolverError::InvalidRange(format!(
                "start {}, end {} and initial step {} must be finite",
                start, end, initial_step
            )));
        }
        if end <= start {
            return Err(SolverError::InvalidRange(format!(
                "end {} must be greater than start {}",
                end, start
            )));
        }
        if initial_step <= 0.0 {
            return Err(SolverError::InvalidRange(format!(
                "initial step {} must be positive",
                initial_step
            )));
        }
        Ok(Range {
            arg: arg.to_string(),
            start,
            end,
            initial_step,
        })
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

/// how the per-component scaled errors are combined into one number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ErrorNorm {
    /// root mean square
    #[default]
    #[strum(serialize = "rms")]
    Rms,
    /// largest component
    #[strum(serialize = "max")]
    Max,
}

/// error tolerances and step size control settings
#[derive(Debug, Clone, PartialEq)]
pub struct ToleranceConfig {
    pub atol: f64,
    pub rtol: f64,
    pub safety_factor: f64,
    pub min_factor: f64,
    pub max_factor: f64,
    /// None means DEFAULT_MIN_STEP
    pub min_step: Option<f64>,
    /// None means DEFAULT_MAX_STEP_FRACTION of the range length
    pub max_step: Option<f64>,
    pub error_norm: ErrorNorm,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        ToleranceConfig {
            atol: 1e-6,
            rtol: 1e-6,
            safety_factor: 0.9,
            min_factor: 0.2,
            max_factor: 5.0,
            min_step: None,
            max_step: None,
            error_norm: ErrorNorm::Rms,
        }
    }
}

pub(crate) fn check_positive(name: &str, value: f64) -> Result<(), SolverError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SolverError::Configuration(format!(
            "{} must be finite and positive, got {}",
            name, value
        )))
    }
}

impl ToleranceConfig {
    /// checks every value and the ordering of the factor and step bounds
    pub fn validate(&self) -> Result<(), SolverError> {
        check_positive("atol", self.atol)?;
        check_positive("rtol", self.rtol)?;
        check_positive("safety factor", self.safety_factor)?;
        check_positive("min factor", self.min_factor)?;
        check_positive("max factor", self.max_factor)?;
        if self.min_factor > self.max_factor {
            return Err(SolverError::Configuration(format!(
                "min factor {} is greater than max factor {}",
                self.min_factor, self.max_factor
            )));
        }
        if let Some(min_step) = self.min_step {
            check_positive("min step", min_step)?;
        }
        if let Some(max_step) = self.max_step {
            check_positive("max step", max_step)?;
        }
        if let (Some(min_step), Some(max_step)) = (self.min_step, self.max_step) {
            if min_step > max_step {
                return Err(SolverError::Configuration(format!(
                    "min step {} is greater than max step {}",
                    min_step, max_step
                )));
            }
        }
        Ok(())
    }

    pub fn min_step(&self) -> f64 {
        self.min_step.unwrap_or(DEFAULT_MIN_STEP)
    }

    pub fn max_step(&self, range: &Range) -> f64 {
        self.max_step
            .unwrap_or(DEFAULT_MAX_STEP_FRACTION * range.length())
    }
}

/// payload of the tolerance_changed event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceChanged {
    pub atol: f64,
    pub rtol: f64,
}

/// payload of the progress event, published once per accepted step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub x: f64,
    pub step_size: f64,
    pub error_norm: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Finished,
    Canceled,
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_range_validation() {
        assert!(Range::new("t", 0.0, 1.0, 0.1).is_ok());
        assert!(matches!(
            Range::new("t", 1.0, 1.0, 0.1),
            Err(SolverError::InvalidRange(_))
        ));
        assert!(matches!(
            Range::new("t", 0.0, f64::INFINITY, 0.1),
            Err(SolverError::InvalidRange(_))
        ));
        assert!(matches!(
            Range::new("t", 0.0, 1.0, 0.0),
            Err(SolverError::InvalidRange(_))
        ));
        assert!(matches!(
            Range::new("2t", 0.0, 1.0, 0.1),
            Err(SolverError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_tolerance_defaults() {
        let tol = ToleranceConfig::default();
        assert!(tol.validate().is_ok());
        assert_eq!(tol.min_step(), DEFAULT_MIN_STEP);
        let range = Range::new("x", 0.0, 5.0, 0.1).unwrap();
        assert_eq!(tol.max_step(&range), 0.5);
    }

    #[test]
    fn test_tolerance_validation() {
        let tol = ToleranceConfig {
            atol: -1.0,
            ..ToleranceConfig::default()
        };
        assert!(matches!(tol.validate(), Err(SolverError::Configuration(_))));
        let tol = ToleranceConfig {
            min_factor: 2.0,
            max_factor: 1.5,
            ..ToleranceConfig::default()
        };
        assert!(tol.validate().is_err());
        let tol = ToleranceConfig {
            min_step: Some(0.5),
            max_step: Some(0.1),
            ..ToleranceConfig::default()
        };
        assert!(tol.validate().is_err());
    }

    #[test]
    fn test_enum_strings() {
        assert_eq!(ErrorNorm::from_str("RMS").unwrap(), ErrorNorm::Rms);
        assert_eq!(ErrorNorm::from_str("Max").unwrap(), ErrorNorm::Max);
        assert!(ErrorNorm::from_str("l1").is_err());
        assert_eq!(ErrorNorm::Max.to_string(), "max");
        assert_eq!(RunStatus::Canceled.to_string(), "Canceled");
    }
}
