//! # Reduction of arbitrary order equations to a first order system
//!
//! An equation `y''' = f(x, y, y', y'')` becomes three first order equations over the
//! variables `y`, `y_1`, `y_2`:
//! ```text
//!  d(y)/dx   = y_1
//!  d(y_1)/dx = y_2
//!  d(y_2)/dx = f(x, y, y_1, y_2)
//! ```
//! Inside the right-hand side the derivatives are written with the same `_k` names,
//! e.g. `y'' = -0.1*y_1 - y`. The left-hand side is a single letter followed by the
//! prime markers; no markers at all means a first order equation, so `y = -y` and
//! `y' = -y` are the same equation.
//!
//! Variables are laid out in input order: all variables of the first equation, then
//! all variables of the second one and so on.

use crate::numerical::DormandPrince::DP_errors::SolverError;
use crate::symbolic::symbolic_engine::{EvalError, Expr, Scope};
use log::{debug, info, warn};
use nalgebra::DVector;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

const LHS_PATTERN: &str = r"^([A-Za-z])('*)$";

/// right-hand side of one first order equation
pub type DerivativeFn = Box<dyn Fn(&Scope) -> Result<f64, EvalError> + Send + Sync>;

/// one slot of the state vector
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// `y` for the base, `y_k` for its k-th derivative
    pub name: String,
    pub base: String,
    /// which derivative of `base` this slot holds
    pub order: usize,
}

/// first order system produced by `reduce`
pub struct System {
    variables: Vec<Variable>,
    functions: Vec<DerivativeFn>,
    base_indices: Vec<usize>,
    equations: Vec<String>,
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("variables", &self.variable_names())
            .field("equations", &self.equations)
            .finish()
    }
}

impl System {
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }

    /// the order-0 variable of every equation, in input order
    pub fn base_variable_names(&self) -> Vec<String> {
        self.base_indices
            .iter()
            .map(|&i| self.variables[i].name.clone())
            .collect()
    }

    /// positions of the base variables in the state vector
    pub fn base_indices(&self) -> &[usize] {
        &self.base_indices
    }

    /// the equations as they were given
    pub fn equations(&self) -> &[String] {
        &self.equations
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Scope names for evaluating the system: the argument first, then every variable.
    pub fn scope_names(&self, arg: &str) -> Arc<Vec<String>> {
        let mut names = Vec::with_capacity(self.len() + 1);
        names.push(arg.to_string());
        names.extend(self.variables.iter().map(|v| v.name.clone()));
        Arc::new(names)
    }

    /// evaluates dy/dx at (x, y); `names` must come from `scope_names`
    pub fn evaluate(
        &self,
        names: &Arc<Vec<String>>,
        x: f64,
        y: &DVector<f64>,
    ) -> Result<DVector<f64>, EvalError> {
        let mut values = Vec::with_capacity(y.len() + 1);
        values.push(x);
        values.extend(y.iter().copied());
        let scope = Scope::new(names.clone(), values);
        let mut dydx = DVector::zeros(self.functions.len());
        for (i, function) in self.functions.iter().enumerate() {
            dydx[i] = function(&scope)?;
        }
        Ok(dydx)
    }
}

fn derivative_name(base: &str, order: usize) -> String {
    if order == 0 {
        base.to_string()
    } else {
        format!("{}_{}", base, order)
    }
}

/// reads the next variable of the chain: d(y_k)/dx = y_{k+1}
fn identity(next: String) -> DerivativeFn {
    Box::new(move |scope: &Scope| {
        scope
            .get(&next)
            .ok_or_else(|| EvalError::UnboundVariable(next.clone()))
    })
}

/// Reduces the equations to a first order system.
///
/// # Errors
/// `EquationSyntax` if the list is empty, an equation has no or several '=', the
/// left-hand side is not a letter followed by primes, the right-hand side does not
/// parse, or two equations share a base letter.
pub fn reduce<S: AsRef<str>>(equations: &[S]) -> Result<System, SolverError> {
    if equations.is_empty() {
        return Err(SolverError::EquationSyntax("no equations given".to_string()));
    }
    let lhs_regex =
        Regex::new(LHS_PATTERN).map_err(|e| SolverError::Configuration(e.to_string()))?;

    let mut variables: Vec<Variable> = Vec::new();
    let mut functions: Vec<DerivativeFn> = Vec::new();
    let mut base_indices = Vec::new();
    let mut right_sides: Vec<Expr> = Vec::new();

    for equation in equations {
        let equation = equation.as_ref().trim();
        let parts: Vec<&str> = equation.split('=').collect();
        if parts.len() != 2 {
            return Err(SolverError::EquationSyntax(format!(
                "'{}' must contain exactly one '='",
                equation
            )));
        }
        let lhs = parts[0].trim();
        let captures = lhs_regex.captures(lhs).ok_or_else(|| {
            SolverError::EquationSyntax(format!(
                "left-hand side '{}' of '{}' must be a single letter followed by primes",
                lhs, equation
            ))
        })?;
        let base = captures[1].to_string();
        let order = captures[2].len().max(1);
        if variables.iter().any(|v| v.base == base) {
            return Err(SolverError::EquationSyntax(format!(
                "duplicate equation for '{}': '{}'",
                base, equation
            )));
        }
        let rhs = Expr::parse_expression(parts[1]).map_err(|e| {
            SolverError::EquationSyntax(format!(
                "cannot parse right-hand side of '{}': {}",
                equation, e
            ))
        })?;
        debug!("{} reduced to order {} chain, rhs {}", base, order, rhs);

        base_indices.push(variables.len());
        for k in 0..order {
            variables.push(Variable {
                name: derivative_name(&base, k),
                base: base.clone(),
                order: k,
            });
        }
        for k in 1..order {
            functions.push(identity(derivative_name(&base, k)));
        }
        let top = rhs.clone();
        functions.push(Box::new(move |scope: &Scope| top.eval(scope)));
        right_sides.push(rhs);
    }

    warn_undeclared(&variables, &right_sides);
    let system = System {
        variables,
        functions,
        base_indices,
        equations: equations.iter().map(|e| e.as_ref().trim().to_string()).collect(),
    };
    info!("system reduced to variables {:?}", system.variable_names());
    Ok(system)
}

// one name outside the system is the independent variable, more than one cannot all be bound
fn warn_undeclared(variables: &[Variable], right_sides: &[Expr]) {
    let mut undeclared: Vec<String> = Vec::new();
    for rhs in right_sides {
        for name in rhs.extract_variables() {
            if !variables.iter().any(|v| v.name == name) && !undeclared.contains(&name) {
                undeclared.push(name);
            }
        }
    }
    match undeclared.len() {
        0 => {}
        1 => debug!(
            "'{}' is not a system variable, expected to be the independent variable",
            undeclared[0]
        ),
        _ => warn!(
            "right-hand sides read {:?} which are not system variables; only one of them can be the independent variable",
            undeclared
        ),
    }
}
