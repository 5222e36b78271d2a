//! # Symbolic Engine Module
//!
//! Symbolic expressions used as right-hand sides of ODE systems.
//!
//! ## Purpose
//!
//! The engine allows users to:
//! - Parse a string into a symbolic expression tree (see [`crate::symbolic::parse_expr`])
//! - Build expressions with ordinary arithmetic operators
//! - Evaluate an expression against an explicit [`Scope`] of named values
//! - Inspect which variables an expression reads
//!
//! ## Main Structures and Methods
//!
//! ### `Expr` Enum
//! - **Variables**: `Var(String)` - symbolic variables like "x", "y_1"
//! - **Constants**: `Const(f64)` - numerical constants
//! - **Operations**: `Add`, `Sub`, `Mul`, `Div`, `Pow` - basic arithmetic
//! - **Functions**: `Exp`, `Ln`, `sin`, `cos`, etc. - mathematical functions
//!
//! ### `Scope`
//! Ordered name/value pairs. Names are shared between scopes built for the same
//! system, values are owned by each scope, so building a fresh scope for every
//! Runge-Kutta stage is cheap.
//!
//! Negation is stored as `Mul(Const(-1), expr)` and square roots as `Pow(expr, 0.5)`,
//! so the tree has no dedicated variants for them.

#![allow(non_camel_case_types)]

use std::f64;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::symbolic::parse_expr::parse_expression_func;

/// Core symbolic expression enum representing mathematical expressions as an abstract syntax tree.
///
/// # Examples
/// ```rust, ignore
/// let x = Expr::Var("x".to_string());
/// let expr = Expr::Add(Box::new(x), Box::new(Expr::Const(2.0)));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Symbolic variable with a name (e.g., "x", "y_1")
    Var(String),
    /// Numerical constant value
    Const(f64),
    /// Addition operation: left + right
    Add(Box<Expr>, Box<Expr>),
    /// Subtraction operation: left - right
    Sub(Box<Expr>, Box<Expr>),
    /// Multiplication operation: left * right
    Mul(Box<Expr>, Box<Expr>),
    /// Division operation: left / right
    Div(Box<Expr>, Box<Expr>),
    /// Power operation: base ^ exponent
    Pow(Box<Expr>, Box<Expr>),
    /// Exponential function: e^x
    Exp(Box<Expr>),
    /// Natural logarithm: ln(x)
    Ln(Box<Expr>),
    /// Absolute value: |x|
    Abs(Box<Expr>),
    /// Sine function: sin(x)
    sin(Box<Expr>),
    /// Cosine function: cos(x)
    cos(Box<Expr>),
    /// Tangent function: tan(x) - uses mathematical notation 'tg'
    tg(Box<Expr>),
    /// Cotangent function: cot(x) - uses mathematical notation 'ctg'
    ctg(Box<Expr>),
    /// Arcsine function: arcsin(x)
    arcsin(Box<Expr>),
    /// Arccosine function: arccos(x)
    arccos(Box<Expr>),
    /// Arctangent function: arctan(x) - uses mathematical notation 'arctg'
    arctg(Box<Expr>),
    /// Arccotangent function: arccot(x) - uses mathematical notation 'arcctg'
    arcctg(Box<Expr>),
}

/// Failure while evaluating an expression against a scope.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("variable '{0}' is not bound in the current scope")]
    UnboundVariable(String),
}

/// Ordered set of named values an expression is evaluated against.
#[derive(Clone, Debug, PartialEq)]
pub struct Scope {
    names: Arc<Vec<String>>,
    values: Vec<f64>,
}

impl Scope {
    /// Creates a scope from shared names and matching values.
    ///
    /// # Panics
    /// Panics if `names` and `values` differ in length.
    pub fn new(names: Arc<Vec<String>>, values: Vec<f64>) -> Self {
        assert_eq!(
            names.len(),
            values.len(),
            "scope needs exactly one value per name"
        );
        Scope { names, values }
    }

    /// Builds a scope from `(name, value)` pairs, keeping their order.
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, f64)>) -> Self {
        let (names, values): (Vec<String>, Vec<f64>) =
            pairs.into_iter().map(|(n, v)| (n.into(), v)).unzip();
        Scope {
            names: Arc::new(names),
            values,
        }
    }

    /// Value bound to `name`. If a name occurs twice the first binding wins.
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

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

/// Display implementation for pretty printing symbolic expressions.
///
/// Converts expressions to human-readable mathematical notation with parentheses
/// for proper precedence.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{}", name),
            Expr::Const(val) => write!(f, "{}", val),
            Expr::Add(lhs, rhs) => write!(f, "({} + {})", lhs, rhs),
            Expr::Sub(lhs, rhs) => write!(f, "({} - {})", lhs, rhs),
            Expr::Mul(lhs, rhs) => write!(f, "({} * {})", lhs, rhs),
            Expr::Div(lhs, rhs) => write!(f, "({} / {})", lhs, rhs),
            Expr::Pow(base, exp) => write!(f, "({} ^ {})", base, exp),
            Expr::Exp(expr) => write!(f, "exp({})", expr),
            Expr::Ln(expr) => write!(f, "ln({})", expr),
            Expr::Abs(expr) => write!(f, "abs({})", expr),
            Expr::sin(expr) => write!(f, "sin({})", expr),
            Expr::cos(expr) => write!(f, "cos({})", expr),
            Expr::tg(expr) => write!(f, "tg({})", expr),
            Expr::ctg(expr) => write!(f, "ctg({})", expr),
            Expr::arcsin(expr) => write!(f, "arcsin({})", expr),
            Expr::arccos(expr) => write!(f, "arccos({})", expr),
            Expr::arctg(expr) => write!(f, "arctg({})", expr),
            Expr::arcctg(expr) => write!(f, "arcctg({})", expr),
        }
    }
}

impl std::ops::Add for Expr {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Sub for Expr {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Mul for Expr {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Div for Expr {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(self.boxed(), rhs.boxed())
    }
}

impl std::ops::Neg for Expr {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Expr::Mul(Box::new(Expr::Const(-1.0)), Box::new(self))
    }
}

impl Expr {
    /// Parses a string into a symbolic expression.
    ///
    /// # Supported Syntax
    /// - Variables: x, y, y_1
    /// - Constants: 3.14, 1e-6, pi
    /// - Operators: +, -, *, /, ^
    /// - Functions: exp, ln, log, sqrt, abs, sin, cos, tg/tan, ctg/cot and their inverses
    /// - Parentheses for grouping
    ///
    /// # Examples
    /// ```rust, ignore
    /// let expr = Expr::parse_expression("-y + 0.1*sin(x)").unwrap();
    /// ```
    pub fn parse_expression(input: &str) -> Result<Expr, String> {
        parse_expression_func(input)
    }

    /// Creates multiple symbolic variables from a comma-separated string.
    ///
    /// # Examples
    /// ```rust, ignore
    /// let vars = Expr::Symbols("x, y, z");
    /// assert_eq!(vars.len(), 3);
    /// ```
    pub fn Symbols(symbols: &str) -> Vec<Expr> {
        symbols
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| Expr::Var(s.to_string()))
            .collect()
    }

    /// Convenience method to wrap expression in Box for recursive structures.
    pub fn boxed(self) -> Box<Self> {
        Box::new(self)
    }

    /// Creates exponential function e^(self).
    pub fn exp(self) -> Expr {
        Expr::Exp(self.boxed())
    }

    /// Creates natural logarithm ln(self).
    pub fn ln(self) -> Expr {
        Expr::Ln(self.boxed())
    }

    /// Creates power expression self^rhs.
    pub fn pow(self, rhs: Expr) -> Expr {
        Expr::Pow(self.boxed(), rhs.boxed())
    }

    /// Checks if expression is exactly zero (constant 0.0).
    pub fn is_zero(&self) -> bool {
        matches!(self, Expr::Const(val) if *val == 0.0)
    }

    /// Evaluates the expression with every variable looked up in `scope`.
    ///
    /// Domain problems (division by zero, log of a negative number) follow IEEE
    /// semantics and yield infinities or NaN; only a name missing from the scope
    /// is an error.
    pub fn eval(&self, scope: &Scope) -> Result<f64, EvalError> {
        let value = match self {
            Expr::Var(name) => scope
                .get(name)
                .ok_or_else(|| EvalError::UnboundVariable(name.clone()))?,
            Expr::Const(val) => *val,
            Expr::Add(lhs, rhs) => lhs.eval(scope)? + rhs.eval(scope)?,
            Expr::Sub(lhs, rhs) => lhs.eval(scope)? - rhs.eval(scope)?,
            Expr::Mul(lhs, rhs) => lhs.eval(scope)? * rhs.eval(scope)?,
            Expr::Div(lhs, rhs) => lhs.eval(scope)? / rhs.eval(scope)?,
            Expr::Pow(base, exp) => {
                let base = base.eval(scope)?;
                match exp.as_ref() {
                    // integer exponents keep negative bases real
                    Expr::Const(p) if p.fract() == 0.0 && p.abs() <= i32::MAX as f64 => {
                        base.powi(*p as i32)
                    }
                    _ => base.powf(exp.eval(scope)?),
                }
            }
            Expr::Exp(expr) => expr.eval(scope)?.exp(),
            Expr::Ln(expr) => expr.eval(scope)?.ln(),
            Expr::Abs(expr) => expr.eval(scope)?.abs(),
            Expr::sin(expr) => expr.eval(scope)?.sin(),
            Expr::cos(expr) => expr.eval(scope)?.cos(),
            Expr::tg(expr) => expr.eval(scope)?.tan(),
            Expr::ctg(expr) => 1.0 / expr.eval(scope)?.tan(),
            Expr::arcsin(expr) => expr.eval(scope)?.asin(),
            Expr::arccos(expr) => expr.eval(scope)?.acos(),
            Expr::arctg(expr) => expr.eval(scope)?.atan(),
            Expr::arcctg(expr) => f64::consts::FRAC_PI_2 - expr.eval(scope)?.atan(),
        };
        Ok(value)
    }

    /// check if the expression contains a variable
    pub fn contains_variable(&self, var_name: &str) -> bool {
        match self {
            Expr::Var(name) => name == var_name,
            Expr::Const(_) => false,
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => {
                lhs.contains_variable(var_name) || rhs.contains_variable(var_name)
            }
            Expr::Exp(expr)
            | Expr::Ln(expr)
            | Expr::Abs(expr)
            | Expr::sin(expr)
            | Expr::cos(expr)
            | Expr::tg(expr)
            | Expr::ctg(expr)
            | Expr::arcsin(expr)
            | Expr::arccos(expr)
            | Expr::arctg(expr)
            | Expr::arcctg(expr) => expr.contains_variable(var_name),
        }
    }

    /// Variable names in order of first appearance (left to right), without duplicates.
    pub fn extract_variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Expr::Var(name) => {
                if !vars.contains(name) {
                    vars.push(name.clone());
                }
            }
            Expr::Const(_) => {}
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Pow(lhs, rhs) => {
                lhs.collect_variables(vars);
                rhs.collect_variables(vars);
            }
            Expr::Exp(expr)
            | Expr::Ln(expr)
            | Expr::Abs(expr)
            | Expr::sin(expr)
            | Expr::cos(expr)
            | Expr::tg(expr)
            | Expr::ctg(expr)
            | Expr::arcsin(expr)
            | Expr::arccos(expr)
            | Expr::arctg(expr)
            | Expr::arcctg(expr) => expr.collect_variables(vars),
        }
    }
}
