/// a module turns a String expression into a symbolic expression
///
///# Example
/// ```
/// use RustedODE::symbolic::symbolic_engine::{Expr, Scope};
/// let parsed_expression = Expr::parse_expression("x^2 + ln(y)").unwrap();
/// println!(" parsed_expression {}", parsed_expression);
/// let scope = Scope::from_pairs([("x", 3.0), ("y", 1.0)]);
/// assert_eq!(parsed_expression.eval(&scope).unwrap(), 9.0);
/// ```
pub mod parse_expr;
///____________________________________________________________________________________________________________________________
/// # Symbolic engine
/// a module
/// 1) turns a String expression into a symbolic expression
/// 2) evaluates a symbolic expression against named values
/// 3) turns a symbolic expression into a string expression for printing and control results
///# Example#
/// ```
/// use RustedODE::symbolic::symbolic_engine::{Expr, Scope};
/// let parsed_expression = Expr::parse_expression("exp(x)+y").unwrap();
/// let variables = parsed_expression.extract_variables();
/// assert_eq!(variables, vec!["x", "y"]);
/// let scope = Scope::from_pairs([("x", 0.0), ("y", 2.0)]);
/// assert_eq!(parsed_expression.eval(&scope).unwrap(), 3.0);
/// ```
pub mod symbolic_engine;
/// bracket matching and operator search used by the parser
pub mod utils;
