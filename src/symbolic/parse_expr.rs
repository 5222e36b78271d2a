use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::utils::{
    brackets_balanced, find_char_positions_outside_brackets, find_pair_to_this_bracket,
    find_rightmost_binary_sign, find_rightmost_operator_outside_brackets, is_identifier,
    wrapped_in_brackets,
};
use log::trace;
/// a module turns a String expression into a symbolic expression
///# Example
/// ```
/// use RustedODE::symbolic::symbolic_engine::{Expr, Scope};
/// let parsed_expression = Expr::parse_expression("-y + 0.5*sin(x)").unwrap();
/// let scope = Scope::from_pairs([("x", 0.0), ("y", 2.0)]);
/// assert_eq!(parsed_expression.eval(&scope).unwrap(), -2.0);
/// ```
//                  search recursion diagram
//                "y^2+exp(x)-log(x)/y*x"           |
//                |       left  | right             |
//                |_________________________________|
//                |   rightmost binary + or -       |
//                |_________________________________|
//                | y^2+exp(x)  |   log(x)/y*x      |
//                |       |     |          |        |
//                |______\|/____|_________\|/_______|
//                |  div by +   | rightmost * or /  |
//                |_____________|___________________|
//                |  y^2|exp(x) |  log(x)/y  |  x   |
//                |  etc...     |   etc...   |  Ok  |
//
// Splitting at the RIGHTMOST operator of the loosest level keeps '+ - * /' left
// associative; splitting '^' at the LEFTMOST one makes it right associative.
pub fn parse_expression_func(input: &str) -> Result<Expr, String> {
    let input = input.trim();
    trace!("parsing: '{}'", input);
    if input.is_empty() {
        return Err("empty expression".to_string());
    }
    if !brackets_balanced(input) {
        return Err(format!("unbalanced brackets in '{}'", input));
    }

    // addition and subtraction
    if let Some((pos, op)) = find_rightmost_binary_sign(input) {
        let left = &input[..pos];
        let right = &input[pos + 1..];
        if right.trim().is_empty() {
            return Err(format!("missing operand after '{}' in '{}'", op, input));
        }
        let (left, right) = (parse_expression_func(left)?, parse_expression_func(right)?);
        return Ok(match op {
            '+' => Expr::Add(left.boxed(), right.boxed()),
            _ => Expr::Sub(left.boxed(), right.boxed()),
        });
    }

    // multiplication and division
    if let Some((pos, op)) = find_rightmost_operator_outside_brackets(input, &['*', '/']) {
        let left = &input[..pos];
        let right = &input[pos + 1..];
        if left.trim().is_empty() || right.trim().is_empty() {
            return Err(format!("missing operand around '{}' in '{}'", op, input));
        }
        let (left, right) = (parse_expression_func(left)?, parse_expression_func(right)?);
        return Ok(match op {
            '*' => Expr::Mul(left.boxed(), right.boxed()),
            _ => Expr::Div(left.boxed(), right.boxed()),
        });
    }

    // unary signs bind looser than '^': -x^2 == -(x^2)
    if let Some(rest) = input.strip_prefix('-') {
        let inner = parse_expression_func(rest)?;
        return Ok(match inner {
            Expr::Const(val) => Expr::Const(-val),
            other => -other,
        });
    }
    if let Some(rest) = input.strip_prefix('+') {
        return parse_expression_func(rest);
    }

    // power
    if let Some(pos) = find_char_positions_outside_brackets(input, '^') {
        let base = &input[..pos];
        let exponent = &input[pos + 1..];
        if base.trim().is_empty() || exponent.trim().is_empty() {
            return Err(format!("missing operand around '^' in '{}'", input));
        }
        return Ok(Expr::Pow(
            parse_expression_func(base)?.boxed(),
            parse_expression_func(exponent)?.boxed(),
        ));
    }

    if wrapped_in_brackets(input) {
        return parse_expression_func(&input[1..input.len() - 1]);
    }

    // functions: name(...)
    if let Some(bracket_start) = input.find('(') {
        let name = input[..bracket_start].trim();
        if is_identifier(name) && find_pair_to_this_bracket(input, bracket_start) == Some(input.len() - 1) {
            let inner = parse_expression_func(&input[bracket_start + 1..input.len() - 1])?.boxed();
            return match name {
                "exp" => Ok(Expr::Exp(inner)),
                "ln" | "log" => Ok(Expr::Ln(inner)),
                "sqrt" => Ok(Expr::Pow(inner, Expr::Const(0.5).boxed())),
                "abs" => Ok(Expr::Abs(inner)),
                "sin" => Ok(Expr::sin(inner)),
                "cos" => Ok(Expr::cos(inner)),
                "tg" | "tan" => Ok(Expr::tg(inner)),
                "ctg" | "cot" => Ok(Expr::ctg(inner)),
                "arcsin" | "asin" => Ok(Expr::arcsin(inner)),
                "arccos" | "acos" => Ok(Expr::arccos(inner)),
                "arctg" | "atan" | "arctan" => Ok(Expr::arctg(inner)),
                "arcctg" | "acot" => Ok(Expr::arcctg(inner)),
                _ => Err(format!("unknown function '{}'", name)),
            };
        }
    }

    // constants and variables
    if input.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return input
            .parse::<f64>()
            .map(Expr::Const)
            .map_err(|_| format!("invalid number '{}'", input));
    }
    if is_identifier(input) {
        return Ok(match input {
            "pi" => Expr::Const(std::f64::consts::PI),
            _ => Expr::Var(input.to_string()),
        });
    }
    Err(format!("Invalid expression format: '{}'", input))
}
