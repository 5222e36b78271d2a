// the collection of utility functions for bracket parsing and operator search.
// All positions are byte offsets; the expression grammar is ASCII, so they are
// also character offsets for every valid input.

/// true if every '(' has a matching ')' and no ')' closes an unopened bracket
pub fn brackets_balanced(s: &str) -> bool {
    let mut depth: i64 = 0;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// finds the position of the bracket closing the one opened at `bracket_start`
pub fn find_pair_to_this_bracket(input: &str, bracket_start: usize) -> Option<usize> {
    let mut depth = 0;
    for (i, c) in input.char_indices().skip_while(|(i, _)| *i < bracket_start) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// true if the whole input is wrapped in one pair of brackets, e.g. "(a+b)" but not "(a)+(b)"
pub fn wrapped_in_brackets(input: &str) -> bool {
    input.starts_with('(') && find_pair_to_this_bracket(input, 0) == Some(input.len() - 1)
}

/// first position of `c` outside brackets
pub fn find_char_positions_outside_brackets(s: &str, c: char) -> Option<usize> {
    let mut depth = 0;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if ch == c && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// rightmost operator among `operators` at bracket depth zero
pub fn find_rightmost_operator_outside_brackets(
    input: &str,
    operators: &[char],
) -> Option<(usize, char)> {
    let mut depth = 0;
    let mut last = None;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ if depth == 0 && operators.contains(&c) => last = Some((i, c)),
            _ => {}
        }
    }
    last
}

/// Rightmost binary '+' or '-' at bracket depth zero.
///
/// A sign is unary when it starts the input or follows another operator or an
/// opening bracket, and it is part of a number when it follows the exponent
/// marker of a numeric literal such as `1e-3`.
pub fn find_rightmost_binary_sign(input: &str) -> Option<(usize, char)> {
    let bytes = input.as_bytes();
    let mut depth = 0;
    let mut last = None;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            '+' | '-' if depth == 0 => {
                let before = input[..i].trim_end();
                let prev = match before.chars().last() {
                    Some(p) => p,
                    None => continue,
                };
                if matches!(prev, '+' | '-' | '*' | '/' | '^' | '(') {
                    continue;
                }
                if (prev == 'e' || prev == 'E') && before.len() == i && is_exponent_marker(bytes, i - 1) {
                    continue;
                }
                last = Some((i, c));
            }
            _ => {}
        }
    }
    last
}

// `e` at `pos` belongs to a numeric literal when the token it ends starts with a digit or a dot
fn is_exponent_marker(bytes: &[u8], pos: usize) -> bool {
    let mut start = pos;
    while start > 0 {
        let b = bytes[start - 1];
        if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' {
            start -= 1;
        } else {
            break;
        }
    }
    if start == pos {
        return false;
    }
    let mantissa = &bytes[start..pos];
    (mantissa[0].is_ascii_digit() || mantissa[0] == b'.')
        && mantissa.iter().all(|b| b.is_ascii_digit() || *b == b'.')
}

/// identifiers are ASCII letters, digits and underscores, not starting with a digit
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
