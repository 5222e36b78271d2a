/// parse document with structure like
/// ```text
/// title1
///   key1: value1, value2
///   key2: value3
/// title2
///   key3: value4
/// ```
/// which has titles and pairs key-vector of values into
/// HashMap<String, HashMap<String, Vec<Value>>>.
/*
 every title sits on its own line, every key-value pair sits on its own line. A value runs
 until ',' ';' or the end of the line, so values may contain spaces ("y'' = -y").
 Lines starting with //, # or % are comments. A key repeated inside one section
 accumulates its values, a repeated section merges into the first one.
*/
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, char, line_ending, space0},
    combinator::{eof, map, map_res, opt, recognize},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;

pub type DocumentMap = HashMap<String, SectionMap>;
pub type SectionMap = HashMap<String, Vec<Value>>;
/// enum to represent different value types:
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    // Helper functions to access different value types
    pub fn as_string(&self) -> Option<&String> {
        if let Value::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        if let Value::Float(f) = self {
            Some(*f)
        } else {
            None
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        if let Value::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// numeric value of a Float or an Integer ("start: 0" is as good as "start: 0.0")
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    // Try to convert to string representation
    pub fn to_string_value(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(f) => f.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Float(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Boolean(val) => write!(f, "{}", val),
        }
    }
}

/// Parses an identifier: letters, digits and '_' not starting with a digit
fn parse_identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    let mut parser = map(parser, String::from);
    parser.parse(input)
}

fn end_of_line(input: &str) -> IResult<&str, &str> {
    alt((line_ending, eof)).parse(input)
}

/// Parses a title line: an identifier alone on its line
fn parse_title(input: &str) -> IResult<&str, String> {
    let mut parser = delimited(
        space0,
        parse_identifier,
        (space0, opt(char(';')), space0, end_of_line),
    );
    parser.parse(input)
}

fn parse_value(input: &str) -> IResult<&str, Value> {
    // a single value runs until a comma, a semicolon or the end of the line
    let value_parser = take_while1(|c: char| !matches!(c, ',' | '\n' | '\r' | ';'));
    let mut value_parser = map_res(value_parser, |s: &str| -> Result<Value, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty value".to_string());
        }
        // Try parsing as different types in order
        if let Ok(val) = s.parse::<i64>() {
            Ok(Value::Integer(val))
        } else if let Ok(val) = s.parse::<f64>() {
            Ok(Value::Float(val))
        } else if let Ok(val) = s.parse::<bool>() {
            Ok(Value::Boolean(val))
        } else {
            Ok(Value::String(s.to_string()))
        }
    });
    value_parser.parse(input)
}

fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let (input, _) = space0(input)?;
    // delimited drops spaces around every separating comma
    let separator_coma = delimited(space0, char(','), space0);
    let mut value_parser = separated_list0(separator_coma, parse_value);
    value_parser.parse(input)
}

/// Parses a `key: value, value` line
fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon_separator = delimited(space0, char(':'), space0);
    let mut parser = terminated(
        pair(
            preceded(space0, terminated(parse_identifier, colon_separator)),
            parse_value_list,
        ),
        (space0, opt(char(';')), space0, end_of_line),
    );
    parser.parse(input)
}

/// Parses a section with a title and one or more key-value lines
fn parse_section(input: &str) -> IResult<&str, (String, SectionMap)> {
    let (input, title) = parse_title(input)?;
    let (input, pairs) = many1(parse_key_value_pair).parse(input)?;

    let mut section_map: SectionMap = HashMap::new();
    for (key, values) in pairs {
        section_map.entry(key).or_default().extend(values);
    }
    Ok((input, (title, section_map)))
}

/// Filters out comment lines (starting with //, # or %) and blank lines
fn filter_comments(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("//")
                && !trimmed.starts_with('#')
                && !trimmed.starts_with('%')
                && !trimmed.is_empty()
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Parses a comment-free document into a HashMap
pub fn parse_document(input: &str) -> IResult<&str, DocumentMap> {
    let (input, sections) = many1(parse_section).parse(input)?;

    let mut result: DocumentMap = HashMap::new();
    for (title, section_map) in sections {
        let merged = result.entry(title).or_default();
        for (key, values) in section_map {
            merged.entry(key).or_default().extend(values);
        }
    }
    Ok((input, result))
}

/// Drops comments, parses the document and insists that nothing is left over
pub fn parse_document_as(input: &str) -> Result<DocumentMap, String> {
    let filtered = filter_comments(input);
    match parse_document(&filtered) {
        Ok((remaining, parsed)) => {
            if !remaining.trim().is_empty() {
                return Err(format!(
                    "Failed to parse entire document. Remaining: '{}'",
                    remaining
                ));
            }
            Ok(parsed)
        }
        Err(e) => Err(format!("Parsing error: {:?}", e)),
    }
}

/// same as parse_document_as but every value is converted to its string form
pub fn parse_document_as_strings(
    input: &str,
) -> Result<HashMap<String, HashMap<String, Vec<String>>>, String> {
    let value_map = parse_document_as(input)?;
    Ok(value_map
        .into_iter()
        .map(|(title, section)| {
            let section = section
                .into_iter()
                .map(|(key, values)| {
                    (
                        key,
                        values.iter().map(Value::to_string_value).collect::<Vec<_>>(),
                    )
                })
                .collect();
            (title, section)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_parse_title() {
        let (remaining, title) = parse_title("title1\n key1: value1").unwrap();
        assert_eq!(title, "title1");
        assert_eq!(remaining, " key1: value1");

        let (remaining, title) = parse_title("initial_conditions  ").unwrap();
        assert_eq!(title, "initial_conditions");
        assert_eq!(remaining, "");

        // a key line is not a title
        assert!(parse_title("key1: value1").is_err());
    }

    #[test]
    fn test_parse_value() {
        let (remaining, value) = parse_value("value1, value2").unwrap();
        assert_eq!(value, Value::String("value1".to_string()));
        assert_eq!(remaining, ", value2");

        let (remaining, value) = parse_value("123, next").unwrap();
        assert_eq!(value, Value::Integer(123));
        assert_eq!(remaining, ", next");

        let (_, value) = parse_value("1e-8").unwrap();
        assert_eq!(value, Value::Float(1e-8));

        let (_, value) = parse_value("true").unwrap();
        assert_eq!(value, Value::Boolean(true));

        // values keep inner spaces
        let (remaining, value) = parse_value("y'' = -y \nnext").unwrap();
        assert_eq!(value, Value::String("y'' = -y".to_string()));
        assert_eq!(remaining, "\nnext");
    }

    #[test]
    fn test_parse_value_list() {
        let (remaining, values) = parse_value_list("value1, 123, 45.67, true").unwrap();
        assert_eq!(
            values,
            vec![
                Value::String("value1".to_string()),
                Value::Integer(123),
                Value::Float(45.67),
                Value::Boolean(true)
            ]
        );
        assert_eq!(remaining, "");

        let (remaining, values) = parse_value_list("").unwrap();
        assert_eq!(values, Vec::<Value>::new());
        assert_eq!(remaining, "");
    }

    #[test]
    fn test_parse_key_value_pair() {
        let (remaining, (key, values)) =
            parse_key_value_pair("key1 : value1 , value2;\nkey2: 1").unwrap();
        assert_eq!(key, "key1");
        assert_eq!(
            values,
            vec![
                Value::String("value1".to_string()),
                Value::String("value2".to_string())
            ]
        );
        assert_eq!(remaining, "key2: 1");

        let (remaining, (key, values)) = parse_key_value_pair("key1:").unwrap();
        assert_eq!(key, "key1");
        assert_eq!(values, Vec::<Value>::new());
        assert_eq!(remaining, "");
    }

    #[test]
    fn test_parse_section() {
        let input = "section1\n key1: value1, value2\n key2: value3\nsection2\n";
        let (remaining, (title, map)) = parse_section(input).unwrap();
        assert_eq!(title, "section1");
        assert_eq!(map.len(), 2);
        assert_eq!(
            map["key1"],
            vec![
                Value::String("value1".to_string()),
                Value::String("value2".to_string())
            ]
        );
        assert_eq!(remaining, "section2\n");
    }

    #[test]
    fn test_repeated_key_accumulates() {
        let input = "equations\n eq: y'' = -y\n eq: z' = y\n";
        let doc = parse_document_as(input).unwrap();
        assert_eq!(
            doc["equations"]["eq"],
            vec![
                Value::String("y'' = -y".to_string()),
                Value::String("z' = y".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_document_with_comments() {
        let input = r#"
            # harmonic oscillator
            range
              arg: t
              start: 0
              end: 6.28
            // tolerances
            tolerance
              atol: 1e-10; rtol: 1e-8
        "#;
        // a ';' ends the value list but a second pair must go on its own line
        assert!(parse_document_as(input).is_err());

        let input = r#"
            # harmonic oscillator
            range
              arg: t
              start: 0
              end: 6.28

            // tolerances
            tolerance
              atol: 1e-10
              rtol: 1e-8
        "#;
        let doc = parse_document_as(input).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(doc["range"]["arg"][0].as_string().unwrap(), "t");
        assert_eq!(doc["range"]["start"][0].as_f64(), Some(0.0));
        assert_eq!(doc["range"]["end"][0].as_float(), Some(6.28));
        assert_eq!(doc["tolerance"]["rtol"][0].as_f64(), Some(1e-8));
    }

    #[test]
    fn test_parse_document_malformed() {
        assert!(parse_document_as("").is_err());
        assert!(parse_document_as("key1: value1").is_err());
        assert!(parse_document_as("section\n key1 value1").is_err());
    }

    #[test]
    fn test_parse_document_as_strings() {
        let doc = parse_document_as_strings("solver\n adaptive: true\n log_level: info").unwrap();
        assert_eq!(doc["solver"]["adaptive"], vec!["true".to_string()]);
        assert_eq!(doc["solver"]["log_level"], vec!["info".to_string()]);
    }

    #[test]
    fn test_parse_document_from_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("task.txt");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "initial_conditions\n y: 0.0\n y_1: 1").unwrap();
        drop(file);

        let content = std::fs::read_to_string(&file_path).unwrap();
        let doc = parse_document_as(&content).unwrap();
        assert_eq!(doc["initial_conditions"]["y"][0].as_f64(), Some(0.0));
        assert_eq!(doc["initial_conditions"]["y_1"][0].as_integer(), Some(1));
    }
}
