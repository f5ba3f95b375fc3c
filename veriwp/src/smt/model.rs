//! Counterexample models read back from `(get-model)`

use serde::Serialize;

use super::encode::SYMBOL_PREFIX;
use super::solver::SolverError;

/// Variable assignments of a satisfying model, keyed by IR variable name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Model {
    pub assignments: Vec<(String, String)>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_assignments(assignments: Vec<(String, String)>) -> Self {
        Self { assignments }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.assignments
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Parse Z3's `(get-model)` response.
    ///
    /// Only constants created for IR variables are kept; helper functions and
    /// Z3's internal definitions are dropped. Assignments are sorted by name.
    pub fn parse(text: &str) -> Result<Model, SolverError> {
        let text = text.trim();
        if !text.starts_with('(') {
            return Err(SolverError::Unexpected(format!("not a model: {text}")));
        }

        let mut assignments = Vec::new();
        let mut pos = 0;
        while let Some(found) = text[pos..].find("(define-fun ") {
            let start = pos + found;
            let Some(end) = sexp_end(text, start) else {
                return Err(SolverError::Unexpected(format!(
                    "unbalanced model entry: {}",
                    &text[start..]
                )));
            };
            let body = &text[start + "(define-fun ".len()..end - 1];
            if let Some((name, value)) = parse_define_fun(body) {
                assignments.push((name, value));
            }
            pos = end;
        }

        assignments.sort();
        Ok(Model { assignments })
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.assignments.is_empty() {
            return write!(f, "(no assignments)");
        }
        for (i, (name, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name} = {value}")?;
        }
        Ok(())
    }
}

/// Index just past the parenthesis closing the s-expression at `start`
fn sexp_end(input: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quoted = false;
    for (i, b) in input.bytes().enumerate().skip(start) {
        match b {
            b'|' => quoted = !quoted,
            b'(' if !quoted => depth += 1,
            b')' if !quoted => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// `name () Sort value` of a nullary define-fun
fn parse_define_fun(body: &str) -> Option<(String, String)> {
    let normalized = body.split_whitespace().collect::<Vec<_>>().join(" ");
    let (name, rest) = split_symbol(&normalized)?;
    let rest = rest.trim_start().strip_prefix("()")?.trim_start();
    let name = name.trim_matches('|').strip_prefix(SYMBOL_PREFIX)?.to_string();
    let (_sort, value) = split_term(rest)?;
    Some((name, simplify_value(value.trim())))
}

/// First symbol of `s` (possibly `|quoted|`) and the remainder
fn split_symbol(s: &str) -> Option<(&str, &str)> {
    if let Some(inner) = s.strip_prefix('|') {
        let close = inner.find('|')?;
        Some((&s[..close + 2], &s[close + 2..]))
    } else {
        let end = s.find(char::is_whitespace).unwrap_or(s.len());
        Some((&s[..end], &s[end..]))
    }
}

/// First term of `s` (atom or s-expression) and the remainder
fn split_term(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.starts_with('(') {
        let end = sexp_end(s, 0)?;
        Some((&s[..end], &s[end..]))
    } else {
        split_symbol(s)
    }
}

/// `(- 5)` is printed as `-5`; anything else is kept verbatim
fn simplify_value(value: &str) -> String {
    value
        .strip_prefix("(- ")
        .and_then(|v| v.strip_suffix(')'))
        .filter(|v| v.chars().all(|c| c.is_ascii_digit()))
        .map(|v| format!("-{v}"))
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_lookup() {
        let model = Model::with_assignments(vec![("x".into(), "42".into())]);
        assert_eq!(model.get("x"), Some("42"));
        assert_eq!(model.get("y"), None);
        assert_eq!(model.len(), 1);
        assert!(!model.is_empty());
        assert!(Model::new().is_empty());
    }

    #[test]
    fn test_parse_z3_model() {
        let text = r#"(
  (define-fun v_y () Int
    (- 3))
  (define-fun v_x () Int
    0)
  (define-fun |v_n$2| () Bool
    true)
  (define-fun len_Int ((x!0 (Array Int Int))) Int
    0)
)"#;
        let model = Model::parse(text).unwrap();
        assert_eq!(
            model.assignments,
            vec![
                ("n$2".to_string(), "true".to_string()),
                ("x".to_string(), "0".to_string()),
                ("y".to_string(), "-3".to_string()),
            ]
        );
        assert_eq!(model.to_string(), "n$2 = true, x = 0, y = -3");
    }

    #[test]
    fn test_parse_array_value() {
        let text = "((define-fun v_xs () (Array Int Int) ((as const (Array Int Int)) 7)))";
        let model = Model::parse(text).unwrap();
        assert_eq!(model.get("xs"), Some("((as const (Array Int Int)) 7)"));
    }

    #[test]
    fn test_parse_empty_and_garbage() {
        assert!(Model::parse("()").unwrap().is_empty());
        assert_eq!(Model::new().to_string(), "(no assignments)");
        assert!(Model::parse("sat").is_err());
    }
}
