//! Syntactic validation of the configuration edit buffer.

use serde_json::Value;

use crate::error::ControlError;

/// Parse the edit buffer, reporting where it stops being valid JSON.
///
/// Only syntax is checked; the service owns the schema.
pub fn validate(text: &str) -> Result<Value, ControlError> {
    serde_json::from_str(text).map_err(|e| ControlError::Syntax {
        line: e.line() as u32,
        column: e.column() as u32,
        detail: syntax_detail(&e),
    })
}

/// serde_json appends " at line X column Y" to its messages; the position is
/// reported separately.
fn syntax_detail(error: &serde_json::Error) -> String {
    let message = error.to_string();
    match message.rfind(" at line ") {
        Some(idx) => message[..idx].to_string(),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_documents_parse() {
        let value = validate(r#"{"models": {"m1": {"ttl": 300}}}"#).unwrap();
        assert_eq!(value, json!({"models": {"m1": {"ttl": 300}}}));
    }

    #[test]
    fn invalid_documents_report_position() {
        let test_cases = vec![
            ("unterminated object", "{", 1, 1),
            ("trailing comma", "{\n  \"a\": 1,\n}", 3, 1),
            ("empty buffer", "", 1, 0),
        ];

        for (description, text, line, column) in test_cases {
            match validate(text) {
                Err(ControlError::Syntax {
                    line: l,
                    column: c,
                    detail,
                }) => {
                    assert_eq!((l, c), (line, column), "{}", description);
                    assert!(!detail.contains(" at line "), "{}: {}", description, detail);
                    assert!(!detail.is_empty(), "{}", description);
                }
                other => panic!("{}: expected syntax error, got {:?}", description, other),
            }
        }
    }
}
