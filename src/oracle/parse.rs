//! JSON extraction from free-text Oracle responses.
//!
//! The Oracle returns prose that should contain a JSON object or array.
//! Extraction is an explicit parse step with its own error outcome; malformed
//! or missing JSON is a parse failure, never a crash.

use crate::error::{CadenceError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Extract the first JSON object or array embedded in free text.
pub fn extract_json(text: &str) -> Result<Value> {
    let candidate = find_json_span(text)
        .ok_or_else(|| CadenceError::Parse("no JSON object or array in response".to_string()))?;

    serde_json::from_str(candidate)
        .map_err(|e| CadenceError::Parse(format!("malformed JSON in response: {}", e)))
}

/// Extract and deserialize into an expected shape.
pub fn extract_typed<T: DeserializeOwned>(text: &str) -> Result<T> {
    let value = extract_json(text)?;
    serde_json::from_value(value)
        .map_err(|e| CadenceError::Parse(format!("unexpected JSON shape: {}", e)))
}

/// Widest span from the first opening brace/bracket to the matching last
/// closing one. Good enough for "here is your JSON: {...}" style replies.
fn find_json_span(text: &str) -> Option<&str> {
    let obj_start = text.find('{');
    let arr_start = text.find('[');

    let (start, close) = match (obj_start, arr_start) {
        (Some(o), Some(a)) if a < o => (a, ']'),
        (Some(o), _) => (o, '}'),
        (None, Some(a)) => (a, ']'),
        (None, None) => return None,
    };

    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_extract_bare_object() {
        let value = extract_json(r#"{"a": 1}"#).unwrap();
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn test_extract_object_in_prose() {
        let text = r#"Sure! Here is the plan you asked for:

{"posts_to_create": 2, "topics": ["x", "y"]}

Let me know if you need anything else."#;
        let value = extract_json(text).unwrap();
        assert_eq!(value["posts_to_create"], 2);
    }

    #[test]
    fn test_extract_array_in_prose() {
        let value = extract_json("Topics: [\"a\", \"b\"] as requested").unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_array_before_object_picks_array() {
        let value = extract_json(r#"["one", "two"] and also {"x": 1}"#);
        // Span runs to the last ']' which does not exist after the object,
        // so this still parses the array alone.
        assert!(value.is_ok());
        assert!(value.unwrap().is_array());
    }

    #[test]
    fn test_no_json_is_parse_error() {
        let err = extract_json("I could not produce anything useful.").unwrap_err();
        assert!(matches!(err, CadenceError::Parse(_)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = extract_json(r#"{"a": unquoted}"#).unwrap_err();
        assert!(matches!(err, CadenceError::Parse(_)));
    }

    #[test]
    fn test_extract_typed() {
        #[derive(Deserialize)]
        struct Reply {
            message: String,
        }

        let reply: Reply = extract_typed(r#"Here: {"message": "hello"}"#).unwrap();
        assert_eq!(reply.message, "hello");
    }

    #[test]
    fn test_extract_typed_wrong_shape() {
        #[derive(Debug, Deserialize)]
        struct Reply {
            #[allow(dead_code)]
            message: String,
        }

        let err = extract_typed::<Reply>(r#"{"other": 1}"#).unwrap_err();
        assert!(matches!(err, CadenceError::Parse(_)));
    }

    #[test]
    fn test_nested_object_spans_to_last_brace() {
        let value = extract_json(r#"{"outer": {"inner": true}}"#).unwrap();
        assert_eq!(value["outer"]["inner"], true);
    }
}
