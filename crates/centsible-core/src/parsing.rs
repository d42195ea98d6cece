//! Best-effort structured-output scraping
//!
//! Model replies routinely wrap their JSON payload in prose or
//! markdown code fences. These helpers return the first balanced
//! object/array span in a reply, or fail. Every stage goes through
//! them; there are no other scraping paths.

use crate::error::{Error, Result};

/// Extract the first balanced `{...}` span from a model reply
pub fn extract_json_object(text: &str) -> Result<&str> {
    extract_balanced(text, '{', '}')
        .ok_or_else(|| Error::InvalidData(no_json_message(text, "object")))
}

/// Extract the first balanced `[...]` span from a model reply
pub fn extract_json_array(text: &str) -> Result<&str> {
    extract_balanced(text, '[', ']')
        .ok_or_else(|| Error::InvalidData(no_json_message(text, "array")))
}

fn extract_balanced(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    None
}

fn no_json_message(text: &str, kind: &str) -> String {
    // Truncate long replies for the error message
    let raw = if text.len() > 200 {
        let cut = text
            .char_indices()
            .take_while(|(i, _)| *i < 200)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &text[..cut])
    } else {
        text.to_string()
    };
    format!("No JSON {} found in model reply | Raw: {}", kind, raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_object() {
        let reply = r#"{"amount": 15.0, "category": "Food"}"#;
        assert_eq!(extract_json_object(reply).unwrap(), reply);
    }

    #[test]
    fn test_object_in_prose() {
        let reply = "Here is the expense:\n{\"amount\": 15.0}\nDone!";
        assert_eq!(extract_json_object(reply).unwrap(), "{\"amount\": 15.0}");
    }

    #[test]
    fn test_object_in_code_fence() {
        let reply = "```json\n{\"amount\": 40, \"category\": \"Transportation\"}\n```";
        assert_eq!(
            extract_json_object(reply).unwrap(),
            "{\"amount\": 40, \"category\": \"Transportation\"}"
        );
    }

    #[test]
    fn test_nested_object() {
        let reply = r#"{"amount": 13.32, "metadata": {"tax": 1.07, "items": ["a", "b"]}}"#;
        assert_eq!(extract_json_object(reply).unwrap(), reply);
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let reply = r#"{"description": "curly } brace", "amount": 1}"#;
        assert_eq!(extract_json_object(reply).unwrap(), reply);
    }

    #[test]
    fn test_first_object_wins() {
        let reply = r#"{"a": 1} trailing {"b": 2}"#;
        assert_eq!(extract_json_object(reply).unwrap(), r#"{"a": 1}"#);
    }

    #[test]
    fn test_no_object_fails() {
        assert!(extract_json_object("sorry, I can't help with that").is_err());
    }

    #[test]
    fn test_unbalanced_fails() {
        assert!(extract_json_object(r#"{"amount": 15"#).is_err());
    }

    #[test]
    fn test_array_in_prose() {
        let reply = "Insights:\n[\"spend less\", \"save more\"]";
        assert_eq!(
            extract_json_array(reply).unwrap(),
            "[\"spend less\", \"save more\"]"
        );
    }

    #[test]
    fn test_array_of_objects() {
        let reply = r#"[{"description": "Item 1", "amount": 10.5}]"#;
        assert_eq!(extract_json_array(reply).unwrap(), reply);
    }
}
