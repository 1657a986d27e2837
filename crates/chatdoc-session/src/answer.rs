use serde_json::Value;

/// Flatten whatever shape the service answered with into display text.
pub fn normalize_answer(raw: &Value) -> String {
    let candidate = match raw {
        Value::Null => return String::new(),
        Value::String(s) => return s.clone(),
        _ => present(raw, "answer")
            .or_else(|| present(raw, "message"))
            .unwrap_or(raw),
    };

    if let Value::String(s) = candidate {
        return s.clone();
    }

    let content = present(candidate, "content")
        .or_else(|| present(candidate, "text"))
        .or_else(|| present(candidate, "output"));

    match content {
        Some(Value::String(s)) => return s.clone(),
        Some(Value::Array(parts)) => {
            let joined: String = parts.iter().filter_map(part_text).collect();
            if !joined.is_empty() {
                return joined;
            }
        }
        _ => {}
    }

    for key in ["output_text", "data"] {
        if let Some(Value::String(s)) = candidate.get(key) {
            return s.clone();
        }
    }

    candidate.to_string()
}

/// Field value unless missing or null.
fn present<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| !v.is_null())
}

fn part_text(part: &Value) -> Option<&str> {
    let text = match part {
        Value::String(s) => Some(s.as_str()),
        _ => present(part, "text")
            .or_else(|| present(part, "content"))
            .or_else(|| present(part, "value"))
            .and_then(Value::as_str),
    };
    text.filter(|s| !s.is_empty())
}
