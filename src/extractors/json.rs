use serde_json::Value;

use crate::text::non_empty;

/// Extract transcript text from a JSON body of unknown shape.
///
/// Candidates are tried in priority order and the first one that normalizes
/// to something non-empty wins:
/// `transcript`, `text`, `data.transcript`, then an array of cue objects
/// (top level or under `data`) whose `text` fields are joined with spaces.
pub fn extract(body: &str) -> Option<String> {
    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!("Body declared as JSON did not parse: {}", err);
            return None;
        }
    };

    let found = [
        value.get("transcript"),
        value.get("text"),
        value.pointer("/data/transcript"),
    ]
    .into_iter()
    .flatten()
    .find_map(|candidate| candidate.as_str().and_then(non_empty))
    .or_else(|| cue_text(&value))
    .or_else(|| value.get("data").and_then(cue_text));
    found
}

/// Join the `text` fields of an array of cue objects.
fn cue_text(value: &Value) -> Option<String> {
    let cues = value.as_array()?;
    let joined = cues
        .iter()
        .filter_map(|cue| cue.get("text").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    non_empty(&joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_field() {
        assert_eq!(extract(r#"{"transcript":"  a   b  "}"#).as_deref(), Some("a b"));
    }

    #[test]
    fn test_priority_order() {
        let body = r#"{"text":"second","transcript":"first","data":{"transcript":"third"}}"#;
        assert_eq!(extract(body).as_deref(), Some("first"));

        let body = r#"{"transcript":"   ","text":"second"}"#;
        assert_eq!(extract(body).as_deref(), Some("second"));

        let body = r#"{"data":{"transcript":"nested"}}"#;
        assert_eq!(extract(body).as_deref(), Some("nested"));
    }

    #[test]
    fn test_cue_arrays() {
        let body = r#"[{"start":0,"text":"one"},{"start":1,"text":"two"},{"start":2}]"#;
        assert_eq!(extract(body).as_deref(), Some("one two"));

        let body = r#"{"data":[{"text":"under"},{"text":"data"}]}"#;
        assert_eq!(extract(body).as_deref(), Some("under data"));
    }

    #[test]
    fn test_non_string_fields_ignored() {
        let body = r#"{"transcript":null,"text":42,"data":{"transcript":["x"]}}"#;
        assert_eq!(extract(body), None);
    }

    #[test]
    fn test_invalid_json() {
        assert_eq!(extract("{not json"), None);
    }
}
