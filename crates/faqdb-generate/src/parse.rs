//! Extraction of model output from `generateContent` responses.

use serde::Deserialize;
use serde_json::Value;

use faqdb_core::traits::OverallFaq;

/// Concatenated text parts of the first candidate, or `None` when the
/// response has no text (blocked, empty or an unexpected shape).
pub fn candidate_text(response: &Value) -> Option<String> {
    let parts = response.get("candidates")?.get(0)?.get("content")?.get("parts")?.as_array()?;
    let text: String = parts.iter().filter_map(|p| p.get("text").and_then(Value::as_str)).collect();
    let text = text.trim();
    if text.is_empty() { None } else { Some(text.to_string()) }
}

/// Removes a surrounding Markdown code fence (```json ... ``` or ``` ... ```).
pub fn strip_code_fences(raw: &str) -> &str {
    let t = raw.trim();
    let Some(rest) = t.strip_prefix("```") else { return t };
    // Drop the info string on the opening line.
    let body = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[derive(Deserialize)]
struct RawOverall {
    question: Option<Value>,
    answer: Option<Value>,
}

/// Parses `{"question": .., "answer": ..}` out of a model response.
///
/// Fences are tolerated, as is prose around the object. Fields that are
/// missing, not strings or blank come back as `None`.
pub fn parse_overall_faq(raw: &str) -> OverallFaq {
    let body = strip_code_fences(raw);
    let parsed = serde_json::from_str::<RawOverall>(body).ok().or_else(|| {
        let start = body.find('{')?;
        let end = body.rfind('}')?;
        if end <= start {
            return None;
        }
        serde_json::from_str::<RawOverall>(&body[start..=end]).ok()
    });
    let Some(parsed) = parsed else { return OverallFaq::default() };
    OverallFaq { question: non_blank(parsed.question), answer: non_blank(parsed.answer) }
}

fn non_blank(v: Option<Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fence_without_language_tag() {
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  plain  "), "plain");
    }
}
