//! Model reply decoding and validation.
//!
//! The generator is asked for a bare JSON object but routinely wraps it in a
//! code fence, adds prose around it, or emits invalid `\` escapes inside long
//! markdown bodies. [`decode_response`] recovers the object; validation into a
//! [`GenerationResult`] is a separate step owned by the caller.

use crate::error::DevlogError;
use serde_json::{Map, Value};
use tracing::debug;

pub const MIN_TAGS: usize = 3;
pub const MAX_TAGS: usize = 6;

/// Characters that may follow a backslash in a JSON string
const JSON_ESCAPES: &[char] = &['"', '\\', '/', 'b', 'f', 'n', 'r', 't', 'u'];

/// Raw decoded reply: every field is optional until validated
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationReply {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    /// Left untyped; anything other than a list is treated as no tags
    pub tags: Option<Value>,
    pub content: Option<String>,
}

/// A reply that passed validation and is safe to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    pub title: String,
    pub excerpt: String,
    pub tags: Vec<String>,
    pub content: String,
}

impl GenerationReply {
    fn from_object(map: &Map<String, Value>) -> Result<Self, DevlogError> {
        Ok(Self {
            title: string_field(map, "title")?,
            excerpt: string_field(map, "excerpt")?,
            tags: map.get("tags").filter(|v| !v.is_null()).cloned(),
            content: string_field(map, "content")?,
        })
    }

    /// Enforce the persistence invariants.
    ///
    /// Title and content must be non-empty after trimming. An empty excerpt
    /// falls back to the title. Tags are normalized to 3..=6 entries, padding
    /// from `fallback_tags`.
    pub fn validate(self, fallback_tags: &[String]) -> Result<GenerationResult, DevlogError> {
        let title = self.title.as_deref().unwrap_or_default().trim().to_string();
        let content = self.content.as_deref().unwrap_or_default().trim().to_string();
        if title.is_empty() || content.is_empty() {
            return Err(DevlogError::Validation(
                "model returned missing title/content".to_string(),
            ));
        }

        let excerpt = match self.excerpt.as_deref().map(str::trim) {
            Some(e) if !e.is_empty() => e.to_string(),
            _ => title.clone(),
        };

        Ok(GenerationResult {
            tags: normalize_tags(self.tags.as_ref(), fallback_tags),
            title,
            excerpt,
            content,
        })
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Result<Option<String>, DevlogError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(DevlogError::Decode(format!(
            "field `{}` must be a string, got {}",
            key,
            json_type(other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Trim, drop blanks and case-insensitive duplicates, cap at six, then pad to
/// three from `fallback`.
pub fn normalize_tags(raw: Option<&Value>, fallback: &[String]) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    if let Some(Value::Array(items)) = raw {
        for item in items {
            let text = match item {
                Value::String(s) => s.trim().to_string(),
                Value::Null => continue,
                other => other.to_string(),
            };
            if text.is_empty() || contains_tag(&tags, &text) {
                continue;
            }
            tags.push(text);
        }
    }
    tags.truncate(MAX_TAGS);

    for extra in fallback {
        if tags.len() >= MIN_TAGS {
            break;
        }
        if !contains_tag(&tags, extra) {
            tags.push(extra.clone());
        }
    }
    tags
}

fn contains_tag(tags: &[String], candidate: &str) -> bool {
    tags.iter().any(|t| t.eq_ignore_ascii_case(candidate))
}

/// Recover the structured reply from raw model output.
///
/// Strips a surrounding code fence, slices to the outermost `{...}` span,
/// then parses. If parsing fails, one repair pass escapes stray backslashes
/// and the parse is retried exactly once.
pub fn decode_response(raw: &str) -> Result<GenerationReply, DevlogError> {
    let candidate = extract_object_span(strip_fence(raw.trim()));

    let value = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => value,
        Err(first) => {
            debug!(error = %first, "Strict parse failed, retrying after backslash repair");
            let repaired = repair_backslashes(candidate);
            serde_json::from_str::<Value>(&repaired).map_err(|e| {
                DevlogError::Decode(format!("invalid JSON after repair: {} (strict: {})", e, first))
            })?
        }
    };

    match value {
        Value::Object(map) => GenerationReply::from_object(&map),
        other => Err(DevlogError::Decode(format!(
            "expected a JSON object, got {}",
            json_type(&other)
        ))),
    }
}

fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest).trim();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn extract_object_span(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

/// Double every backslash that does not begin a valid JSON escape.
fn repair_backslashes(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.peek() {
            Some(next) if JSON_ESCAPES.contains(next) => {
                out.push('\\');
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            _ => out.push_str("\\\\"),
        }
    }
    out
}
