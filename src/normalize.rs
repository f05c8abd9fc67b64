//! Pulls one JSON object out of free-form model output.
//!
//! Extraction is the same for every pass: strip markdown fences, take the
//! text between the first `{` and the last `}`, parse strictly. Anything that
//! fails here sends the caller to the fallback path; nothing is retried.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::analysis::{analysis_typedef, components_typedef, AiProvider, AnalysisResult, ComponentSpec};
use crate::provider::ProviderName;
use crate::types::{validate, TypeDef};

#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeError {
    /// No `{ ... }` span in the response.
    NoJsonFound,
    /// A span was found but is not valid JSON or does not fit the schema.
    MalformedJson(String),
}

impl std::fmt::Display for NormalizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizeError::NoJsonFound => write!(f, "no JSON object found in model response"),
            NormalizeError::MalformedJson(msg) => write!(f, "malformed JSON in model response: {msg}"),
        }
    }
}

impl std::error::Error for NormalizeError {}

/// Remove a leading fence line (```` ``` ```` or ```` ```json ````) and a trailing fence.
pub fn strip_fences(response: &str) -> &str {
    let mut cleaned = response.trim();

    if cleaned.starts_with("```") {
        cleaned = match cleaned.find('\n') {
            Some(idx) => &cleaned[idx + 1..],
            None => &cleaned[3..],
        };
    }
    if let Some(stripped) = cleaned.trim_end().strip_suffix("```") {
        cleaned = stripped;
    }

    cleaned.trim()
}

/// Slice from the first `{` to the last `}` inclusive.
pub fn extract_json_object(response: &str) -> Result<&str, NormalizeError> {
    let cleaned = strip_fences(response);
    match (cleaned.find('{'), cleaned.rfind('}')) {
        (Some(start), Some(end)) if end > start => Ok(&cleaned[start..=end]),
        _ => Err(NormalizeError::NoJsonFound),
    }
}

fn parse_object(response: &str) -> Result<Map<String, Value>, NormalizeError> {
    let slice = extract_json_object(response)?;
    match serde_json::from_str::<Value>(slice) {
        Ok(Value::Object(obj)) => Ok(obj),
        Ok(_) => Err(NormalizeError::MalformedJson("top-level value is not an object".into())),
        Err(e) => Err(NormalizeError::MalformedJson(e.to_string())),
    }
}

/// Parse an analysis response. `aiProvider` and `timestamp` are always
/// overwritten with the supplied values, whatever the model emitted.
pub fn normalize_analysis(
    response: &str,
    provider: ProviderName,
    timestamp: u64,
) -> Result<AnalysisResult, NormalizeError> {
    let mut obj = parse_object(response)?;

    canonicalize_analysis(&mut obj);
    obj.insert("aiProvider".into(), Value::String(AiProvider::from(provider).as_str().into()));
    obj.insert("timestamp".into(), Value::from(timestamp));

    let value = strip_nulls(Value::Object(obj));
    check(&analysis_typedef(), &value)?;
    serde_json::from_value(value).map_err(|e| NormalizeError::MalformedJson(e.to_string()))
}

/// Parse a component generation response. A `components` array is required.
pub fn normalize_components(response: &str) -> Result<Vec<ComponentSpec>, NormalizeError> {
    #[derive(Deserialize)]
    struct Envelope {
        components: Vec<ComponentSpec>,
    }

    let mut obj = parse_object(response)?;
    canonicalize_components(&mut obj);

    let value = strip_nulls(Value::Object(obj));
    check(&components_typedef(), &value)?;
    let envelope: Envelope =
        serde_json::from_value(value).map_err(|e| NormalizeError::MalformedJson(e.to_string()))?;
    Ok(envelope.components)
}

fn check(ty: &TypeDef, value: &Value) -> Result<(), NormalizeError> {
    validate(ty, value).map_err(|errors| {
        NormalizeError::MalformedJson(
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        )
    })
}

// Move an alias key to its canonical name unless the canonical key exists.
fn rename_key(obj: &mut Map<String, Value>, alias: &str, canonical: &str) {
    if let Some(v) = obj.remove(alias) {
        obj.entry(canonical.to_string()).or_insert(v);
    }
}

fn canonicalize_analysis(obj: &mut Map<String, Value>) {
    obj.remove("ai_provider");
    rename_key(obj, "components_detected", "components");
    rename_key(obj, "componentsDetected", "components");
    rename_key(obj, "design_system", "designSystem");

    if let Some(Value::Object(structure)) = obj.get_mut("structure") {
        rename_key(structure, "layout_type", "layout");
    }
    canonicalize_components(obj);
}

fn canonicalize_components(obj: &mut Map<String, Value>) {
    if let Some(Value::Array(items)) = obj.get_mut("components") {
        for item in items.iter_mut() {
            if let Value::Object(component) = item {
                rename_key(component, "tsx_code", "code");
            }
        }
    }
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(obj) => Value::Object(
            obj.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(strip_nulls)
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::LayoutType;

    #[test]
    fn test_fenced_json_with_preamble() {
        let raw = "Sure! ```json\n{\"title\":\"X\",\"components\":[]}\n```";
        let result = normalize_analysis(raw, ProviderName::Groq, 1_700_000_000).unwrap();
        assert_eq!(result.title, "X");
        assert!(result.components.is_empty());
        assert_eq!(result.ai_provider, AiProvider::Groq);
        assert_eq!(result.timestamp, 1_700_000_000);
    }

    #[test]
    fn test_refusal_has_no_json() {
        assert_eq!(
            normalize_analysis("I cannot help with that.", ProviderName::Openai, 1),
            Err(NormalizeError::NoJsonFound)
        );
    }

    #[test]
    fn test_reversed_or_missing_braces() {
        assert_eq!(extract_json_object("} nothing {"), Err(NormalizeError::NoJsonFound));
        assert_eq!(extract_json_object("{ open only"), Err(NormalizeError::NoJsonFound));
        assert_eq!(extract_json_object(""), Err(NormalizeError::NoJsonFound));
    }

    #[test]
    fn test_pipeline_bookkeeping_overrides_model_keys() {
        let raw = r#"{"title":"T","aiProvider":"google","ai_provider":"openai","timestamp":5}"#;
        let result = normalize_analysis(raw, ProviderName::Anthropic, 42).unwrap();
        assert_eq!(result.ai_provider, AiProvider::Anthropic);
        assert_eq!(result.timestamp, 42);
    }

    #[test]
    fn test_malformed_span() {
        let raw = "Here you go: {\"title\": \"X\", missing_quotes: true} hope it helps";
        assert!(matches!(
            normalize_analysis(raw, ProviderName::Groq, 1),
            Err(NormalizeError::MalformedJson(_))
        ));
    }

    #[test]
    fn test_schema_type_mismatch_is_malformed() {
        let raw = r#"{"title": 7}"#;
        match normalize_analysis(raw, ProviderName::Groq, 1) {
            Err(NormalizeError::MalformedJson(msg)) => assert!(msg.contains("$.title")),
            other => panic!("expected MalformedJson, got {other:?}"),
        }
    }

    #[test]
    fn test_fence_without_language_tag_and_aliases() {
        let raw = "```\n{\"structure\":{\"layout_type\":\"multi-column\",\"sections\":[]},\
                   \"components_detected\":[{\"name\":\"Nav\",\"type\":\"navigation\",\"description\":null}],\
                   \"design_system\":{\"tokens\":[{\"name\":\"primary\",\"category\":\"color\",\"value\":\"#3B82F6\"}]}}\n```";
        let result = normalize_analysis(raw, ProviderName::Google, 9).unwrap();
        assert_eq!(result.structure.layout, LayoutType::MultiColumn);
        assert_eq!(result.components[0].name, "Nav");
        assert_eq!(result.components[0].description, "");
        assert_eq!(result.design_system.tokens[0].value, "#3B82F6");
    }

    #[test]
    fn test_braces_inside_strings_survive() {
        let raw = "Output:\n{\"components\":[{\"name\":\"Card\",\"tsx_code\":\"export const Card = () => { return <div/> }\"}]}\nDone.";
        let components = normalize_components(raw).unwrap();
        assert_eq!(components.len(), 1);
        assert_eq!(
            components[0].code.as_deref(),
            Some("export const Card = () => { return <div/> }")
        );
    }

    #[test]
    fn test_components_key_required() {
        assert!(matches!(
            normalize_components(r#"{"items": []}"#),
            Err(NormalizeError::MalformedJson(_))
        ));
    }

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_fences("  {}  "), "{}");
        assert_eq!(strip_fences("```{}```"), "{}");
    }
}
