//! Progress resolver: reconciles both progress dialects into one report
//!
//! Confluence answers with a flat document:
//!
//! ```json
//! {"alternativePercentage": "45%", "currentStatus": "Zipping", "fileName": "temp/backup.zip"}
//! ```
//!
//! Jira answers with a task document whose `result` field is itself a JSON
//! document serialized to a string:
//!
//! ```json
//! {"progress": 100, "description": "Done", "result": "{\"mediaFileId\":\"f00d\",\"fileName\":\"backup.zip\"}"}
//! ```

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ExportError, Result};
use crate::profile::Dialect;
use crate::types::{ArtifactRef, ProgressReport};

const RESULT_FIELD: &str = "result";
const FILE_NAME_FIELD: &str = "fileName";
const MEDIA_FILE_ID_FIELD: &str = "mediaFileId";
const PERCENT_FIELDS: [&str; 2] = ["progress", "alternativePercentage"];
const DESCRIPTION_FIELDS: [&str; 2] = ["description", "currentStatus"];

/// Normalize a raw progress response
///
/// `status` is the HTTP status the body arrived with and is only used to
/// annotate parse failures. The function is pure: the same input always
/// yields the same report.
pub fn normalize(body: &str, status: u16, dialect: Dialect) -> Result<ProgressReport> {
    let top = parse_object(body).map_err(|detail| ExportError::parse(status, detail))?;

    let nested = match top.get(RESULT_FIELD) {
        None | Some(Value::Null) => None,
        Some(result) => match nested_object(result) {
            Ok(nested) => Some(nested),
            Err(detail) if dialect == Dialect::Nested => {
                return Err(ExportError::parse(
                    status,
                    format!("nested result: {}", detail),
                ));
            }
            Err(detail) => {
                warn!("Ignoring unparseable nested result: {}", detail);
                None
            }
        },
    };

    let artifact = nested.as_ref().and_then(artifact_from_nested).or_else(|| {
        text_field(&top, FILE_NAME_FIELD).map(|file_name| ArtifactRef::File { file_name })
    });

    Ok(ProgressReport {
        percent: first_text(&top, &PERCENT_FIELDS),
        description: first_text(&top, &DESCRIPTION_FIELDS),
        artifact,
    })
}

fn parse_object(raw: &str) -> std::result::Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected a JSON object, got {}", type_name(&other))),
        Err(e) => Err(e.to_string()),
    }
}

/// The nested result normally arrives stringified; an inline object is
/// accepted as well
fn nested_object(result: &Value) -> std::result::Result<Map<String, Value>, String> {
    match result {
        Value::String(raw) => parse_object(raw),
        Value::Object(map) => Ok(map.clone()),
        other => Err(format!("expected a JSON string, got {}", type_name(other))),
    }
}

fn artifact_from_nested(nested: &Map<String, Value>) -> Option<ArtifactRef> {
    let file_name = text_field(nested, FILE_NAME_FIELD)?;
    Some(match text_field(nested, MEDIA_FILE_ID_FIELD) {
        Some(media_file_id) => ArtifactRef::Media {
            media_file_id,
            file_name,
        },
        None => ArtifactRef::File { file_name },
    })
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| map.get(*key).filter(|v| !v.is_null()))
        .map(render)
        .unwrap_or_default()
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_in_progress_report() {
        let report = normalize(
            r#"{"progress": 42, "description": "Archiving"}"#,
            200,
            Dialect::Nested,
        )
        .unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.percent, "42");
        assert_eq!(report.description, "Archiving");
        assert_eq!(report.artifact, None);
    }

    #[test]
    fn test_flat_file_name_completes() {
        let report = normalize(r#"{"fileName": "export.zip"}"#, 200, Dialect::Flat).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.artifact.unwrap().path(), "export.zip");
        assert_eq!(report.percent, "");
        assert_eq!(report.description, "");
    }

    #[test]
    fn test_empty_file_name_is_not_complete() {
        let report = normalize(r#"{"fileName": ""}"#, 200, Dialect::Flat).unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.artifact, None);

        let nested = json!({"fileName": ""}).to_string();
        let body = json!({"fileName": "", "result": nested}).to_string();
        let report = normalize(&body, 200, Dialect::Nested).unwrap();
        assert!(!report.is_complete());
    }

    #[test]
    fn test_alternative_fields() {
        let report = normalize(
            r#"{"alternativePercentage": "45%", "currentStatus": "Zipping files"}"#,
            200,
            Dialect::Flat,
        )
        .unwrap();
        assert_eq!(report.percent, "45%");
        assert_eq!(report.description, "Zipping files");
    }

    #[test]
    fn test_nested_wins_over_top_level() {
        let nested = json!({"fileName": "new.zip"}).to_string();
        let body = json!({"fileName": "old.zip", "result": nested}).to_string();

        let report = normalize(&body, 200, Dialect::Nested).unwrap();
        assert_eq!(
            report.artifact,
            Some(ArtifactRef::File {
                file_name: "new.zip".into()
            })
        );
    }

    #[test]
    fn test_nested_media_join() {
        let nested = json!({"mediaFileId": "9f8e-77", "fileName": "new.zip"}).to_string();
        let body = json!({
            "progress": 100,
            "description": "Backup complete",
            "fileName": "old.zip",
            "result": nested,
        })
        .to_string();

        let report = normalize(&body, 200, Dialect::Nested).unwrap();
        assert_eq!(report.artifact.unwrap().path(), "9f8e-77/new.zip");
        assert_eq!(report.percent, "100");
    }

    #[test]
    fn test_nested_without_file_name_falls_back() {
        let nested = json!({"mediaFileId": "9f8e-77"}).to_string();
        let body = json!({"fileName": "top.zip", "result": nested}).to_string();

        let report = normalize(&body, 200, Dialect::Nested).unwrap();
        assert_eq!(report.artifact.unwrap().path(), "top.zip");
    }

    #[test]
    fn test_nested_inline_object_accepted() {
        let body = json!({"result": {"fileName": "inline.zip"}}).to_string();
        let report = normalize(&body, 200, Dialect::Nested).unwrap();
        assert_eq!(report.artifact.unwrap().path(), "inline.zip");
    }

    #[test]
    fn test_bad_nested_result_depends_on_dialect() {
        let body = json!({"fileName": "top.zip", "result": "not json"}).to_string();

        let err = normalize(&body, 200, Dialect::Nested).unwrap_err();
        assert!(matches!(err, ExportError::Parse { status: 200, .. }));

        let report = normalize(&body, 200, Dialect::Flat).unwrap();
        assert_eq!(report.artifact.unwrap().path(), "top.zip");
    }

    #[test]
    fn test_unparseable_body_carries_status() {
        let err = normalize("<html>Service Unavailable</html>", 503, Dialect::Flat).unwrap_err();
        match err {
            ExportError::Parse { status, .. } => assert_eq!(status, 503),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_object_body_is_parse_error() {
        assert!(matches!(
            normalize("[1, 2]", 200, Dialect::Flat),
            Err(ExportError::Parse { .. })
        ));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let nested = json!({"mediaFileId": "m1", "fileName": "b.zip"}).to_string();
        let body = json!({"progress": 99, "description": "x", "result": nested}).to_string();

        let first = normalize(&body, 200, Dialect::Nested).unwrap();
        let second = normalize(&body, 200, Dialect::Nested).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_null_result_is_ignored() {
        let body = r#"{"progress": 10, "description": "Queued", "result": null}"#;
        let report = normalize(body, 200, Dialect::Nested).unwrap();
        assert!(!report.is_complete());
        assert_eq!(report.description, "Queued");
    }
}
