//! Pulls the final JSON result out of free-text model output.
//!
//! Policy: take the span from the first `{` to the last `}` and parse it.
//! Anything that does not yield both required keys is an error. There is no
//! repair and no default score.

use serde_json::Value;
use thiserror::Error;

use crate::analysis::scoring::clamp_score;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("No JSON object found in agent output")]
    NoJsonObject,

    #[error("Invalid JSON in agent output: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("final_score is not numeric: {0}")]
    NonNumericScore(String),

    #[error("report_markdown is not a string")]
    ReportNotString,
}

/// The validated result of the report synthesis stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedReport {
    pub final_score: i32,
    pub report_markdown: String,
}

/// Parses the first-`{`-to-last-`}` span of `text` as JSON.
pub fn extract_json_object(text: &str) -> Result<Value, ExtractionError> {
    let start = text.find('{').ok_or(ExtractionError::NoJsonObject)?;
    let end = text.rfind('}').ok_or(ExtractionError::NoJsonObject)?;
    if end < start {
        return Err(ExtractionError::NoJsonObject);
    }
    Ok(serde_json::from_str(&text[start..=end])?)
}

pub fn extract_report(text: &str) -> Result<ExtractedReport, ExtractionError> {
    let value = extract_json_object(text)?;

    let score = value
        .get("final_score")
        .ok_or(ExtractionError::MissingKey("final_score"))?;
    let report = value
        .get("report_markdown")
        .ok_or(ExtractionError::MissingKey("report_markdown"))?;

    let final_score = clamp_score(coerce_score(score)?);
    let report_markdown = report
        .as_str()
        .ok_or(ExtractionError::ReportNotString)?
        .to_string();

    Ok(ExtractedReport {
        final_score,
        report_markdown,
    })
}

/// Integers pass through, floats truncate toward zero, numeric strings are parsed.
fn coerce_score(value: &Value) -> Result<i64, ExtractionError> {
    let non_numeric = || ExtractionError::NonNumericScore(value.to_string());

    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(non_numeric),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
                .ok_or_else(non_numeric)
        }
        _ => Err(non_numeric()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_object() {
        let report =
            extract_report(r##"{"final_score": 75, "report_markdown": "# Report\nSolid fit."}"##)
                .unwrap();
        assert_eq!(report.final_score, 75);
        assert_eq!(report.report_markdown, "# Report\nSolid fit.");
    }

    #[test]
    fn test_object_wrapped_in_prose_and_fences() {
        let text = "Sure! I used the calculator.\n```json\n{\n  \"final_score\": 82,\n  \"report_markdown\": \"## Summary\\nGood alignment.\"\n}\n```\nLet me know if anything else is needed.";
        let report = extract_report(text).unwrap();
        assert_eq!(report.final_score, 82);
        assert_eq!(report.report_markdown, "## Summary\nGood alignment.");
    }

    #[test]
    fn test_nested_objects_are_kept_whole() {
        let text = r#"Result: {"final_score": 60, "report_markdown": "text", "details": {"conflicts": 4}} done"#;
        let report = extract_report(text).unwrap();
        assert_eq!(report.final_score, 60);
        assert_eq!(report.report_markdown, "text");
    }

    #[test]
    fn test_no_braces_is_error() {
        let err = extract_report("The candidate scored 75 out of 100.").unwrap_err();
        assert!(matches!(err, ExtractionError::NoJsonObject));
    }

    #[test]
    fn test_reversed_braces_is_error() {
        let err = extract_report("} nothing here {").unwrap_err();
        assert!(matches!(err, ExtractionError::NoJsonObject));
    }

    #[test]
    fn test_unbalanced_braces_is_error() {
        let err = extract_report(r#"{"final_score": 75, "report_markdown": "x""#).unwrap_err();
        assert!(matches!(err, ExtractionError::NoJsonObject));

        let err = extract_report(r#"{ {"final_score": 75, "report_markdown": "x"}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidJson(_)));
    }

    #[test]
    fn test_invalid_json_inside_braces_is_error() {
        let err = extract_report("{final_score: 75, report_markdown: 'x'}").unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidJson(_)));
    }

    #[test]
    fn test_missing_keys_are_errors() {
        let err = extract_report(r#"{"report_markdown": "x"}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::MissingKey("final_score")));

        let err = extract_report(r#"{"final_score": 70}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::MissingKey("report_markdown")));
    }

    #[test]
    fn test_float_score_is_truncated() {
        let report = extract_report(r#"{"final_score": 74.9, "report_markdown": "x"}"#).unwrap();
        assert_eq!(report.final_score, 74);
    }

    #[test]
    fn test_numeric_string_score_is_coerced() {
        let report = extract_report(r#"{"final_score": " 88 ", "report_markdown": "x"}"#).unwrap();
        assert_eq!(report.final_score, 88);

        let report = extract_report(r#"{"final_score": "90.0", "report_markdown": "x"}"#).unwrap();
        assert_eq!(report.final_score, 90);
    }

    #[test]
    fn test_non_numeric_score_is_error() {
        for score in [r#""seventy""#, "null", "true", "[75]", r#"{"value": 75}"#] {
            let text = format!(r#"{{"final_score": {score}, "report_markdown": "x"}}"#);
            let err = extract_report(&text).unwrap_err();
            assert!(
                matches!(err, ExtractionError::NonNumericScore(_)),
                "{score}: {err:?}"
            );
        }
    }

    #[test]
    fn test_report_must_be_a_string() {
        let err = extract_report(r#"{"final_score": 75, "report_markdown": ["a"]}"#).unwrap_err();
        assert!(matches!(err, ExtractionError::ReportNotString));
    }

    #[test]
    fn test_out_of_range_score_is_clamped() {
        let report = extract_report(r#"{"final_score": -15, "report_markdown": "x"}"#).unwrap();
        assert_eq!(report.final_score, 0);
    }
}
