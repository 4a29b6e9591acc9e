use crate::error::{ProcurementError, Result};
use crate::schema::{check_conformance, ExtractionRecord};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the model returned: one record, or a list of records for multi-line orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParsedCompletion {
    Single(ExtractionRecord),
    Many(Vec<ExtractionRecord>),
}

impl ParsedCompletion {
    pub fn records(&self) -> Vec<&ExtractionRecord> {
        match self {
            ParsedCompletion::Single(record) => vec![record],
            ParsedCompletion::Many(records) => records.iter().collect(),
        }
    }

    pub fn to_csv(&self) -> Result<String> {
        records_to_csv(&self.records())
    }
}

/// Removes a leading ```` ```json ```` (or bare ```` ``` ````) fence and a trailing
/// ```` ``` ```` fence. Text without a leading fence is only trimmed.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();

    let body = if starts_with_ignore_case(trimmed, "```json") {
        &trimmed[7..]
    } else if let Some(rest) = trimmed.strip_prefix("```") {
        rest
    } else {
        return trimmed;
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

fn starts_with_ignore_case(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Parses a model completion into records. Failures keep the raw completion.
pub fn parse_completion(completion: &str) -> Result<ParsedCompletion> {
    let parse_err = |details: String| ProcurementError::Parse {
        details,
        raw_response: completion.to_string(),
    };

    let value: Value =
        serde_json::from_str(strip_code_fence(completion)).map_err(|e| parse_err(e.to_string()))?;

    let parsed = match value {
        Value::Object(record) => ParsedCompletion::Single(record),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match item {
                Value::Object(record) => Ok(record),
                other => Err(parse_err(format!(
                    "element {} is {}, expected a JSON object",
                    idx,
                    json_kind(&other)
                ))),
            })
            .collect::<Result<Vec<_>>>()
            .map(ParsedCompletion::Many)?,
        other => {
            return Err(parse_err(format!(
                "expected a JSON object or an array of objects, got {}",
                json_kind(&other)
            )))
        }
    };

    report_conformance(&parsed);
    Ok(parsed)
}

fn report_conformance(parsed: &ParsedCompletion) {
    for (idx, record) in parsed.records().into_iter().enumerate() {
        let report = check_conformance(record);
        if !report.missing.is_empty() {
            warn!("Record {} is missing schema fields: {:?}", idx, report.missing);
        }
        if !report.unexpected.is_empty() {
            warn!(
                "Record {} has fields outside the schema: {:?}",
                idx, report.unexpected
            );
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Renders records as CSV. The header is the union of all field names in first-seen
/// order; fields a record lacks become empty cells.
pub fn records_to_csv(records: &[&ExtractionRecord]) -> Result<String> {
    let mut header: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !header.contains(&key.as_str()) {
                header.push(key);
            }
        }
    }

    // An empty list (or only empty objects) renders as a blank header line.
    if header.is_empty() {
        return Ok("\n".to_string());
    }

    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(&header)?;
    for record in records {
        writer.write_record(
            header
                .iter()
                .map(|key| record.get(*key).map(cell_text).unwrap_or_default()),
        )?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ProcurementError::IoError(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| ProcurementError::IoError(std::io::Error::other(e.to_string())))
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_and_plain_parse_alike() {
        let plain = r#"{"Vendor": "V1001", "Tax Code": "I4"}"#;
        let fenced = format!("```json\n{}\n```", plain);

        assert_eq!(parse_completion(plain).unwrap(), parse_completion(&fenced).unwrap());
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("  {\"a\": 1}  "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```JSON\n{\"a\": 1}"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n[1]\n```\n"), "[1]");
    }

    #[test]
    fn test_single_record_csv() {
        let parsed = parse_completion(r#"{"PO Number": "PO-1", "Vendor": "V1001"}"#).unwrap();
        assert!(matches!(parsed, ParsedCompletion::Single(_)));

        let csv = parsed.to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec!["PO Number,Vendor", "PO-1,V1001"]);
    }

    #[test]
    fn test_multi_record_csv_header_is_first_seen_union() {
        let parsed = parse_completion(
            r#"[{"Vendor": "V1001", "Plant": "DS01"}, {"Vendor": "V1002", "GL Account": "651001"}]"#,
        )
        .unwrap();

        let csv = parsed.to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec!["Vendor,Plant,GL Account", "V1001,DS01,", "V1002,,651001"]
        );
    }

    #[test]
    fn test_csv_cells_quote_and_render_values() {
        let record = json!({
            "Short Text": "Cloud, compute",
            "Gross Price": 1000,
            "WBS": null,
        });
        let record = record.as_object().unwrap();

        let csv = records_to_csv(&[record]).unwrap();
        assert_eq!(csv, "Short Text,Gross Price,WBS\n\"Cloud, compute\",1000,\n");
    }

    #[test]
    fn test_empty_list_renders_blank_csv() {
        let parsed = parse_completion("[]").unwrap();
        assert_eq!(parsed, ParsedCompletion::Many(Vec::new()));
        assert!(parsed.records().is_empty());
        assert_eq!(parsed.to_csv().unwrap(), "\n");
    }

    #[test]
    fn test_invalid_json_keeps_raw_response() {
        let raw = "Sure! Here is the data: {not json}";
        let err = parse_completion(raw).unwrap_err();

        assert!(matches!(err, ProcurementError::Parse { .. }));
        assert_eq!(err.raw_response(), Some(raw));
    }

    #[test]
    fn test_scalar_json_is_rejected() {
        let err = parse_completion("42").unwrap_err();
        assert!(err.to_string().contains("got a number"));
    }

    #[test]
    fn test_array_of_scalars_is_rejected() {
        let err = parse_completion(r#"[{"Vendor": "V1"}, "oops"]"#).unwrap_err();
        assert!(err.to_string().contains("element 1 is a string"));
    }
}
