use futures::future::BoxFuture;
use futures::FutureExt;
use procurement_extractor::samples::{
    placeholder_pdf, sample_master_workbook, workbook_bytes, SAMPLE_INVOICE_TEXT,
    SAMPLE_TICKET_TEXT,
};
use procurement_extractor::*;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

const FAITHFUL_COMPLETION: &str = r#"```json
{
    "Document Type": "ZNID",
    "PO Number": "PO-2024-0001",
    "Line Item Number": "10",
    "Vendor": "V1001",
    "Document Date": "15.03.2024",
    "Gross Price": "1000",
    "Tax Code": "I4",
    "GL Account": "651001",
    "Requestor": "AJohnson"
}
```"#;

#[derive(Debug, Clone)]
struct RecordedCall {
    invoice: Document,
    ticket: Document,
    prompt: String,
}

/// Returns a canned completion (or error) and records what it was asked.
struct StubModel {
    reply: std::result::Result<String, String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StubModel {
    fn replying(completion: &str) -> Self {
        Self {
            reply: Ok(completion.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ModelClient for StubModel {
    fn extract<'a>(
        &'a self,
        invoice: &'a Document,
        ticket: &'a Document,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String>> {
        self.calls.lock().unwrap().push(RecordedCall {
            invoice: invoice.clone(),
            ticket: ticket.clone(),
            prompt: prompt.to_string(),
        });
        let reply = self
            .reply
            .clone()
            .map_err(ProcurementError::ExtractionFailed);
        async move { reply }.boxed()
    }

    fn model_name(&self) -> &str {
        "stub-model"
    }
}

fn sample_request() -> anyhow::Result<ExtractionRequest> {
    let mut workbooks = BTreeMap::new();
    workbooks.insert("master_data.xlsx".to_string(), sample_master_workbook()?);

    Ok(ExtractionRequest::from_bytes(
        &placeholder_pdf(SAMPLE_INVOICE_TEXT),
        &placeholder_pdf(SAMPLE_TICKET_TEXT),
        &workbooks,
    ))
}

fn expect_success(result: ExtractionResult) -> ExtractionOutput {
    match result {
        ExtractionResult::Success(output) => output,
        ExtractionResult::Failure(failure) => panic!("extraction failed: {:?}", failure),
    }
}

fn expect_failure(result: ExtractionResult) -> ExtractionFailure {
    match result {
        ExtractionResult::Failure(failure) => failure,
        ExtractionResult::Success(output) => panic!("expected a failure, got {:?}", output),
    }
}

#[tokio::test]
async fn test_end_to_end_with_stub_model() -> anyhow::Result<()> {
    let processor = InvoiceProcessor::new(StubModel::replying(FAITHFUL_COMPLETION));
    let output = expect_success(processor.query(&sample_request()?).await);

    let record = match &output.json_data {
        ParsedCompletion::Single(record) => record,
        other => panic!("expected a single record, got {:?}", other),
    };
    assert_eq!(record["Vendor"], "V1001");
    assert_eq!(record["Tax Code"], "I4");

    assert_eq!(output.message, "Processing complete.");
    assert_eq!(output.raw_response, FAITHFUL_COMPLETION);
    assert_eq!(output.master_data_keys, vec!["master_data".to_string()]);

    let lines: Vec<&str> = output.csv_data.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Document Type,PO Number,Line Item Number,Vendor"));
    assert!(lines[1].contains("V1001"));

    let calls = processor.model().calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].invoice.bytes, placeholder_pdf(SAMPLE_INVOICE_TEXT));
    assert_eq!(calls[0].ticket.bytes, placeholder_pdf(SAMPLE_TICKET_TEXT));
    assert_eq!(calls[0].invoice.mime_type, "application/pdf");
    assert!(calls[0].prompt.contains("**master_data Master Data:**"));
    assert!(calls[0].prompt.contains("Cloud Corp"));
    assert!(calls[0].prompt.contains("V1001"));

    Ok(())
}

#[tokio::test]
async fn test_result_serializes_to_success_shape() -> anyhow::Result<()> {
    let processor = InvoiceProcessor::new(StubModel::replying(FAITHFUL_COMPLETION));
    let result = processor.query(&sample_request()?).await;

    let value = serde_json::to_value(&result)?;
    for key in ["message", "raw_response", "json_data", "csv_data", "master_data_keys"] {
        assert!(value.get(key).is_some(), "missing {}", key);
    }
    assert!(value.get("error").is_none());
    assert_eq!(value["json_data"]["Vendor"], "V1001");

    let round_trip: ExtractionResult = serde_json::from_value(value)?;
    assert!(round_trip.is_success());
    Ok(())
}

#[tokio::test]
async fn test_multiple_records_share_one_header() -> anyhow::Result<()> {
    let completion = r#"[
        {"PO Number": "PO-1", "Vendor": "V1001"},
        {"PO Number": "PO-2", "Vendor": "V1002", "WBS": "W-7"}
    ]"#;
    let processor = InvoiceProcessor::new(StubModel::replying(completion));
    let output = expect_success(processor.query(&sample_request()?).await);

    assert!(matches!(output.json_data, ParsedCompletion::Many(ref r) if r.len() == 2));
    let lines: Vec<&str> = output.csv_data.lines().collect();
    assert_eq!(
        lines,
        vec!["PO Number,Vendor,WBS", "PO-1,V1001,", "PO-2,V1002,W-7"]
    );
    Ok(())
}

#[tokio::test]
async fn test_unparseable_completion_keeps_raw_response() -> anyhow::Result<()> {
    let completion = "I could not find a purchase order in these documents.";
    let processor = InvoiceProcessor::new(StubModel::replying(completion));
    let failure = expect_failure(processor.query(&sample_request()?).await);

    assert!(failure.error.starts_with("Could not parse JSON from response"));
    assert_eq!(failure.raw_response.as_deref(), Some(completion));
    assert_eq!(
        failure.message.as_deref(),
        Some("Processing complete but JSON parsing failed.")
    );
    Ok(())
}

#[tokio::test]
async fn test_model_error_becomes_error_result() -> anyhow::Result<()> {
    let processor = InvoiceProcessor::new(StubModel::failing("quota exceeded"));
    let failure = expect_failure(processor.query(&sample_request()?).await);

    assert_eq!(failure.error, "Extraction failed: quota exceeded");
    assert!(failure.raw_response.is_none());
    assert_eq!(processor.model().calls().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_no_usable_master_data_skips_model_call() {
    let mut workbooks = BTreeMap::new();
    workbooks.insert("broken.xlsx".to_string(), b"not a workbook".to_vec());
    let request = ExtractionRequest::from_bytes(b"%PDF", b"%PDF", &workbooks);

    let processor = InvoiceProcessor::new(StubModel::replying(FAITHFUL_COMPLETION));
    let result = processor.query(&request).await;

    assert_eq!(result.error(), Some("No master data could be loaded."));
    assert!(processor.model().calls().is_empty());
}

#[tokio::test]
async fn test_corrupt_workbook_does_not_block_others() -> anyhow::Result<()> {
    let mut workbooks = BTreeMap::new();
    workbooks.insert("broken.xlsx".to_string(), b"not a workbook".to_vec());
    workbooks.insert("master_data.xlsx".to_string(), sample_master_workbook()?);
    let request = ExtractionRequest::from_bytes(b"%PDF", b"%PDF", &workbooks);

    let processor = InvoiceProcessor::new(StubModel::replying(FAITHFUL_COMPLETION));
    let output = expect_success(processor.query(&request).await);

    assert_eq!(output.master_data_keys, vec!["master_data".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_invalid_base64_is_reported() -> anyhow::Result<()> {
    let mut request = sample_request()?;
    request.invoice = "not base64 at all!".to_string();

    let processor = InvoiceProcessor::new(StubModel::replying(FAITHFUL_COMPLETION));
    let failure = expect_failure(processor.query(&request).await);

    assert!(failure.error.starts_with("Failed to decode invoice"));
    assert!(processor.model().calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_processor_serves_concurrent_requests() -> anyhow::Result<()> {
    let processor = Arc::new(InvoiceProcessor::new(StubModel::replying(
        FAITHFUL_COMPLETION,
    )));
    let request = sample_request()?;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let processor = Arc::clone(&processor);
            let request = request.clone();
            tokio::spawn(async move { processor.query(&request).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await?.is_success());
    }
    assert_eq!(processor.model().calls().len(), 4);
    Ok(())
}

#[test]
fn test_multi_sheet_master_data_lookup() -> anyhow::Result<()> {
    let bytes = workbook_bytes(&[
        (
            "Vendors",
            vec![
                vec!["Vendor Name ", " Vendor Code"],
                vec!["Cloud Corp", "V1001"],
                vec!["Consulting LLC", "V1002"],
            ],
        ),
        (
            "Accounts",
            vec![
                vec!["Service Description", "GL Account"],
                vec!["Cloud Computing Services", "651001"],
            ],
        ),
    ])?;
    let mut workbooks = BTreeMap::new();
    workbooks.insert("reference.xlsx".to_string(), bytes);

    let master_data = MasterData::load_required(&workbooks)?;
    assert_eq!(
        master_data.keys(),
        vec!["reference_Accounts".to_string(), "reference_Vendors".to_string()]
    );

    assert_eq!(
        master_data.lookup("reference_Vendors", "Vendor Name", "cloud", "Vendor Code"),
        Ok("V1001".to_string())
    );
    assert_eq!(
        master_data.lookup("reference_Accounts", "Service Description", "COMPUTING", "GL Account"),
        Ok("651001".to_string())
    );
    assert!(matches!(
        master_data.lookup("reference_Vendors", "Vendor Name", "Acme", "Vendor Code"),
        Err(LookupError::NotFound { .. })
    ));

    let tool_reply = master_data.invoke_tool(&serde_json::json!({
        "file_key": "reference_Vendors",
        "lookup_column": "Vendor Name",
        "lookup_value": "consulting",
        "return_column": "Vendor Code",
    }));
    assert_eq!(tool_reply["result"], Value::from("V1002"));
    Ok(())
}

#[test]
fn test_prompt_from_loaded_workbook() -> anyhow::Result<()> {
    let mut workbooks = BTreeMap::new();
    workbooks.insert("master_data.xlsx".to_string(), sample_master_workbook()?);
    let master_data = MasterData::load_required(&workbooks)?;

    let prompt = build_prompt(&master_data);
    assert!(prompt.contains("Use VENDOR CODE, not vendor name."));
    assert!(prompt.contains("Consulting LLC"));
    for field in OUTPUT_FIELDS {
        assert!(prompt.contains(&format!("\"{}\": \"{}\"", field.name, field.default)));
    }
    Ok(())
}
