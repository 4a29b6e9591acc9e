//! Invoice + ticket extraction pipeline.
//!
//! decode inputs → load master data → build prompt → one model call → parse and render CSV.
//! Every failure after configuration is reported as an [`ExtractionResult::Failure`].

#[cfg(feature = "gemini")]
use crate::config::ProcessorConfig;
use crate::error::{ProcurementError, Result};
use crate::master_data::MasterData;
use crate::model::{Document, ModelClient};
use crate::parser::{parse_completion, ParsedCompletion};
use crate::prompts::build_prompt;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const INVOICE_DOCUMENT_NAME: &str = "invoice.pdf";
pub const TICKET_DOCUMENT_NAME: &str = "jira.pdf";

/// The single entry point's input: both documents and every workbook, base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    #[serde(alias = "invoice_b64")]
    pub invoice: String,
    #[serde(alias = "jira_b64")]
    pub ticket: String,
    #[serde(alias = "master_data_b64", alias = "master_data")]
    pub master_data: BTreeMap<String, String>,
}

impl ExtractionRequest {
    pub fn from_bytes(invoice: &[u8], ticket: &[u8], workbooks: &BTreeMap<String, Vec<u8>>) -> Self {
        Self {
            invoice: STANDARD.encode(invoice),
            ticket: STANDARD.encode(ticket),
            master_data: workbooks
                .iter()
                .map(|(name, bytes)| (name.clone(), STANDARD.encode(bytes)))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub message: String,
    pub raw_response: String,
    pub json_data: ParsedCompletion,
    pub csv_data: String,
    pub master_data_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionFailure {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl From<ProcurementError> for ExtractionFailure {
    fn from(err: ProcurementError) -> Self {
        let raw_response = err.raw_response().map(str::to_string);
        let message = raw_response
            .as_ref()
            .map(|_| "Processing complete but JSON parsing failed.".to_string());

        Self {
            error: err.to_string(),
            message,
            raw_response,
        }
    }
}

/// Exactly one of the two shapes is produced per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractionResult {
    Success(ExtractionOutput),
    Failure(ExtractionFailure),
}

impl ExtractionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionResult::Success(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ExtractionResult::Failure(f) => Some(f.error.as_str()),
            ExtractionResult::Success(_) => None,
        }
    }
}

impl From<Result<ExtractionOutput>> for ExtractionResult {
    fn from(result: Result<ExtractionOutput>) -> Self {
        match result {
            Ok(output) => ExtractionResult::Success(output),
            Err(e) => ExtractionResult::Failure(e.into()),
        }
    }
}

/// Decodes standard base64, ignoring embedded whitespace and line breaks.
pub fn decode_base64(input: &str, payload: &str) -> Result<Vec<u8>> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(compact)
        .map_err(|source| ProcurementError::Decode {
            input: input.to_string(),
            source,
        })
}

/// Runs extractions against one model. Holds no per-request state, so a single
/// instance can serve concurrent requests.
pub struct InvoiceProcessor<M> {
    model: M,
}

impl<M: ModelClient> InvoiceProcessor<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Processes a base64 request; failures come back as the error shape.
    pub async fn query(&self, request: &ExtractionRequest) -> ExtractionResult {
        let result = self.query_inner(request).await;
        if let Err(e) = &result {
            error!("Error during processing: {}", e);
        }
        result.into()
    }

    async fn query_inner(&self, request: &ExtractionRequest) -> Result<ExtractionOutput> {
        let invoice = decode_base64("invoice", &request.invoice)?;
        let ticket = decode_base64("ticket", &request.ticket)?;
        let workbooks = request
            .master_data
            .iter()
            .map(|(name, data)| Ok((name.clone(), decode_base64(name, data)?)))
            .collect::<Result<BTreeMap<_, _>>>()?;

        self.process_documents(invoice, ticket, &workbooks).await
    }

    /// Processes already-decoded inputs.
    pub async fn process_documents(
        &self,
        invoice: Vec<u8>,
        ticket: Vec<u8>,
        workbooks: &BTreeMap<String, Vec<u8>>,
    ) -> Result<ExtractionOutput> {
        let master_data = MasterData::load_required(workbooks)?;

        let prompt = build_prompt(&master_data);
        debug!("Built extraction prompt ({} chars)", prompt.len());

        let invoice = Document::pdf(INVOICE_DOCUMENT_NAME, invoice);
        let ticket = Document::pdf(TICKET_DOCUMENT_NAME, ticket);

        info!(
            "Requesting extraction from {} ({} + {} bytes of documents)",
            self.model.model_name(),
            invoice.bytes.len(),
            ticket.bytes.len()
        );
        let raw_response = self.model.extract(&invoice, &ticket, &prompt).await?;

        let json_data = parse_completion(&raw_response)?;
        let csv_data = json_data.to_csv()?;
        info!(
            "Extraction complete: {} record(s)",
            json_data.records().len()
        );

        Ok(ExtractionOutput {
            message: "Processing complete.".to_string(),
            raw_response,
            json_data,
            csv_data,
            master_data_keys: master_data.keys(),
        })
    }
}

#[cfg(feature = "gemini")]
impl InvoiceProcessor<Box<dyn ModelClient>> {
    /// A processor talking to the service selected by `config.auth`.
    pub fn from_config(config: &ProcessorConfig) -> Self {
        Self::new(crate::llm::model_client(config))
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::from_config(&ProcessorConfig::from_env()?))
    }
}
