//! # Procurement Extractor
//!
//! Turns a tax invoice and its approval ticket into purchase-order upload rows, using a
//! Gemini model for the reading and spreadsheet master data for the cross-referencing.
//!
//! ## Core Concepts
//!
//! - **Master data**: reference workbooks (vendors, GL accounts, tax codes) loaded into
//!   named [`MasterTable`]s and previewed to the model
//! - **Lookup**: case-insensitive substring search over a master table, usable directly or
//!   as the `lookup_master_data` tool
//! - **Prompt**: a fixed instruction block with business rules and the output schema
//! - **Model client**: anything implementing [`ModelClient`]; the `gemini` feature ships a
//!   Gemini API adapter and a Vertex AI adapter
//! - **Result**: the parsed JSON record(s), the same data as CSV, and the raw completion,
//!   or an error object
//!
//! ## Example
//!
//! ```rust,ignore
//! use procurement_extractor::*;
//!
//! let processor = InvoiceProcessor::from_config(&ProcessorConfig::from_env()?);
//! let request = ExtractionRequest::from_bytes(&invoice_pdf, &ticket_pdf, &workbooks);
//!
//! match processor.query(&request).await {
//!     ExtractionResult::Success(output) => println!("{}", output.csv_data),
//!     ExtractionResult::Failure(failure) => eprintln!("{}", failure.error),
//! }
//! ```

pub mod config;
pub mod error;
pub mod lookup;
pub mod master_data;
pub mod model;
pub mod parser;
pub mod processor;
pub mod prompts;
pub mod samples;
pub mod schema;

#[cfg(feature = "gemini")]
pub mod llm;

pub use config::{AuthConfig, ProcessorConfig};
pub use error::{ProcurementError, Result};
pub use lookup::{lookup_function_declaration, LookupError, LookupRequest};
pub use master_data::{load_workbook, MasterData, MasterTable};
pub use model::{Document, ModelClient};
pub use parser::{parse_completion, records_to_csv, strip_code_fence, ParsedCompletion};
pub use processor::{
    ExtractionFailure, ExtractionOutput, ExtractionRequest, ExtractionResult, InvoiceProcessor,
};
pub use prompts::build_prompt;
pub use schema::{ExtractionRecord, OUTPUT_FIELDS};
