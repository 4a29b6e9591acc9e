use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One extracted purchase-order line, keyed by output field name.
///
/// `serde_json` is built with `preserve_order`, so iteration follows insertion order.
pub type ExtractionRecord = Map<String, Value>;

/// A field of the purchase-order upload sheet and the value the model should start from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputField {
    pub name: &'static str,
    pub default: &'static str,
}

const fn field(name: &'static str, default: &'static str) -> OutputField {
    OutputField { name, default }
}

/// Every field the model is asked to fill, in upload-sheet column order.
pub const OUTPUT_FIELDS: &[OutputField] = &[
    field("Document Type", "ZNID"),
    field("PO Number", ""),
    field("Line Item Number", "10"),
    field("Vendor", ""),
    field("Document Date", ""),
    field("Payment Terms", "P000"),
    field("Purchasing Organisation", "1001"),
    field("Purchase Group", "S05"),
    field("Invoice", ""),
    field("SAP Database", ""),
    field("Jira", ""),
    field("Agreement", ""),
    field("Company Code", "1001"),
    field("Validity Start Date", ""),
    field("Validity End Date", ""),
    field("WO Header Text", ""),
    field("Account Assignment", ""),
    field("Item Category", ""),
    field("Short Text", ""),
    field("Delivery Date", ""),
    field("Plant", "DS01"),
    field("Requisitioner", ""),
    field("Service Number", ""),
    field("Service Quantity", ""),
    field("Gross Price", ""),
    field("Cost Center", ""),
    field("WBS", ""),
    field("Tax Code", "I4"),
    field("Material Group", ""),
    field("no of days", ""),
    field("Requestor", ""),
    field("Control Code", ""),
    field("GL Account", ""),
    field("UOM", ""),
    field("Order Number", ""),
    field("Text 1", ""),
];

pub fn is_output_field(name: &str) -> bool {
    OUTPUT_FIELDS.iter().any(|f| f.name == name)
}

/// The record the model is shown as its target: every field with its default value.
pub fn template_record() -> ExtractionRecord {
    OUTPUT_FIELDS
        .iter()
        .map(|f| (f.name.to_string(), Value::String(f.default.to_string())))
        .collect()
}

pub fn schema_as_json() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&template_record())
}

/// How far a parsed record strays from [`OUTPUT_FIELDS`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conformance {
    pub missing: Vec<String>,
    pub unexpected: Vec<String>,
}

impl Conformance {
    pub fn is_conformant(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

pub fn check_conformance(record: &ExtractionRecord) -> Conformance {
    let missing = OUTPUT_FIELDS
        .iter()
        .filter(|f| !record.contains_key(f.name))
        .map(|f| f.name.to_string())
        .collect();

    let unexpected = record
        .keys()
        .filter(|k| !is_output_field(k))
        .cloned()
        .collect();

    Conformance {
        missing,
        unexpected,
    }
}
