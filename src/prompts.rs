//! Instruction template for the single-shot invoice + ticket extraction call.

use crate::master_data::{MasterData, PREVIEW_ROWS};
use crate::schema::schema_as_json;

pub const ROLE_AND_GOAL: &str = r#"**ROLE & GOAL:**
You are an AI agent specializing in procurement data processing. Your task is to extract information from the provided documents (a Tax Invoice and a Jira Ticket), and then output the final, complete data in JSON format."#;

pub const CRITICAL_REQUIREMENTS: &str = r#"**CRITICAL REQUIREMENTS:**
1. **Use VENDOR CODE, not vendor name.**
2. **Format dates as DD.MM.YYYY.**
3. **Use 18% GST Tax Code** (Expect 'I4').
4. **Generate a purchase order number.**"#;

pub const INSTRUCTIONS: &str = r#"**INSTRUCTIONS:**
1. **Extract Data:** Carefully read all provided documents.
2. **Use Master Data:** Cross-reference the master data above to find GL Accounts, Tax Codes, Requestor IDs, etc.
3. **Construct Final Data:** Assemble all data into the specified JSON schema."#;

pub const JSON_ONLY_DIRECTIVE: &str = "Please provide ONLY the JSON output, no additional text.";

/// Renders every table as a `**{key} Master Data:**` heading followed by its preview.
pub fn master_data_context(master_data: &MasterData) -> String {
    let mut context = String::new();
    for table in master_data.tables() {
        context.push_str(&format!("\n\n**{} Master Data:**\n", table.name()));
        context.push_str(&table.preview(PREVIEW_ROWS));
    }
    context
}

/// Builds the full extraction prompt. The output depends only on `master_data`.
pub fn build_prompt(master_data: &MasterData) -> String {
    // Serializing a Map of strings cannot fail.
    let schema = schema_as_json().unwrap_or_default();

    format!(
        "{role}\n\n\
         **AVAILABLE DOCUMENTS:**\n\
         - Tax Invoice PDF and Jira Ticket PDF are attached (the invoice first, then the ticket)\n\
         - Master Data: {context}\n\n\
         {requirements}\n\n\
         {instructions}\n\n\
         **OUTPUT JSON SCHEMA:**\n\
         {schema}\n\n\
         {directive}\n",
        role = ROLE_AND_GOAL,
        context = master_data_context(master_data),
        requirements = CRITICAL_REQUIREMENTS,
        instructions = INSTRUCTIONS,
        schema = schema,
        directive = JSON_ONLY_DIRECTIVE,
    )
}
