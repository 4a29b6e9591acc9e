use crate::master_data::MasterData;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

pub const LOOKUP_TOOL_NAME: &str = "lookup_master_data";

/// Why a lookup produced no value. Returned to callers (and to the model) as data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("Master data key '{key}' not found. Available keys: {available:?}")]
    UnknownTable { key: String, available: Vec<String> },

    #[error("Column '{column}' not found in {table}. Available: {available:?}")]
    UnknownColumn {
        table: String,
        column: String,
        available: Vec<String>,
    },

    #[error("Value '{value}' not found in {table} column '{column}'")]
    NotFound {
        table: String,
        column: String,
        value: String,
    },

    #[error("Invalid lookup arguments: {0}")]
    InvalidArguments(String),
}

/// Arguments of a master data lookup, as the model sends them in a function call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupRequest {
    pub file_key: String,
    pub lookup_column: String,
    pub lookup_value: String,
    pub return_column: String,
}

impl MasterData {
    /// Returns `return_column` of the first row whose `lookup_column` contains
    /// `lookup_value`, ignoring case.
    pub fn lookup(
        &self,
        file_key: &str,
        lookup_column: &str,
        lookup_value: &str,
        return_column: &str,
    ) -> Result<String, LookupError> {
        let table = self.get(file_key).ok_or_else(|| LookupError::UnknownTable {
            key: file_key.to_string(),
            available: self.keys(),
        })?;

        let unknown_column = |column: &str| LookupError::UnknownColumn {
            table: file_key.to_string(),
            column: column.to_string(),
            available: table.columns().to_vec(),
        };

        let lookup_column = lookup_column.trim();
        let return_column = return_column.trim();
        let lookup_idx = table
            .column_index(lookup_column)
            .ok_or_else(|| unknown_column(lookup_column))?;
        let return_idx = table
            .column_index(return_column)
            .ok_or_else(|| unknown_column(return_column))?;

        let needle = lookup_value.to_lowercase();
        table
            .rows()
            .iter()
            .find(|row| row[lookup_idx].to_lowercase().contains(&needle))
            .map(|row| row[return_idx].clone())
            .ok_or_else(|| LookupError::NotFound {
                table: file_key.to_string(),
                column: lookup_column.to_string(),
                value: lookup_value.to_string(),
            })
    }

    pub fn lookup_request(&self, request: &LookupRequest) -> Result<String, LookupError> {
        self.lookup(
            &request.file_key,
            &request.lookup_column,
            &request.lookup_value,
            &request.return_column,
        )
    }

    /// Executes a `lookup_master_data` function call and renders the tool response.
    pub fn invoke_tool(&self, arguments: &Value) -> Value {
        let outcome = serde_json::from_value::<LookupRequest>(arguments.clone())
            .map_err(|e| LookupError::InvalidArguments(e.to_string()))
            .and_then(|request| self.lookup_request(&request));

        tool_response(outcome)
    }
}

pub fn tool_response(outcome: Result<String, LookupError>) -> Value {
    match outcome {
        Ok(result) => json!({ "result": result, "status": "success" }),
        Err(e) => json!({ "error": e.to_string(), "status": "error" }),
    }
}

/// Function declaration advertising the lookup to a tool-calling model.
pub fn lookup_function_declaration() -> Value {
    let string_param = |description: &str| json!({ "type": "string", "description": description });

    json!({
        "name": LOOKUP_TOOL_NAME,
        "description": "Look up a value in the master data tables. Finds the first row whose \
                        lookup column contains the lookup value (case-insensitive) and returns \
                        that row's value in the return column.",
        "parameters": {
            "type": "object",
            "properties": {
                "file_key": string_param("Name of the master data table"),
                "lookup_column": string_param("Column to search"),
                "lookup_value": string_param("Text to search for"),
                "return_column": string_param("Column whose value is returned"),
            },
            "required": ["file_key", "lookup_column", "lookup_value", "return_column"],
        },
    })
}
