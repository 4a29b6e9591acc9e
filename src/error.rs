use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcurementError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to load master data from {file}: {details}")]
    MasterDataLoad { file: String, details: String },

    #[error("No master data could be loaded.")]
    NoMasterData,

    #[error("Failed to decode {input}: {source}")]
    Decode {
        input: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Could not parse JSON from response: {details}")]
    Parse {
        details: String,
        raw_response: String,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "gemini")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ProcurementError {
    /// The unparsed model completion, when the failure happened after the model replied.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ProcurementError::Parse { raw_response, .. } => Some(raw_response.as_str()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProcurementError>;
