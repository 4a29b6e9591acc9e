use crate::error::{ProcurementError, Result};
use std::fmt;

pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";
pub const DEFAULT_LOCATION: &str = "us-central1";

pub const ENV_MODEL: &str = "GEMINI_MODEL";
pub const ENV_USE_VERTEX: &str = "GOOGLE_GENAI_USE_VERTEXAI";
pub const ENV_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_PROJECT: &str = "GOOGLE_CLOUD_PROJECT";
pub const ENV_LOCATION: &str = "GOOGLE_CLOUD_LOCATION";
pub const ENV_ACCESS_TOKEN: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// How the processor authenticates against the model service.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthConfig {
    /// Gemini API with an API key.
    ApiKey { api_key: String },
    /// Vertex AI with ambient credentials. Without an explicit token, one is requested
    /// from the metadata server of the hosting environment.
    VertexAi {
        project: String,
        location: String,
        access_token: Option<String>,
    },
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthConfig::ApiKey { .. } => f
                .debug_struct("ApiKey")
                .field("api_key", &"<redacted>")
                .finish(),
            AuthConfig::VertexAi {
                project,
                location,
                access_token,
            } => f
                .debug_struct("VertexAi")
                .field("project", project)
                .field("location", location)
                .field("access_token", &access_token.as_ref().map(|_| "<redacted>"))
                .finish(),
        }
    }
}

/// Process-wide settings, fixed when the processor is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    pub model: String,
    pub auth: AuthConfig,
}

impl ProcessorConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            auth: AuthConfig::ApiKey {
                api_key: api_key.into(),
            },
        }
    }

    pub fn vertex_ai(project: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            auth: AuthConfig::VertexAi {
                project: project.into(),
                location: location.into(),
                access_token: None,
            },
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str, mode: &str| {
            get(key).ok_or_else(|| {
                ProcurementError::Configuration(format!(
                    "{} environment variable not set ({} mode).",
                    key, mode
                ))
            })
        };

        let model = get(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let use_vertex = get(ENV_USE_VERTEX)
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let auth = if use_vertex {
            AuthConfig::VertexAi {
                project: require(ENV_PROJECT, "Vertex AI")?,
                location: get(ENV_LOCATION).unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
                access_token: get(ENV_ACCESS_TOKEN),
            }
        } else {
            AuthConfig::ApiKey {
                api_key: require(ENV_API_KEY, "API key")?,
            }
        };

        Ok(Self { model, auth })
    }
}
