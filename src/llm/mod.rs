pub mod client;
pub mod types;
pub mod vertex;

pub use client::*;
pub use types::*;
pub use vertex::*;

use crate::config::{AuthConfig, ProcessorConfig};
use crate::model::ModelClient;

/// The model adapter matching the configured authentication mode.
pub fn model_client(config: &ProcessorConfig) -> Box<dyn ModelClient> {
    match &config.auth {
        AuthConfig::ApiKey { api_key } => Box::new(GeminiClient::new(api_key, &config.model)),
        AuthConfig::VertexAi {
            project,
            location,
            access_token,
        } => {
            let token_source = access_token
                .clone()
                .map(TokenSource::Static)
                .unwrap_or(TokenSource::Metadata);
            Box::new(VertexClient::new(
                project,
                location,
                &config.model,
                token_source,
            ))
        }
    }
}
