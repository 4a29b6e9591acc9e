use crate::error::{ProcurementError, Result};
use crate::llm::client::send_generate_content;
use crate::llm::types::GenerateContentRequest;
use crate::model::{Document, ModelClient};
use futures::future::BoxFuture;
use futures::FutureExt;
use log::debug;
use reqwest::Client;
use serde::Deserialize;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

/// Where the bearer token for Vertex AI comes from.
#[derive(Clone)]
pub enum TokenSource {
    Static(String),
    /// The service account of the hosting environment, via the metadata server.
    Metadata,
}

/// Vertex AI client using the credentials of the environment it runs in.
#[derive(Clone)]
pub struct VertexClient {
    client: Client,
    project: String,
    location: String,
    model: String,
    token_source: TokenSource,
}

impl VertexClient {
    pub fn new(
        project: impl Into<String>,
        location: impl Into<String>,
        model: impl Into<String>,
        token_source: TokenSource,
    ) -> Self {
        Self {
            client: Client::new(),
            project: project.into(),
            location: location.into(),
            model: model.into(),
            token_source,
        }
    }

    pub fn endpoint(&self) -> String {
        format!(
            "https://{loc}-aiplatform.googleapis.com/v1/projects/{project}/locations/{loc}/publishers/google/models/{model}:generateContent",
            loc = self.location,
            project = self.project,
            model = self.model,
        )
    }

    async fn access_token(&self) -> Result<String> {
        match &self.token_source {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::Metadata => {
                let res = self
                    .client
                    .get(METADATA_TOKEN_URL)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .await?;

                let status = res.status();
                if !status.is_success() {
                    let err_text = res.text().await?;
                    return Err(ProcurementError::ExtractionFailed(format!(
                        "Metadata server token request failed (status {}): {}",
                        status, err_text
                    )));
                }

                let token: MetadataToken = res.json().await?;
                Ok(token.access_token)
            }
        }
    }

    pub async fn generate_content(&self, payload: &GenerateContentRequest) -> Result<String> {
        let token = self.access_token().await?;
        let request = self.client.post(self.endpoint()).bearer_auth(token);
        send_generate_content(request, payload).await
    }
}

impl ModelClient for VertexClient {
    fn extract<'a>(
        &'a self,
        invoice: &'a Document,
        ticket: &'a Document,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String>> {
        async move {
            let payload = GenerateContentRequest::extraction(invoice, ticket, prompt);
            debug!(
                "Calling Vertex AI model {} in {}/{}",
                self.model, self.project, self.location
            );
            self.generate_content(&payload).await
        }
        .boxed()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
