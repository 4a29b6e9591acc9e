use crate::error::{ProcurementError, Result};
use crate::llm::types::*;
use crate::model::{Document, ModelClient};
use futures::future::BoxFuture;
use futures::FutureExt;
use log::debug;
use reqwest::{Client, RequestBuilder};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Sends a `generateContent` request and pulls the completion text out of the reply.
pub(crate) async fn send_generate_content(
    request: RequestBuilder,
    payload: &GenerateContentRequest,
) -> Result<String> {
    let res = request.json(payload).send().await?;
    let status = res.status();

    if !status.is_success() {
        let err_text = res.text().await?;
        return Err(ProcurementError::ExtractionFailed(format!(
            "Gemini API Error (status {}): {}",
            status, err_text
        )));
    }

    let body: GenerateContentResponse = res.json().await?;
    body.into_text()
}

/// Gemini API client authenticated with an API key.
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            model: model.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    pub async fn generate_content(&self, payload: &GenerateContentRequest) -> Result<String> {
        let request = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())]);
        send_generate_content(request, payload).await
    }
}

impl ModelClient for GeminiClient {
    fn extract<'a>(
        &'a self,
        invoice: &'a Document,
        ticket: &'a Document,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String>> {
        async move {
            let payload = GenerateContentRequest::extraction(invoice, ticket, prompt);
            debug!("Calling Gemini API model {}", self.model);
            self.generate_content(&payload).await
        }
        .boxed()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
