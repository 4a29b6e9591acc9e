use crate::error::Result;
use futures::future::BoxFuture;
use std::sync::Arc;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A binary document attached to a model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub display_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Document {
    pub fn pdf(display_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            display_name: display_name.into(),
            mime_type: PDF_MIME_TYPE.to_string(),
            bytes,
        }
    }
}

/// A generative model that reads an invoice and an approval ticket and answers a prompt.
///
/// Implementations make exactly one attempt; errors are reported, not retried.
pub trait ModelClient: Send + Sync {
    fn extract<'a>(
        &'a self,
        invoice: &'a Document,
        ticket: &'a Document,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String>>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

impl<M: ModelClient + ?Sized> ModelClient for Arc<M> {
    fn extract<'a>(
        &'a self,
        invoice: &'a Document,
        ticket: &'a Document,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String>> {
        (**self).extract(invoice, ticket, prompt)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

impl<M: ModelClient + ?Sized> ModelClient for Box<M> {
    fn extract<'a>(
        &'a self,
        invoice: &'a Document,
        ticket: &'a Document,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String>> {
        (**self).extract(invoice, ticket, prompt)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
