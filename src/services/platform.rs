use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Invoice;

/// Errors from the external invoicing platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("platform access token is not configured")]
    Unconfigured,
    #[error("platform request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("platform returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("unexpected platform response: {0}")]
    Decode(String),
}

/// The invoicing platform as this engine consumes it. Implemented over
/// HTTP in production and by in-memory fakes in tests.
#[async_trait]
pub trait InvoicingPlatform: Send + Sync {
    async fn list_invoices(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Invoice>, PlatformError>;

    async fn get_invoice_detail(&self, id: &str) -> Result<Invoice, PlatformError>;

    /// Create a new invoice from a template invoice, with explicit billing
    /// and due dates. Returns the new invoice's id.
    async fn create_from_template(
        &self,
        template_id: &str,
        billing_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Result<String, PlatformError>;

    /// Replace the tag list of an invoice.
    async fn update_invoice_tags(
        &self,
        id: &str,
        tag_names: &[String],
    ) -> Result<(), PlatformError>;
}

#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub base_url: String,
    pub access_token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        PlatformConfig {
            base_url: "https://api.billing-platform.example".to_string(),
            access_token: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Deserialize)]
struct ListInvoicesResponse {
    invoices: Vec<Invoice>,
}

#[derive(Deserialize)]
struct InvoiceDetailResponse {
    invoice: Invoice,
}

#[derive(Serialize)]
struct CreateFromTemplateRequest {
    template_invoice_id: String,
    billing_date: String,
    due_date: String,
}

#[derive(Deserialize)]
struct CreateFromTemplateResponse {
    id: String,
}

#[derive(Serialize)]
struct UpdateTagsRequest {
    tag_names: Vec<String>,
}

/// HTTP client for the invoicing platform. Every request carries the
/// bearer token and a bounded timeout so a single call cannot hang a run.
pub struct BillingApiClient {
    client: reqwest::Client,
    config: PlatformConfig,
}

impl BillingApiClient {
    pub fn new(config: PlatformConfig) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(BillingApiClient { client, config })
    }

    fn token(&self) -> Result<&str, PlatformError> {
        match self.config.access_token.as_deref() {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(PlatformError::Unconfigured),
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(PlatformError::Api { status, body })
    }
}

#[async_trait]
impl InvoicingPlatform for BillingApiClient {
    async fn list_invoices(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Invoice>, PlatformError> {
        let token = self.token()?;
        let response = self
            .client
            .get(format!("{}/invoices", self.config.base_url))
            .bearer_auth(token)
            .query(&[
                ("from", from.format("%Y-%m-%d").to_string()),
                ("to", to.format("%Y-%m-%d").to_string()),
            ])
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let body: ListInvoicesResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))?;
        Ok(body.invoices)
    }

    async fn get_invoice_detail(&self, id: &str) -> Result<Invoice, PlatformError> {
        let token = self.token()?;
        let response = self
            .client
            .get(format!("{}/invoices/{}", self.config.base_url, id))
            .bearer_auth(token)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let body: InvoiceDetailResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))?;
        Ok(body.invoice)
    }

    async fn create_from_template(
        &self,
        template_id: &str,
        billing_date: NaiveDate,
        due_date: NaiveDate,
    ) -> Result<String, PlatformError> {
        let token = self.token()?;
        let request = CreateFromTemplateRequest {
            template_invoice_id: template_id.to_string(),
            billing_date: billing_date.format("%Y-%m-%d").to_string(),
            due_date: due_date.format("%Y-%m-%d").to_string(),
        };

        let response = self
            .client
            .post(format!(
                "{}/invoices/create_from_template",
                self.config.base_url
            ))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let body: CreateFromTemplateResponse = response
            .json()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))?;
        Ok(body.id)
    }

    async fn update_invoice_tags(
        &self,
        id: &str,
        tag_names: &[String],
    ) -> Result<(), PlatformError> {
        let token = self.token()?;
        let request = UpdateTagsRequest {
            tag_names: tag_names.to_vec(),
        };

        let response = self
            .client
            .put(format!("{}/invoices/{}/tags", self.config.base_url, id))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await?;

        Self::check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_token_is_a_distinguishable_error() {
        let client = BillingApiClient::new(PlatformConfig::default()).unwrap();
        let err = client.get_invoice_detail("inv-1").await.unwrap_err();
        assert!(matches!(err, PlatformError::Unconfigured));
    }

    #[tokio::test]
    async fn blank_token_counts_as_unconfigured() {
        let config = PlatformConfig {
            access_token: Some("   ".to_string()),
            ..PlatformConfig::default()
        };
        let client = BillingApiClient::new(config).unwrap();
        let err = client
            .list_invoices(
                NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PlatformError::Unconfigured));
    }
}
