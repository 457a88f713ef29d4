//! Payment gateway client.
//!
//! The gateway itself is an external collaborator; this module defines the
//! trait the order service charges and refunds through, plus an HTTP client
//! implementation. Tests mock the trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{OrderError, OrderResult};

/// External payment processor seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge the given amount for an order, returning the gateway's
    /// reference for the charge.
    async fn charge(&self, order_id: Uuid, amount_cents: i64) -> OrderResult<String>;

    /// Refund a previous charge in full.
    async fn refund(&self, gateway_ref: &str, amount_cents: i64) -> OrderResult<()>;
}

#[derive(Debug, Serialize)]
struct ChargeRequest {
    order_id: Uuid,
    amount_cents: i64,
}

#[derive(Debug, Deserialize)]
struct ChargeResponse {
    reference: String,
}

#[derive(Debug, Serialize)]
struct RefundRequest<'a> {
    reference: &'a str,
    amount_cents: i64,
}

/// HTTP implementation of [`PaymentGateway`].
#[derive(Clone)]
pub struct HttpPaymentGateway {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpPaymentGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn charge(&self, order_id: Uuid, amount_cents: i64) -> OrderResult<String> {
        let response = self
            .http_client
            .post(format!("{}/charges", self.base_url))
            .json(&ChargeRequest {
                order_id,
                amount_cents,
            })
            .send()
            .await
            .map_err(|e| OrderError::Gateway(format!("charge request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(OrderError::Gateway(format!(
                "charge rejected with status {}",
                response.status()
            )));
        }

        let body: ChargeResponse = response
            .json()
            .await
            .map_err(|e| OrderError::Gateway(format!("malformed charge response: {e}")))?;
        tracing::info!(order_id = %order_id, reference = %body.reference, "Charged order");
        Ok(body.reference)
    }

    async fn refund(&self, gateway_ref: &str, amount_cents: i64) -> OrderResult<()> {
        let response = self
            .http_client
            .post(format!("{}/refunds", self.base_url))
            .json(&RefundRequest {
                reference: gateway_ref,
                amount_cents,
            })
            .send()
            .await
            .map_err(|e| OrderError::Gateway(format!("refund request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(OrderError::Gateway(format!(
                "refund rejected with status {}",
                response.status()
            )));
        }
        tracing::info!(reference = %gateway_ref, "Refunded charge");
        Ok(())
    }
}
