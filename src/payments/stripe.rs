use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::{CheckoutSession, CheckoutSessionRequest, GatewayError, PaymentGateway, SessionStatus};
use crate::config::PaymentConfig;
use crate::money::to_minor_units;

/// Stripe Checkout over the REST API.
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    config: PaymentConfig,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
    customer: Option<String>,
    status: Option<String>,
    payment_status: Option<String>,
}

impl SessionResponse {
    fn settlement(&self) -> SessionStatus {
        match (self.payment_status.as_deref(), self.status.as_deref()) {
            (Some("paid"), _) | (Some("no_payment_required"), _) => SessionStatus::Paid,
            (_, Some("expired")) => SessionStatus::Expired,
            _ => SessionStatus::Open,
        }
    }
}

impl StripeGateway {
    pub fn new(
        secret_key: String,
        config: PaymentConfig,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            secret_key,
            config,
        })
    }

    fn session_form(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<Vec<(&'static str, String)>, GatewayError> {
        let cents =
            to_minor_units(request.amount).ok_or(GatewayError::InvalidAmount(request.amount))?;

        Ok(vec![
            ("mode", "payment".to_string()),
            ("payment_method_types[0]", "card".to_string()),
            ("line_items[0][quantity]", "1".to_string()),
            (
                "line_items[0][price_data][currency]",
                self.config.currency.clone(),
            ),
            ("line_items[0][price_data][unit_amount]", cents.to_string()),
            (
                "line_items[0][price_data][product_data][name]",
                self.config.product_label.clone(),
            ),
            ("success_url", self.config.success_url.clone()),
            ("cancel_url", self.config.cancel_url.clone()),
            ("client_reference_id", request.order_ref.clone()),
            ("metadata[order_id]", request.order_ref.clone()),
            ("metadata[user_id]", request.user_id.to_string()),
        ])
    }

    async fn parse(response: reqwest::Response) -> Result<SessionResponse, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Stripe API error: {}", body);
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<SessionResponse>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self), fields(order_ref = %request.order_ref))]
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let form = self.session_form(request)?;
        let response = self
            .client
            .post(format!("{}/v1/checkout/sessions", self.config.api_base))
            .basic_auth(&self.secret_key, Some(""))
            .form(&form)
            .send()
            .await?;

        let session = Self::parse(response).await?;
        let url = session
            .url
            .ok_or_else(|| GatewayError::InvalidResponse("session without url".to_string()))?;

        info!(session_id = %session.id, "Stripe checkout session created");
        Ok(CheckoutSession {
            session_id: session.id,
            url,
            customer_id: session.customer,
        })
    }

    #[instrument(skip(self))]
    async fn session_status(&self, session_id: &str) -> Result<SessionStatus, GatewayError> {
        let response = self
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{}",
                self.config.api_base, session_id
            ))
            .basic_auth(&self.secret_key, Some(""))
            .send()
            .await?;

        Ok(Self::parse(response).await?.settlement())
    }
}
