use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::{CheckoutSession, CheckoutSessionRequest, GatewayError, PaymentGateway, SessionStatus};
use crate::money::to_minor_units;

/// Local stand-in used when no provider key is configured. Sessions point at
/// the success URL and report as paid.
#[derive(Debug, Clone)]
pub struct SandboxGateway {
    success_url: String,
}

impl SandboxGateway {
    pub fn new(success_url: impl Into<String>) -> Self {
        Self {
            success_url: success_url.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for SandboxGateway {
    async fn create_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<CheckoutSession, GatewayError> {
        let cents =
            to_minor_units(request.amount).ok_or(GatewayError::InvalidAmount(request.amount))?;
        let session_id = format!("cs_sandbox_{}", Uuid::new_v4().simple());
        info!(order_ref = %request.order_ref, cents, "sandbox checkout session opened");
        Ok(CheckoutSession {
            url: format!("{}?session_id={}", self.success_url, session_id),
            session_id,
            customer_id: None,
        })
    }

    async fn session_status(&self, _session_id: &str) -> Result<SessionStatus, GatewayError> {
        Ok(SessionStatus::Paid)
    }
}
