//! Payment endpoints.

use tracing::instrument;

use super::types::{CheckoutRequest, CheckoutResponse, Order, PaymentConfirmation,
    ProviderKeyResponse};
use super::{ApiClient, ApiError};

impl ApiClient {
    /// Fetch the payment provider's publishable key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unavailable.
    #[instrument(skip(self))]
    pub async fn fetch_provider_key(&self) -> Result<String, ApiError> {
        let response: ProviderKeyResponse = self.get_json("/getkey").await?;
        Ok(response.key)
    }

    /// Create a provider order for the cart contents.
    ///
    /// # Errors
    ///
    /// Returns an error if the order cannot be created.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn create_order(&self, request: &CheckoutRequest) -> Result<Order, ApiError> {
        let response: CheckoutResponse = self.post_json("/checkout", request).await?;
        Ok(response.order)
    }

    /// Submit a provider callback payload for server-side verification.
    ///
    /// The response body carries no information the client acts on; the
    /// checkout orchestrator's settle decision is made from the callback
    /// payload itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the verification request fails.
    #[instrument(skip(self, confirmation), fields(order_id = %confirmation.order_id))]
    pub async fn verify_payment(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> Result<(), ApiError> {
        let _ignored: serde_json::Value = self
            .post_json("/paymentVerification", confirmation)
            .await?;
        Ok(())
    }
}
