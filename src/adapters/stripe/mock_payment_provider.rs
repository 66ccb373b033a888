//! Mock payment provider for tests and local development.
//!
//! Returns predictable session ids (`cs_test_<transaction id>`) and records
//! every request so tests can assert on prices and metadata.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::{CheckoutRequest, CheckoutSession, PaymentError, PaymentProvider};

#[derive(Default)]
pub struct MockPaymentProvider {
    requests: Mutex<Vec<CheckoutRequest>>,
    next_error: Mutex<Option<PaymentError>>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next call fail with `error`.
    pub async fn fail_next(&self, error: PaymentError) {
        *self.next_error.lock().await = Some(error);
    }

    pub async fn requests(&self) -> Vec<CheckoutRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn last_request(&self) -> Option<CheckoutRequest> {
        self.requests.lock().await.last().cloned()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_checkout_session(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        if let Some(error) = self.next_error.lock().await.take() {
            return Err(error);
        }

        let id = format!("cs_test_{}", request.transaction_id);
        let url = format!("https://checkout.example.test/pay/{}", id);
        self.requests.lock().await.push(request);

        Ok(CheckoutSession { id, url })
    }
}
