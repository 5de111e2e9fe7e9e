use crate::core::poller::OperationPoller;
use crate::domain::model::Operation;
use crate::domain::ports::{AuthProvider, CloudApi};
use crate::utils::cancel::CancelSignal;
use crate::utils::error::Result;
use futures::future::try_join_all;
use std::sync::Arc;

/// 啟用一組 GCP API 並等待全部生效
pub struct ServiceEnabler<A: CloudApi, P: AuthProvider> {
    api: Arc<A>,
    auth: Arc<P>,
    poller: OperationPoller<A>,
}

impl<A: CloudApi, P: AuthProvider> ServiceEnabler<A, P> {
    pub fn new(api: Arc<A>, auth: Arc<P>, poller: OperationPoller<A>) -> Self {
        Self { api, auth, poller }
    }

    /// Fires every enable request at once, then polls every returned job at once.
    /// The first failure is returned; services already enabled stay enabled.
    /// The order of the returned operations is unspecified.
    pub async fn enable(&self, endpoints: &[String], cancel: &CancelSignal) -> Result<Vec<Operation>> {
        if endpoints.is_empty() {
            return Ok(Vec::new());
        }

        let credential = self.auth.credential().await?;
        tracing::info!("🔌 Enabling {} service(s): {}", endpoints.len(), endpoints.join(", "));

        let pending = try_join_all(
            endpoints
                .iter()
                .map(|endpoint| self.api.enable_service(&credential, endpoint)),
        )
        .await
        .inspect_err(|e| tracing::error!("❌ Unable to enable necessary GCP services: {}", e))?;

        let operations = try_join_all(
            pending
                .iter()
                .map(|job| self.poller.await_operation(&credential, job, cancel)),
        )
        .await
        .inspect_err(|e| tracing::error!("❌ Enabling GCP services did not complete: {}", e))?;

        tracing::info!("✅ {} service(s) enabled", operations.len());
        Ok(operations)
    }
}
