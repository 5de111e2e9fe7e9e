use crate::core::poller::OperationPoller;
use crate::domain::model::{AppEngineApp, Bucket, Location, Operation};
use crate::domain::ports::{AuthProvider, CloudApi};
use crate::utils::cancel::CancelSignal;
use crate::utils::error::{ProvisionError, Result};
use std::sync::Arc;

/// 建立 GCS bucket、Cloud Function 與 App Engine app
pub struct ResourceProvisioner<A: CloudApi, P: AuthProvider> {
    api: Arc<A>,
    auth: Arc<P>,
    poller: OperationPoller<A>,
}

impl<A: CloudApi, P: AuthProvider> ResourceProvisioner<A, P> {
    pub fn new(api: Arc<A>, auth: Arc<P>, poller: OperationPoller<A>) -> Self {
        Self { api, auth, poller }
    }

    /// 單次請求，不需輪詢
    pub async fn create_bucket(&self, name: &str) -> Result<Bucket> {
        let credential = self.auth.credential().await?;
        tracing::info!("🪣 Creating GCS bucket {}", name);

        let bucket = self
            .api
            .create_bucket(&credential, name)
            .await
            .inspect_err(|e| tracing::error!("❌ Unable to create GCS bucket {}: {}", name, e))?;

        tracing::info!("✅ Created GCS bucket gs://{}", bucket.name);
        Ok(bucket)
    }

    /// Deploys the scheduler helper function in `region` and waits for the
    /// deployment operation to finish.
    pub async fn create_function(&self, region: &str, cancel: &CancelSignal) -> Result<Operation> {
        let credential = self.auth.credential().await?;
        tracing::info!("☁️ Deploying Cloud Function in {}", region);

        let job = self
            .api
            .create_function(&credential, region)
            .await
            .inspect_err(|e| tracing::error!("❌ Unable to create Cloud Function: {}", e))?;

        let operation = self
            .poller
            .await_operation(&credential, &job, cancel)
            .await
            .inspect_err(|e| tracing::error!("❌ Cloud Function deployment failed: {}", e))?;

        tracing::info!("✅ Cloud Function deployed in {}", region);
        Ok(operation)
    }

    /// App Engine app 決定 Cloud Scheduler 的區域
    pub async fn create_app_engine_app(
        &self,
        region: &str,
        cancel: &CancelSignal,
    ) -> Result<AppEngineApp> {
        let credential = self.auth.credential().await?;
        tracing::info!("🏗️ Creating App Engine app in {}", region);

        let job = self
            .api
            .create_app_engine_app(&credential, region)
            .await
            .inspect_err(|e| {
                tracing::error!("❌ Unable to create App Engine app in {}: {}", region, e)
            })?;

        let operation = self.poller.await_operation(&credential, &job, cancel).await?;
        let response = operation.response.clone().unwrap_or_default();
        serde_json::from_value(response).map_err(|e| ProvisionError::InvalidResponse {
            endpoint: operation.name.clone(),
            message: format!("operation response is not an App Engine app: {}", e),
        })
    }

    pub async fn app_engine_locations(&self) -> Result<Vec<Location>> {
        let credential = self.auth.credential().await?;
        self.api
            .list_app_engine_locations(&credential)
            .await
            .inspect_err(|e| tracing::error!("❌ Unable to retrieve App Engine locations: {}", e))
    }
}
