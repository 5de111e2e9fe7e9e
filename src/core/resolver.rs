use crate::domain::catalog::REQUIRED_SERVICES;
use crate::domain::model::{Credential, ProjectState, ServiceStatus};
use crate::domain::ports::{AuthProvider, CloudApi};
use crate::utils::error::Result;
use std::collections::HashSet;
use std::sync::Arc;

/// 計算 ProjectState 快照，供 UI 判斷顯示初始化流程或「已就緒」畫面
pub struct ProjectStateResolver<A: CloudApi, P: AuthProvider> {
    api: Arc<A>,
    auth: Arc<P>,
    default_region: String,
}

impl<A: CloudApi, P: AuthProvider> ProjectStateResolver<A, P> {
    pub fn new(api: Arc<A>, auth: Arc<P>, default_region: impl Into<String>) -> Self {
        Self {
            api,
            auth,
            default_region: default_region.into(),
        }
    }

    pub async fn resolve(&self) -> Result<ProjectState> {
        let credential = self.auth.credential().await.inspect_err(|e| {
            tracing::error!("❌ Unable to determine project status: {}", e);
        })?;

        let service_statuses = self.service_statuses(&credential).await?;

        let (scheduler_region, gcs_buckets) = tokio::join!(
            self.scheduler_region(&credential),
            self.gcs_buckets(&credential)
        );

        let function_region = scheduler_region
            .clone()
            .unwrap_or_else(|| self.default_region.clone());
        let has_cloud_function = self.has_cloud_function(&credential, &function_region).await;

        let state = ProjectState {
            project_id: credential.project_id.clone(),
            service_statuses,
            has_gcs_bucket: !gcs_buckets.is_empty(),
            has_cloud_function,
            gcs_buckets,
            scheduler_region,
        };

        tracing::debug!(
            project = %state.project_id,
            all_services_enabled = state.all_services_enabled(),
            has_gcs_bucket = state.has_gcs_bucket,
            has_cloud_function = state.has_cloud_function,
            "Resolved project state"
        );
        Ok(state)
    }

    async fn service_statuses(&self, credential: &Credential) -> Result<Vec<ServiceStatus>> {
        let enabled: HashSet<String> = self
            .api
            .list_enabled_services(credential)
            .await
            .inspect_err(|e| tracing::error!("❌ Unable to list GCP services: {}", e))?
            .into_iter()
            .collect();

        Ok(REQUIRED_SERVICES
            .iter()
            .map(|service| ServiceStatus {
                service: *service,
                enabled: enabled.contains(service.endpoint),
            })
            .collect())
    }

    async fn scheduler_region(&self, credential: &Credential) -> Option<String> {
        match self.api.list_scheduler_locations(credential).await {
            Ok(locations) => locations.into_iter().next().map(|l| l.location_id),
            Err(e) => {
                tracing::warn!("⚠️ Could not determine Cloud Scheduler location: {}", e);
                None
            }
        }
    }

    async fn gcs_buckets(&self, credential: &Credential) -> Vec<String> {
        match self.api.list_buckets(credential).await {
            Ok(names) => names.into_iter().map(|n| format!("gs://{}", n)).collect(),
            Err(e) => {
                tracing::warn!("⚠️ Unable to list GCS buckets: {}", e);
                Vec::new()
            }
        }
    }

    async fn has_cloud_function(&self, credential: &Credential, region: &str) -> bool {
        match self.api.get_function(credential, region).await {
            Ok(function) => function.is_some(),
            Err(e) => {
                tracing::warn!("⚠️ Cloud Function lookup in {} failed: {}", region, e);
                false
            }
        }
    }

    /// 建立前重新確認 bucket 是否已存在
    pub async fn bucket_present(&self) -> Result<bool> {
        let credential = self.auth.credential().await?;
        Ok(!self.gcs_buckets(&credential).await.is_empty())
    }

    pub async fn function_present(&self, region: &str) -> Result<bool> {
        let credential = self.auth.credential().await?;
        Ok(self.has_cloud_function(&credential, region).await)
    }
}
