use crate::domain::model::{
    AppEngineApp, Bucket, CloudFunction, Credential, Location, Operation, PendingJob,
};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 提供 bearer token 與 project id；每個頂層操作呼叫一次
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn credential(&self) -> Result<Credential>;
}

/// Raw provider calls. Every call receives the credential explicitly and
/// returns provider errors untouched.
#[async_trait]
pub trait CloudApi: Send + Sync {
    async fn enable_service(&self, credential: &Credential, endpoint: &str) -> Result<PendingJob>;

    async fn create_bucket(&self, credential: &Credential, name: &str) -> Result<Bucket>;

    async fn create_function(&self, credential: &Credential, region: &str) -> Result<PendingJob>;

    async fn create_app_engine_app(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<PendingJob>;

    async fn get_operation(&self, credential: &Credential, job: &PendingJob) -> Result<Operation>;

    async fn list_enabled_services(&self, credential: &Credential) -> Result<Vec<String>>;

    async fn list_buckets(&self, credential: &Credential) -> Result<Vec<String>>;

    async fn list_scheduler_locations(&self, credential: &Credential) -> Result<Vec<Location>>;

    /// `Ok(None)` when the function does not exist in `region`.
    async fn get_function(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<Option<CloudFunction>>;

    async fn list_app_engine_locations(&self, credential: &Credential) -> Result<Vec<Location>>;
}

