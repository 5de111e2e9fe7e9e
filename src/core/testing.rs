//! In-memory `CloudApi` / `AuthProvider` fakes shared by the unit tests.

use crate::domain::model::{
    AppEngineApp, Bucket, CloudFunction, ControlPlane, Credential, Location, Operation, PendingJob,
};
use crate::domain::ports::{AuthProvider, CloudApi};
use crate::utils::error::{ProviderError, ProvisionError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

pub fn credential() -> Credential {
    Credential {
        token: "test-token".to_string(),
        project_id: "test-project".to_string(),
    }
}

pub fn provider_error(status: &str, message: &str) -> ProviderError {
    ProviderError::from_response_body(
        400,
        &serde_json::json!({"error": {"code": 400, "message": message, "status": status}})
            .to_string(),
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Enable(String),
    CreateBucket(String),
    CreateFunction(String),
    CreateApp(String),
    GetOperation(String),
    ListServices,
    ListBuckets,
    ListSchedulerLocations,
    GetFunction(String),
    ListAppLocations,
}

/// 單次狀態查詢的腳本步驟
#[derive(Debug, Clone)]
pub enum Step {
    Running,
    Succeed(serde_json::Value),
    Fail(serde_json::Value),
    QueryError(ProviderError),
}

pub fn enable_operation_name(endpoint: &str) -> String {
    format!("operations/enable-{}", endpoint)
}

pub const FUNCTION_OPERATION: &str = "operations/create-function";
pub const APP_OPERATION: &str = "apps/test-project/operations/create-app";

#[derive(Default)]
pub struct FakeCloud {
    calls: Mutex<Vec<Call>>,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    enable_failures: Mutex<HashMap<String, ProviderError>>,
    bucket_failure: Mutex<Option<ProviderError>>,
    bucket_delay: Mutex<Duration>,
    function_failure: Mutex<Option<ProviderError>>,
    list_services_failure: Mutex<Option<ProviderError>>,
    list_buckets_failure: Mutex<Option<ProviderError>>,
    enabled_services: Mutex<HashSet<String>>,
    buckets: Mutex<Vec<String>>,
    scheduler_locations: Mutex<Vec<Location>>,
    functions: Mutex<HashSet<String>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| predicate(c)).count()
    }

    pub fn script(&self, operation: &str, steps: Vec<Step>) {
        self.scripts
            .lock()
            .unwrap()
            .insert(operation.to_string(), steps.into());
    }

    pub fn fail_enable(&self, endpoint: &str, error: ProviderError) {
        self.enable_failures
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), error);
    }

    pub fn fail_bucket_creation(&self, error: ProviderError) {
        *self.bucket_failure.lock().unwrap() = Some(error);
    }

    pub fn delay_bucket_creation(&self, delay: Duration) {
        *self.bucket_delay.lock().unwrap() = delay;
    }

    pub fn fail_function_creation(&self, error: ProviderError) {
        *self.function_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_list_services(&self, error: ProviderError) {
        *self.list_services_failure.lock().unwrap() = Some(error);
    }

    pub fn fail_list_buckets(&self, error: ProviderError) {
        *self.list_buckets_failure.lock().unwrap() = Some(error);
    }

    pub fn with_enabled_services(&self, endpoints: &[&str]) {
        let mut enabled = self.enabled_services.lock().unwrap();
        enabled.extend(endpoints.iter().map(|e| e.to_string()));
    }

    pub fn with_bucket(&self, name: &str) {
        self.buckets.lock().unwrap().push(name.to_string());
    }

    pub fn with_scheduler_location(&self, location_id: &str) {
        self.scheduler_locations.lock().unwrap().push(Location {
            name: format!("projects/test-project/locations/{}", location_id),
            location_id: location_id.to_string(),
            metadata: None,
        });
    }

    pub fn with_function(&self, region: &str) {
        self.functions.lock().unwrap().insert(region.to_string());
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl CloudApi for FakeCloud {
    async fn enable_service(&self, _credential: &Credential, endpoint: &str) -> Result<PendingJob> {
        self.record(Call::Enable(endpoint.to_string()));
        tokio::task::yield_now().await;
        if let Some(error) = self.enable_failures.lock().unwrap().get(endpoint) {
            return Err(error.clone().into());
        }
        Ok(PendingJob::new(
            ControlPlane::ServiceManagement,
            enable_operation_name(endpoint),
        ))
    }

    async fn create_bucket(&self, _credential: &Credential, name: &str) -> Result<Bucket> {
        self.record(Call::CreateBucket(name.to_string()));
        let delay = *self.bucket_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.bucket_failure.lock().unwrap().clone() {
            return Err(error.into());
        }
        self.buckets.lock().unwrap().push(name.to_string());
        Ok(Bucket {
            name: name.to_string(),
            id: Some(name.to_string()),
            location: Some("US".to_string()),
            time_created: None,
        })
    }

    async fn create_function(&self, _credential: &Credential, region: &str) -> Result<PendingJob> {
        self.record(Call::CreateFunction(region.to_string()));
        if let Some(error) = self.function_failure.lock().unwrap().clone() {
            return Err(error.into());
        }
        Ok(PendingJob::new(ControlPlane::CloudFunctions, FUNCTION_OPERATION))
    }

    async fn create_app_engine_app(
        &self,
        _credential: &Credential,
        region: &str,
    ) -> Result<PendingJob> {
        self.record(Call::CreateApp(region.to_string()));
        Ok(PendingJob::new(ControlPlane::AppEngine, APP_OPERATION))
    }

    async fn get_operation(&self, _credential: &Credential, job: &PendingJob) -> Result<Operation> {
        self.record(Call::GetOperation(job.name.clone()));
        tokio::task::yield_now().await;
        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&job.name)
            .and_then(|steps| steps.pop_front());

        match step {
            None => Ok(Operation::succeeded(
                job.name.clone(),
                serde_json::json!({"name": job.name}),
            )),
            Some(Step::Running) => Ok(Operation::pending(job.name.clone())),
            Some(Step::Succeed(response)) => Ok(Operation::succeeded(job.name.clone(), response)),
            Some(Step::Fail(error)) => Ok(Operation::failed(job.name.clone(), error)),
            Some(Step::QueryError(error)) => Err(error.into()),
        }
    }

    async fn list_enabled_services(&self, _credential: &Credential) -> Result<Vec<String>> {
        self.record(Call::ListServices);
        if let Some(error) = self.list_services_failure.lock().unwrap().clone() {
            return Err(error.into());
        }
        let mut services: Vec<String> =
            self.enabled_services.lock().unwrap().iter().cloned().collect();
        services.sort();
        Ok(services)
    }

    async fn list_buckets(&self, _credential: &Credential) -> Result<Vec<String>> {
        self.record(Call::ListBuckets);
        if let Some(error) = self.list_buckets_failure.lock().unwrap().clone() {
            return Err(error.into());
        }
        Ok(self.buckets.lock().unwrap().clone())
    }

    async fn list_scheduler_locations(&self, _credential: &Credential) -> Result<Vec<Location>> {
        self.record(Call::ListSchedulerLocations);
        Ok(self.scheduler_locations.lock().unwrap().clone())
    }

    async fn get_function(
        &self,
        _credential: &Credential,
        region: &str,
    ) -> Result<Option<CloudFunction>> {
        self.record(Call::GetFunction(region.to_string()));
        let exists = self.functions.lock().unwrap().contains(region);
        Ok(exists.then(|| CloudFunction {
            name: format!(
                "projects/test-project/locations/{}/functions/submitScheduledNotebook",
                region
            ),
            status: Some("ACTIVE".to_string()),
            https_trigger: None,
        }))
    }

    async fn list_app_engine_locations(&self, _credential: &Credential) -> Result<Vec<Location>> {
        self.record(Call::ListAppLocations);
        Ok(vec![Location {
            name: "apps/test-project/locations/us-central".to_string(),
            location_id: "us-central".to_string(),
            metadata: Some(serde_json::json!({"standardEnvironmentAvailable": true})),
        }])
    }
}

/// 計算被呼叫次數的 AuthProvider
#[derive(Default)]
pub struct FakeAuth {
    pub requests: Mutex<usize>,
    pub fail: bool,
}

impl FakeAuth {
    pub fn failing() -> Self {
        Self {
            requests: Mutex::new(0),
            fail: true,
        }
    }

    pub fn requests(&self) -> usize {
        *self.requests.lock().unwrap()
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn credential(&self) -> Result<Credential> {
        *self.requests.lock().unwrap() += 1;
        if self.fail {
            return Err(ProvisionError::Auth {
                message: "credential unavailable".to_string(),
            });
        }
        Ok(credential())
    }
}
