use crate::config::toml_config::{EndpointsConfig, FunctionConfig};
use crate::config::ProvisionerConfig;
use crate::domain::model::{
    Bucket, CloudFunction, ControlPlane, Credential, Location, Operation, PendingJob,
};
use crate::domain::ports::CloudApi;
use crate::utils::error::{ProviderError, ProvisionError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManagedService {
    service_name: String,
}

#[derive(Debug, Deserialize)]
struct ListServicesResponse {
    #[serde(default)]
    services: Vec<ManagedService>,
}

#[derive(Debug, Deserialize)]
struct BucketList {
    #[serde(default)]
    items: Vec<Bucket>,
}

#[derive(Debug, Deserialize)]
struct LocationList {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnableServiceRequest {
    consumer_id: String,
}

#[derive(Debug, Serialize)]
struct Versioning {
    enabled: bool,
}

#[derive(Debug, Serialize)]
struct CreateBucketRequest<'a> {
    name: &'a str,
    versioning: Versioning,
}

#[derive(Debug, Serialize)]
struct HttpsTriggerRequest {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateFunctionRequest<'a> {
    name: String,
    description: &'a str,
    entry_point: &'a str,
    runtime: &'a str,
    source_archive_url: &'a str,
    https_trigger: HttpsTriggerRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateAppRequest<'a> {
    id: &'a str,
    location_id: &'a str,
}

/// Google Cloud REST 實作，共用一個 reqwest::Client
#[derive(Debug, Clone)]
pub struct GcpRestClient {
    client: Client,
    endpoints: EndpointsConfig,
    function: FunctionConfig,
    versioning: bool,
}

impl GcpRestClient {
    pub fn new(config: &ProvisionerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_seconds))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &ProvisionerConfig) -> Self {
        Self {
            client,
            endpoints: config.endpoints.clone(),
            function: config.function.clone(),
            versioning: config.bucket.versioning,
        }
    }

    fn url(base: &str, path: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn operation_url(&self, job: &PendingJob) -> String {
        let base = match job.control_plane {
            ControlPlane::ServiceManagement => &self.endpoints.service_management,
            ControlPlane::CloudFunctions => &self.endpoints.cloud_functions,
            ControlPlane::AppEngine => &self.endpoints.app_engine,
        };
        Self::url(base, &job.name)
    }

    fn functions_url(&self, credential: &Credential, region: &str) -> String {
        Self::url(
            &self.endpoints.cloud_functions,
            &format!("projects/{}/locations/{}/functions", credential.project_id, region),
        )
    }

    /// 送出請求並解析 JSON；非 2xx 的回應原樣轉成 ProviderError
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, endpoint: &str) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(
                status_code = status.as_u16(),
                endpoint = %endpoint,
                "GCP API returned error status"
            );
            return Err(ProviderError::from_response_body(status.as_u16(), &body).into());
        }

        serde_json::from_str(&body).map_err(|e| ProvisionError::InvalidResponse {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl CloudApi for GcpRestClient {
    async fn enable_service(&self, credential: &Credential, endpoint: &str) -> Result<PendingJob> {
        let url = Self::url(
            &self.endpoints.service_management,
            &format!("services/{}:enable", endpoint),
        );
        let request = self
            .client
            .post(&url)
            .bearer_auth(&credential.token)
            .json(&EnableServiceRequest {
                consumer_id: format!("project:{}", credential.project_id),
            });

        let operation: Operation = self.send(request, &url).await?;
        Ok(PendingJob::new(ControlPlane::ServiceManagement, operation.name))
    }

    async fn create_bucket(&self, credential: &Credential, name: &str) -> Result<Bucket> {
        let url = Self::url(&self.endpoints.storage, "b");
        let request = self
            .client
            .post(&url)
            .bearer_auth(&credential.token)
            .query(&[("project", credential.project_id.as_str())])
            .json(&CreateBucketRequest {
                name,
                versioning: Versioning {
                    enabled: self.versioning,
                },
            });

        self.send(request, &url).await
    }

    async fn create_function(&self, credential: &Credential, region: &str) -> Result<PendingJob> {
        let url = self.functions_url(credential, region);
        let body = CreateFunctionRequest {
            name: format!(
                "projects/{}/locations/{}/functions/{}",
                credential.project_id, region, self.function.name
            ),
            description: &self.function.description,
            entry_point: &self.function.entry_point,
            runtime: &self.function.runtime,
            source_archive_url: &self.function.source_archive_url,
            https_trigger: HttpsTriggerRequest {},
        };
        let request = self
            .client
            .post(&url)
            .bearer_auth(&credential.token)
            .json(&body);

        let operation: Operation = self.send(request, &url).await?;
        Ok(PendingJob::new(ControlPlane::CloudFunctions, operation.name))
    }

    async fn create_app_engine_app(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<PendingJob> {
        let url = Self::url(&self.endpoints.app_engine, "apps");
        let request = self
            .client
            .post(&url)
            .bearer_auth(&credential.token)
            .json(&CreateAppRequest {
                id: &credential.project_id,
                location_id: region,
            });

        let operation: Operation = self.send(request, &url).await?;
        Ok(PendingJob::new(ControlPlane::AppEngine, operation.name))
    }

    async fn get_operation(&self, credential: &Credential, job: &PendingJob) -> Result<Operation> {
        let url = self.operation_url(job);
        let request = self.client.get(&url).bearer_auth(&credential.token);
        self.send(request, &url).await
    }

    async fn list_enabled_services(&self, credential: &Credential) -> Result<Vec<String>> {
        let url = Self::url(&self.endpoints.service_management, "services");
        let consumer_id = format!("project:{}", credential.project_id);
        let request = self
            .client
            .get(&url)
            .bearer_auth(&credential.token)
            .query(&[("consumerId", consumer_id.as_str()), ("pageSize", "100")]);

        let response: ListServicesResponse = self.send(request, &url).await?;
        Ok(response
            .services
            .into_iter()
            .map(|s| s.service_name)
            .collect())
    }

    async fn list_buckets(&self, credential: &Credential) -> Result<Vec<String>> {
        let url = Self::url(&self.endpoints.storage, "b");
        let request = self
            .client
            .get(&url)
            .bearer_auth(&credential.token)
            .query(&[("project", credential.project_id.as_str())]);

        let response: BucketList = self.send(request, &url).await?;
        Ok(response.items.into_iter().map(|b| b.name).collect())
    }

    async fn list_scheduler_locations(&self, credential: &Credential) -> Result<Vec<Location>> {
        let url = Self::url(
            &self.endpoints.cloud_scheduler,
            &format!("projects/{}/locations", credential.project_id),
        );
        let request = self.client.get(&url).bearer_auth(&credential.token);

        let response: LocationList = self.send(request, &url).await?;
        Ok(response.locations)
    }

    async fn get_function(
        &self,
        credential: &Credential,
        region: &str,
    ) -> Result<Option<CloudFunction>> {
        let url = format!("{}/{}", self.functions_url(credential, region), self.function.name);
        let request = self.client.get(&url).bearer_auth(&credential.token);

        match self.send(request, &url).await {
            Ok(function) => Ok(Some(function)),
            Err(ProvisionError::Provider(e)) if e.is_not_found() => {
                tracing::debug!("{} not found in {}", self.function.name, region);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn list_app_engine_locations(&self, credential: &Credential) -> Result<Vec<Location>> {
        let url = Self::url(
            &self.endpoints.app_engine,
            &format!("apps/{}/locations", credential.project_id),
        );
        let request = self.client.get(&url).bearer_auth(&credential.token);

        let response: LocationList = self.send(request, &url).await?;
        Ok(response.locations)
    }
}
