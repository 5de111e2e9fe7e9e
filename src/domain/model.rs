use serde::{Deserialize, Serialize};

/// 必要 GCP 服務的靜態目錄項目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub endpoint: &'static str,
    pub documentation: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub service: ServiceDescriptor,
    pub enabled: bool,
}

/// 專案初始化狀態快照，只能整份重新產生，不會原地修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectState {
    pub project_id: String,
    pub service_statuses: Vec<ServiceStatus>,
    pub has_gcs_bucket: bool,
    pub has_cloud_function: bool,
    /// `gs://` URI of every bucket visible to the credential
    pub gcs_buckets: Vec<String>,
    /// Cloud Scheduler location, present once an App Engine app exists
    pub scheduler_region: Option<String>,
}

impl ProjectState {
    pub fn all_services_enabled(&self) -> bool {
        self.service_statuses.iter().all(|s| s.enabled)
    }

    pub fn is_ready(&self) -> bool {
        self.all_services_enabled() && self.has_gcs_bucket && self.has_cloud_function
    }

    pub fn disabled_endpoints(&self) -> Vec<String> {
        self.service_statuses
            .iter()
            .filter(|s| !s.enabled)
            .map(|s| s.service.endpoint.to_string())
            .collect()
    }
}

/// 伺服器端的長時間作業
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    Running,
    Succeeded,
    Failed,
}

impl Operation {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            done: false,
            response: None,
            error: None,
            metadata: None,
        }
    }

    pub fn succeeded(name: impl Into<String>, response: serde_json::Value) -> Self {
        Self {
            response: Some(response),
            done: true,
            ..Self::pending(name)
        }
    }

    pub fn failed(name: impl Into<String>, error: serde_json::Value) -> Self {
        Self {
            error: Some(error),
            done: true,
            ..Self::pending(name)
        }
    }

    /// `done` 而沒有 `response` 即視為失敗，不另外檢查 `error`
    pub fn outcome(&self) -> OperationOutcome {
        match (self.done, &self.response) {
            (false, _) => OperationOutcome::Running,
            (true, Some(_)) => OperationOutcome::Succeeded,
            (true, None) => OperationOutcome::Failed,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
    }
}

/// Control plane that owns a long-running operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlPlane {
    ServiceManagement,
    CloudFunctions,
    AppEngine,
}

/// 建立/啟用請求回傳的待完成作業
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJob {
    pub control_plane: ControlPlane,
    pub name: String,
}

impl PendingJob {
    pub fn new(control_plane: ControlPlane, name: impl Into<String>) -> Self {
        Self {
            control_plane,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    #[serde(rename = "project")]
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub time_created: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudFunction {
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub https_trigger: Option<HttpsTrigger>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpsTrigger {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppEngineApp {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub name: String,
    pub location_id: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl Location {
    pub fn standard_environment_available(&self) -> bool {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("standardEnvironmentAvailable"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// 單次 Initialize 呼叫的需求，由當下的 ProjectState 推導
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    pub project_id: String,
    pub services_to_enable: Vec<String>,
    pub bucket_name: Option<String>,
    pub function_region: Option<String>,
}

impl ProvisioningRequest {
    pub fn is_empty(&self) -> bool {
        self.services_to_enable.is_empty()
            && self.bucket_name.is_none()
            && self.function_region.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::REQUIRED_SERVICES;

    fn state(enabled: &[bool], bucket: bool, function: bool) -> ProjectState {
        ProjectState {
            project_id: "test-project".to_string(),
            service_statuses: REQUIRED_SERVICES
                .iter()
                .zip(enabled)
                .map(|(service, enabled)| ServiceStatus {
                    service: *service,
                    enabled: *enabled,
                })
                .collect(),
            has_gcs_bucket: bucket,
            has_cloud_function: function,
            gcs_buckets: Vec::new(),
            scheduler_region: None,
        }
    }

    #[test]
    fn test_project_state_readiness() {
        let ready = state(&[true; 5], true, true);
        assert!(ready.all_services_enabled());
        assert!(ready.is_ready());

        let missing_function = state(&[true; 5], true, false);
        assert!(missing_function.all_services_enabled());
        assert!(!missing_function.is_ready());

        let one_disabled = state(&[true, true, false, true, true], true, true);
        assert!(!one_disabled.all_services_enabled());
        assert!(!one_disabled.is_ready());
        assert_eq!(one_disabled.disabled_endpoints(), vec!["ml.googleapis.com"]);
    }

    #[test]
    fn test_operation_outcome() {
        assert_eq!(Operation::pending("op").outcome(), OperationOutcome::Running);
        assert_eq!(
            Operation::succeeded("op", serde_json::json!({})).outcome(),
            OperationOutcome::Succeeded
        );
        assert_eq!(
            Operation::failed("op", serde_json::json!({"code": 7})).outcome(),
            OperationOutcome::Failed
        );

        // done without either payload is still a failure
        let bare: Operation = serde_json::from_str(r#"{"name":"op","done":true}"#).unwrap();
        assert_eq!(bare.outcome(), OperationOutcome::Failed);
    }

    #[test]
    fn test_operation_parses_without_done_field() {
        let op: Operation =
            serde_json::from_str(r#"{"name":"operations/abc","metadata":{"@type":"x"}}"#).unwrap();
        assert!(!op.done);
        assert_eq!(op.outcome(), OperationOutcome::Running);
    }
}
