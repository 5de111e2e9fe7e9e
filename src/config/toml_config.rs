use crate::utils::error::{ProvisionError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CLOUD_FUNCTION_NAME: &str = "submitScheduledNotebook";
pub const CLOUD_FUNCTION_ARCHIVE: &str =
    "gs://artifacts.deeplearning-platform-ui.appspot.com/gcp_scheduled_notebook_helper.zip";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionerConfig {
    pub endpoints: EndpointsConfig,
    pub auth: AuthConfig,
    pub polling: PollingConfig,
    pub function: FunctionConfig,
    pub bucket: BucketConfig,
    pub initialization: InitializationConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub service_management: String,
    pub storage: String,
    pub cloud_functions: String,
    pub cloud_scheduler: String,
    pub app_engine: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            service_management: "https://servicemanagement.googleapis.com/v1".to_string(),
            storage: "https://storage.googleapis.com/storage/v1".to_string(),
            cloud_functions: "https://cloudfunctions.googleapis.com/v1".to_string(),
            cloud_scheduler: "https://cloudscheduler.googleapis.com/v1".to_string(),
            app_engine: "https://appengine.googleapis.com/v1".to_string(),
        }
    }
}

/// 認證來源: `env`（預設）、`http`（由 `url` 取得 token）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub provider: String,
    pub url: Option<String>,
    pub token_env: String,
    pub project_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider: "env".to_string(),
            url: None,
            token_env: "GCP_ACCESS_TOKEN".to_string(),
            project_env: "GCP_PROJECT".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_ms: u64,
    /// 0 表示不設上限
    pub max_duration_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_duration_secs: 900,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FunctionConfig {
    pub name: String,
    pub entry_point: String,
    pub runtime: String,
    pub source_archive_url: String,
    pub description: String,
    pub default_region: String,
}

impl Default for FunctionConfig {
    fn default() -> Self {
        Self {
            name: CLOUD_FUNCTION_NAME.to_string(),
            entry_point: CLOUD_FUNCTION_NAME.to_string(),
            runtime: "nodejs10".to_string(),
            source_archive_url: CLOUD_FUNCTION_ARCHIVE.to_string(),
            description: "Submits a Notebook Job on AI Platform".to_string(),
            default_region: "us-central1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketConfig {
    /// 未設定時使用 project id 作為 bucket 名稱
    pub name: Option<String>,
    pub versioning: bool,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            name: None,
            versioning: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InitializationConfig {
    pub recheck_before_create: bool,
}

impl Default for InitializationConfig {
    fn default() -> Self {
        Self {
            recheck_before_create: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_seconds: 30 }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn max_duration(&self) -> Option<Duration> {
        (self.max_duration_secs > 0).then(|| Duration::from_secs(self.max_duration_secs))
    }
}

impl ProvisionerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ProvisionError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ProvisionError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GCP_PROJECT})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ProvisionError::ConfigValidationError {
            field: "env_substitution".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        let endpoints = [
            ("endpoints.service_management", &self.endpoints.service_management),
            ("endpoints.storage", &self.endpoints.storage),
            ("endpoints.cloud_functions", &self.endpoints.cloud_functions),
            ("endpoints.cloud_scheduler", &self.endpoints.cloud_scheduler),
            ("endpoints.app_engine", &self.endpoints.app_engine),
        ];
        for (field, url) in endpoints {
            validation::validate_url(field, url)?;
        }

        match self.auth.provider.as_str() {
            "env" => {
                validation::validate_non_empty_string("auth.token_env", &self.auth.token_env)?;
                validation::validate_non_empty_string("auth.project_env", &self.auth.project_env)?;
            }
            "http" => {
                let url = validation_required(&self.auth.url, "auth.url")?;
                validation::validate_url("auth.url", url)?;
            }
            other => {
                return Err(ProvisionError::InvalidConfigValueError {
                    field: "auth.provider".to_string(),
                    value: other.to_string(),
                    reason: "Supported providers: env, http".to_string(),
                })
            }
        }

        validation::validate_positive_number("polling.interval_ms", self.polling.interval_ms, 1)?;
        validation::validate_positive_number("http.timeout_seconds", self.http.timeout_seconds, 1)?;

        validation::validate_non_empty_string("function.name", &self.function.name)?;
        validation::validate_non_empty_string("function.entry_point", &self.function.entry_point)?;
        validation::validate_non_empty_string("function.runtime", &self.function.runtime)?;
        if !self.function.source_archive_url.starts_with("gs://") {
            return Err(ProvisionError::InvalidConfigValueError {
                field: "function.source_archive_url".to_string(),
                value: self.function.source_archive_url.clone(),
                reason: "Source archive must be a gs:// URI".to_string(),
            });
        }
        validation::validate_region("function.default_region", &self.function.default_region)?;

        if let Some(name) = &self.bucket.name {
            validation::validate_bucket_name("bucket.name", name)?;
        }

        Ok(())
    }
}

fn validation_required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| ProvisionError::MissingConfigError {
            field: field.to_string(),
        })
}

impl Validate for ProvisionerConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
