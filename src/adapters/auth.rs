use crate::config::toml_config::AuthConfig;
use crate::domain::model::Credential;
use crate::domain::ports::AuthProvider;
use crate::utils::error::{ProvisionError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// 固定的 credential，用於測試或一次性腳本
#[derive(Debug, Clone)]
pub struct StaticAuthProvider {
    credential: Credential,
}

impl StaticAuthProvider {
    pub fn new(token: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            credential: Credential {
                token: token.into(),
                project_id: project_id.into(),
            },
        }
    }
}

#[async_trait]
impl AuthProvider for StaticAuthProvider {
    async fn credential(&self) -> Result<Credential> {
        Ok(self.credential.clone())
    }
}

/// 每次呼叫時重新讀取環境變數，token 更新後不需重啟
#[derive(Debug, Clone)]
pub struct EnvAuthProvider {
    token_var: String,
    project_var: String,
}

impl EnvAuthProvider {
    pub fn new(token_var: impl Into<String>, project_var: impl Into<String>) -> Self {
        Self {
            token_var: token_var.into(),
            project_var: project_var.into(),
        }
    }

    fn read(name: &str) -> Result<String> {
        match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ProvisionError::Auth {
                message: format!("environment variable {} is not set", name),
            }),
        }
    }
}

#[async_trait]
impl AuthProvider for EnvAuthProvider {
    async fn credential(&self) -> Result<Credential> {
        Ok(Credential {
            token: Self::read(&self.token_var)?,
            project_id: Self::read(&self.project_var)?,
        })
    }
}

/// Fetches `{"token": ..., "project": ...}` from an HTTP endpoint, such as a
/// notebook server's auth handler.
#[derive(Debug, Clone)]
pub struct HttpAuthProvider {
    client: Client,
    url: String,
}

impl HttpAuthProvider {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn credential(&self) -> Result<Credential> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|source| ProvisionError::AuthRequest {
                message: format!("request to {} failed", self.url),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status_code = status.as_u16(), "❌ Auth endpoint rejected the request");
            return Err(ProvisionError::Auth {
                message: format!("{} returned {}: {}", self.url, status, body),
            });
        }

        response
            .json::<Credential>()
            .await
            .map_err(|source| ProvisionError::AuthRequest {
                message: format!("unexpected auth response from {}", self.url),
                source,
            })
    }
}

/// 依設定檔 `[auth]` 區段選擇的實作
#[derive(Debug, Clone)]
pub enum ConfiguredAuthProvider {
    Env(EnvAuthProvider),
    Http(HttpAuthProvider),
}

impl ConfiguredAuthProvider {
    pub fn from_config(config: &AuthConfig, timeout: Duration) -> Result<Self> {
        match config.provider.as_str() {
            "env" => Ok(Self::Env(EnvAuthProvider::new(
                &config.token_env,
                &config.project_env,
            ))),
            "http" => {
                let url = config
                    .url
                    .clone()
                    .ok_or_else(|| ProvisionError::MissingConfigError {
                        field: "auth.url".to_string(),
                    })?;
                let client = Client::builder().timeout(timeout).build()?;
                Ok(Self::Http(HttpAuthProvider::new(client, url)))
            }
            other => Err(ProvisionError::InvalidConfigValueError {
                field: "auth.provider".to_string(),
                value: other.to_string(),
                reason: "Supported providers: env, http".to_string(),
            }),
        }
    }
}

#[async_trait]
impl AuthProvider for ConfiguredAuthProvider {
    async fn credential(&self) -> Result<Credential> {
        match self {
            Self::Env(provider) => provider.credential().await,
            Self::Http(provider) => provider.credential().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticAuthProvider::new("token", "project");
        let credential = provider.credential().await.unwrap();
        assert_eq!(credential.token, "token");
        assert_eq!(credential.project_id, "project");
    }

    #[tokio::test]
    async fn test_env_provider_reads_variables() {
        std::env::set_var("SP_TEST_ENV_TOKEN", "env-token");
        std::env::set_var("SP_TEST_ENV_PROJECT", "env-project");
        let provider = EnvAuthProvider::new("SP_TEST_ENV_TOKEN", "SP_TEST_ENV_PROJECT");

        let credential = provider.credential().await.unwrap();

        assert_eq!(credential.token, "env-token");
        assert_eq!(credential.project_id, "env-project");
    }

    #[tokio::test]
    async fn test_env_provider_missing_variable() {
        let provider = EnvAuthProvider::new("SP_TEST_UNSET_TOKEN", "SP_TEST_UNSET_PROJECT");

        let err = provider.credential().await.unwrap_err();

        assert!(matches!(err, ProvisionError::Auth { ref message } if message.contains("SP_TEST_UNSET_TOKEN")));
    }

    #[tokio::test]
    async fn test_http_provider_parses_auth_response() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/gcp/v1/auth");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"token": "http-token", "project": "http-project"}));
        });
        let provider = HttpAuthProvider::new(Client::new(), server.url("/gcp/v1/auth"));

        let credential = provider.credential().await.unwrap();

        mock.assert();
        assert_eq!(credential.token, "http-token");
        assert_eq!(credential.project_id, "http-project");
    }

    #[tokio::test]
    async fn test_http_provider_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/gcp/v1/auth");
            then.status(500).body("no default credentials");
        });
        let provider = HttpAuthProvider::new(Client::new(), server.url("/gcp/v1/auth"));

        let err = provider.credential().await.unwrap_err();

        assert!(matches!(err, ProvisionError::Auth { ref message } if message.contains("no default credentials")));
    }

    #[tokio::test]
    async fn test_http_provider_keeps_error_source() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/gcp/v1/auth");
            then.status(200).body("<html>login required</html>");
        });
        let provider = HttpAuthProvider::new(Client::new(), server.url("/gcp/v1/auth"));

        let err = provider.credential().await.unwrap_err();

        assert!(matches!(err, ProvisionError::AuthRequest { ref message, .. } if message.contains("/gcp/v1/auth")));
        assert_eq!(err.category(), crate::utils::error::ErrorCategory::Auth);
        let source = std::error::Error::source(&err).expect("reqwest error kept as source");
        assert!(source.downcast_ref::<reqwest::Error>().is_some());
    }

    #[test]
    fn test_from_config() {
        let env = ConfiguredAuthProvider::from_config(&AuthConfig::default(), Duration::from_secs(5));
        assert!(matches!(env, Ok(ConfiguredAuthProvider::Env(_))));

        let missing_url = AuthConfig {
            provider: "http".to_string(),
            ..AuthConfig::default()
        };
        assert!(matches!(
            ConfiguredAuthProvider::from_config(&missing_url, Duration::from_secs(5)),
            Err(ProvisionError::MissingConfigError { .. })
        ));

        let unknown = AuthConfig {
            provider: "metadata".to_string(),
            ..AuthConfig::default()
        };
        assert!(matches!(
            ConfiguredAuthProvider::from_config(&unknown, Duration::from_secs(5)),
            Err(ProvisionError::InvalidConfigValueError { .. })
        ));
    }
}
