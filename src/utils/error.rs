use crate::domain::model::Operation;
use serde::Deserialize;
use thiserror::Error;

/// 雲端供應商回傳的原始錯誤，內容不做任何轉譯
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}: {message}", status_label(.status, .code, .http_status))]
pub struct ProviderError {
    pub http_status: u16,
    pub code: Option<i64>,
    pub status: Option<String>,
    pub message: String,
    pub body: serde_json::Value,
}

#[derive(Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleErrorBody,
}

#[derive(Deserialize)]
struct GoogleErrorBody {
    code: Option<i64>,
    message: Option<String>,
    status: Option<String>,
}

impl ProviderError {
    /// 解析 Google API 錯誤格式 `{"error": {"code", "message", "status"}}`
    pub fn from_response_body(http_status: u16, raw: &str) -> Self {
        let body = serde_json::from_str::<serde_json::Value>(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));

        match serde_json::from_value::<GoogleErrorEnvelope>(body.clone()) {
            Ok(envelope) => Self {
                http_status,
                code: envelope.error.code,
                status: envelope.error.status,
                message: envelope
                    .error
                    .message
                    .unwrap_or_else(|| format!("HTTP {}", http_status)),
                body,
            },
            Err(_) => Self {
                http_status,
                code: None,
                status: None,
                message: if raw.trim().is_empty() {
                    format!("HTTP {}", http_status)
                } else {
                    raw.to_string()
                },
                body,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.http_status == 404
    }
}

/// 優先使用 `status`，其次 `code`，最後才是 HTTP 狀態碼
fn status_label(status: &Option<String>, code: &Option<i64>, http_status: &u16) -> String {
    match (status, code) {
        (Some(status), _) => status.clone(),
        (None, Some(code)) => code.to_string(),
        (None, None) => http_status.to_string(),
    }
}

#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Unable to obtain GCP authorization: {message}")]
    Auth { message: String },

    #[error("Unable to obtain GCP authorization: {message}")]
    AuthRequest {
        message: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },

    #[error("Operation {} finished with an error", .0.name)]
    OperationFailed(Operation),

    #[error("Operation {name} did not complete within {waited_secs}s")]
    PollTimeout { name: String, waited_secs: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Auth,
    Request,
    JobFailure,
    Cancelled,
    Configuration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ProvisionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProvisionError::Auth { .. } | ProvisionError::AuthRequest { .. } => {
                ErrorCategory::Auth
            }
            ProvisionError::Provider(_)
            | ProvisionError::Transport(_)
            | ProvisionError::InvalidResponse { .. }
            | ProvisionError::IoError(_)
            | ProvisionError::SerializationError(_) => ErrorCategory::Request,
            ProvisionError::OperationFailed(_) | ProvisionError::PollTimeout { .. } => {
                ErrorCategory::JobFailure
            }
            ProvisionError::Cancelled => ErrorCategory::Cancelled,
            ProvisionError::ConfigValidationError { .. }
            | ProvisionError::InvalidConfigValueError { .. }
            | ProvisionError::MissingConfigError { .. } => ErrorCategory::Configuration,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Cancelled => ErrorSeverity::Low,
            ErrorCategory::Request | ErrorCategory::JobFailure => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Auth => ErrorSeverity::Critical,
        }
    }

    /// 給終端使用者看的簡短訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            ProvisionError::Auth { .. } | ProvisionError::AuthRequest { .. } => {
                "Unable to obtain Google Cloud authorization".to_string()
            }
            ProvisionError::Provider(e) => e.to_string(),
            ProvisionError::Transport(_) => "Could not reach the Google Cloud API".to_string(),
            ProvisionError::OperationFailed(op) => match op.error_message() {
                Some(message) => format!("Operation {} failed: {}", op.name, message),
                None => format!("Operation {} failed", op.name),
            },
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Auth => {
                "Check GCP_ACCESS_TOKEN / GCP_PROJECT or run `gcloud auth application-default login`"
            }
            ErrorCategory::Request => {
                "Verify network access and that the account has permission on the project"
            }
            ErrorCategory::JobFailure => {
                "Inspect the operation in the Cloud Console and run `init` again"
            }
            ErrorCategory::Cancelled => "Run the command again to resume initialization",
            ErrorCategory::Configuration => "Fix the configuration file and try again",
        }
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
