use crate::config::toml_config::PollingConfig;
use crate::domain::model::{Credential, Operation, OperationOutcome, PendingJob};
use crate::domain::ports::CloudApi;
use crate::utils::cancel::CancelSignal;
use crate::utils::error::{ProvisionError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

/// `tokio::time::interval` rejects a zero period
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` polls until the job reports completion
    pub max_duration: Option<Duration>,
}

impl Default for PollSettings {
    fn default() -> Self {
        PollSettings::from(&PollingConfig::default())
    }
}

impl From<&PollingConfig> for PollSettings {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            max_duration: config.max_duration(),
        }
    }
}

/// 將「送出非同步作業、取得 handle」轉成單一可 await 的最終結果
pub struct OperationPoller<A: CloudApi> {
    api: Arc<A>,
    settings: PollSettings,
}

impl<A: CloudApi> Clone for OperationPoller<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            settings: self.settings,
        }
    }
}

impl<A: CloudApi> OperationPoller<A> {
    pub fn new(api: Arc<A>, mut settings: PollSettings) -> Self {
        if settings.interval < MIN_POLL_INTERVAL {
            tracing::warn!(
                "⚠️ Poll interval {:?} is too small, using {:?}",
                settings.interval,
                MIN_POLL_INTERVAL
            );
            settings.interval = MIN_POLL_INTERVAL;
        }
        Self { api, settings }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    /// 每個 interval 查詢一次作業狀態，直到 `done`。
    ///
    /// 查詢本身失敗即終止並原樣回傳錯誤；`done` 且有 `response` 回傳該作業，
    /// `done` 但沒有 `response` 回傳 [`ProvisionError::OperationFailed`]。
    pub async fn await_operation(
        &self,
        credential: &Credential,
        job: &PendingJob,
        cancel: &CancelSignal,
    ) -> Result<Operation> {
        let started = Instant::now();
        let deadline = self.settings.max_duration.map(|max| started + max);

        // owned by this call and dropped on every exit path
        let mut ticker =
            tokio::time::interval_at(started + self.settings.interval, self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut queries: u32 = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!("⏹️ Stopped polling {} after {} queries", job.name, queries);
                    return Err(ProvisionError::Cancelled);
                }
                _ = ticker.tick() => {}
            }

            queries += 1;
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ProvisionError::Cancelled),
                result = self.api.get_operation(credential, job) => result,
            };

            let operation = match result {
                Ok(operation) => operation,
                Err(e) => {
                    tracing::error!("❌ Unable to retrieve status of operation {}: {}", job.name, e);
                    return Err(e);
                }
            };

            match operation.outcome() {
                OperationOutcome::Running => {
                    if let Some(deadline) = deadline {
                        if Instant::now() >= deadline {
                            tracing::error!(
                                "⏱️ Operation {} still running after {} queries, giving up",
                                job.name,
                                queries
                            );
                            return Err(ProvisionError::PollTimeout {
                                name: job.name.clone(),
                                waited_secs: started.elapsed().as_secs(),
                            });
                        }
                    }
                    tracing::info!(
                        "⏳ Operation {} is still running, polling again in {:?}",
                        job.name,
                        self.settings.interval
                    );
                }
                OperationOutcome::Succeeded => {
                    tracing::debug!("✅ Operation {} completed after {} queries", job.name, queries);
                    return Ok(operation);
                }
                OperationOutcome::Failed => {
                    tracing::error!("❌ Error returned from operation {}", job.name);
                    return Err(ProvisionError::OperationFailed(operation));
                }
            }
        }
    }
}
