use crate::config::ProvisionerConfig;
use crate::core::enabler::ServiceEnabler;
use crate::core::poller::{OperationPoller, PollSettings};
use crate::core::provisioner::ResourceProvisioner;
use crate::core::resolver::ProjectStateResolver;
use crate::domain::model::{ProjectState, ProvisioningRequest};
use crate::domain::ports::{AuthProvider, CloudApi};
use crate::utils::cancel::{cancel_pair, CancelHandle, CancelSignal};
use crate::utils::error::{ProvisionError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    EnableApis,
    CreateBucket,
    CreateFunction,
}

impl Stage {
    /// 固定的使用者訊息，底層錯誤另外保留在 StageOutcome
    pub fn failure_message(&self) -> &'static str {
        match self {
            Stage::EnableApis => "Unable to enable necessary GCP APIs",
            Stage::CreateBucket => "Unable to create GCS Bucket",
            Stage::CreateFunction => "Unable to create Cloud Function",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::EnableApis => "enable",
            Stage::CreateBucket => "bucket",
            Stage::CreateFunction => "function",
        }
    }
}

#[derive(Debug)]
pub enum StageOutcome {
    Succeeded,
    /// Found by the pre-creation re-check, nothing was created
    AlreadyPresent,
    Failed(ProvisionError),
}

#[derive(Debug)]
pub struct StageReport {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl StageReport {
    fn new(stage: Stage, result: Result<StageOutcome>, started: Instant) -> Self {
        let outcome = result.unwrap_or_else(StageOutcome::Failed);
        Self {
            stage,
            outcome,
            finished_at: Utc::now(),
            elapsed: started.elapsed(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, StageOutcome::Failed(_))
    }

    pub fn failure_message(&self) -> Option<&'static str> {
        self.is_failure().then(|| self.stage.failure_message())
    }

    pub fn error(&self) -> Option<&ProvisionError> {
        match &self.outcome {
            StageOutcome::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn event(&self) -> StageEvent {
        StageEvent {
            stage: self.stage,
            succeeded: !self.is_failure(),
            already_present: matches!(self.outcome, StageOutcome::AlreadyPresent),
            message: self.failure_message().map(str::to_string),
            detail: self.error().map(|e| e.to_string()),
            finished_at: self.finished_at,
        }
    }
}

/// Cloneable summary of a finished stage, suitable for channels and JSON output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageEvent {
    pub stage: Stage,
    pub succeeded: bool,
    pub already_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub finished_at: DateTime<Utc>,
}

/// 每個階段結束時恰好通知一次
pub trait StageObserver: Send + Sync {
    fn stage_completed(&self, report: &StageReport);
}

impl<F> StageObserver for F
where
    F: Fn(&StageReport) + Send + Sync,
{
    fn stage_completed(&self, report: &StageReport) {
        self(report)
    }
}

/// Forwards every finished stage as a [`StageEvent`] to a channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<StageEvent>,
}

impl ChannelObserver {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StageEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl StageObserver for ChannelObserver {
    fn stage_completed(&self, report: &StageReport) {
        if self.tx.send(report.event()).is_err() {
            tracing::debug!("Stage observer channel closed, dropping {:?}", report.stage);
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    EnablingApis,
    Provisioning {
        creating_bucket: bool,
        creating_function: bool,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InitializerStatus {
    pub phase: Phase,
    /// Failure messages of the latest attempt
    pub errors: Vec<String>,
}

impl InitializerStatus {
    pub fn is_idle(&self) -> bool {
        self.phase == Phase::Idle
    }
}

#[derive(Debug, Default)]
pub struct InitializationReport {
    /// `None` when the snapshot was already ready
    pub request: Option<ProvisioningRequest>,
    pub stages: Vec<StageReport>,
}

impl InitializationReport {
    pub fn is_noop(&self) -> bool {
        self.request.is_none()
    }

    pub fn succeeded(&self) -> bool {
        self.stages.iter().all(|s| !s.is_failure())
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn failure_messages(&self) -> Vec<&'static str> {
        self.stages.iter().filter_map(|s| s.failure_message()).collect()
    }

    /// 最嚴重的底層錯誤，CLI 用來決定 exit code
    pub fn into_worst_error(self) -> Option<ProvisionError> {
        self.stages
            .into_iter()
            .filter_map(|s| match s.outcome {
                StageOutcome::Failed(e) => Some(e),
                _ => None,
            })
            .max_by_key(|e| e.severity())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializerSettings {
    pub bucket_name: Option<String>,
    pub default_region: String,
    pub recheck_before_create: bool,
}

impl From<&ProvisionerConfig> for InitializerSettings {
    fn from(config: &ProvisionerConfig) -> Self {
        Self {
            bucket_name: config.bucket.name.clone(),
            default_region: config.function.default_region.clone(),
            recheck_before_create: config.initialization.recheck_before_create,
        }
    }
}

/// 先啟用 API，再同時建立 bucket 與 Cloud Function
pub struct ProjectInitializer<A: CloudApi, P: AuthProvider> {
    enabler: ServiceEnabler<A, P>,
    provisioner: ResourceProvisioner<A, P>,
    resolver: ProjectStateResolver<A, P>,
    settings: InitializerSettings,
    status: watch::Sender<InitializerStatus>,
    /// 同一時間只跑一個 attempt，狀態頻道才不會互相覆蓋
    attempt: Mutex<()>,
}

impl<A: CloudApi, P: AuthProvider> ProjectInitializer<A, P> {
    pub fn new(api: Arc<A>, auth: Arc<P>, config: &ProvisionerConfig) -> Self {
        Self::with_settings(
            api,
            auth,
            PollSettings::from(&config.polling),
            InitializerSettings::from(config),
        )
    }

    pub fn with_settings(
        api: Arc<A>,
        auth: Arc<P>,
        poll: PollSettings,
        settings: InitializerSettings,
    ) -> Self {
        let poller = OperationPoller::new(api.clone(), poll);
        let (status, _) = watch::channel(InitializerStatus::default());
        Self {
            enabler: ServiceEnabler::new(api.clone(), auth.clone(), poller.clone()),
            provisioner: ResourceProvisioner::new(api.clone(), auth.clone(), poller),
            resolver: ProjectStateResolver::new(api, auth, settings.default_region.clone()),
            settings,
            status,
            attempt: Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<InitializerStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> InitializerStatus {
        self.status.borrow().clone()
    }

    pub fn resolver(&self) -> &ProjectStateResolver<A, P> {
        &self.resolver
    }

    pub fn provisioner(&self) -> &ResourceProvisioner<A, P> {
        &self.provisioner
    }

    /// 依快照推導本次需要的工作
    pub fn plan(&self, state: &ProjectState) -> ProvisioningRequest {
        let bucket_name = (!state.has_gcs_bucket).then(|| {
            self.settings
                .bucket_name
                .clone()
                .unwrap_or_else(|| state.project_id.clone())
        });
        let function_region = (!state.has_cloud_function).then(|| {
            state
                .scheduler_region
                .clone()
                .unwrap_or_else(|| self.settings.default_region.clone())
        });

        ProvisioningRequest {
            project_id: state.project_id.clone(),
            services_to_enable: state.disabled_endpoints(),
            bucket_name,
            function_region,
        }
    }

    /// Runs one provisioning attempt from `state`.
    ///
    /// Stage failures never abort the call; they are reported to `observer`
    /// and collected in the returned report. A ready snapshot does nothing.
    /// Overlapping attempts on the same initializer run one after another.
    pub async fn initialize(
        &self,
        state: &ProjectState,
        observer: &dyn StageObserver,
        cancel: &CancelSignal,
    ) -> InitializationReport {
        let request = self.plan(state);
        if request.is_empty() {
            tracing::debug!("Project {} is already initialized", state.project_id);
            return InitializationReport::default();
        }

        let _attempt = match self.attempt.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::info!("⏳ Another initialization attempt is running, waiting for it");
                self.attempt.lock().await
            }
        };

        tracing::info!(
            project = %request.project_id,
            services = request.services_to_enable.len(),
            bucket = request.bucket_name.is_some(),
            function = request.function_region.is_some(),
            "🚀 Initializing project"
        );

        let creates_resources = request.bucket_name.is_some() || request.function_region.is_some();
        let provisioning = Phase::Provisioning {
            creating_bucket: request.bucket_name.is_some(),
            creating_function: request.function_region.is_some(),
        };
        let first_phase = if request.services_to_enable.is_empty() {
            provisioning.clone()
        } else {
            Phase::EnablingApis
        };
        self.status.send_replace(InitializerStatus {
            phase: first_phase,
            errors: Vec::new(),
        });

        let mut report = InitializationReport::default();

        if !request.services_to_enable.is_empty() {
            let enable_report = self.run_enable_stage(&request.services_to_enable, cancel).await;
            observer.stage_completed(&enable_report);
            let failed = enable_report.is_failure();
            report.stages.push(enable_report);

            if failed || !creates_resources {
                self.set_phase(Phase::Idle);
                report.request = Some(request);
                return report;
            }
            self.set_phase(provisioning);
        }

        let bucket = async {
            match &request.bucket_name {
                Some(name) => Some(self.run_bucket_stage(name, observer, cancel).await),
                None => None,
            }
        };
        let function = async {
            match &request.function_region {
                Some(region) => Some(self.run_function_stage(region, observer, cancel).await),
                None => None,
            }
        };
        let (bucket, function) = tokio::join!(bucket, function);
        report.stages.extend(bucket);
        report.stages.extend(function);

        self.set_phase(Phase::Idle);
        if report.succeeded() {
            tracing::info!("✅ Project {} initialized", request.project_id);
        } else {
            tracing::warn!(
                "⚠️ Project {} initialization finished with errors: {}",
                request.project_id,
                report.failure_messages().join("; ")
            );
        }
        report.request = Some(request);
        report
    }

    async fn run_enable_stage(&self, endpoints: &[String], cancel: &CancelSignal) -> StageReport {
        let started = Instant::now();
        let result = self
            .enabler
            .enable(endpoints, cancel)
            .await
            .map(|_| StageOutcome::Succeeded);

        let report = StageReport::new(Stage::EnableApis, result, started);
        self.record_failure(&report);
        report
    }

    async fn run_bucket_stage(
        &self,
        name: &str,
        observer: &dyn StageObserver,
        cancel: &CancelSignal,
    ) -> StageReport {
        let started = Instant::now();
        let result = self.create_bucket_unless_present(name, cancel).await;
        let report = StageReport::new(Stage::CreateBucket, result, started);

        self.status.send_modify(|status| {
            if let Phase::Provisioning { creating_bucket, .. } = &mut status.phase {
                *creating_bucket = false;
            }
        });
        self.record_failure(&report);
        observer.stage_completed(&report);
        report
    }

    async fn run_function_stage(
        &self,
        region: &str,
        observer: &dyn StageObserver,
        cancel: &CancelSignal,
    ) -> StageReport {
        let started = Instant::now();
        let result = self.create_function_unless_present(region, cancel).await;
        let report = StageReport::new(Stage::CreateFunction, result, started);

        self.status.send_modify(|status| {
            if let Phase::Provisioning {
                creating_function, ..
            } = &mut status.phase
            {
                *creating_function = false;
            }
        });
        self.record_failure(&report);
        observer.stage_completed(&report);
        report
    }

    async fn create_bucket_unless_present(
        &self,
        name: &str,
        cancel: &CancelSignal,
    ) -> Result<StageOutcome> {
        if cancel.is_cancelled() {
            return Err(ProvisionError::Cancelled);
        }
        if self.settings.recheck_before_create && self.resolver.bucket_present().await? {
            tracing::info!("🪣 A GCS bucket already exists, skipping creation of {}", name);
            return Ok(StageOutcome::AlreadyPresent);
        }
        self.provisioner.create_bucket(name).await?;
        Ok(StageOutcome::Succeeded)
    }

    async fn create_function_unless_present(
        &self,
        region: &str,
        cancel: &CancelSignal,
    ) -> Result<StageOutcome> {
        if cancel.is_cancelled() {
            return Err(ProvisionError::Cancelled);
        }
        if self.settings.recheck_before_create && self.resolver.function_present(region).await? {
            tracing::info!("☁️ Cloud Function already deployed in {}, skipping", region);
            return Ok(StageOutcome::AlreadyPresent);
        }
        self.provisioner.create_function(region, cancel).await?;
        Ok(StageOutcome::Succeeded)
    }

    fn set_phase(&self, phase: Phase) {
        self.status.send_modify(|status| status.phase = phase);
    }

    fn record_failure(&self, report: &StageReport) {
        if let Some(message) = report.failure_message() {
            tracing::error!(
                stage = report.stage.label(),
                "❌ {}: {}",
                message,
                report.error().map(|e| e.to_string()).unwrap_or_default()
            );
            self.status
                .send_modify(|status| status.errors.push(message.to_string()));
        }
    }
}

impl<A, P> ProjectInitializer<A, P>
where
    A: CloudApi + 'static,
    P: AuthProvider + 'static,
{
    /// Fire-and-forget entry point. The attempt runs on its own task and can be
    /// stopped through the returned handle.
    pub fn spawn(
        self: &Arc<Self>,
        state: ProjectState,
        observer: Arc<dyn StageObserver>,
    ) -> (JoinHandle<InitializationReport>, CancelHandle) {
        let (handle, signal) = cancel_pair();
        let initializer = Arc::clone(self);
        let task = tokio::spawn(async move {
            initializer
                .initialize(&state, observer.as_ref(), &signal)
                .await
        });
        (task, handle)
    }
}
