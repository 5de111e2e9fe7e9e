use anyhow::Context;
use clap::Parser;
use scheduler_provisioner::utils::error::ErrorSeverity;
use scheduler_provisioner::utils::logger::{self, LogFormat};
use scheduler_provisioner::utils::validation::Validate;
use scheduler_provisioner::{
    CliConfig, Command, ConfiguredAuthProvider, GcpRestClient, ProjectInitializer, ProjectState,
    ProvisionError, ProvisionerConfig, StageReport,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

type Initializer = ProjectInitializer<GcpRestClient, ConfiguredAuthProvider>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json {
        logger::init_logger(LogFormat::Json, cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting scheduler-provisioner");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 載入並驗證配置
    let config = match cli.load_provisioner_config().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let api = Arc::new(GcpRestClient::new(&config)?);
    let auth = Arc::new(ConfiguredAuthProvider::from_config(
        &config.auth,
        Duration::from_secs(config.http.timeout_seconds),
    )?);

    let result = match &cli.command {
        Command::Status => status(&cli, &config, api, auth).await,
        Command::Init => init(&cli, &config, api, auth).await,
        Command::CreateApp { region } => create_app(&cli, &config, api, auth, region).await,
        Command::AppLocations => app_locations(&cli, &config, api, auth).await,
    };

    match result {
        Ok(Outcome::Success) => Ok(()),
        Ok(Outcome::Failed(e)) => exit_with(&e),
        Err(Failure::Provision(e)) => exit_with(&e),
        Err(Failure::Output(e)) => Err(e),
    }
}

enum Outcome {
    Success,
    /// 部分階段失敗，已輸出結果
    Failed(ProvisionError),
}

enum Failure {
    Provision(ProvisionError),
    Output(anyhow::Error),
}

impl From<ProvisionError> for Failure {
    fn from(e: ProvisionError) -> Self {
        Failure::Provision(e)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(e: anyhow::Error) -> Self {
        Failure::Output(e)
    }
}

type CliResult = std::result::Result<Outcome, Failure>;

fn exit_with(e: &ProvisionError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 130, // 使用者中斷
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

fn print_state(state: &ProjectState) {
    println!("Project: {}", state.project_id);
    for status in &state.service_statuses {
        let mark = if status.enabled { "✅" } else { "❌" };
        println!("  {} {} ({})", mark, status.service.name, status.service.endpoint);
    }
    if state.gcs_buckets.is_empty() {
        println!("  ❌ GCS bucket");
    } else {
        println!("  ✅ GCS bucket: {}", state.gcs_buckets.join(", "));
    }
    let function_mark = if state.has_cloud_function { "✅" } else { "❌" };
    println!("  {} Cloud Function", function_mark);
    match &state.scheduler_region {
        Some(region) => println!("  ✅ Cloud Scheduler region: {}", region),
        None => println!("  ⚠️ No App Engine app, Cloud Scheduler region not set"),
    }
    if state.is_ready() {
        println!("✅ Project is ready to schedule Notebooks");
    }
}

async fn status(
    cli: &CliConfig,
    config: &ProvisionerConfig,
    api: Arc<GcpRestClient>,
    auth: Arc<ConfiguredAuthProvider>,
) -> CliResult {
    let initializer = Initializer::new(api, auth, config);
    let state = initializer.resolver().resolve().await?;

    if cli.json {
        print_json(&state)?;
    } else {
        print_state(&state);
    }
    Ok(Outcome::Success)
}

async fn init(
    cli: &CliConfig,
    config: &ProvisionerConfig,
    api: Arc<GcpRestClient>,
    auth: Arc<ConfiguredAuthProvider>,
) -> CliResult {
    let initializer = Arc::new(Initializer::new(api, auth, config));
    let state = initializer.resolver().resolve().await?;

    if state.is_ready() {
        if cli.json {
            print_json(&state)?;
        } else {
            println!("✅ Project {} is already initialized", state.project_id);
        }
        return Ok(Outcome::Success);
    }

    let json = cli.json;
    let observer = Arc::new(move |report: &StageReport| {
        if json {
            return;
        }
        match report.failure_message() {
            Some(message) => println!("❌ {}", message),
            None => println!("✅ {:?} finished in {:.1?}", report.stage, report.elapsed),
        }
    });

    let (mut task, cancel) = initializer.spawn(state, observer);
    let report = tokio::select! {
        joined = &mut task => joined.context("Initialization task panicked")?,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("⏹️ Interrupted, cancelling initialization");
            cancel.cancel();
            task.await.context("Initialization task panicked")?
        }
    };

    if json {
        let events: Vec<_> = report.stages.iter().map(StageReport::event).collect();
        print_json(&events)?;
    }

    if report.succeeded() {
        if !json {
            let state = initializer.resolver().resolve().await?;
            print_state(&state);
        }
        return Ok(Outcome::Success);
    }

    tracing::error!("❌ Initialization incomplete: {}", report.failure_messages().join("; "));
    let worst = report
        .into_worst_error()
        .context("Failed stage without an error")?;
    Ok(Outcome::Failed(worst))
}

async fn create_app(
    cli: &CliConfig,
    config: &ProvisionerConfig,
    api: Arc<GcpRestClient>,
    auth: Arc<ConfiguredAuthProvider>,
    region: &str,
) -> CliResult {
    scheduler_provisioner::utils::validation::validate_non_empty_string("region", region)?;
    let initializer = Initializer::new(api, auth, config);
    let (cancel, signal) = scheduler_provisioner::cancel_pair();

    let creation = initializer
        .provisioner()
        .create_app_engine_app(region, &signal);
    tokio::pin!(creation);
    let app = tokio::select! {
        app = &mut creation => app?,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            creation.await?
        }
    };

    if cli.json {
        print_json(&app)?;
    } else {
        println!(
            "✅ Created App Engine app {} in {}",
            app.id,
            app.location_id.as_deref().unwrap_or(region)
        );
    }
    Ok(Outcome::Success)
}

async fn app_locations(
    cli: &CliConfig,
    config: &ProvisionerConfig,
    api: Arc<GcpRestClient>,
    auth: Arc<ConfiguredAuthProvider>,
) -> CliResult {
    let locations: Vec<_> = Initializer::new(api, auth, config)
        .provisioner()
        .app_engine_locations()
        .await?
        .into_iter()
        .filter(|l| l.standard_environment_available())
        .collect();

    if cli.json {
        let ids: Vec<&str> = locations.iter().map(|l| l.location_id.as_str()).collect();
        print_json(&ids)?;
    } else {
        for location in &locations {
            println!("{}", location.location_id);
        }
    }
    Ok(Outcome::Success)
}
