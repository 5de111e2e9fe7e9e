pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, Command};

pub use adapters::{ConfiguredAuthProvider, GcpRestClient, StaticAuthProvider};
pub use config::ProvisionerConfig;
pub use core::{
    InitializationReport, InitializerStatus, Phase, ProjectInitializer, ProjectStateResolver,
    Stage, StageEvent, StageObserver, StageOutcome, StageReport,
};
pub use domain::model::{Operation, ProjectState};
pub use domain::ports::{AuthProvider, CloudApi};
pub use utils::cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use utils::error::{ProvisionError, Result};
