pub mod enabler;
pub mod orchestrator;
pub mod poller;
pub mod provisioner;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

pub use enabler::ServiceEnabler;
pub use orchestrator::{
    ChannelObserver, InitializationReport, InitializerStatus, Phase, ProjectInitializer, Stage,
    StageEvent, StageObserver, StageOutcome, StageReport,
};
pub use poller::{OperationPoller, PollSettings};
pub use provisioner::ResourceProvisioner;
pub use resolver::ProjectStateResolver;
