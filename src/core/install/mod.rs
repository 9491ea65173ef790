pub mod paths;
pub mod pipeline;
pub mod progress;
pub mod service;

pub use pipeline::{InstallOutcome, InstallRequest, Installer};
pub use progress::{InstallEvent, InstallObserver, NullObserver, ProgressEvent, ProgressPhase};
pub use service::{
    CancelInstallResponse, InstallRecord, InstallService, InstallStatus, InstallStatusResponse,
    StartInstallResponse,
};
