pub mod manager;
pub mod process;
pub mod session;
pub mod window;

#[cfg(feature = "desktop")]
pub mod tauri_host;

pub use manager::{CloseSessionResponse, LaunchManager, LaunchResult};
pub use session::{SessionKind, SessionSummary};
pub use window::{ExternalLinks, HostBridge, NoWindowHost, OpenedWindow, WindowHandle, WindowHost, WindowSpec};
