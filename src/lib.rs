pub mod core;

#[cfg(feature = "desktop")]
mod commands;

use tracing_subscriber::EnvFilter;

/// Structured logging, overridable with `RUST_LOG`. Safe to call twice.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ether_launcher_lib=debug")),
        )
        .try_init();
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use std::sync::Arc;
    use tauri::Manager;
    use tokio::sync::Mutex;

    use crate::core::launch::tauri_host::TauriWindowHost;
    use crate::core::state::{default_data_dir, AppState};

    init_tracing();
    tracing::info!("Ether launcher starting...");

    tauri::Builder::default()
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            let handle = app.handle().clone();
            let state = AppState::new(
                default_data_dir(),
                Arc::new(TauriWindowHost::new(handle.clone())),
                Arc::new(handle),
            )?;
            app.manage(Arc::new(Mutex::new(state)));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::start_install,
            commands::get_install_status,
            commands::cancel_install,
            commands::check_installed,
            commands::uninstall_game,
            commands::launch_game,
            commands::get_active_games,
            commands::close_game,
            commands::get_launcher_settings,
            commands::update_launcher_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
