// ─── Native Process ───
// Spawns a bundle executable detached from the launcher and reports its exit.

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};

/// Owner's side of a running child: its pid and a kill switch.
pub struct ProcessHandle {
    pid: Option<u32>,
    kill: Option<oneshot::Sender<()>>,
}

impl ProcessHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Ask the supervisor to force-kill the child. Returns false if the
    /// child already exited.
    pub fn kill(&mut self) -> bool {
        match self.kill.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

/// A spawned child plus its exit notification.
pub struct SpawnedProcess {
    pub handle: ProcessHandle,
    /// Resolves with the exit status (or `None` if waiting failed).
    pub exited: oneshot::Receiver<Option<ExitStatus>>,
}

/// Spawn `executable` with `working_dir` as cwd and no inherited stdio.
///
/// The child gets its own process group (console on Windows) and is not
/// killed when the handle or the launcher goes away.
pub fn spawn_detached(executable: &Path, working_dir: &Path) -> LauncherResult<SpawnedProcess> {
    let mut cmd = Command::new(executable);
    cmd.current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(false);
    configure_platform_spawn(&mut cmd);

    debug!("Command: {:?}", cmd);
    let mut child = cmd.spawn().map_err(|source| LauncherError::Spawn {
        path: executable.to_path_buf(),
        source,
    })?;
    let pid = child.id();
    info!("Spawned {:?} (pid {:?})", executable, pid);

    let (kill_tx, kill_rx) = oneshot::channel::<()>();
    let (exit_tx, exit_rx) = oneshot::channel();

    tokio::spawn(async move {
        let status = tokio::select! {
            status = child.wait() => status,
            Ok(()) = kill_rx => {
                if let Err(e) = child.start_kill() {
                    warn!("Failed to kill pid {:?}: {}", pid, e);
                }
                child.wait().await
            }
        };

        let status = match status {
            Ok(status) => Some(status),
            Err(e) => {
                warn!("Failed while waiting on pid {:?}: {}", pid, e);
                None
            }
        };
        let _ = exit_tx.send(status);
    });

    Ok(SpawnedProcess {
        handle: ProcessHandle {
            pid,
            kill: Some(kill_tx),
        },
        exited: exit_rx,
    })
}

#[cfg(unix)]
fn configure_platform_spawn(cmd: &mut Command) {
    cmd.process_group(0);
}

#[cfg(windows)]
fn configure_platform_spawn(cmd: &mut Command) {
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

#[cfg(not(any(unix, windows)))]
fn configure_platform_spawn(_cmd: &mut Command) {}
