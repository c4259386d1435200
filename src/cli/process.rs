use std::{env, path::Path, process::Stdio};

use anyhow::{anyhow, Result};
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

/// Stops every other process started from the executable at `name`. Returns how many were
/// stopped.
pub fn kill_previous_servers(name: &Path) -> Result<usize> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow!("Can't get current pid {e}"))?;
    let mut killed = 0;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Stopping previous tracker {pid}");
            // This will forcefully terminate the process on Windows, the final dwell of that
            // process is lost.
            if needs_forced_kill(process.kill_with(Signal::Term)) {
                process.kill();
            }
            process.wait();
            killed += 1;
        }
    }
    Ok(killed)
}

/// `kill_with` gives [None] when the signal isn't supported and `Some(false)` when it couldn't be
/// delivered. Both need the forced kill.
fn needs_forced_kill(terminate: Option<bool>) -> bool {
    terminate != Some(true)
}

/// Shuts down previous trackers and starts a new one as a detached `serve` process.
pub fn restart_server(dir: &Path, fresh: bool) -> Result<()> {
    let process_name = env::current_exe()?;
    kill_previous_servers(&process_name)?;
    let mut command = std::process::Command::new(process_name);
    command.arg("--dir").arg(dir).arg("serve");
    if fresh {
        command.arg("--fresh");
    }

    #[cfg(feature = "win")]
    {
        use std::os::windows::process::CommandExt;
        use windows::Win32::System::Threading::DETACHED_PROCESS;
        command.creation_flags(DETACHED_PROCESS.0);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());
    command.stderr(Stdio::null());

    #[allow(clippy::zombie_processes)]
    let child = command.spawn()?;
    println!("Started tracker (pid {})", child.id());
    Ok(())
}
