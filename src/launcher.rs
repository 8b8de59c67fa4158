//! Detached launching of external commands

use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

/// Run `command` through `/bin/sh -c` in its own session. Failures are
/// logged and otherwise ignored; the event loop reaps the child once it exits.
pub fn spawn(command: &str) {
    let mut child = Command::new("/bin/sh");
    child.arg("-c").arg(command).stdin(Stdio::null());

    // SAFETY: setsid is async-signal-safe and touches no parent state
    unsafe {
        child.pre_exec(|| {
            nix::unistd::setsid()?;
            Ok(())
        });
    }

    match child.spawn() {
        Ok(process) => debug!("Launched {:?} (pid {})", command, process.id()),
        Err(e) => warn!("Failed to launch {:?}: {}", command, e),
    }
}
