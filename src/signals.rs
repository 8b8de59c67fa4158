//! Process signal handling
//!
//! Handlers only raise flags. The event loop checks them between events:
//! a termination flag starts the shutdown sequence, a child flag makes the
//! loop reap exited children. Reaping never runs while a command is being
//! spawned, so `Command::spawn` always gets to wait on its own failed child.

use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::Pid;
use tracing::debug;

static SHUTDOWN: OnceLock<Arc<AtomicBool>> = OnceLock::new();
static CHILD_EXITED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_terminate(_: nix::libc::c_int) {
    if let Some(flag) = SHUTDOWN.get() {
        flag.store(true, Ordering::SeqCst);
    }
}

extern "C" fn on_child(_: nix::libc::c_int) {
    CHILD_EXITED.store(true, Ordering::SeqCst);
}

/// Install the handlers and return the flag set by SIGTERM, SIGINT and SIGHUP
pub fn install() -> Result<Arc<AtomicBool>> {
    let flag = SHUTDOWN
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone();

    let terminate = SigAction::new(
        SigHandler::Handler(on_terminate),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    let child = SigAction::new(
        SigHandler::Handler(on_child),
        SaFlags::SA_RESTART | SaFlags::SA_NOCLDSTOP,
        SigSet::empty(),
    );

    // SAFETY: both handlers only store to an atomic
    unsafe {
        for signal in [Signal::SIGTERM, Signal::SIGINT, Signal::SIGHUP] {
            sigaction(signal, &terminate)
                .with_context(|| format!("Failed to install {} handler", signal))?;
        }
        sigaction(Signal::SIGCHLD, &child).context("Failed to install SIGCHLD handler")?;
    }

    // Children that exited before the handler existed
    CHILD_EXITED.store(true, Ordering::SeqCst);

    debug!("Signal handlers installed");
    Ok(flag)
}

/// Reap every exited child if SIGCHLD arrived since the last call.
/// Returns how many were reaped.
pub fn reap_children() -> usize {
    if !CHILD_EXITED.swap(false, Ordering::SeqCst) {
        return 0;
    }
    let mut reaped = 0;
    while let Ok(status) = waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
        if status == WaitStatus::StillAlive {
            break;
        }
        debug!("Reaped child: {:?}", status);
        reaped += 1;
    }
    reaped
}
