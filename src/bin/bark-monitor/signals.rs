use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Set by SIGINT/SIGTERM.
static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Set by SIGUSR1; the main loop flips pause/resume when it sees it.
static PAUSE_TOGGLED: AtomicBool = AtomicBool::new(false);

// Handlers only touch atomics, which is async-signal-safe.
extern "C" fn handle_stop(_: libc::c_int) {
    STOP_REQUESTED.store(true, Ordering::SeqCst);
}

extern "C" fn handle_pause_toggle(_: libc::c_int) {
    PAUSE_TOGGLED.store(true, Ordering::SeqCst);
}

fn install(signal: libc::c_int, name: &str, handler: extern "C" fn(libc::c_int)) -> Result<()> {
    unsafe {
        // SAFETY: the handler is an extern "C" fn that only stores to an atomic.
        let handler = handler as *const () as libc::sighandler_t;
        if libc::signal(signal, handler) == libc::SIG_ERR {
            debug!(signal = name, "failed to install signal handler");
            return Err(anyhow!("failed to install {name} handler"));
        }
    }
    Ok(())
}

pub(crate) fn install_handlers() -> Result<()> {
    install(libc::SIGINT, "SIGINT", handle_stop)?;
    install(libc::SIGTERM, "SIGTERM", handle_stop)?;
    install(libc::SIGUSR1, "SIGUSR1", handle_pause_toggle)
}

pub(crate) fn stop_requested() -> bool {
    STOP_REQUESTED.load(Ordering::SeqCst)
}

pub(crate) fn take_pause_toggle() -> bool {
    PAUSE_TOGGLED.swap(false, Ordering::SeqCst)
}
