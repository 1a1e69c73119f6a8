//! Ctrl+C handling
//!
//! The first interrupt cancels the running test flow through its
//! [`InterruptHandle`]; the flow unwinds on its own. Later interrupts are
//! only logged.

use keel_core::interrupt::{InterruptHandle, InterruptReason};
use tokio::task::JoinHandle;

/// Listens for interrupts until dropped
pub struct SignalListener {
    task: JoinHandle<()>,
    #[cfg(unix)]
    signals: signal_hook_tokio::Handle,
}

impl SignalListener {
    /// Start forwarding interrupts to `interrupt`
    #[cfg(unix)]
    pub fn start(interrupt: InterruptHandle) -> std::io::Result<Self> {
        use futures::stream::StreamExt;
        use signal_hook::consts::SIGINT;
        use signal_hook_tokio::Signals;

        let mut signals = Signals::new([SIGINT])?;
        let handle = signals.handle();

        let task = tokio::spawn(async move {
            while let Some(signal) = signals.next().await {
                if signal == SIGINT {
                    on_interrupt(&interrupt);
                }
            }
        });

        Ok(Self {
            task,
            signals: handle,
        })
    }

    /// Start forwarding interrupts to `interrupt`
    #[cfg(not(unix))]
    pub fn start(interrupt: InterruptHandle) -> std::io::Result<Self> {
        let task = tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt(&interrupt);
            }
        });

        Ok(Self { task })
    }
}

impl Drop for SignalListener {
    fn drop(&mut self) {
        #[cfg(unix)]
        self.signals.close();
        self.task.abort();
    }
}

fn on_interrupt(interrupt: &InterruptHandle) {
    if interrupt.interrupt(InterruptReason::UserInterrupt) {
        tracing::debug!("interrupt received, stopping test run");
    } else {
        tracing::debug!("test run already stopping, ignoring interrupt");
    }
}
