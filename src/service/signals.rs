use anyhow::Result;
use signal_hook::consts::signal::*;
use signal_hook_tokio::Signals;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{info, warn};

/// Requests delivered to the running service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    /// SIGTERM / SIGINT
    Shutdown,
    /// SIGHUP
    Reload,
}

/// Forwards process signals to the service over a channel
#[derive(Clone)]
pub struct SignalHandler {
    signal_sender: mpsc::UnboundedSender<SignalType>,
}

impl SignalHandler {
    pub fn new(signal_sender: mpsc::UnboundedSender<SignalType>) -> Self {
        Self { signal_sender }
    }

    /// Listen for SIGTERM, SIGINT and SIGHUP until a shutdown signal arrives
    pub async fn listen_for_signals(&self) -> Result<()> {
        let mut signals = Signals::new([SIGTERM, SIGINT, SIGHUP])?;
        let handle = signals.handle();

        info!("Signal handler initialized, listening for SIGTERM, SIGINT, SIGHUP");

        while let Some(signal) = signals.next().await {
            match signal {
                SIGTERM | SIGINT => {
                    info!(
                        "Received shutdown signal ({}), initiating graceful shutdown",
                        signal
                    );
                    if self.signal_sender.send(SignalType::Shutdown).is_err() {
                        warn!("Service already stopped, shutdown signal dropped");
                    }
                    break;
                }
                SIGHUP => {
                    if let Err(e) = self.signal_sender.send(SignalType::Reload) {
                        warn!("Failed to send reload signal: {}", e);
                    }
                }
                _ => {
                    warn!("Received unexpected signal: {}", signal);
                }
            }
        }

        handle.close();
        Ok(())
    }
}
