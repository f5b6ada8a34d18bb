use anyhow::{Context, Result, bail};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::signals::SignalType;
use super::startup::StartupSynchronizer;
use crate::config::Config;
use crate::switcher::CallController;
use crate::system::{AudioControl, EventSource, Subscription};

/// The long-running switcher: startup, then one event at a time until shutdown
pub struct SwitcherService<A: AudioControl, E: EventSource> {
    controller: CallController<A>,
    events: E,
    startup: StartupSynchronizer,
}

impl<A: AudioControl, E: EventSource> SwitcherService<A, E> {
    pub fn new(audio_control: A, events: E, config: &Config) -> Result<Self> {
        Ok(Self {
            controller: CallController::new(audio_control, config)?,
            events,
            startup: StartupSynchronizer::from_config(&config.switching),
        })
    }

    /// Run until a shutdown request arrives.
    ///
    /// Fails when the audio server cannot be reached within the startup
    /// budget, or when its event feed breaks afterwards.
    pub async fn run(&mut self, mut shutdown: mpsc::UnboundedReceiver<SignalType>) -> Result<()> {
        info!(
            "Waiting up to {}s for the audio server",
            self.startup.budget().as_secs()
        );

        let (mut subscription, first_line) = tokio::select! {
            established = self.startup.establish(&self.events) => established?,
            _ = wait_for_shutdown(&mut shutdown) => {
                info!("Shutdown requested during startup");
                return Ok(());
            }
        };

        info!("Watching audio streams");
        self.controller.handle_line(&first_line);

        loop {
            tokio::select! {
                line = subscription.next_line() => {
                    match line.context("Reading the audio server event feed failed")? {
                        Some(line) => {
                            self.controller.handle_line(&line);
                        }
                        None => bail!("Audio server event feed closed"),
                    }
                }
                signal = shutdown.recv() => {
                    match signal {
                        Some(SignalType::Shutdown) => {
                            info!("Shutdown signal received, stopping service");
                            break;
                        }
                        Some(SignalType::Reload) => log_reload_request(),
                        None => {
                            warn!("Signal channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("Service stopped");
        Ok(())
    }

    pub fn controller(&self) -> &CallController<A> {
        &self.controller
    }
}

fn log_reload_request() {
    info!("Configuration is read once at startup, restart the service to apply changes");
}

async fn wait_for_shutdown(shutdown: &mut mpsc::UnboundedReceiver<SignalType>) {
    loop {
        match shutdown.recv().await {
            Some(SignalType::Shutdown) => return,
            Some(SignalType::Reload) => log_reload_request(),
            None => {
                warn!("Signal channel closed");
                return;
            }
        }
    }
}
