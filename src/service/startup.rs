use anyhow::{Result, bail};
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use crate::config::SwitchingConfig;
use crate::system::{EventSource, Subscription};

/// Waits for the audio server to come up at process start.
///
/// An attempt succeeds once the subscription has delivered its first line;
/// a refused connection or a feed that closes first is retried every
/// `retry_interval` until `budget` has passed since the first attempt.
#[derive(Debug, Clone, Copy)]
pub struct StartupSynchronizer {
    retry_interval: Duration,
    budget: Duration,
}

impl StartupSynchronizer {
    pub fn new(retry_interval: Duration, budget: Duration) -> Self {
        Self {
            retry_interval,
            budget,
        }
    }

    pub fn from_config(config: &SwitchingConfig) -> Self {
        Self::new(config.retry_interval(), config.startup_timeout())
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Connect and return the live subscription with the first line it produced
    pub async fn establish<E: EventSource>(&self, source: &E) -> Result<(E::Subscription, String)> {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            if started.elapsed() >= self.budget {
                warn!(
                    "Giving up on the audio server after {} attempts",
                    attempts
                );
                bail!(
                    "Audio server unavailable: no event feed within {}s",
                    self.budget.as_secs()
                );
            }
            attempts += 1;

            match source.connect().await {
                Ok(mut subscription) => match subscription.next_line().await {
                    Ok(Some(line)) => {
                        info!(
                            "Connected to the audio server after {} attempt(s)",
                            attempts
                        );
                        return Ok((subscription, line));
                    }
                    Ok(None) => debug!("Attempt {}: event feed closed before any event", attempts),
                    Err(e) => debug!("Attempt {}: reading event feed failed: {:#}", attempts, e),
                },
                Err(e) => debug!("Attempt {}: {:#}", attempts, e),
            }

            sleep(self.retry_interval).await;
        }
    }
}
