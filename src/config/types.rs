use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::Level;

/// Upper bound for `general.log_retention_days`, ten years
pub const MAX_LOG_RETENTION_DAYS: u64 = 3650;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub switching: SwitchingConfig,

    /// Applications allowed to trigger a profile switch
    #[serde(default = "default_clients")]
    pub clients: Vec<ClientRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
    pub log_to_file: bool,
    pub json_logs: bool,
    pub log_retention_days: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchingConfig {
    /// Mute paused playback of other applications for the duration of a call
    pub mute_other_streams: bool,
    pub volume_memory: VolumeMemoryMode,
    pub high_fidelity_profile: String,
    pub telephony_profile: String,
    /// How long to keep retrying the audio server at startup
    pub startup_timeout_secs: u64,
    pub retry_interval_ms: u64,
}

/// How volume is remembered across profile switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeMemoryMode {
    /// One slot, replayed by whichever switch comes next
    #[default]
    Shared,
    /// One slot per profile
    PerProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRule {
    pub name: String,
    pub match_type: MatchType,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    Contains,
    StartsWith,
    EndsWith,
    Regex,
}

fn default_enabled() -> bool {
    true
}

fn default_clients() -> Vec<ClientRule> {
    vec![
        ClientRule::new("Skype", MatchType::Exact),
        ClientRule::new("WEBRTC VoiceEngine", MatchType::Exact),
    ]
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_to_file: false,
            json_logs: false,
            log_retention_days: 7,
        }
    }
}

impl Default for SwitchingConfig {
    fn default() -> Self {
        Self {
            mute_other_streams: true,
            volume_memory: VolumeMemoryMode::Shared,
            high_fidelity_profile: "a2dp_sink".to_string(),
            telephony_profile: "headset_head_unit".to_string(),
            startup_timeout_secs: 30,
            retry_interval_ms: 1000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            switching: SwitchingConfig::default(),
            clients: default_clients(),
        }
    }
}

impl Config {
    /// Reject settings the switcher cannot run with
    pub fn validate(&self) -> Result<()> {
        let general = &self.general;
        if general.log_level.parse::<Level>().is_err() {
            bail!(
                "general.log_level '{}' is not one of trace, debug, info, warn, error",
                general.log_level
            );
        }
        if general.log_retention_days > MAX_LOG_RETENTION_DAYS {
            bail!(
                "general.log_retention_days must be at most {}",
                MAX_LOG_RETENTION_DAYS
            );
        }

        let switching = &self.switching;

        if switching.high_fidelity_profile.trim().is_empty() {
            bail!("switching.high_fidelity_profile must not be empty");
        }
        if switching.telephony_profile.trim().is_empty() {
            bail!("switching.telephony_profile must not be empty");
        }
        if switching.high_fidelity_profile == switching.telephony_profile {
            bail!(
                "switching.high_fidelity_profile and switching.telephony_profile are both '{}'",
                switching.telephony_profile
            );
        }
        if switching.startup_timeout_secs == 0 {
            bail!("switching.startup_timeout_secs must be greater than zero");
        }
        if switching.retry_interval_ms == 0 {
            bail!("switching.retry_interval_ms must be greater than zero");
        }

        for rule in &self.clients {
            rule.validate()?;
        }

        Ok(())
    }
}

impl SwitchingConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl ClientRule {
    pub fn new(name: &str, match_type: MatchType) -> Self {
        Self {
            name: name.to_string(),
            match_type,
            enabled: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            bail!("client rule with an empty name");
        }
        if self.match_type == MatchType::Regex {
            regex::Regex::new(&self.name)
                .with_context(|| format!("Invalid client pattern '{}'", self.name))?;
        }
        Ok(())
    }
}
