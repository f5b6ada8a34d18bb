use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, info};

use crate::config::{ClientRule, Config, MatchType};

enum Matcher {
    Exact(String),
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Pattern(Regex),
}

impl Matcher {
    fn compile(rule: &ClientRule) -> Result<Self> {
        let name = rule.name.clone();
        Ok(match rule.match_type {
            MatchType::Exact => Matcher::Exact(name),
            MatchType::Contains => Matcher::Contains(name),
            MatchType::StartsWith => Matcher::StartsWith(name),
            MatchType::EndsWith => Matcher::EndsWith(name),
            MatchType::Regex => Matcher::Pattern(
                Regex::new(&rule.name)
                    .with_context(|| format!("Invalid client pattern '{}'", rule.name))?,
            ),
        })
    }

    fn matches(&self, label: &str) -> bool {
        match self {
            Matcher::Exact(name) => label == name,
            Matcher::Contains(name) => label.contains(name.as_str()),
            Matcher::StartsWith(name) => label.starts_with(name.as_str()),
            Matcher::EndsWith(name) => label.ends_with(name.as_str()),
            Matcher::Pattern(pattern) => pattern.is_match(label),
        }
    }
}

/// Decides whether a stream belongs to an application allowed to start a call
pub struct ClientFilter {
    matchers: Vec<Matcher>,
}

impl ClientFilter {
    pub fn new(config: &Config) -> Result<Self> {
        Self::from_rules(&config.clients)
    }

    pub fn from_rules(rules: &[ClientRule]) -> Result<Self> {
        let matchers = rules
            .iter()
            .filter(|rule| rule.enabled)
            .map(Matcher::compile)
            .collect::<Result<Vec<_>>>()?;

        info!("Client allow-list has {} active rules", matchers.len());
        Ok(Self { matchers })
    }

    /// `true` iff `label` is present and matches an enabled rule
    pub fn approve(&self, label: Option<&str>) -> bool {
        let Some(label) = label else {
            return false;
        };
        let approved = self.matchers.iter().any(|m| m.matches(label));
        debug!(
            "Client '{}' is {}",
            label,
            if approved { "approved" } else { "not approved" }
        );
        approved
    }

    pub fn rule_count(&self) -> usize {
        self.matchers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(rules: &[(&str, MatchType)]) -> ClientFilter {
        let rules: Vec<ClientRule> = rules
            .iter()
            .map(|(name, match_type)| ClientRule::new(name, match_type.clone()))
            .collect();
        ClientFilter::from_rules(&rules).unwrap()
    }

    #[test]
    fn test_default_allow_list() {
        let filter = ClientFilter::new(&Config::default()).unwrap();
        assert!(filter.approve(Some("Skype")));
        assert!(filter.approve(Some("WEBRTC VoiceEngine")));
        assert!(!filter.approve(Some("Skype for Linux")));
        assert!(!filter.approve(Some("Firefox")));
        assert!(!filter.approve(None));
    }

    #[test]
    fn test_match_types() {
        let filter = filter(&[
            ("zoom", MatchType::Contains),
            ("Teams", MatchType::StartsWith),
            ("Voice", MatchType::EndsWith),
            ("^(Slack|Discord)$", MatchType::Regex),
        ]);

        assert!(filter.approve(Some("zoom-client")));
        assert!(filter.approve(Some("Teams Classic")));
        assert!(filter.approve(Some("Jitsi Voice")));
        assert!(filter.approve(Some("Discord")));
        assert!(!filter.approve(Some("Discord PTB")));
        assert!(!filter.approve(Some("speech-dispatcher")));
    }

    #[test]
    fn test_disabled_rules_are_ignored() {
        let mut rule = ClientRule::new("Skype", MatchType::Exact);
        rule.enabled = false;
        let filter = ClientFilter::from_rules(&[rule]).unwrap();
        assert_eq!(filter.rule_count(), 0);
        assert!(!filter.approve(Some("Skype")));
    }

    #[test]
    fn test_invalid_pattern_fails_construction() {
        let rule = ClientRule::new("[unclosed", MatchType::Regex);
        assert!(ClientFilter::from_rules(&[rule]).is_err());
    }
}
