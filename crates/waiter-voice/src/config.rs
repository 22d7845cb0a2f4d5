//! Voice subsystem configuration.
//!
//! Loaded with the `config` crate from (lowest to highest precedence): built-in
//! defaults, an optional file, and `WAITER_VOICE_*` environment variables.
//!
//! | Env | Default | Description |
//! |-----|---------|-------------|
//! | WAITER_VOICE_CONFIG | config/voice | Config file path (extension optional). |
//! | WAITER_VOICE_LOCALE | uk-UA | Locale handed to recognition and synthesis. |
//! | WAITER_VOICE_RESTART_DELAY_MS | 250 | Restart delay after an utterance. |
//! | WAITER_VOICE_ERROR_RESTART_DELAY_MS | 1000 | Restart delay after a recognition fault. |
//! | WAITER_VOICE_MATCH_THRESHOLD | 0.34 | Minimum token-overlap score for dish resolution. |
//! | WAITER_VOICE_KNOWN_ROUTES | see below | Comma-separated navigation allow-list. |

use crate::error::{VoiceError, VoiceResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default locale of the voice waiter.
pub const DEFAULT_LOCALE: &str = "uk-UA";

/// Default fuzzy match threshold.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.34;

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

fn default_restart_delay_ms() -> u64 {
    250
}

fn default_error_restart_delay_ms() -> u64 {
    1000
}

fn default_match_threshold() -> f64 {
    DEFAULT_MATCH_THRESHOLD
}

fn default_known_routes() -> Vec<String> {
    ["/", "/menu", "/auth", "/cart", "/profile", "/checkout", "/admin"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_checkout_route() -> String {
    "/checkout".to_string()
}

fn default_auth_route() -> String {
    "/auth".to_string()
}

/// Configuration shared by the lifecycle controller and the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Locale for recognition and synthesis (e.g. "uk-UA").
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Delay before re-arming recognition after an utterance completes.
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,
    /// Delay before re-arming recognition after a recognition fault.
    #[serde(default = "default_error_restart_delay_ms")]
    pub error_restart_delay_ms: u64,
    /// Minimum Jaccard score accepted by the fuzzy matcher.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,
    /// Navigation allow-list.
    #[serde(default = "default_known_routes")]
    pub known_routes: Vec<String>,
    /// Route of the checkout surface.
    #[serde(default = "default_checkout_route")]
    pub checkout_route: String,
    /// Route of the sign-in surface.
    #[serde(default = "default_auth_route")]
    pub auth_route: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            restart_delay_ms: default_restart_delay_ms(),
            error_restart_delay_ms: default_error_restart_delay_ms(),
            match_threshold: default_match_threshold(),
            known_routes: default_known_routes(),
            checkout_route: default_checkout_route(),
            auth_route: default_auth_route(),
        }
    }
}

impl VoiceConfig {
    /// Load from file and environment, then validate.
    ///
    /// Precedence: `WAITER_VOICE_*` env > file named by `WAITER_VOICE_CONFIG` (or `config/voice`) > defaults.
    pub fn load() -> VoiceResult<Self> {
        let config_path =
            std::env::var("WAITER_VOICE_CONFIG").unwrap_or_else(|_| "config/voice".to_string());

        let built = config::Config::builder()
            .add_source(config::File::with_name(&config_path).required(false))
            .add_source(
                config::Environment::with_prefix("WAITER_VOICE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("known_routes"),
            )
            .build()?;

        let loaded: Self = built.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Parse a TOML document (missing keys fall back to defaults) and validate.
    pub fn from_toml_str(raw: &str) -> VoiceResult<Self> {
        let built = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()?;
        let parsed: Self = built.try_deserialize()?;
        parsed.validate()?;
        Ok(parsed)
    }

    /// Reject values the core cannot operate with.
    pub fn validate(&self) -> VoiceResult<()> {
        if self.locale.trim().is_empty() {
            return Err(VoiceError::Config("locale must not be empty".to_string()));
        }
        if !(self.match_threshold > 0.0 && self.match_threshold <= 1.0) {
            return Err(VoiceError::Config(format!(
                "match_threshold must be in (0, 1], got {}",
                self.match_threshold
            )));
        }
        for route in [&self.checkout_route, &self.auth_route] {
            if !self.is_known_route(route) {
                return Err(VoiceError::Config(format!(
                    "route {route} must be part of known_routes"
                )));
            }
        }
        Ok(())
    }

    /// True when `path` is in the navigation allow-list.
    pub fn is_known_route(&self, path: &str) -> bool {
        self.known_routes.iter().any(|r| r == path)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn error_restart_delay(&self) -> Duration {
        Duration::from_millis(self.error_restart_delay_ms)
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> VoiceResult<String> {
        toml::to_string_pretty(self).map_err(|e| VoiceError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = VoiceConfig::default();
        assert_eq!(c.locale, "uk-UA");
        assert_eq!(c.restart_delay(), Duration::from_millis(250));
        assert!((c.match_threshold - 0.34).abs() < 1e-9);
        assert!(c.is_known_route("/menu"));
        assert!(!c.is_known_route("/kitchen"));
        c.validate().unwrap();
    }

    #[test]
    fn toml_overrides_keep_remaining_defaults() {
        let c = VoiceConfig::from_toml_str("locale = \"en-US\"\nrestart_delay_ms = 100\n").unwrap();
        assert_eq!(c.locale, "en-US");
        assert_eq!(c.restart_delay_ms, 100);
        assert_eq!(c.error_restart_delay_ms, 1000);
        assert_eq!(c.known_routes, VoiceConfig::default().known_routes);
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let c = VoiceConfig {
            match_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(c.validate(), Err(VoiceError::Config(_))));
    }

    #[test]
    fn checkout_route_must_be_known() {
        let c = VoiceConfig {
            known_routes: vec!["/".into(), "/auth".into()],
            ..Default::default()
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn renders_toml() {
        let rendered = VoiceConfig::default().to_toml().unwrap();
        assert!(rendered.contains("locale = \"uk-UA\""));
    }
}
