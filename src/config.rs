//! Environment configuration.

use std::env;
use std::time::Duration;

use crate::core::text::markup::MarkupOptions;
use crate::error::TimelineError;
use crate::playback::player::DEFAULT_MIN_TICK;
use crate::playback::speed::PlaybackSpeed;

pub const SPEED_ENV: &str = "CAST_TIMELINE_SPEED";
pub const MIN_TICK_ENV: &str = "CAST_TIMELINE_MIN_TICK_MS";
pub const ESCAPE_HTML_ENV: &str = "CAST_TIMELINE_ESCAPE_HTML";
pub const LOG_ENV: &str = "CAST_TIMELINE_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    pub speed: PlaybackSpeed,
    pub min_tick: Duration,
    pub escape_html: bool,
    pub log_filter: Option<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: PlaybackSpeed::default(),
            min_tick: DEFAULT_MIN_TICK,
            escape_html: false,
            log_filter: None,
        }
    }
}

impl PlayerConfig {
    /// Reads the environment, falling back to defaults for values that do not parse.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let speed = env_string_opt(SPEED_ENV)
            .map(|value| value.parse::<PlaybackSpeed>())
            .transpose()
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "ignoring {SPEED_ENV}");
                None
            })
            .unwrap_or(defaults.speed);
        let min_tick = parse_min_tick()
            .unwrap_or_else(|error| {
                tracing::warn!(%error, "ignoring {MIN_TICK_ENV}");
                None
            })
            .unwrap_or(defaults.min_tick);

        Self {
            speed,
            min_tick,
            escape_html: env_flag(ESCAPE_HTML_ENV),
            log_filter: env_string_opt(LOG_ENV),
        }
    }

    /// Reads the environment, rejecting values that do not parse.
    pub fn try_from_env() -> Result<Self, TimelineError> {
        let defaults = Self::default();
        let speed = env_string_opt(SPEED_ENV)
            .map(|value| value.parse::<PlaybackSpeed>())
            .transpose()?
            .unwrap_or(defaults.speed);
        let min_tick = parse_min_tick()?.unwrap_or(defaults.min_tick);

        Ok(Self {
            speed,
            min_tick,
            escape_html: env_flag(ESCAPE_HTML_ENV),
            log_filter: env_string_opt(LOG_ENV),
        })
    }

    pub fn markup_options(&self) -> MarkupOptions {
        MarkupOptions {
            escape_html: self.escape_html,
            ..MarkupOptions::default()
        }
    }
}

fn parse_min_tick() -> Result<Option<Duration>, TimelineError> {
    let Some(value) = env_string_opt(MIN_TICK_ENV) else {
        return Ok(None);
    };
    // The floor must stay positive.
    match value.trim().parse::<u64>() {
        Ok(millis) if millis > 0 => Ok(Some(Duration::from_millis(millis))),
        _ => Err(TimelineError::invalid_config(MIN_TICK_ENV, value)),
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value.trim() == "1").unwrap_or(false)
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{PlayerConfig, ESCAPE_HTML_ENV, LOG_ENV, MIN_TICK_ENV, SPEED_ENV};
    use crate::error::TimelineError;
    use crate::playback::speed::PlaybackSpeed;
    use std::env;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    #[test]
    fn env_defaults() {
        let _lock = env_lock();
        let _g1 = set_env_guard(SPEED_ENV, None);
        let _g2 = set_env_guard(MIN_TICK_ENV, None);
        let _g3 = set_env_guard(ESCAPE_HTML_ENV, None);
        let _g4 = set_env_guard(LOG_ENV, None);

        assert_eq!(PlayerConfig::from_env(), PlayerConfig::default());
        assert_eq!(PlayerConfig::try_from_env(), Ok(PlayerConfig::default()));
    }

    #[test]
    fn env_values_are_applied() {
        let _lock = env_lock();
        let _g1 = set_env_guard(SPEED_ENV, Some("2"));
        let _g2 = set_env_guard(MIN_TICK_ENV, Some("25"));
        let _g3 = set_env_guard(ESCAPE_HTML_ENV, Some("1"));
        let _g4 = set_env_guard(LOG_ENV, Some("debug"));

        let config = PlayerConfig::from_env();
        assert_eq!(config.speed, PlaybackSpeed::Double);
        assert_eq!(config.min_tick, Duration::from_millis(25));
        assert!(config.escape_html);
        assert!(config.markup_options().escape_html);
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn invalid_values_fall_back_or_fail() {
        let _lock = env_lock();
        let _g1 = set_env_guard(SPEED_ENV, Some("3"));
        let _g2 = set_env_guard(MIN_TICK_ENV, Some("soon"));

        let config = PlayerConfig::from_env();
        assert_eq!(config.speed, PlaybackSpeed::Normal);
        assert_eq!(config.min_tick, Duration::from_millis(10));

        assert_eq!(
            PlayerConfig::try_from_env(),
            Err(TimelineError::unsupported_speed("3"))
        );
    }

    #[test]
    fn zero_min_tick_is_rejected() {
        let _lock = env_lock();
        let _g1 = set_env_guard(SPEED_ENV, None);
        let _g2 = set_env_guard(MIN_TICK_ENV, Some("0"));

        assert_eq!(PlayerConfig::from_env().min_tick, Duration::from_millis(10));
        assert_eq!(
            PlayerConfig::try_from_env(),
            Err(TimelineError::invalid_config(MIN_TICK_ENV, "0"))
        );
    }

    #[test]
    fn escaping_stays_off_unless_set_to_one() {
        let _lock = env_lock();
        let _g1 = set_env_guard(ESCAPE_HTML_ENV, Some("yes"));
        assert!(!PlayerConfig::from_env().escape_html);
    }

    #[test]
    fn empty_values_are_ignored() {
        let _lock = env_lock();
        let _g1 = set_env_guard(SPEED_ENV, Some("  "));
        let _g2 = set_env_guard(MIN_TICK_ENV, Some(""));
        let _g3 = set_env_guard(LOG_ENV, Some(""));

        let config = PlayerConfig::try_from_env().expect("empty values are unset");
        assert_eq!(config.speed, PlaybackSpeed::Normal);
        assert!(config.log_filter.is_none());
    }
}
