//! Configuration loaded from the environment (and `.env`) at startup.
//!
//! Keys are the upper-case environment names (`COURSE_CODES`, `TWILIO_SID`, ...).
//! An optional `seatwatch.toml` in the working directory supplies the same keys
//! in lower case; the environment wins on conflict.

use crate::banner::{CheckSettings, ChromeOptions, CourseCode, Credentials, Timeouts};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

mod de;

pub const DEFAULT_BASE_URL: &str = "https://ssp.mycampus.ca/StudentRegistrationSsb/ssb/registration/registerPostSignIn?mode=registration&mepCode=UOIT";
pub const CONFIG_FILE: &str = "seatwatch.toml";

const DEFAULT_INTERVAL: Duration = Duration::from_secs(5 * 60);
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Deserialize, custom_debug_derive::Debug)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    #[serde(default = "default_base_url", deserialize_with = "de::string")]
    pub base_url: String,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub site_username: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    #[debug(with = "crate::fmt::redacted_opt")]
    pub site_password: Option<String>,

    #[serde(default, deserialize_with = "de::course_list")]
    pub course_codes: Vec<CourseCode>,
    /// Time between check cycles, e.g. `5m` or `90s`.
    #[serde(default, deserialize_with = "de::opt_duration")]
    pub interval: Option<Duration>,
    /// Older spelling of [`interval`](Self::interval), in whole minutes.
    #[serde(default)]
    pub interval_min: Option<u64>,

    #[serde(
        default = "default_headless",
        deserialize_with = "figment::util::bool_from_str_or_int"
    )]
    pub headless: bool,
    #[serde(default)]
    pub chrome_profile_path: Option<PathBuf>,
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,

    #[serde(default = "default_target_term", deserialize_with = "de::string")]
    pub target_term: String,
    #[serde(default = "default_subject_filter", deserialize_with = "de::string")]
    pub subject_filter: String,

    #[serde(default, deserialize_with = "de::opt_string")]
    pub twilio_sid: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    #[debug(with = "crate::fmt::redacted_opt")]
    pub twilio_token: Option<String>,
    #[serde(default, deserialize_with = "de::opt_phone")]
    pub twilio_from: Option<String>,
    #[serde(default, deserialize_with = "de::opt_phone")]
    pub twilio_to: Option<String>,

    /// How long to wait for the monitor to stop after a shutdown signal.
    #[serde(default = "default_shutdown_timeout", deserialize_with = "de::duration")]
    pub shutdown_timeout: Duration,
}

/// Everything needed to send an SMS through Twilio.
#[derive(Clone, custom_debug_derive::Debug)]
pub struct TwilioConfig {
    pub account_sid: String,
    #[debug(with = "crate::fmt::redacted")]
    pub auth_token: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing Twilio settings: {}", .0.join(", "))]
    MissingTwilio(Vec<&'static str>),
    #[error("COURSE_CODES is empty; set a comma-separated list like CSCI2020U,CSCI3090U")]
    NoCourses,
    #[error("check interval must be greater than zero")]
    ZeroInterval,
    #[error("invalid BASE_URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_headless() -> bool {
    true
}

fn default_target_term() -> String {
    "winter".to_string()
}

fn default_subject_filter() -> String {
    "CSCI".to_string()
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Config {
    /// Providers in merge order: config file, then the raw environment.
    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw())
    }

    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn interval(&self) -> Duration {
        self.interval
            .or_else(|| self.interval_min.map(|m| Duration::from_secs(m * 60)))
            .unwrap_or(DEFAULT_INTERVAL)
    }

    /// Cycles that make up one day; the notification cache is reset after this many.
    pub fn checks_per_day(&self) -> u32 {
        let secs = self.interval().as_secs().max(1);
        u32::try_from(SECONDS_PER_DAY / secs).unwrap_or(u32::MAX).max(1)
    }

    /// Site credentials, present only when both username and password are set.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.site_username, &self.site_password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    pub fn check_settings(&self) -> CheckSettings {
        CheckSettings {
            base_url: self.base_url.clone(),
            credentials: self.credentials(),
            term: self.target_term.clone(),
            subject: crate::banner::course::normalize(&self.subject_filter),
            timeouts: Timeouts::default(),
        }
    }

    pub fn chrome_options(&self) -> ChromeOptions {
        ChromeOptions {
            headless: self.headless,
            profile_dir: self.chrome_profile_path.clone(),
            executable: self.chrome_executable.clone(),
        }
    }

    pub fn twilio(&self) -> Result<TwilioConfig, ConfigError> {
        let fields = [
            ("TWILIO_SID", &self.twilio_sid),
            ("TWILIO_TOKEN", &self.twilio_token),
            ("TWILIO_FROM", &self.twilio_from),
            ("TWILIO_TO", &self.twilio_to),
        ];
        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingTwilio(missing));
        }

        let [sid, token, from, to] = fields.map(|(_, value)| value.clone().unwrap_or_default());
        Ok(TwilioConfig {
            account_sid: sid,
            auth_token: token,
            from,
            to,
        })
    }

    /// Checks needed by any command that talks to the registration site.
    pub fn validate_site(&self) -> Result<(), ConfigError> {
        url::Url::parse(&self.base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            source,
        })?;
        Ok(())
    }

    /// Checks needed by the long-running monitor.
    pub fn validate_monitor(&self) -> Result<TwilioConfig, ConfigError> {
        self.validate_site()?;
        if self.course_codes.is_empty() {
            return Err(ConfigError::NoCourses);
        }
        if self.interval().is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        self.twilio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn extract() -> Result<Config, figment::Error> {
        Figment::new().merge(Env::raw()).extract()
    }

    #[test]
    fn test_defaults_apply_when_unset() {
        Jail::expect_with(|_jail| {
            let config = extract()?;
            assert_eq!(config.base_url, DEFAULT_BASE_URL);
            assert!(config.headless);
            assert_eq!(config.target_term, "winter");
            assert_eq!(config.subject_filter, "CSCI");
            assert_eq!(config.interval(), Duration::from_secs(300));
            assert_eq!(config.shutdown_timeout, Duration::from_secs(10));
            assert!(config.credentials().is_none());
            Ok(())
        });
    }

    #[test]
    fn test_course_codes_are_split_and_normalized() {
        Jail::expect_with(|jail| {
            jail.set_env("COURSE_CODES", " csci 2020u, CSCI3090U ,, ");
            let config = extract()?;
            let codes: Vec<&str> = config.course_codes.iter().map(CourseCode::as_str).collect();
            assert_eq!(codes, ["CSCI2020U", "CSCI3090U"]);
            Ok(())
        });
    }

    #[test]
    fn test_interval_accepts_units_and_legacy_minutes() {
        Jail::expect_with(|jail| {
            jail.set_env("INTERVAL", "90s");
            assert_eq!(extract()?.interval(), Duration::from_secs(90));
            Ok(())
        });
        Jail::expect_with(|jail| {
            jail.set_env("INTERVAL_MIN", "10");
            let config = extract()?;
            assert_eq!(config.interval(), Duration::from_secs(600));
            assert_eq!(config.checks_per_day(), 144);
            Ok(())
        });
    }

    #[test]
    fn test_numeric_values_stay_strings() {
        Jail::expect_with(|jail| {
            jail.set_env("SITE_USERNAME", "100123456");
            jail.set_env("SITE_PASSWORD", "pw");
            jail.set_env("TWILIO_FROM", "+15550001111");
            jail.set_env("TWILIO_TO", "+15552223333");
            let config = extract()?;
            let creds = config.credentials().expect("credentials");
            assert_eq!(creds.username, "100123456");
            assert_eq!(config.twilio_from.as_deref(), Some("+15550001111"));
            assert_eq!(config.twilio_to.as_deref(), Some("+15552223333"));
            Ok(())
        });
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        Jail::expect_with(|jail| {
            jail.set_env("SITE_USERNAME", "");
            jail.set_env("TWILIO_SID", "   ");
            let config = extract()?;
            assert!(config.site_username.is_none());
            assert!(config.twilio_sid.is_none());
            Ok(())
        });
    }

    #[test]
    fn test_headless_accepts_false() {
        Jail::expect_with(|jail| {
            jail.set_env("HEADLESS", "false");
            assert!(!extract()?.headless);
            Ok(())
        });
    }

    #[test]
    fn test_missing_twilio_settings_are_listed() {
        Jail::expect_with(|jail| {
            jail.set_env("COURSE_CODES", "CSCI2020U");
            jail.set_env("TWILIO_SID", "AC123");
            let config = extract()?;
            match config.validate_monitor() {
                Err(ConfigError::MissingTwilio(missing)) => {
                    assert_eq!(missing, ["TWILIO_TOKEN", "TWILIO_FROM", "TWILIO_TO"]);
                }
                other => panic!("expected MissingTwilio, got {other:?}"),
            }
            Ok(())
        });
    }

    #[test]
    fn test_monitor_requires_courses() {
        Jail::expect_with(|jail| {
            jail.set_env("TWILIO_SID", "AC123");
            jail.set_env("TWILIO_TOKEN", "secret");
            jail.set_env("TWILIO_FROM", "+15550001111");
            jail.set_env("TWILIO_TO", "+15552223333");
            let config = extract()?;
            assert!(matches!(config.validate_monitor(), Err(ConfigError::NoCourses)));
            Ok(())
        });
    }

    #[test]
    fn test_debug_output_hides_secrets() {
        Jail::expect_with(|jail| {
            jail.set_env("SITE_PASSWORD", "hunter2");
            jail.set_env("TWILIO_TOKEN", "tok_abcdef");
            let out = format!("{:?}", extract()?);
            assert!(!out.contains("hunter2"));
            assert!(!out.contains("tok_abcdef"));
            Ok(())
        });
    }
}
