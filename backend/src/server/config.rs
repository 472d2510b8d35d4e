//! Environment-driven application configuration.
//!
//! Centralises parsing and validation of the deployment toggles so they can
//! be tested in isolation. Every provider integration is optional; a missing
//! one wires the corresponding fallback adapter instead of failing startup.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use mockable::Env;
use reqwest::Url;
use tracing::warn;

const BIND_ADDR_ENV: &str = "BIND_ADDR";
const DATABASE_URL_ENV: &str = "DATABASE_URL";
const BUSINESS_TIMEZONE_ENV: &str = "BUSINESS_TIMEZONE";
const HOLIDAY_DATES_ENV: &str = "HOLIDAY_DATES";
const SMS_API_URL_ENV: &str = "SMS_API_URL";
const SMS_API_KEY_ENV: &str = "SMS_API_KEY";
const PAYMENT_API_URL_ENV: &str = "PAYMENT_API_URL";
const PAYMENT_API_KEY_ENV: &str = "PAYMENT_API_KEY";
const RECEIPT_API_URL_ENV: &str = "RECEIPT_API_URL";
const RECEIPT_API_KEY_ENV: &str = "RECEIPT_API_KEY";
const DELIVERY_SWEEP_SECONDS_ENV: &str = "DELIVERY_SWEEP_SECONDS";
const CANCELLATION_SWEEP_SECONDS_ENV: &str = "CANCELLATION_SWEEP_SECONDS";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_DELIVERY_SWEEP_SECONDS: u64 = 30;
const DEFAULT_CANCELLATION_SWEEP_SECONDS: u64 = 60;

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Errors raised while validating application configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A variable is present but contains an invalid value.
    #[error("invalid value for {name}='{value}'; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    /// A provider URL is configured without its API key, or vice versa.
    #[error("{url_name} and {key_name} must be set together")]
    IncompleteProvider {
        url_name: &'static str,
        key_name: &'static str,
    },
}

/// Endpoint and credential for one outbound provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub url: Url,
    pub api_key: String,
}

/// Validated application settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// When absent, the in-memory adapters back the repositories.
    pub database_url: Option<String>,
    /// Zone the tariff bands are expressed in.
    pub timezone: Tz,
    /// Designated non-working dates priced at the weekend rate.
    pub holidays: Vec<NaiveDate>,
    pub sms: Option<ProviderConfig>,
    pub payments: Option<ProviderConfig>,
    pub receipts: Option<ProviderConfig>,
    pub delivery_sweep: Duration,
    pub cancellation_sweep: Duration,
}

impl AppConfig {
    /// Build the configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is present but unparseable,
    /// or a provider URL and key are not set together.
    pub fn from_env<E: Env>(env: &E) -> Result<Self, ConfigError> {
        Self::from_lookup(&|name| env.string(name))
    }

    fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: parse_bind_addr(lookup)?,
            database_url: lookup(DATABASE_URL_ENV),
            timezone: parse_timezone(lookup)?,
            holidays: parse_holidays(lookup)?,
            sms: provider(lookup, SMS_API_URL_ENV, SMS_API_KEY_ENV)?,
            payments: provider(lookup, PAYMENT_API_URL_ENV, PAYMENT_API_KEY_ENV)?,
            receipts: provider(lookup, RECEIPT_API_URL_ENV, RECEIPT_API_KEY_ENV)?,
            delivery_sweep: parse_seconds(
                lookup,
                DELIVERY_SWEEP_SECONDS_ENV,
                DEFAULT_DELIVERY_SWEEP_SECONDS,
            )?,
            cancellation_sweep: parse_seconds(
                lookup,
                CANCELLATION_SWEEP_SECONDS_ENV,
                DEFAULT_CANCELLATION_SWEEP_SECONDS,
            )?,
        })
    }
}

fn parse_bind_addr(lookup: Lookup<'_>) -> Result<SocketAddr, ConfigError> {
    let value = lookup(BIND_ADDR_ENV).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned());
    value.parse().map_err(|_| ConfigError::InvalidEnv {
        name: BIND_ADDR_ENV,
        value,
        expected: "host:port",
    })
}

fn parse_timezone(lookup: Lookup<'_>) -> Result<Tz, ConfigError> {
    match lookup(BUSINESS_TIMEZONE_ENV) {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidEnv {
            name: BUSINESS_TIMEZONE_ENV,
            value,
            expected: "IANA zone name",
        }),
        None => {
            warn!("BUSINESS_TIMEZONE not set; defaulting to Europe/Moscow");
            Ok(chrono_tz::Europe::Moscow)
        }
    }
}

fn parse_holidays(lookup: Lookup<'_>) -> Result<Vec<NaiveDate>, ConfigError> {
    let Some(value) = lookup(HOLIDAY_DATES_ENV) else {
        return Ok(Vec::new());
    };
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            entry
                .parse::<NaiveDate>()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: HOLIDAY_DATES_ENV,
                    value: entry.to_owned(),
                    expected: "comma-separated YYYY-MM-DD dates",
                })
        })
        .collect()
}

fn provider(
    lookup: Lookup<'_>,
    url_name: &'static str,
    key_name: &'static str,
) -> Result<Option<ProviderConfig>, ConfigError> {
    match (lookup(url_name), lookup(key_name)) {
        (Some(url), Some(api_key)) => {
            let url = url.parse().map_err(|_| ConfigError::InvalidEnv {
                name: url_name,
                value: url,
                expected: "absolute URL",
            })?;
            Ok(Some(ProviderConfig { url, api_key }))
        }
        (None, None) => Ok(None),
        _ => Err(ConfigError::IncompleteProvider { url_name, key_name }),
    }
}

fn parse_seconds(
    lookup: Lookup<'_>,
    name: &'static str,
    default: u64,
) -> Result<Duration, ConfigError> {
    match lookup(name) {
        Some(value) => value
            .parse::<u64>()
            .ok()
            .filter(|seconds| *seconds > 0)
            .map(Duration::from_secs)
            .ok_or(ConfigError::InvalidEnv {
                name,
                value,
                expected: "positive integer seconds",
            }),
        None => Ok(Duration::from_secs(default)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    fn config_from(entries: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = entries
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect();
        AppConfig::from_lookup(&|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).expect("defaults should parse");

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.timezone, chrono_tz::Europe::Moscow);
        assert!(config.database_url.is_none());
        assert!(config.sms.is_none());
        assert_eq!(config.delivery_sweep, Duration::from_secs(30));
        assert_eq!(config.cancellation_sweep, Duration::from_secs(60));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            ("BIND_ADDR", "127.0.0.1:9001"),
            ("BUSINESS_TIMEZONE", "Europe/London"),
            ("HOLIDAY_DATES", "2026-01-01, 2026-05-09"),
            ("DELIVERY_SWEEP_SECONDS", "5"),
        ])
        .expect("config should parse");

        assert_eq!(config.bind_addr.port(), 9001);
        assert_eq!(config.timezone, chrono_tz::Europe::London);
        assert_eq!(config.holidays.len(), 2);
        assert_eq!(config.delivery_sweep, Duration::from_secs(5));
    }

    #[test]
    fn provider_requires_url_and_key_together() {
        let error = config_from(&[("SMS_API_URL", "https://sms.example/send")])
            .expect_err("half-configured provider must fail");
        assert!(matches!(error, ConfigError::IncompleteProvider { .. }));
    }

    #[test]
    fn provider_parses_url_and_keeps_key() {
        let config = config_from(&[
            ("SMS_API_URL", "https://sms.example/send"),
            ("SMS_API_KEY", "sk-test"),
        ])
        .expect("config should parse");

        let sms = config.sms.expect("provider should be configured");
        assert_eq!(sms.url.as_str(), "https://sms.example/send");
        assert_eq!(sms.api_key, "sk-test");
    }

    #[rstest]
    #[case::bad_addr(&[("BIND_ADDR", "not-an-addr")])]
    #[case::bad_zone(&[("BUSINESS_TIMEZONE", "Mars/Olympus")])]
    #[case::bad_date(&[("HOLIDAY_DATES", "01.05.2026")])]
    #[case::zero_sweep(&[("DELIVERY_SWEEP_SECONDS", "0")])]
    fn invalid_values_are_rejected(#[case] entries: &[(&str, &str)]) {
        let error = config_from(entries).expect_err("value must be rejected");
        assert!(matches!(error, ConfigError::InvalidEnv { .. }));
    }
}
