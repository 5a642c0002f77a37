//! Command line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use binsight_core::PollPolicy;
use clap::Parser;
use reqwest::Url;

/// Runtime settings; every flag can also come from the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "binsight", version, about)]
pub struct Config {
    /// Address to listen on.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// CamFind API key sent with every recognition request.
    #[arg(long, env = "CAMFIND_KEY", hide_env_values = true)]
    pub camfind_key: String,

    /// CamFind base URL.
    #[arg(
        long,
        env = "CAMFIND_URL",
        default_value = binsight_provider_camfind::DEFAULT_BASE_URL,
        value_parser = parse_base_url
    )]
    pub camfind_url: Url,

    /// Classifier model file.
    #[arg(long, env = "CLASSIFIER_MODEL", default_value = "models/classifier.json")]
    pub model_path: PathBuf,

    /// SQLite database file.
    #[arg(long, env = "DATABASE_PATH", default_value = "binsight.db")]
    pub database: PathBuf,

    /// Status checks per recognition job before giving up.
    #[arg(long, env = "POLL_MAX_ATTEMPTS", default_value_t = 30)]
    pub poll_max_attempts: u32,

    /// Delay before the second status check, in milliseconds.
    #[arg(long, env = "POLL_INITIAL_DELAY_MS", default_value_t = 500)]
    pub poll_initial_delay_ms: u64,

    /// Upper bound for the delay between status checks, in milliseconds.
    #[arg(long, env = "POLL_MAX_DELAY_MS", default_value_t = 4000)]
    pub poll_max_delay_ms: u64,

    /// Timeout for each outbound HTTP request, in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, env = "LOG_LEVEL", default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

impl Config {
    /// Polling limits derived from the poll flags.
    #[must_use]
    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            max_attempts: self.poll_max_attempts,
            initial_delay: Duration::from_millis(self.poll_initial_delay_ms),
            max_delay: Duration::from_millis(self.poll_max_delay_ms),
            ..PollPolicy::default()
        }
    }

    /// Timeout applied to outbound HTTP requests.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Parse a URL that path segments can be appended to.
fn parse_base_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|err| err.to_string())?;
    if url.cannot_be_a_base() {
        return Err(format!("{raw} cannot be used as a base URL"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    #[test]
    fn timeout_flag_sets_request_timeout() {
        let config = Config::try_parse_from([
            "binsight",
            "--camfind-key",
            "secret",
            "--request-timeout-secs",
            "7",
        ])
        .expect("parses");

        assert_eq!(config.camfind_key, "secret", "key flag");
        assert_eq!(
            config.request_timeout(),
            Duration::from_secs(7),
            "timeout in seconds"
        );
    }

    #[test]
    fn poll_flags_shape_the_policy() {
        let config = Config::try_parse_from([
            "binsight",
            "--camfind-key",
            "secret",
            "--poll-max-attempts",
            "5",
            "--poll-initial-delay-ms",
            "10",
            "--poll-max-delay-ms",
            "40",
        ])
        .expect("parses");

        let policy = config.poll_policy();
        assert_eq!(policy.max_attempts, 5, "attempts flag");
        assert_eq!(
            policy.initial_delay,
            Duration::from_millis(10),
            "initial delay flag"
        );
        assert_eq!(policy.max_delay, Duration::from_millis(40), "max delay flag");
        assert!(
            (policy.multiplier - PollPolicy::default().multiplier).abs() < f64::EPSILON,
            "multiplier keeps its default"
        );
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = Config::try_parse_from(["binsight", "--camfind-key", "k", "--log-level", "loud"])
            .expect_err("loud is not a level");
        assert_eq!(
            err.kind(),
            ErrorKind::InvalidValue,
            "reported as an invalid value"
        );
    }

    #[test]
    fn camfind_url_flag_is_parsed() {
        let config = Config::try_parse_from([
            "binsight",
            "--camfind-key",
            "k",
            "--camfind-url",
            "http://127.0.0.1:9000/camfind/",
        ])
        .expect("parses");
        assert_eq!(
            config.camfind_url.as_str(),
            "http://127.0.0.1:9000/camfind/",
            "url kept as given"
        );
    }

    #[test]
    fn rejects_opaque_camfind_url() {
        let err = Config::try_parse_from([
            "binsight",
            "--camfind-key",
            "k",
            "--camfind-url",
            "mailto:ops@example.com",
        ])
        .expect_err("mailto cannot carry paths");
        assert_eq!(
            err.kind(),
            ErrorKind::ValueValidation,
            "reported by the url parser"
        );
    }
}
