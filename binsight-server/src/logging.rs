//! Tracing subscriber setup.

use std::env::{self, VarError};

use anyhow::Context;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_TARGETS: &[&str] = &[
    "binsight",
    "binsight_server",
    "binsight_core",
    "binsight_classifier",
    "binsight_provider_camfind",
    "binsight_store_sqlite",
    "tower_http",
];

/// Build the filter directive enabling `level` for all binsight crates.
fn filter_directive(level: &str) -> String {
    LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Use `rust_log` when it is set and not blank, `level` for the binsight crates otherwise.
fn build_filter(rust_log: Option<&str>, level: &str) -> anyhow::Result<EnvFilter> {
    match rust_log.map(str::trim).filter(|directives| !directives.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).with_context(|| {
            format!("invalid {} directives {directives:?}", EnvFilter::DEFAULT_ENV)
        }),
        None => EnvFilter::try_new(filter_directive(level))
            .with_context(|| format!("invalid log level {level:?}")),
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
///
/// # Errors
///
/// Fails when `RUST_LOG` holds directives that cannot be parsed, or when a global
/// subscriber is already installed.
pub fn init(level: &str, json: bool) -> anyhow::Result<()> {
    let rust_log = match env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) => Some(value),
        Err(VarError::NotPresent) => None,
        Err(err) => {
            return Err(err).with_context(|| format!("reading {}", EnvFilter::DEFAULT_ENV));
        }
    };
    let filter = build_filter(rust_log.as_deref(), level)?;

    let layer = fmt::layer().with_target(true).with_line_number(true);
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(layer.json().flatten_event(true)).try_init()?;
    } else {
        registry.with(layer).try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;

    use super::*;

    #[test]
    fn directive_covers_every_crate() {
        let directive = filter_directive("debug");
        assert!(directive.starts_with("binsight=debug,"), "binary target first");
        assert!(
            directive.contains("binsight_store_sqlite=debug"),
            "adapter crates included"
        );
        assert!(directive.ends_with("tower_http=debug"), "http traces included");
    }

    #[test]
    fn level_is_used_without_rust_log() {
        let filter = build_filter(None, "warn").expect("valid level");
        assert_eq!(
            filter.max_level_hint(),
            Some(LevelFilter::WARN),
            "level applied to the binsight crates"
        );
    }

    #[test]
    fn blank_rust_log_counts_as_unset() {
        let filter = build_filter(Some("  "), "debug").expect("valid level");
        assert_eq!(
            filter.max_level_hint(),
            Some(LevelFilter::DEBUG),
            "blank variable falls back to the level"
        );
    }

    #[test]
    fn rust_log_overrides_level() {
        let filter = build_filter(Some("binsight_core=trace"), "info").expect("valid directives");
        assert_eq!(
            filter.max_level_hint(),
            Some(LevelFilter::TRACE),
            "directives win over the level"
        );
    }

    #[test]
    fn malformed_rust_log_is_an_error() {
        let err = build_filter(Some("binsight=loud"), "info").expect_err("loud is not a level");
        assert!(
            err.to_string().contains("RUST_LOG"),
            "error names the variable: {err}"
        );
    }
}
