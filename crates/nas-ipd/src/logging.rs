//! tracing subscriber setup shared by the binaries.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nas_os_common::{NasError, NasResult};

/// Picks the filter directives. `RUST_LOG` (`env`) wins over `level` unless
/// `level` came from the command line; an unparsable `RUST_LOG` is ignored.
fn build_filter(level: &str, explicit: bool, env: Option<&str>) -> NasResult<EnvFilter> {
    if !explicit {
        if let Some(filter) = env.and_then(|env| EnvFilter::try_new(env).ok()) {
            return Ok(filter);
        }
    }
    EnvFilter::try_new(level)
        .map_err(|e| NasError::config(format!("Invalid log filter '{}': {}", level, e)))
}

/// Installs a compact fmt subscriber filtered by `level`, an `EnvFilter`
/// directive string such as `info` or `nas_ip=debug,warn`.
pub fn init_logging(level: &str, explicit: bool) -> NasResult<()> {
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(level, explicit, env.as_deref())?;

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| NasError::config(format!("Failed to set logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_env_wins_over_configured_level() {
        let filter = build_filter("info", false, Some("debug")).unwrap();
        assert_eq!(filter.to_string(), "debug");

        let filter = build_filter("info", false, None).unwrap();
        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    fn test_explicit_level_wins_over_env() {
        let filter = build_filter("nas_ip=debug", true, Some("warn")).unwrap();
        assert_eq!(filter.to_string(), "nas_ip=debug");
    }

    #[test]
    fn test_unparsable_env_is_ignored() {
        let filter = build_filter("warn", false, Some("nas_ip=loud")).unwrap();
        assert_eq!(filter.to_string(), "warn");
    }

    #[test]
    fn test_invalid_level() {
        assert!(matches!(
            build_filter("nas_ip=loud", true, None),
            Err(NasError::Config { .. })
        ));
    }
}
