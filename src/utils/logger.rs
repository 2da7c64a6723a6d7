use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LEVEL: &str = "info";

/// `--verbose` wins over a configured level, which wins over the default.
pub fn effective_level(verbose: bool, configured: Option<&str>) -> String {
    if verbose {
        return "debug".to_string();
    }
    configured
        .map(|level| level.trim().to_lowercase())
        .filter(|level| !level.is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

/// Filter directive enabling this crate's events at `level` and above.
pub fn filter_directive(level: &str) -> String {
    format!("ontology_extract={}", level)
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive(level)))
}

/// Installs the global subscriber on stderr: compact lines, or one JSON object per event
/// for batch jobs whose logs are collected by machines. `RUST_LOG` overrides `level`.
pub fn init_logger(level: &str, json: bool) {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if json {
        tracing_subscriber::registry()
            .with(filter(level))
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter(level))
            .with(layer.compact())
            .init();
    }
}

pub fn init_cli_logger(verbose: bool) {
    init_logger(&effective_level(verbose, None), false);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_level() {
        assert_eq!(effective_level(false, None), "info");
        assert_eq!(effective_level(false, Some("WARN")), "warn");
        assert_eq!(effective_level(false, Some(" ")), "info");
        assert_eq!(effective_level(true, Some("error")), "debug");
    }

    #[test]
    fn test_filter_directive_parses() {
        let directive = filter_directive(&effective_level(false, Some("trace")));
        assert_eq!(directive, "ontology_extract=trace");
        assert!(EnvFilter::try_new(directive).is_ok());
    }
}
