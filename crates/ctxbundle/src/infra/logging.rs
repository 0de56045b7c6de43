//! Tracing subscriber setup for the binary.

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_tree::HierarchicalLayer;

/// Environment variable holding an explicit filter directive, e.g. `ctxbundle=trace`.
pub const LOG_ENV: &str = "CTXBUNDLE_LOG";

/// Map `-v` occurrences to a default filter directive.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install a hierarchical stderr subscriber. `CTXBUNDLE_LOG` wins over `verbosity`.
pub fn init(verbosity: u8) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let layer = HierarchicalLayer::new(2)
        .with_writer(std::io::stderr)
        .with_targets(true)
        .with_bracketed_fields(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_increasing_detail() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "info");
        assert_eq!(default_directive(2), "debug");
        assert_eq!(default_directive(9), "trace");
    }
}
