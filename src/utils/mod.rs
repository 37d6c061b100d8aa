use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber with sensible defaults.
///
/// `extra_filter` is appended after `RUST_LOG`, typically the `log_filter` from the config.
pub fn init_tracing(extra_filter: Option<&str>) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{filter::Directive, fmt, EnvFilter};

        let mut filter =
            EnvFilter::from_default_env().add_directive("expense_core=info".parse().unwrap());
        if let Some(directive) = extra_filter.and_then(|raw| raw.parse::<Directive>().ok()) {
            filter = filter.add_directive(directive);
        }

        let _ = fmt().with_env_filter(filter).try_init();
    });
}
