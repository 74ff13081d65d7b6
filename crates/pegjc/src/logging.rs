use std::sync::Once;

static INIT: Once = Once::new();

/// Install the stderr subscriber. `level` wins over `RUST_LOG`; without
/// either only warnings are shown so generated source on stdout stays clean.
pub fn init_with_level(level: Option<&str>) {
    INIT.call_once(|| {
        if tracing::dispatcher::has_been_set() {
            return;
        }

        let env = match level {
            Some(l) if !l.is_empty() => l.to_string(),
            _ => std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string()),
        };

        let filter = tracing_subscriber::EnvFilter::try_new(env.clone()).unwrap_or_else(|e| {
            eprintln!("WARN: invalid RUST_LOG/--log-level '{env}': {e}; falling back to 'warn'");
            tracing_subscriber::EnvFilter::new("warn")
        });

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .compact()
            .try_init();
    });
}
