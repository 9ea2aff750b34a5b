use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;

/// Installs the global subscriber. `RUST_LOG` replaces the default `info`
/// level; sqlx is always capped at `warn`.
pub fn setup_logger() {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Ok(sqlx) = "sqlx=warn".parse::<Directive>() {
        filter = filter.add_directive(sqlx);
    }

    let _ = tracing_subscriber::fmt()
        // .with_file(true)
        // .with_line_number(true)
        .with_target(true)
        .with_level(true)
        .with_ansi(true)
        .compact()
        .with_env_filter(filter)
        .try_init();
}
