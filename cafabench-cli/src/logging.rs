use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level for the number of `-v` flags given.
fn level_for(verbosity: u64) -> Level {
    match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs a stderr subscriber; `RUST_LOG` takes precedence over `-v`.
pub fn init_logging(verbosity: u64) {
    let filter = EnvFilter::builder()
        .with_default_directive(level_for(verbosity).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
