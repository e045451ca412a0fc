use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding an `EnvFilter` directive.
pub const LOG_ENV: &str = "BOOKCAST_LOG";

/// Level used when `BOOKCAST_LOG` is unset.
///
/// `quiet` wins over any verbosity: errors only.
pub fn default_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the stderr log subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(verbosity: u8, quiet: bool) {
    let filter = EnvFilter::builder()
        .with_env_var(LOG_ENV)
        .with_default_directive(default_level(verbosity, quiet).into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbosity >= 2),
        )
        .try_init()
        .ok();
}
