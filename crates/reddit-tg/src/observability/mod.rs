pub(crate) mod logging;
pub(crate) mod metrics;

pub use self::logging::{init_logging, tracing_err, LoggingInitError, LoggingTask};
pub use self::metrics::init_metrics;
pub(crate) use self::metrics::MetricsConfig;

const GLOBAL_LABELS: &[(&str, &str)] = &[
    ("app_version", env!("CARGO_PKG_VERSION")),
    ("app_git_commit", env!("VERGEN_GIT_SHA")),
];
