use crate::config::{from_env, ConfigError};
use crate::observability::GLOBAL_LABELS;
use crate::prelude::*;
use serde::Deserialize;
use serde_with::serde_as;
use std::collections::HashMap;
use std::ops::Deref;
use tracing_subscriber::prelude::*;

/// Handle to the background task that pushes logs to Loki (if enabled).
pub struct LoggingTask {
    loki: Option<LokiTask>,
}

struct LokiTask {
    task: tokio::task::JoinHandle<()>,
    controller: tracing_loki::BackgroundTaskController,
}

impl LoggingTask {
    pub async fn shutdown(self) {
        let Some(loki) = self.loki else {
            return;
        };

        info!("Waiting for the logging task to finish nicely...");

        let ((), duration) = loki.controller.shutdown().with_duration().await;

        eprintln!(
            "Stopped logging task in {:.2?}: {:?}",
            duration,
            loki.task.await
        );
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoggingInitError {
    #[error(transparent)]
    Config {
        #[from]
        source: ConfigError,
    },

    #[error("Failed to set up the Loki logging layer")]
    Loki {
        #[from]
        source: tracing_loki::Error,
    },
}

pub fn init_logging() -> Result<LoggingTask, LoggingInitError> {
    from_env::<LoggingConfig>("")?.init_logging()
}

#[serde_as]
#[derive(Deserialize)]
struct LoggingConfig {
    loki_url: Option<url::Url>,

    #[serde_as(as = "Option<serde_with::json::JsonString>")]
    loki_labels: Option<HashMap<String, String>>,
}

impl LoggingConfig {
    fn init_logging(self) -> Result<LoggingTask, LoggingInitError> {
        let env_filter = tracing_subscriber::EnvFilter::from_env("BOT_LOG");

        let fmt = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(std::env::var("COLORS").as_deref() != Ok("0"))
            .pretty();

        let (loki_layer, loki) = match self.loki_url {
            Some(loki_url) => {
                let additional_labels = GLOBAL_LABELS.iter().chain(&[("source", "reddit-tg")]);

                let mut labels = self.loki_labels.unwrap_or_default();
                labels.extend(additional_labels.map(|(k, v)| ((*k).to_owned(), (*v).to_owned())));

                let builder = labels
                    .into_iter()
                    .try_fold(tracing_loki::builder(), |builder, (key, value)| {
                        builder.label(key, value)
                    })?;

                let (layer, controller, task) = builder.build_controller_url(loki_url)?;

                let task = tokio::spawn(task);

                (Some(layer), Some(LokiTask { task, controller }))
            }
            None => (None, None),
        };

        tracing_subscriber::registry()
            .with(fmt)
            .with(loki_layer)
            .with(env_filter)
            .with(tracing_error::ErrorLayer::default())
            .init();

        init_panic_hook();

        info!(
            version = env!("CARGO_PKG_VERSION"),
            git_sha = env!("VERGEN_GIT_SHA"),
            built_at = env!("VERGEN_BUILD_TIMESTAMP"),
            loki = loki.is_some(),
            "Logging initialized"
        );

        Ok(LoggingTask { loki })
    }
}

fn init_panic_hook() {
    let current_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        // It's super-important to call the default panic hook, otherwise
        // we may not see it in the logs at all, because the panic may
        // happen inside of `tracing` logging system itself.
        current_hook(panic_info);

        let backtrace = std::backtrace::Backtrace::capture();
        let location = panic_info.location().map(|location| {
            format!(
                "{}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            )
        });

        // If the panic message was formatted using interpolated values,
        // it will be a `String`. Otherwise, it will be a `&str`.
        let payload = panic_info.payload();
        let message = payload
            .downcast_ref::<String>()
            .map(<_>::deref)
            .or_else(|| payload.downcast_ref::<&str>().map(<_>::deref))
            .unwrap_or("<unknown>");

        let span_trace = tracing_error::SpanTrace::capture();

        error!(
            target: "panic",
            thread = std::thread::current().name(),
            location,
            span_trace = %span_trace,
            backtrace = format_args!("\n{backtrace}"),
            "{message}"
        );
    }));
}
