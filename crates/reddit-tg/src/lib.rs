mod activity;
mod config;
mod error;
mod format;
mod http;
mod keywords;
mod observability;
mod query;
mod reddit;
mod tg;

pub mod util;

pub use crate::error::*;
pub use config::*;
pub use observability::*;

mod prelude {
    pub(crate) use crate::error::prelude::*;
    pub(crate) use crate::http::prelude::*;
    pub(crate) use crate::observability::logging::prelude::*;
    pub(crate) use crate::util::prelude::*;
}

/// Run the telegram bot processing loop
pub async fn run(config: Config) -> Result<()> {
    let http = http::create_client(&config.reddit)?;

    let reddit = reddit::Client::new(config.reddit, http);

    let opts = tg::RunBotOptions {
        tg_cfg: config.tg,
        reddit: std::sync::Arc::new(reddit),
    };

    tg::run_bot(opts).await
}
