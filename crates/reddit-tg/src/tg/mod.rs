//! Telegram commands root module

mod cmd;
mod config;

use crate::prelude::*;
use crate::reddit::RedditSource;
use crate::Result;
use dptree::di::DependencyMap;
use std::sync::Arc;
use teloxide::adaptors::{CacheMe, DefaultParseMode, Throttle, Trace};
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;

pub(crate) use cmd::CommandError;
pub(crate) use config::Config;

type Bot = Trace<CacheMe<DefaultParseMode<Throttle<teloxide::Bot>>>>;

pub(crate) struct Ctx {
    pub(crate) bot: Bot,
    pub(crate) reddit: Arc<dyn RedditSource>,
}

pub(crate) struct RunBotOptions {
    pub(crate) tg_cfg: Config,
    pub(crate) reddit: Arc<dyn RedditSource>,
}

pub(crate) async fn run_bot(opts: RunBotOptions) -> Result {
    let bot: Bot = teloxide::Bot::new(opts.tg_cfg.bot_token)
        .throttle(Default::default())
        .parse_mode(ParseMode::MarkdownV2)
        .cache_me()
        .trace(teloxide::adaptors::trace::Settings::all());

    let mut di = DependencyMap::new();

    di.insert(Arc::new(Ctx {
        bot: bot.clone(),
        reddit: opts.reddit,
    }));

    info!("Starting bot...");

    bot.set_my_commands(cmd::regular::Cmd::bot_commands()).await?;

    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<cmd::regular::Cmd>()
                .endpoint(cmd::handle::<cmd::regular::Cmd>()),
        )
        .branch(
            Update::filter_message()
                .filter_map(cmd::unknown::filter_unknown_command)
                .endpoint(cmd::handle::<cmd::unknown::UnknownCmd>()),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(di)
        // Plain messages are not interesting for the bot, this noop default
        // handler suppresses the warnings about them
        .default_handler(|_| std::future::ready(()))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped");

    Ok(())
}
