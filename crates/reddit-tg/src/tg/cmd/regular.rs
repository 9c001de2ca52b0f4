use crate::activity::UserActivity;
use crate::format::{self, MESSAGE_BUDGET};
use crate::keywords::Keywords;
use crate::prelude::*;
use crate::query::{Limit, QueryParams, SubredditName, Username, ValidationError};
use crate::reddit::{RecordStream, RedditSource};
use crate::tg::cmd::CommandError;
use crate::{err_ctx, tg, Result};
use async_trait::async_trait;
use chrono::Utc;
use futures::prelude::*;
use teloxide::macros::BotCommands;
use teloxide::types::Message;
use teloxide::utils::command::BotCommands as _;
use teloxide::utils::markdown;

/// With keywords the listing is scanned deeper, so that enough matches
/// can be found
const KEYWORDS_SCAN_FACTOR: usize = 10;
const MAX_KEYWORDS_SCAN: usize = 500;

#[derive(BotCommands, Clone, Debug, strum::IntoStaticStr)]
#[command(rename_rule = "snake_case", description = "These commands are supported:")]
#[strum(serialize_all = "snake_case")]
pub(crate) enum Cmd {
    #[command(description = "greet and point to the help")]
    Start,

    #[command(description = "show this text")]
    Help,

    #[command(description = "account summary for a number of days: <username> [days]")]
    UserDetails(String),

    #[command(description = "all-time top posts of a user: <username> [keywords] [limit]")]
    UserTop(String),

    #[command(description = "hot posts of a subreddit: <subreddit> [keywords] [limit]")]
    SubredditHot(String),

    #[command(description = "all-time top posts of a subreddit: <subreddit> [keywords] [limit]")]
    SubredditTop(String),
}

#[async_trait]
impl tg::cmd::Command for Cmd {
    fn name(&self) -> &'static str {
        self.into()
    }

    async fn handle(self, ctx: &tg::Ctx, msg: &Message) -> Result {
        let reply = self.reply(&*ctx.reddit).await?;
        ctx.bot.reply_no_preview(msg, reply).await?;
        Ok(())
    }
}

impl Cmd {
    fn usage(&self) -> &'static str {
        match self {
            Cmd::Start => "/start",
            Cmd::Help => "/help",
            Cmd::UserDetails(_) => "/user_details <username> [days]",
            Cmd::UserTop(_) => "/user_top <username> [keywords] [limit]",
            Cmd::SubredditHot(_) => "/subreddit_hot <subreddit> [keywords] [limit]",
            Cmd::SubredditTop(_) => "/subreddit_top <subreddit> [keywords] [limit]",
        }
    }

    /// Runs the queries the command asks for and renders the reply text.
    /// Arguments are validated before anything is requested from Reddit.
    async fn reply(self, reddit: &dyn RedditSource) -> Result<String> {
        let usage = self.usage();

        match self {
            Cmd::Start => Ok(markdown::escape(
                "👋 Hi! I can fetch Reddit data. Use /help to see the commands.",
            )),
            Cmd::Help => Ok(help_text()),
            Cmd::UserDetails(args) => {
                let params = validate(usage, QueryParams::<Username>::parse_history(&args))?;
                user_details(reddit, params).await
            }
            Cmd::UserTop(args) => {
                let params = validate(usage, QueryParams::<Username>::parse_listing(&args))?;
                let header = format!("Top posts by {}", params.target);
                let stream = reddit.fetch_user_top(&params.target, scan_depth(&params));
                listing(header, stream, &params.keywords, params.limit).await
            }
            Cmd::SubredditHot(args) => {
                let params = validate(usage, QueryParams::<SubredditName>::parse_listing(&args))?;
                let header = format!("Hot in {}", params.target);
                let stream = reddit.fetch_subreddit_hot(&params.target, scan_depth(&params));
                listing(header, stream, &params.keywords, params.limit).await
            }
            Cmd::SubredditTop(args) => {
                let params = validate(usage, QueryParams::<SubredditName>::parse_listing(&args))?;
                let header = format!("Top of all time in {}", params.target);
                let stream = reddit.fetch_subreddit_top(&params.target, scan_depth(&params));
                listing(header, stream, &params.keywords, params.limit).await
            }
        }
    }
}

fn validate<T>(usage: &'static str, result: Result<T, ValidationError>) -> Result<T> {
    result.map_err(err_ctx!(CommandError::InvalidArgs { usage }))
}

pub(crate) fn help_text() -> String {
    markdown::escape(&Cmd::descriptions().to_string())
}

/// How many records to read from Reddit to show `limit` of them
fn scan_depth<T>(params: &QueryParams<T>) -> usize {
    let limit = params.limit.get();
    if params.keywords.is_empty() {
        return limit;
    }
    (limit * KEYWORDS_SCAN_FACTOR).min(MAX_KEYWORDS_SCAN)
}

async fn listing(
    mut header: String,
    records: RecordStream<'_>,
    keywords: &Keywords,
    limit: Limit,
) -> Result<String> {
    let records: Vec<_> = records.try_collect().await?;
    let scanned = records.len();

    let records: Vec<_> = keywords
        .filter(records)
        .into_iter()
        .take(limit.get())
        .collect();

    debug!(scanned, shown = records.len(), "Collected the listing");

    if !keywords.is_empty() {
        header.push_str(&format!(" matching: {keywords}"));
    }

    Ok(format::render_listing(&header, &records, MESSAGE_BUDGET))
}

async fn user_details(reddit: &dyn RedditSource, params: QueryParams<Username>) -> Result<String> {
    let days = params.days.unwrap_or_default();
    let profile = reddit.fetch_user_profile(&params.target).await?;

    // Listings of suspended accounts are not available
    let records = if profile.is_suspended {
        vec![]
    } else {
        reddit
            .fetch_user_history(&params.target, days)
            .try_collect()
            .await?
    };

    let activity = UserActivity::summarize(profile, days, Utc::now(), records);

    Ok(format::render_user_activity(&activity, MESSAGE_BUDGET))
}
