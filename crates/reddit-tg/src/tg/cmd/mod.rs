pub(crate) mod regular;
pub(crate) mod unknown;

use crate::error::ErrorKind;
use crate::observability::metrics::TG_COMMANDS_TOTAL;
use crate::prelude::*;
use crate::query::ValidationError;
use crate::reddit::RedditError;
use crate::util::display::human_duration;
use crate::util::DynResult;
use crate::{tg, Error, Result};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use teloxide::types::Message;
use teloxide::utils::markdown;

#[async_trait]
pub(crate) trait Command: fmt::Debug + Send + Sync + 'static {
    /// Name of the command in metrics labels
    fn name(&self) -> &'static str;

    async fn handle(self, ctx: &tg::Ctx, msg: &Message) -> Result;
}

/// The command was used incorrectly
#[derive(Debug, thiserror::Error)]
pub(crate) enum CommandError {
    #[error("Invalid command arguments (usage: {usage})")]
    InvalidArgs {
        usage: &'static str,
        source: ValidationError,
    },
}

pub(crate) fn handle<'a, C: Command>(
) -> impl Fn(Arc<tg::Ctx>, Message, C) -> BoxFuture<'a, DynResult> {
    move |ctx, msg, cmd| {
        let command = cmd.name();

        let info = info_span!(
            "handle_message",
            sender = msg.from().map(|user| user.debug_id()).as_deref(),
            msg_text = msg.text(),
            chat = %msg.chat.debug_id(),
            cmd = format_args!("{cmd:#?}")
        );

        let fut = async move {
            debug!("Processing command");

            let result = cmd.handle(&ctx, &msg).await;

            let outcome = match &result {
                Ok(()) => "ok",
                Err(err) if err.is_user_error() => "user_error",
                Err(_) => "error",
            };

            metrics::register_counter!(
                TG_COMMANDS_TOTAL,
                "command" => command,
                "outcome" => outcome
            )
            .increment(1);

            let Err(err) = result else {
                return Ok(());
            };

            let span = warn_span!("err", err = tracing_err(&err), id = err.id());
            async {
                if !err.is_user_error() {
                    warn!("Command handler returned an error");
                }

                let msg_result = ctx.bot.reply_no_preview(&msg, error_reply(&err)).await;

                if let Err(err) = msg_result {
                    warn!(
                        err = tracing_err(&err),
                        "Failed to reply with the error message to the user"
                    );
                }
            }
            .instrument(span)
            .await;

            // User errors are fully handled with the reply
            if err.is_user_error() {
                return Ok(());
            }

            Err(err.into())
        };

        Box::pin(fut.instrument(info))
    }
}

/// Text of the reply that explains the error to the user (MarkdownV2)
fn error_reply(err: &Error) -> String {
    let id = markdown::code_inline(err.id());

    match err.kind() {
        ErrorKind::Command {
            source: CommandError::InvalidArgs { usage, source },
        } => format!(
            "{}\n\nUsage: {}",
            markdown::escape(&source.to_string()),
            markdown::code_inline(usage)
        ),
        ErrorKind::Reddit { source } => match source {
            RedditError::NotFound { target } => markdown::escape(&format!(
                "🔍 {target} doesn't exist or is not accessible"
            )),
            RedditError::RateLimited { retry_after } => {
                let when = match retry_after {
                    // timeago shows sub-second durations as "now"
                    Some(delay) => format!(
                        "in {}",
                        human_duration(Duration::from_secs(delay.as_secs().max(1)))
                    ),
                    None => "later".to_owned(),
                };
                markdown::escape(&format!(
                    "⏳ Reddit is rate limiting the bot, try again {when}"
                ))
            }
            RedditError::Transient { .. } => format!(
                "{} {id}",
                markdown::escape(
                    "⚠️ Reddit is temporarily unavailable, try again in a bit. Error id:"
                )
            ),
        },
        ErrorKind::HttpClient { .. } | ErrorKind::Tg { .. } | ErrorKind::Fatal { .. } => {
            format!(
                "{} {id}",
                markdown::escape("💥 Something went wrong. Error id:")
            )
        }
    }
}
