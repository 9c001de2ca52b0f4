use crate::prelude::*;
use crate::tg::cmd::regular::{help_text, Cmd};
use crate::{tg, Result};
use async_trait::async_trait;
use teloxide::types::{Me, Message};
use teloxide::utils::command::BotCommands;
use teloxide::utils::markdown;

/// A slash command that didn't parse as any of [`Cmd`]
#[derive(Debug, Clone)]
pub(crate) struct UnknownCmd {
    name: String,
}

/// Picks the messages that start with a slash command addressed to this bot
/// (or not addressed to anyone in particular).
pub(crate) fn filter_unknown_command(msg: Message, me: Me) -> Option<UnknownCmd> {
    let command = msg.text()?.split_whitespace().next()?.strip_prefix('/')?;

    let name = match command.split_once('@') {
        Some((name, mention)) if mention.eq_ignore_ascii_case(me.username()) => name,
        Some(_) => return None,
        None => command,
    };

    Some(UnknownCmd {
        name: name.to_owned(),
    })
}

impl UnknownCmd {
    fn reply(&self) -> String {
        let is_known = Cmd::bot_commands()
            .iter()
            .any(|cmd| cmd.command.trim_start_matches('/') == self.name);

        // Known commands land here only when they get unexpected arguments
        if is_known {
            return help_text();
        }

        format!(
            "{}\n\n{}",
            markdown::escape(&format!("🤔 Unrecognized command /{}", self.name)),
            help_text()
        )
    }
}

#[async_trait]
impl tg::cmd::Command for UnknownCmd {
    fn name(&self) -> &'static str {
        "unknown"
    }

    async fn handle(self, ctx: &tg::Ctx, msg: &Message) -> Result {
        ctx.bot.reply_no_preview(msg, self.reply()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_command_lists_the_commands() {
        let cmd = UnknownCmd {
            name: "frobnicate".to_owned(),
        };

        let reply = cmd.reply();

        assert!(reply.starts_with("🤔 Unrecognized command /frobnicate\n\n"), "{reply}");
        for command in ["/help", "/user\\_details", "/user\\_top", "/subreddit\\_hot"] {
            assert!(reply.contains(command), "{command}: {reply}");
        }
    }

    #[test]
    fn known_command_with_bad_args_shows_help() {
        let cmd = UnknownCmd {
            name: "help".to_owned(),
        };
        assert_eq!(cmd.reply(), help_text());
    }
}
