use easy_ext::ext;
use teloxide::prelude::*;
use teloxide::types::{Chat, Message, User};

pub(crate) mod prelude {
    pub(crate) use super::{ChatExt as _, UserExt as _, UtilRequesterExt as _};
}

#[ext(UserExt)]
pub(crate) impl User {
    fn username(&self) -> String {
        self.username.clone().unwrap_or_else(|| self.full_name())
    }

    fn debug_id(&self) -> String {
        format!("{} ({})", self.username(), self.id)
    }
}

#[ext(ChatExt)]
pub(crate) impl Chat {
    fn debug_id(&self) -> String {
        let title = self
            .title()
            .or_else(|| self.username())
            .unwrap_or("{unknown_chat_title}");

        format!("{title} ({})", self.id)
    }
}

/// There is [`RequesterExt`] in [`teloxide::prelude`]. We name this symbol
/// different to avoid collisions.
#[ext(UtilRequesterExt)]
pub(crate) impl<T: Requester> T {
    /// Reply to the message without link previews. Reddit links in replies
    /// would otherwise expand into a huge preview of the first link only.
    fn reply_no_preview(&self, msg: &Message, text: impl Into<String>) -> Self::SendMessage {
        self.send_message(msg.chat.id, text)
            .reply_to_message_id(msg.id)
            .allow_sending_without_reply(true)
            .disable_web_page_preview(true)
    }
}
