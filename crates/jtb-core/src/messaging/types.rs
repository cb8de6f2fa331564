use crate::domain::{ChatId, UserId};

/// A slash command as delivered by the messenger adapter.
#[derive(Clone, Debug)]
pub struct Command {
    pub chat_id: ChatId,
    /// `None` for updates without a sender (e.g. channel posts).
    pub user_id: Option<UserId>,
    /// Lowercase name without the leading `/` or `@botname` suffix.
    pub name: String,
    /// Raw text after the command name.
    pub args: String,
}

impl Command {
    /// Split message text such as `/adduser@my_bot 42` into a command.
    ///
    /// Returns `None` for text that is not a slash command, and for commands
    /// whose `@botname` suffix names a bot other than `bot_username`. With
    /// `bot_username` unknown, any suffix is accepted.
    pub fn parse(
        text: &str,
        chat_id: ChatId,
        user_id: Option<UserId>,
        bot_username: Option<&str>,
    ) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }

        let mut parts = text.splitn(2, char::is_whitespace);
        let first = parts.next().unwrap_or("");
        let args = parts.next().unwrap_or("").trim().to_string();

        let (name, addressee) = match first.trim_start_matches('/').split_once('@') {
            Some((name, addressee)) => (name, Some(addressee)),
            None => (first.trim_start_matches('/'), None),
        };
        if name.is_empty() {
            return None;
        }
        if let (Some(addressee), Some(me)) = (addressee, bot_username) {
            if !addressee.eq_ignore_ascii_case(me.trim_start_matches('@')) {
                return None;
            }
        }

        Some(Self {
            chat_id,
            user_id,
            name: name.to_lowercase(),
            args,
        })
    }
}
