//! Telegram update handlers.
//!
//! Slash commands are converted into `jtb-core` commands and passed to the
//! dispatcher; everything else is ignored.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use jtb_core::{
    domain::{ChatId, UserId},
    messaging::types::Command,
};

use crate::router::AppState;

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(cmd) = command_from_message(&msg, state.bot_username.as_deref()) else {
        return Ok(());
    };

    tracing::debug!(
        command = %cmd.name,
        user_id = ?cmd.user_id.map(|u| u.0),
        chat_id = cmd.chat_id.0,
        "received command"
    );

    if let Err(e) = state.dispatcher.dispatch(&cmd).await {
        tracing::warn!(command = %cmd.name, chat_id = cmd.chat_id.0, error = %e, "failed to reply");
    }

    Ok(())
}

fn command_from_message(msg: &Message, bot_username: Option<&str>) -> Option<Command> {
    let text = msg.text()?;
    Command::parse(
        text,
        ChatId(msg.chat.id.0),
        msg.from().map(|u| UserId(u.id.0 as i64)),
        bot_username,
    )
}
