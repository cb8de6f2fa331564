//! Command dispatch: authorization gate + per-command handlers.
//!
//! Every handler checks authorization before touching the access list or the
//! build trigger. Argument and authorization failures are plain replies.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};

use crate::{
    access::AccessList,
    domain::{ChatId, UserId},
    formatting::{escape_html, truncate_chars},
    messaging::{port::MessagingPort, types::Command},
    ports::{BuildTrigger, TriggerOutcome},
    Result,
};

const MAX_BODY_CHARS: usize = 1000;

const DENIED: &str = "⛔ You are not allowed to run this command.";
const SUPER_ADMIN_ONLY: &str = "⛔ This command is for the super admin only.";

/// Recognized bot commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Help,
    MyId,
    Restart,
    AddUser { args: String },
    DelUser { args: String },
    ListUsers,
}

impl BotCommand {
    pub fn from_command(cmd: &Command) -> Option<Self> {
        let parsed = match cmd.name.as_str() {
            "start" | "help" => Self::Help,
            "myid" => Self::MyId,
            "restart" => Self::Restart,
            "adduser" => Self::AddUser {
                args: cmd.args.clone(),
            },
            "deluser" => Self::DelUser {
                args: cmd.args.clone(),
            },
            "listusers" => Self::ListUsers,
            _ => return None,
        };
        Some(parsed)
    }
}

/// Commands that take a target user id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TargetCommand {
    Add,
    Del,
}

impl TargetCommand {
    fn usage(self) -> &'static str {
        match self {
            Self::Add => "/adduser &lt;user_id&gt;",
            Self::Del => "/deluser &lt;user_id&gt;",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArgError {
    Missing,
    Invalid,
}

/// First whitespace-separated token as a user id.
fn parse_target(args: &str) -> std::result::Result<UserId, ArgError> {
    let Some(token) = args.split_whitespace().next() else {
        return Err(ArgError::Missing);
    };
    token
        .parse::<i64>()
        .map(UserId)
        .map_err(|_| ArgError::Invalid)
}

pub struct CommandDispatcher {
    access: Mutex<AccessList>,
    messenger: Arc<dyn MessagingPort>,
    trigger: Option<Arc<dyn BuildTrigger>>,
}

impl CommandDispatcher {
    /// `trigger` is `None` when the CI server is not configured; `/restart`
    /// then replies with a configuration error.
    pub fn new(
        access: AccessList,
        messenger: Arc<dyn MessagingPort>,
        trigger: Option<Arc<dyn BuildTrigger>>,
    ) -> Self {
        Self {
            access: Mutex::new(access),
            messenger,
            trigger,
        }
    }

    pub async fn access(&self) -> MutexGuard<'_, AccessList> {
        self.access.lock().await
    }

    /// Handle one inbound command. Only failures to deliver a reply are returned.
    ///
    /// Unrecognized commands are ignored; in groups they usually belong to
    /// another bot.
    pub async fn dispatch(&self, cmd: &Command) -> Result<()> {
        let Some(parsed) = BotCommand::from_command(cmd) else {
            tracing::debug!(
                command = %cmd.name,
                chat_id = cmd.chat_id.0,
                "ignoring unknown command"
            );
            return Ok(());
        };

        match &parsed {
            BotCommand::Help => self.reply(cmd.chat_id, &help_text()).await,
            BotCommand::MyId => self.handle_my_id(cmd).await,
            BotCommand::Restart => self.handle_restart(cmd).await,
            BotCommand::AddUser { args } => self.handle_add_user(cmd, args).await,
            BotCommand::DelUser { args } => self.handle_del_user(cmd, args).await,
            BotCommand::ListUsers => self.handle_list_users(cmd).await,
        }
    }

    async fn reply(&self, chat_id: ChatId, html: &str) -> Result<()> {
        self.messenger.send_html(chat_id, html).await?;
        Ok(())
    }

    async fn handle_my_id(&self, cmd: &Command) -> Result<()> {
        let msg = match cmd.user_id {
            Some(id) => format!("🆔 Your user ID is:\n<code>{id}</code>"),
            None => "Could not determine your user ID.".to_string(),
        };
        self.reply(cmd.chat_id, &msg).await
    }

    async fn handle_restart(&self, cmd: &Command) -> Result<()> {
        // The guard is dropped before the HTTP call.
        let allowed = self.access.lock().await.is_authorized(cmd.user_id);
        if !allowed {
            return self.reply(cmd.chat_id, DENIED).await;
        }

        let Some(trigger) = self.trigger.as_ref() else {
            return self
                .reply(
                    cmd.chat_id,
                    "❌ Bot misconfigured: Jenkins settings are missing (URL, USER, TOKEN or JOB).",
                )
                .await;
        };

        self.reply(
            cmd.chat_id,
            "🚀 Restart received. Sending request to Jenkins...",
        )
        .await?;

        let msg = match trigger.trigger(cmd.chat_id).await {
            Ok(TriggerOutcome::Accepted { status }) => {
                tracing::info!(
                    user_id = ?cmd.user_id.map(|u| u.0),
                    chat_id = cmd.chat_id.0,
                    status,
                    "build triggered"
                );
                "✅ Jenkins accepted the request. Running...".to_string()
            }
            Ok(TriggerOutcome::Rejected { status, body }) => {
                tracing::warn!(chat_id = cmd.chat_id.0, status, "jenkins rejected build trigger");
                format!(
                    "❌ Jenkins call failed.\nStatus: {status}\nData: {}",
                    escape_html(&truncate_chars(&body, MAX_BODY_CHARS))
                )
            }
            Err(e) => {
                tracing::error!(chat_id = cmd.chat_id.0, error = %e, "jenkins request failed");
                format!("❌ Could not reach Jenkins:\n{}", escape_html(&e.to_string()))
            }
        };
        self.reply(cmd.chat_id, &msg).await
    }

    async fn handle_add_user(&self, cmd: &Command, args: &str) -> Result<()> {
        let mut access = self.access.lock().await;
        if !access.is_super_admin(cmd.user_id) {
            drop(access);
            return self.reply(cmd.chat_id, SUPER_ADMIN_ONLY).await;
        }

        let target = match parse_target(args) {
            Ok(target) => target,
            Err(e) => {
                drop(access);
                let msg = usage_reply(TargetCommand::Add, e);
                return self.reply(cmd.chat_id, &msg).await;
            }
        };

        let msg = if access.add(target) {
            access.save().await;
            tracing::info!(user_id = target.0, "authorized user added");
            format!("✅ Added user <code>{target}</code> to the authorized list.")
        } else {
            format!("User <code>{target}</code> is already authorized.")
        };
        drop(access);
        self.reply(cmd.chat_id, &msg).await
    }

    async fn handle_del_user(&self, cmd: &Command, args: &str) -> Result<()> {
        let mut access = self.access.lock().await;
        if !access.is_super_admin(cmd.user_id) {
            drop(access);
            return self.reply(cmd.chat_id, SUPER_ADMIN_ONLY).await;
        }

        let target = match parse_target(args) {
            Ok(target) => target,
            Err(e) => {
                drop(access);
                let msg = usage_reply(TargetCommand::Del, e);
                return self.reply(cmd.chat_id, &msg).await;
            }
        };

        let msg = if access.remove(target) {
            access.save().await;
            tracing::info!(user_id = target.0, "authorized user removed");
            format!("✅ Removed user <code>{target}</code> from the authorized list.")
        } else {
            format!("User <code>{target}</code> is not in the list.")
        };
        drop(access);
        self.reply(cmd.chat_id, &msg).await
    }

    async fn handle_list_users(&self, cmd: &Command) -> Result<()> {
        let msg = {
            let access = self.access.lock().await;
            if !access.is_super_admin(cmd.user_id) {
                None
            } else {
                Some(format_user_list(access.super_admin(), &access.list()))
            }
        };
        match msg {
            Some(msg) => self.reply(cmd.chat_id, &msg).await,
            None => self.reply(cmd.chat_id, SUPER_ADMIN_ONLY).await,
        }
    }
}

fn usage_reply(cmd: TargetCommand, err: ArgError) -> String {
    match err {
        ArgError::Missing => format!("Usage: {}", cmd.usage()),
        ArgError::Invalid => format!("Invalid ID. Usage: {}", cmd.usage()),
    }
}

fn format_user_list(super_admin: UserId, members: &[i64]) -> String {
    let mut lines = vec![format!("👑 <b>Super Admin:</b> <code>{super_admin}</code>\n")];
    if members.is_empty() {
        lines.push("No other authorized users.".to_string());
    } else {
        lines.push("Other authorized users:".to_string());
        lines.extend(members.iter().map(|id| format!("- <code>{id}</code>")));
    }
    lines.join("\n")
}

fn help_text() -> String {
    "🤖 <b>Jenkins Trigger Bot</b>\n\n\
<b>📋 Commands:</b>\n\
/myid - Show your Telegram user ID\n\
/restart - Trigger the Jenkins job (authorized users)\n\
/adduser &lt;user_id&gt; - Authorize a user (super admin)\n\
/deluser &lt;user_id&gt; - Revoke a user (super admin)\n\
/listusers - Show authorized users (super admin)"
        .to_string()
}
