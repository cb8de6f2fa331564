use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use jtb_core::{
    access::AccessList, commands::CommandDispatcher, config::Config,
    messaging::port::MessagingPort, ports::BuildTrigger,
};

use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<CommandDispatcher>,
    /// Used to skip `/cmd@other_bot`; `None` if `getMe` failed at startup.
    pub bot_username: Option<String>,
}

/// Poll Telegram for updates until SIGINT or SIGTERM.
pub async fn run_polling(
    cfg: Arc<Config>,
    access: AccessList,
    trigger: Option<Arc<dyn BuildTrigger>>,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_token.clone());

    let bot_username = match bot.get_me().await {
        Ok(me) => {
            tracing::info!(username = %me.username(), "jtb started");
            Some(me.username().to_string())
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not fetch bot identity");
            None
        }
    };
    tracing::info!(
        super_admin = cfg.super_admin_id.0,
        authorized_users = access.len(),
        jenkins_configured = trigger.is_some(),
        "ready"
    );

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let state = Arc::new(AppState {
        dispatcher: Arc::new(CommandDispatcher::new(access, messenger, trigger)),
        bot_username,
    });

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build();

    let shutdown = dispatcher.shutdown_token();
    tokio::spawn(async move {
        let signal = wait_for_shutdown_signal().await;
        tracing::info!(signal, "shutting down");
        match shutdown.shutdown() {
            Ok(done) => done.await,
            Err(e) => tracing::warn!(error = %e, "dispatcher was not running"),
        }
    });

    dispatcher.dispatch().await;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "cannot listen for SIGTERM, only SIGINT will stop the bot");
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = term.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "SIGINT"
}
