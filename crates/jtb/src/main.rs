use std::sync::Arc;

use jtb_core::{access::AccessList, config::Config, ports::BuildTrigger};
use jtb_jenkins::JenkinsClient;

#[tokio::main]
async fn main() -> Result<(), jtb_core::Error> {
    jtb_core::logging::init("jtb")?;

    // Missing TELEGRAM_TOKEN / SUPER_ADMIN_ID ends the process here with exit code 1.
    let cfg = match Config::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            tracing::error!(error = %e, "startup aborted");
            return Err(e);
        }
    };

    let mut access = AccessList::new(cfg.authorized_users_file.clone(), cfg.super_admin_id);
    access.load().await;

    let trigger: Option<Arc<dyn BuildTrigger>> = match &cfg.jenkins {
        Some(jenkins) => {
            let client = JenkinsClient::new(jenkins, cfg.telegram_token.clone())?;
            Some(Arc::new(client) as Arc<dyn BuildTrigger>)
        }
        None => {
            tracing::warn!(
                "Jenkins is not configured (JENKINS_URL/USER/TOKEN/JOB); /restart will reply with an error"
            );
            None
        }
    };

    jtb_telegram::router::run_polling(cfg, access, trigger)
        .await
        .map_err(|e| jtb_core::Error::External(format!("telegram bot failed: {e}")))?;

    Ok(())
}
