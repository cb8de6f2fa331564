//! Jenkins adapter (remote build trigger).
//!
//! Implements the `jtb-core` BuildTrigger port with a `buildWithParameters`
//! POST authenticated with HTTP Basic auth.

use async_trait::async_trait;

use jtb_core::{
    config::JenkinsConfig,
    domain::ChatId,
    errors::Error,
    ports::{BuildTrigger, TriggerOutcome},
    Result,
};

#[derive(Clone)]
pub struct JenkinsClient {
    trigger_url: String,
    user: String,
    token: String,
    bot_token: String,
    http: reqwest::Client,
}

impl JenkinsClient {
    /// `bot_token` is forwarded to the job so it can report back to the chat.
    pub fn new(cfg: &JenkinsConfig, bot_token: impl Into<String>) -> Result<Self> {
        // No request timeout: the trigger call runs until Jenkins answers or the
        // connection fails.
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::External(format!("jenkins http client error: {e}")))?;
        Ok(Self {
            trigger_url: cfg.trigger_url(),
            user: cfg.user.clone(),
            token: cfg.token.clone(),
            bot_token: bot_token.into(),
            http,
        })
    }
}

#[async_trait]
impl BuildTrigger for JenkinsClient {
    async fn trigger(&self, chat_id: ChatId) -> Result<TriggerOutcome> {
        // TODO: stop sending BOT_TOKEN once the Jenkins job reads the token from its own
        // credentials store; it currently leaks the bot credential into build logs.
        let params = [
            ("TELEGRAM_CHAT_ID", chat_id.0.to_string()),
            ("BOT_TOKEN", self.bot_token.clone()),
        ];

        tracing::debug!(url = %self.trigger_url, chat_id = chat_id.0, "posting build trigger");

        let resp = self
            .http
            .post(&self.trigger_url)
            .basic_auth(&self.user, Some(&self.token))
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::External(format!("jenkins request error: {e}")))?;

        let status = resp.status().as_u16();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(status, error = %e, "could not read jenkins response body");
                String::new()
            }
        };
        Ok(TriggerOutcome::from_status(status, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    /// Serve exactly one HTTP response and return the raw request head.
    async fn one_shot_server(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
        let resp = format!(
            "HTTP/1.1 {status} Status\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        serve_once(resp).await
    }

    async fn serve_once(resp: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = sock.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            sock.write_all(resp.as_bytes()).await.unwrap();
            sock.shutdown().await.unwrap();
            String::from_utf8_lossy(&buf).to_string()
        });

        (format!("http://{addr}"), handle)
    }

    fn client_for(base: &str) -> JenkinsClient {
        let cfg = JenkinsConfig {
            url: format!("{base}/"),
            user: "bot".to_string(),
            token: "secret".to_string(),
            job: "deploy".to_string(),
        };
        JenkinsClient::new(&cfg, "tg-token").unwrap()
    }

    #[tokio::test]
    async fn created_is_accepted_and_request_carries_auth_and_params() {
        let (base, server) = one_shot_server(201, "").await;
        let client = client_for(&base);

        let outcome = client.trigger(ChatId(-42)).await.unwrap();
        assert_eq!(outcome, TriggerOutcome::Accepted { status: 201 });

        let head = server.await.unwrap();
        let request_line = head.lines().next().unwrap_or_default();
        assert!(request_line.starts_with("POST /job/deploy/buildWithParameters?"));
        assert!(request_line.contains("TELEGRAM_CHAT_ID=-42"));
        assert!(request_line.contains("BOT_TOKEN=tg-token"));
        assert!(head.to_lowercase().contains("authorization: basic "));
        assert!(head.contains("Ym90OnNlY3JldA=="));
    }

    #[tokio::test]
    async fn server_error_is_rejected_with_body() {
        let (base, server) = one_shot_server(500, "boom").await;
        let client = client_for(&base);

        let outcome = client.trigger(ChatId(1)).await.unwrap();
        assert_eq!(
            outcome,
            TriggerOutcome::Rejected {
                status: 500,
                body: "boom".to_string()
            }
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn unreadable_body_is_rejected_with_empty_body() {
        // Body is cut short of the advertised length.
        let resp = "HTTP/1.1 503 Unavailable\r\nContent-Length: 100\r\nConnection: close\r\n\r\npartial"
            .to_string();
        let (base, server) = serve_once(resp).await;
        let client = client_for(&base);

        let outcome = client.trigger(ChatId(1)).await.unwrap();
        assert_eq!(
            outcome,
            TriggerOutcome::Rejected {
                status: 503,
                body: String::new()
            }
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connection_failure_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{addr}"));
        let err = client.trigger(ChatId(1)).await.unwrap_err();
        assert!(err.to_string().contains("jenkins request error"));
    }
}
