use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use super::{CallDispatcher, DispatchError, DispatchResult};
use crate::config::EasyCallConfig;
use crate::constants::system;
use crate::models::Pager;

/// Request body of the gateway's `/send` endpoint
#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    receiver: i64,
    message: &'a str,
    port: u32,
}

/// [`CallDispatcher`] backed by the EasyCall paging gateway
#[derive(Debug, Clone)]
pub struct EasyCallDispatcher {
    client: reqwest::Client,
    send_url: String,
    user: String,
    password: String,
    port: u32,
    timeout: Duration,
}

impl EasyCallDispatcher {
    pub fn new(config: &EasyCallConfig) -> DispatchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| DispatchError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            send_url: format!("{}/send", config.url.trim_end_matches('/')),
            user: config.user.clone(),
            password: config.password.clone(),
            port: config.port,
            timeout: config.timeout(),
        })
    }

    pub fn send_url(&self) -> &str {
        &self.send_url
    }

    fn classify(&self, error: reqwest::Error) -> DispatchError {
        if error.is_timeout() {
            DispatchError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            DispatchError::Transport(error.to_string())
        }
    }
}

#[async_trait]
impl CallDispatcher for EasyCallDispatcher {
    async fn dispatch(&self, pager: &Pager) -> DispatchResult<()> {
        let body = SendRequest {
            receiver: pager.easy_call_id,
            message: system::DEFAULT_PAGE_MESSAGE,
            port: self.port,
        };

        debug!(pager_id = pager.id, receiver = pager.easy_call_id, "Sending page");

        let response = self
            .client
            .post(&self.send_url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(
            pager_id = pager.id,
            status = status.as_u16(),
            "Paging gateway rejected the call"
        );
        Err(DispatchError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
