//! Webhook 渠道 - 通过 HTTP 网关把消息发布到通知主题

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::channel::{NotificationChannel, OutboundMessage};
use crate::severity::{severity_meets_preference, MessagePreference};

/// Webhook 渠道配置
#[derive(Debug, Clone)]
pub struct WebhookChannelConfig {
    /// 网关 URL (如 http://localhost:9080)
    pub gateway_url: String,
    /// 认证 token
    pub auth_token: String,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
    /// 消息偏好 - 决定 INFO 消息是否发布
    pub preference: MessagePreference,
}

impl Default for WebhookChannelConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:9080".to_string(),
            auth_token: String::new(),
            timeout_secs: 30,
            preference: MessagePreference::default(),
        }
    }
}

/// 发布请求载荷
#[derive(Debug, Serialize)]
struct PublishPayload<'a> {
    /// 目标主题
    topic: &'a str,
    /// 消息正文
    message: &'a str,
    /// 严重级别
    severity: &'a str,
}

/// 网关响应
#[derive(Debug, Deserialize)]
struct PublishResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Webhook 渠道
#[derive(Debug)]
pub struct WebhookChannel {
    client: Client,
    config: WebhookChannelConfig,
}

impl WebhookChannel {
    /// 创建新的 Webhook 渠道
    pub fn new(config: WebhookChannelConfig) -> Result<Self> {
        if config.auth_token.is_empty() {
            return Err(anyhow!("auth_token is required"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    fn should_send(&self, message: &OutboundMessage) -> bool {
        severity_meets_preference(message.severity, self.config.preference)
    }

    async fn publish(&self, message: &OutboundMessage) -> Result<()> {
        let url = format!("{}/hooks/publish", self.config.gateway_url);
        let payload = PublishPayload {
            topic: &message.topic,
            message: &message.body,
            severity: message.severity.as_str(),
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.auth_token))
            .json(&payload)
            .send()
            .await
            .context("HTTP request to notification gateway failed")?;

        let publish_response: PublishResponse = response
            .json()
            .await
            .context("Failed to parse notification gateway response")?;

        if publish_response.ok {
            debug!(channel = "webhook", topic = %message.topic, "Message published");
            Ok(())
        } else {
            Err(anyhow!(
                "notification gateway rejected publish: {}",
                publish_response
                    .error
                    .unwrap_or_else(|| "Unknown error".to_string())
            ))
        }
    }
}
