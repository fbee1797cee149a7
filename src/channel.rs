//! 通知渠道 trait 定义

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::severity::Severity;

/// 待发布的通知消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// 目标主题标识（来自配置）
    pub topic: String,
    /// 消息正文（已格式化）
    pub body: String,
    /// 严重级别 - 与消息偏好共同决定是否真正发布
    pub severity: Severity,
}

impl OutboundMessage {
    pub fn new(topic: impl Into<String>, body: impl Into<String>, severity: Severity) -> Self {
        Self {
            topic: topic.into(),
            body: body.into(),
            severity,
        }
    }
}

/// 通知渠道 trait
///
/// 发布在本次调用内同步等待完成，失败向上传播，由外层编排器决定重试策略。
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// 渠道名称（用于日志）
    fn name(&self) -> &str;

    /// 是否应该发布此消息（按严重级别与消息偏好过滤）
    fn should_send(&self, message: &OutboundMessage) -> bool;

    /// 发布消息，等待通道确认
    async fn publish(&self, message: &OutboundMessage) -> Result<()>;
}
