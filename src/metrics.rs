//! 匿名用量指标 - 尽力而为的遥测副通道
//!
//! 指标发送失败只记日志，绝不影响通知与持久化的主流程。

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};

/// 指标事件类型
pub mod event_type {
    /// 工作流进入错误处理状态
    pub const WORKFLOW_ERROR: &str = "WorkflowError";
    /// 工作流完成清理
    pub const WORKFLOW_COMPLETED: &str = "WorkflowCompleted";
}

/// 用量指标发射器 trait
#[async_trait]
pub trait MetricsEmitter: Send + Sync {
    /// 发送一条匿名指标
    async fn send(&self, event_type: &str, data: Value) -> Result<()>;
}

/// HTTP 指标发射器配置
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// 指标接收端点
    pub endpoint: String,
    /// 匿名实例标识
    pub anonymous_id: String,
    /// 方案标识与版本
    pub solution_id: String,
    pub solution_version: String,
    /// 部署区域
    pub region: String,
    /// 是否为从区域
    pub is_secondary_region: bool,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
}

/// HTTP 指标发射器
pub struct HttpMetricsEmitter {
    client: Client,
    config: MetricsConfig,
}

impl HttpMetricsEmitter {
    pub fn new(config: MetricsConfig) -> Result<Self> {
        if config.endpoint.is_empty() {
            return Err(anyhow!("metrics endpoint is required"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl MetricsEmitter for HttpMetricsEmitter {
    async fn send(&self, event_type: &str, data: Value) -> Result<()> {
        // 区域标记并入 Data，与事件自身的字段一起上报
        let mut data = data;
        if let Some(map) = data.as_object_mut() {
            map.insert("EventType".to_string(), json!(event_type));
            map.insert("Region".to_string(), json!(self.config.region));
            map.insert(
                "IsSecondaryRegion".to_string(),
                json!(self.config.is_secondary_region),
            );
        }

        let payload = json!({
            "Solution": self.config.solution_id,
            "Version": self.config.solution_version,
            "UUID": self.config.anonymous_id,
            "TimeStamp": Utc::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            "Data": data,
        });

        self.client
            .post(&self.config.endpoint)
            .json(&payload)
            .send()
            .await
            .context("Metric emission request failed")?
            .error_for_status()
            .context("Metrics endpoint rejected the ping")?;

        Ok(())
    }
}
