//! 消息 Broker - 工作流事件的分类与分发
//!
//! 每个事件的处理严格按 分类 -> 格式化 -> 持久化（仅清理）-> 发布 -> 指标
//! 的顺序执行，每一步等待完成后才进入下一步。发布与持久化失败向上传播，
//! 指标失败只记日志。

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::channel::{NotificationChannel, OutboundMessage};
use crate::channels::webhook::{WebhookChannel, WebhookChannelConfig};
use crate::config::BrokerConfig;
use crate::event::{classify, WorkflowEvent, WorkflowOutcome};
use crate::formatter;
use crate::metrics::{event_type, HttpMetricsEmitter, MetricsConfig, MetricsEmitter};
use crate::severity::Severity;
use crate::store::{FileRecordStore, RecordStore, TimestampRecord, LATEST_EXPORT_TIMESTAMP_ID};

/// 消息 Broker
///
/// 调用之间不保留任何状态，重复投递同一事件会产出逐字节相同的消息与记录。
pub struct MessageBroker {
    config: BrokerConfig,
    channel: Arc<dyn NotificationChannel>,
    store: Arc<dyn RecordStore>,
    metrics: Option<Arc<dyn MetricsEmitter>>,
    /// dry-run 模式下跳过所有外部副作用
    dry_run: bool,
}

impl MessageBroker {
    /// 用显式协作者构造（测试入口）
    pub fn new(
        config: BrokerConfig,
        channel: Arc<dyn NotificationChannel>,
        store: Arc<dyn RecordStore>,
        metrics: Option<Arc<dyn MetricsEmitter>>,
    ) -> Self {
        Self {
            config,
            channel,
            store,
            metrics,
            dry_run: false,
        }
    }

    /// 按配置构造真实协作者
    pub fn from_config(config: BrokerConfig) -> Result<Self> {
        let channel = WebhookChannel::new(WebhookChannelConfig {
            gateway_url: config.gateway_url.clone(),
            auth_token: config.gateway_token.clone(),
            preference: config.message_preference,
            ..Default::default()
        })
        .context("Failed to build notification channel")?;

        let store = FileRecordStore::new(&config.record_table_name);

        let metrics: Option<Arc<dyn MetricsEmitter>> = if config.send_metric {
            let emitter = HttpMetricsEmitter::new(MetricsConfig {
                endpoint: config.metrics_endpoint.clone(),
                anonymous_id: config.metrics_anonymous_id.clone(),
                solution_id: config.solution_id.clone(),
                solution_version: config.solution_version.clone(),
                region: config.region.clone(),
                is_secondary_region: config.is_secondary_region,
                timeout_secs: 10,
            })
            .context("Failed to build metrics emitter")?;
            Some(Arc::new(emitter))
        } else {
            None
        };

        Ok(Self::new(config, Arc::new(channel), Arc::new(store), metrics))
    }

    /// 设置 dry-run 模式
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 按配置的状态名分类事件
    pub fn classify_event(&self, event: &WorkflowEvent) -> WorkflowOutcome {
        classify(
            &event.context.state.name,
            &self.config.error_handler_state,
            &self.config.cleanup_state,
        )
    }

    /// 处理一个工作流事件
    ///
    /// 未识别的状态名是合法的无操作路径：不发布、不写记录、不发指标。
    pub async fn route(&self, event: &WorkflowEvent) -> Result<()> {
        let outcome = self.classify_event(event);
        match outcome {
            WorkflowOutcome::Ignored => {
                debug!(state = %event.context.state.name, "State not routed, nothing to do");
                Ok(())
            }
            WorkflowOutcome::ErrorHandler => {
                let body = formatter::error_message(&event.context, &event.input);
                let message =
                    OutboundMessage::new(&self.config.notification_topic, body, Severity::Error);
                self.publish(&message).await?;
                self.emit_metric(event_type::WORKFLOW_ERROR, json!({ "ErrorOccurred": true }))
                    .await;
                info!(
                    state_machine = %event.context.state_machine.name,
                    "Error notification routed"
                );
                Ok(())
            }
            WorkflowOutcome::Cleanup => {
                let body = formatter::cleanup_message(&event.context);
                let message =
                    OutboundMessage::new(&self.config.notification_topic, body, Severity::Info);

                // 先持久化：即使随后的发布失败，时间戳记录也必须落盘
                self.write_timestamp_record(event).await?;
                self.publish(&message).await?;
                self.emit_metric(
                    event_type::WORKFLOW_COMPLETED,
                    json!({
                        "ElapsedSeconds": formatter::elapsed_seconds(
                            event.context.execution.start_time,
                            event.context.state.entered_time,
                        )
                    }),
                )
                .await;
                info!(
                    state_machine = %event.context.state_machine.name,
                    "Cleanup notification routed"
                );
                Ok(())
            }
        }
    }

    async fn publish(&self, message: &OutboundMessage) -> Result<()> {
        if !self.channel.should_send(message) {
            debug!(
                channel = self.channel.name(),
                severity = %message.severity,
                "Message suppressed by message preference"
            );
            return Ok(());
        }

        if self.dry_run {
            eprintln!("[DRY-RUN] Would publish to topic: {}", message.topic);
            return Ok(());
        }

        self.channel
            .publish(message)
            .await
            .with_context(|| format!("Publish via channel '{}' failed", self.channel.name()))
    }

    async fn write_timestamp_record(&self, event: &WorkflowEvent) -> Result<()> {
        let export_timestamp = event
            .input
            .export_timestamp
            .ok_or_else(|| anyhow!("cleanup event is missing ExportTimestamp"))?;

        let record = TimestampRecord {
            id: LATEST_EXPORT_TIMESTAMP_ID.to_string(),
            record_type: self.config.record_type_timestamp.clone(),
            latest_export_timestamp: export_timestamp,
        };

        if self.dry_run {
            eprintln!(
                "[DRY-RUN] Would write record to table: {}",
                self.config.record_table_name
            );
            return Ok(());
        }

        self.store
            .put(&record)
            .await
            .with_context(|| format!("Record write to '{}' failed", self.config.record_table_name))
    }

    /// 发送用量指标 - 尽力而为，失败不传播
    async fn emit_metric(&self, event_type: &str, data: serde_json::Value) {
        let Some(metrics) = &self.metrics else {
            return;
        };

        if self.dry_run {
            eprintln!("[DRY-RUN] Would send usage metric: {}", event_type);
            return;
        }

        if let Err(e) = metrics.send(event_type, data).await {
            warn!(event_type, error = %e, "Usage metric emission failed");
        }
    }
}
