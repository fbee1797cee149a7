//! Broker 配置 - 启动时从环境一次性装载
//!
//! 配置在构造时注入 Broker，格式化逻辑内部不读环境。

use anyhow::{anyhow, Result};

use crate::severity::MessagePreference;

/// 默认的错误处理状态名
pub const DEFAULT_ERROR_HANDLER_STATE: &str = "WorkflowErrorHandler";
/// 默认的清理状态名
pub const DEFAULT_CLEANUP_STATE: &str = "WorkflowCleanup";

/// Broker 配置
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// 所有消息发布到的主题标识
    pub notification_topic: String,
    /// 时间戳记录的表标识
    pub record_table_name: String,
    /// 时间戳记录的类型区分符
    pub record_type_timestamp: String,
    /// 消息偏好 - INFO 消息是否发布
    pub message_preference: MessagePreference,
    /// 错误处理状态名
    pub error_handler_state: String,
    /// 清理状态名
    pub cleanup_state: String,
    /// 通知网关
    pub gateway_url: String,
    pub gateway_token: String,
    /// 用量指标开关与标记
    pub send_metric: bool,
    pub metrics_endpoint: String,
    pub metrics_anonymous_id: String,
    pub solution_id: String,
    pub solution_version: String,
    pub region: String,
    pub is_secondary_region: bool,
}

impl BrokerConfig {
    /// 从进程环境装载
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值查找函数装载（测试无需改动进程环境）
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow!("{} is not set", key))
        };
        let or_default = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        // 布尔开关沿用 Yes/No 约定
        let yes_no = |key: &str| {
            lookup(key)
                .map(|v| v.eq_ignore_ascii_case("yes"))
                .unwrap_or(false)
        };

        let send_metric = yes_no("SEND_METRIC");
        let config = Self {
            notification_topic: required("NOTIFICATION_TOPIC")?,
            record_table_name: required("RECORD_TABLE_NAME")?,
            record_type_timestamp: required("RECORD_TYPE_TIMESTAMP")?,
            message_preference: MessagePreference::parse(&or_default(
                "MESSAGE_PREFERENCE",
                "INFO_AND_ERRORS",
            )),
            error_handler_state: or_default("ERROR_HANDLER_STATE", DEFAULT_ERROR_HANDLER_STATE),
            cleanup_state: or_default("CLEANUP_STATE", DEFAULT_CLEANUP_STATE),
            gateway_url: or_default("NOTIFY_GATEWAY_URL", "http://localhost:9080"),
            gateway_token: required("NOTIFY_GATEWAY_TOKEN")?,
            send_metric,
            // 指标相关配置仅在开关打开时要求齐全
            metrics_endpoint: if send_metric {
                required("METRICS_ENDPOINT")?
            } else {
                or_default("METRICS_ENDPOINT", "")
            },
            metrics_anonymous_id: or_default("METRICS_ANONYMOUS_ID", ""),
            solution_id: or_default("SOLUTION_ID", ""),
            solution_version: or_default("SOLUTION_VERSION", ""),
            region: or_default("REGION", ""),
            is_secondary_region: yes_no("IS_SECONDARY_REGION"),
        };

        Ok(config)
    }
}
