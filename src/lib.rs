//! Workflow Message Broker - 工作流状态事件的通知路由

pub mod broker;
pub mod channel;
pub mod channels;
pub mod config;
pub mod event;
pub mod formatter;
pub mod metrics;
pub mod severity;
pub mod store;

pub use broker::MessageBroker;
pub use channel::{NotificationChannel, OutboundMessage};
pub use channels::{WebhookChannel, WebhookChannelConfig};
pub use config::{BrokerConfig, DEFAULT_CLEANUP_STATE, DEFAULT_ERROR_HANDLER_STATE};
pub use event::{classify, ExecutionContext, StateInput, WorkflowEvent, WorkflowOutcome};
pub use metrics::{HttpMetricsEmitter, MetricsConfig, MetricsEmitter};
pub use severity::{severity_meets_preference, MessagePreference, Severity};
pub use store::{FileRecordStore, RecordStore, TimestampRecord, LATEST_EXPORT_TIMESTAMP_ID};
