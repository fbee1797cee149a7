//! Broker 端到端用例 - 用记录型 mock 协作者验证路由行为

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use workflow_message_broker::{
    BrokerConfig, MessageBroker, MessagePreference, MetricsEmitter, NotificationChannel,
    OutboundMessage, RecordStore, Severity, TimestampRecord, WorkflowEvent,
    LATEST_EXPORT_TIMESTAMP_ID,
};

/// 记录所有发布消息的测试渠道
#[derive(Default)]
struct RecordingChannel {
    preference: Option<MessagePreference>,
    fail: bool,
    published: Mutex<Vec<OutboundMessage>>,
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    fn name(&self) -> &str {
        "recording"
    }

    fn should_send(&self, message: &OutboundMessage) -> bool {
        match self.preference {
            Some(preference) => {
                workflow_message_broker::severity_meets_preference(message.severity, preference)
            }
            None => true,
        }
    }

    async fn publish(&self, message: &OutboundMessage) -> Result<()> {
        if self.fail {
            return Err(anyhow!("channel rejected publish"));
        }
        self.published.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// 记录所有写入的测试存储
#[derive(Default)]
struct RecordingStore {
    fail: bool,
    records: Mutex<Vec<TimestampRecord>>,
}

#[async_trait]
impl RecordStore for RecordingStore {
    async fn put(&self, record: &TimestampRecord) -> Result<()> {
        if self.fail {
            return Err(anyhow!("store rejected write"));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// 记录所有指标的测试发射器
#[derive(Default)]
struct RecordingMetrics {
    fail: bool,
    pings: Mutex<Vec<(String, serde_json::Value)>>,
}

#[async_trait]
impl MetricsEmitter for RecordingMetrics {
    async fn send(&self, event_type: &str, data: serde_json::Value) -> Result<()> {
        if self.fail {
            return Err(anyhow!("metrics endpoint unavailable"));
        }
        self.pings.lock().unwrap().push((event_type.to_string(), data));
        Ok(())
    }
}

fn test_config() -> BrokerConfig {
    BrokerConfig::from_lookup(|key| {
        match key {
            "NOTIFICATION_TOPIC" => Some("topic-arn"),
            "RECORD_TABLE_NAME" => Some("table-name"),
            "RECORD_TYPE_TIMESTAMP" => Some("timestamp-type"),
            "NOTIFY_GATEWAY_TOKEN" => Some("token"),
            _ => None,
        }
        .map(String::from)
    })
    .unwrap()
}

struct Harness {
    broker: MessageBroker,
    channel: Arc<RecordingChannel>,
    store: Arc<RecordingStore>,
    metrics: Arc<RecordingMetrics>,
}

fn harness() -> Harness {
    harness_with(RecordingChannel::default(), RecordingStore::default(), RecordingMetrics::default())
}

fn harness_with(
    channel: RecordingChannel,
    store: RecordingStore,
    metrics: RecordingMetrics,
) -> Harness {
    let channel = Arc::new(channel);
    let store = Arc::new(store);
    let metrics = Arc::new(metrics);
    let broker = MessageBroker::new(
        test_config(),
        channel.clone(),
        store.clone(),
        Some(metrics.clone()),
    );
    Harness {
        broker,
        channel,
        store,
        metrics,
    }
}

fn error_event(input: serde_json::Value) -> WorkflowEvent {
    serde_json::from_value(serde_json::json!({
        "Context": {
            "Execution": { "StartTime": "1970-01-01T00:00:00Z" },
            "StateMachine": {
                "Id": "id",
                "StartTime": "2026-08-01T12:00:00Z",
                "Name": "StateMachineName"
            },
            "State": { "Name": "WorkflowErrorHandler" }
        },
        "Input": input
    }))
    .unwrap()
}

fn cleanup_event(export_timestamp: i64) -> WorkflowEvent {
    serde_json::from_value(serde_json::json!({
        "Context": {
            "Execution": { "StartTime": "1970-01-01T00:00:00Z" },
            "StateMachine": {
                "Id": "id",
                "StartTime": "2026-08-01T12:00:00Z",
                "Name": "ExportWorkflow-HASH"
            },
            "State": { "Name": "WorkflowCleanup", "EnteredTime": "1970-01-01T00:00:01Z" }
        },
        "Input": { "ExportTimestamp": export_timestamp }
    }))
    .unwrap()
}

#[tokio::test]
async fn routes_error_event_to_topic() {
    let h = harness();
    let event = error_event(serde_json::json!({
        "Error": "Error",
        "Cause": "{\"message\":\"error-message\"}"
    }));

    h.broker.route(&event).await.unwrap();

    let published = h.channel.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].topic, "topic-arn");
    assert_eq!(published[0].severity, Severity::Error);

    let expected_cause =
        serde_json::to_string_pretty(&serde_json::json!({ "message": "error-message" })).unwrap();
    let expected_context = serde_json::to_string_pretty(&event.context).unwrap();
    assert_eq!(
        published[0].body,
        format!(
            "An unexpected error occurred while executing the StateMachineName for this solution:\n{}\n\nPlease check the state machine's task logs for additional information\n\nExecution details:\n{}",
            expected_cause, expected_context
        )
    );

    // 错误路径不写记录
    assert!(h.store.records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn routes_cleanup_event_with_record_write() {
    let h = harness();
    let event = cleanup_event(1754000000000);

    h.broker.route(&event).await.unwrap();

    let published = h.channel.published.lock().unwrap();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].severity, Severity::Info);

    let expected_context = serde_json::to_string_pretty(&event.context).unwrap();
    assert_eq!(
        published[0].body,
        format!(
            "Workflow (ExportWorkflow-HASH) completed successfully. Execution took 1 second(s).\n\nExecution details:\n{}",
            expected_context
        )
    );

    let records = h.store.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, LATEST_EXPORT_TIMESTAMP_ID);
    assert_eq!(records[0].record_type, "timestamp-type");
    assert_eq!(records[0].latest_export_timestamp, 1754000000000);
}

#[tokio::test]
async fn unknown_state_is_silent_noop() {
    let h = harness();
    let event: WorkflowEvent = serde_json::from_value(serde_json::json!({
        "Context": {
            "Execution": { "StartTime": "1970-01-01T00:00:00Z" },
            "StateMachine": {
                "Id": "id",
                "StartTime": "2026-08-01T12:00:00Z",
                "Name": "StateMachineName"
            },
            "State": { "Name": "UNKNOWN", "EnteredTime": "1970-01-01T00:00:01Z" }
        },
        "Input": {}
    }))
    .unwrap();

    h.broker.route(&event).await.unwrap();

    assert!(h.channel.published.lock().unwrap().is_empty());
    assert!(h.store.records.lock().unwrap().is_empty());
    assert!(h.metrics.pings.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_cause_renders_unknown() {
    let h = harness();
    let event = error_event(serde_json::json!({}));

    h.broker.route(&event).await.unwrap();

    let published = h.channel.published.lock().unwrap();
    let expected_context = serde_json::to_string_pretty(&event.context).unwrap();
    assert_eq!(
        published[0].body,
        format!(
            "An unexpected error occurred while executing the StateMachineName for this solution:\n\"Unknown\"\n\nPlease check the state machine's task logs for additional information\n\nExecution details:\n{}",
            expected_context
        )
    );
}

#[tokio::test]
async fn plain_string_cause_rendered_quoted() {
    let h = harness();
    let event = error_event(serde_json::json!({
        "Error": "Error",
        "Cause": "some-error-cause"
    }));

    h.broker.route(&event).await.unwrap();

    let published = h.channel.published.lock().unwrap();
    assert!(published[0]
        .body
        .contains("for this solution:\n\"some-error-cause\"\n\n"));
}

#[tokio::test]
async fn identical_events_produce_identical_output() {
    let h = harness();
    let event = cleanup_event(42);

    h.broker.route(&event).await.unwrap();
    h.broker.route(&event).await.unwrap();

    let published = h.channel.published.lock().unwrap();
    let records = h.store.records.lock().unwrap();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].body, published[1].body);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0], records[1]);
}

#[tokio::test]
async fn metric_emitted_once_per_routed_event() {
    let h = harness();

    h.broker
        .route(&error_event(serde_json::json!({ "Cause": "boom" })))
        .await
        .unwrap();
    h.broker.route(&cleanup_event(1)).await.unwrap();

    let pings = h.metrics.pings.lock().unwrap();
    assert_eq!(pings.len(), 2);
    assert_eq!(pings[0].0, "WorkflowError");
    assert_eq!(pings[0].1.get("ErrorOccurred"), Some(&serde_json::json!(true)));
    assert_eq!(pings[1].0, "WorkflowCompleted");
    assert_eq!(pings[1].1.get("ElapsedSeconds"), Some(&serde_json::json!(1)));
}

#[tokio::test]
async fn metric_failure_does_not_fail_invocation() {
    let h = harness_with(
        RecordingChannel::default(),
        RecordingStore::default(),
        RecordingMetrics {
            fail: true,
            ..Default::default()
        },
    );

    h.broker.route(&cleanup_event(7)).await.unwrap();

    // 指标失败被吞掉，主流程照常完成
    assert_eq!(h.channel.published.lock().unwrap().len(), 1);
    assert_eq!(h.store.records.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn errors_only_preference_suppresses_cleanup_publish() {
    let h = harness_with(
        RecordingChannel {
            preference: Some(MessagePreference::ErrorsOnly),
            ..Default::default()
        },
        RecordingStore::default(),
        RecordingMetrics::default(),
    );

    h.broker.route(&cleanup_event(9)).await.unwrap();

    // 发布被偏好拦下，持久化与指标不受影响
    assert!(h.channel.published.lock().unwrap().is_empty());
    assert_eq!(h.store.records.lock().unwrap().len(), 1);
    assert_eq!(h.metrics.pings.lock().unwrap().len(), 1);

    h.broker
        .route(&error_event(serde_json::json!({ "Cause": "boom" })))
        .await
        .unwrap();
    assert_eq!(h.channel.published.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn publish_failure_propagates_after_record_write() {
    let h = harness_with(
        RecordingChannel {
            fail: true,
            ..Default::default()
        },
        RecordingStore::default(),
        RecordingMetrics::default(),
    );

    let err = h.broker.route(&cleanup_event(11)).await.unwrap_err();
    assert!(err.to_string().contains("recording"));

    // 发布失败前记录已经落盘
    assert_eq!(h.store.records.lock().unwrap().len(), 1);
    // 失败的调用不再发指标
    assert!(h.metrics.pings.lock().unwrap().is_empty());
}

#[tokio::test]
async fn store_failure_propagates_before_publish() {
    let h = harness_with(
        RecordingChannel::default(),
        RecordingStore {
            fail: true,
            ..Default::default()
        },
        RecordingMetrics::default(),
    );

    let err = h.broker.route(&cleanup_event(13)).await.unwrap_err();
    assert!(err.to_string().contains("table-name"));
    assert!(h.channel.published.lock().unwrap().is_empty());
}
