//! 工作流事件结构
//!
//! 定义状态机执行器在每次相关状态转换时投递的事件载荷，
//! 以及按触发状态名进行的事件分类。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 状态机执行器投递的完整事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowEvent {
    /// 执行上下文（由执行器注入）
    #[serde(rename = "Context")]
    pub context: ExecutionContext,
    /// 触发状态的输入，形状取决于具体状态
    #[serde(rename = "Input", default)]
    pub input: StateInput,
}

/// 执行上下文 - 字段顺序与执行器的上下文对象保持一致
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    #[serde(rename = "Execution")]
    pub execution: Execution,
    #[serde(rename = "StateMachine")]
    pub state_machine: StateMachine,
    #[serde(rename = "State")]
    pub state: State,
}

/// 本次执行的信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    /// 执行开始时间
    #[serde(rename = "StartTime")]
    pub start_time: DateTime<Utc>,
}

/// 状态机信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateMachine {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "StartTime")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "Name")]
    pub name: String,
}

/// 触发本次调用的状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    /// 状态名 - 分类的唯一依据
    #[serde(rename = "Name")]
    pub name: String,
    /// 进入该状态的时间（错误状态不携带）
    #[serde(rename = "EnteredTime", skip_serializing_if = "Option::is_none")]
    pub entered_time: Option<DateTime<Utc>>,
}

/// 状态输入 - 自由形状，已知字段类型化，其余原样保留
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateInput {
    /// 错误名（错误处理状态）
    #[serde(rename = "Error", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 错误原因 - 可能是 JSON 编码的对象，也可能是普通字符串
    #[serde(rename = "Cause", skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    /// 导出完成时间戳（epoch 毫秒，清理状态携带）
    #[serde(rename = "ExportTimestamp", skip_serializing_if = "Option::is_none")]
    pub export_timestamp: Option<i64>,
    /// 未识别的字段
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// 事件分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// 错误处理状态触发 - 发布失败通知
    ErrorHandler,
    /// 清理状态触发 - 发布完成通知并持久化时间戳
    Cleanup,
    /// 其他状态 - 无操作
    Ignored,
}

impl WorkflowOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowOutcome::ErrorHandler => "error-handler",
            WorkflowOutcome::Cleanup => "cleanup",
            WorkflowOutcome::Ignored => "ignored",
        }
    }
}

impl std::fmt::Display for WorkflowOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 按状态名分类事件
///
/// 只看状态名，事件的其他字段不参与分类。
/// 未识别的状态名一律归为 `Ignored`，不是错误。
pub fn classify(state_name: &str, error_handler_state: &str, cleanup_state: &str) -> WorkflowOutcome {
    if state_name == error_handler_state {
        WorkflowOutcome::ErrorHandler
    } else if state_name == cleanup_state {
        WorkflowOutcome::Cleanup
    } else {
        WorkflowOutcome::Ignored
    }
}

impl WorkflowEvent {
    /// 从 JSON 文本解析事件
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        let event = serde_json::from_str(raw)?;
        Ok(event)
    }
}
