//! 消息格式化模块 - 将工作流事件转换为通知文本
//!
//! 设计原则：
//! 1. 纯函数 - 不触碰任何外部通道，相同输入产出逐字节相同的输出
//! 2. 全函数 - 原因字段的三种形状（对象 / JSON 字符串 / 普通字符串）都有确定的输出
//! 3. 模板固定 - 正文模板是运维侧约定的一部分，不随配置变化

use chrono::{DateTime, Utc};

use crate::event::{ExecutionContext, StateInput};

/// 通知正文的固定片段
pub mod msg {
    /// 指引运维查看任务日志
    pub const CHECK_TASK_LOGS: &str =
        "Please check the state machine's task logs for additional information";
    /// 诊断详情标题
    pub const EXECUTION_DETAILS: &str = "Execution details:";
    /// 原因缺失时的占位值
    pub const UNKNOWN_CAUSE: &str = "Unknown";
}

/// 解析错误原因为可读文本
///
/// 优先级：
/// 1. 原因存在且是合法 JSON -> 两空格缩进的结构化文本
/// 2. 原因存在但不是 JSON -> 原串按 JSON 字符串加引号展示
/// 3. 原因缺失 -> 字面量 `"Unknown"`
pub fn resolve_cause(cause: Option<&str>) -> String {
    match cause {
        Some(raw) => match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(parsed) => serde_json::to_string_pretty(&parsed).unwrap_or_default(),
            Err(_) => serde_json::Value::String(raw.to_string()).to_string(),
        },
        None => serde_json::Value::String(msg::UNKNOWN_CAUSE.to_string()).to_string(),
    }
}

/// 计算执行耗时（整秒，向下取整）
///
/// 清理状态总是携带 EnteredTime；缺失时按 0 秒处理，
/// 保证后续的时间戳持久化不受影响。
pub fn elapsed_seconds(start_time: DateTime<Utc>, entered_time: Option<DateTime<Utc>>) -> i64 {
    entered_time
        .map(|entered| (entered - start_time).num_seconds())
        .unwrap_or(0)
}

/// 上下文对象的两空格缩进 JSON（附在每条通知末尾）
fn pretty_context(context: &ExecutionContext) -> String {
    serde_json::to_string_pretty(context).unwrap_or_default()
}

/// 构造错误通知正文
pub fn error_message(context: &ExecutionContext, input: &StateInput) -> String {
    let cause = resolve_cause(input.cause.as_deref());
    format!(
        "An unexpected error occurred while executing the {} for this solution:\n{}\n\n{}\n\n{}\n{}",
        context.state_machine.name,
        cause,
        msg::CHECK_TASK_LOGS,
        msg::EXECUTION_DETAILS,
        pretty_context(context)
    )
}

/// 构造完成通知正文
pub fn cleanup_message(context: &ExecutionContext) -> String {
    let seconds = elapsed_seconds(context.execution.start_time, context.state.entered_time);
    format!(
        "Workflow ({}) completed successfully. Execution took {} second(s).\n\n{}\n{}",
        context.state_machine.name,
        seconds,
        msg::EXECUTION_DETAILS,
        pretty_context(context)
    )
}
