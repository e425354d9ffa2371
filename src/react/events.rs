//! ReAct 过程事件：供调用方实时展示思考、工具调用、观察、挂起与最终回复

use serde::Serialize;

/// 单步过程事件（可序列化为 JSON）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReactEvent {
    /// 流水线开始执行第 index 个智能体
    StageStarted { index: usize, identity: String },
    /// 第 turn 轮开始（从 1 计）
    TurnStarted { turn: usize, max_turns: usize },
    /// 模型原始输出（预览）
    ModelOutput { text: String },
    ToolCall {
        tool: String,
        params: serde_json::Value,
    },
    /// 工具返回（预览，避免过长）
    Observation { tool: String, preview: String },
    /// 输出无法解析，纠正提示已写入记忆
    CorrectiveHint { message: String },
    AskUser {
        question: String,
        details: Option<String>,
    },
    FinalAnswer { text: String },
    /// 剩余预算耗尽，循环停止
    BudgetExhausted { remaining: i64 },
}
