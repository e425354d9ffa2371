//! Agent 错误类型
//!
//! 只有致命错误走 AgentError（未注册的 prompt 模式、模型调用失败、工具失败），一律向调用方传播；
//! 模型输出格式错误不是错误，由检测器的 DetectionFailure 表达并在循环内处理。

use thiserror::Error;

use crate::llm::LlmError;

/// 引擎运行过程中可能出现的致命错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 引擎自身唯一的失败信息：prompt 模式未注册
    #[error("Unknown prompt mode: {0}")]
    UnknownMode(String),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// 工具已注册，但不在当前智能体的工具集内
    #[error("Tool not available for this agent: {0}")]
    ToolNotAvailable(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_message_is_not_wrapped() {
        let err: AgentError = LlmError::Api("quota exceeded".to_string()).into();
        assert_eq!(err.to_string(), LlmError::Api("quota exceeded".to_string()).to_string());
    }

    #[test]
    fn test_unknown_mode_message() {
        let err = AgentError::UnknownMode("planner".to_string());
        assert!(err.to_string().contains("planner"));
    }
}
