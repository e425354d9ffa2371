//! 内置工具参数与 JSON Schema（schemars 自动生成）
//!
//! final_answer / ask_user 不经过工具执行器，由 ReAct 循环直接处理；
//! 它们的 Schema 注入 react 模式的 system prompt，减少模型输出格式错误。

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use crate::tools::ToolDescriptor;

pub const FINAL_ANSWER_TOOL: &str = "final_answer";
pub const ASK_USER_TOOL: &str = "ask_user";

/// final_answer 的参数
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FinalAnswerArgs {
    /// 给用户的最终回复
    pub answer: String,
}

/// ask_user 的参数
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AskUserArgs {
    /// 需要用户回答的问题
    pub question: String,
    /// 可选的补充说明
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// 两个内置工具的描述
pub fn builtin_tool_descriptors() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor {
            name: FINAL_ANSWER_TOOL.to_string(),
            description: "Finish the task and give the final answer to the user.".to_string(),
            parameters: serde_json::to_value(schema_for!(FinalAnswerArgs)).unwrap_or_default(),
        },
        ToolDescriptor {
            name: ASK_USER_TOOL.to_string(),
            description: "Pause and ask the user a question when required information is missing."
                .to_string(),
            parameters: serde_json::to_value(schema_for!(AskUserArgs)).unwrap_or_default(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_schemas_mention_fields() {
        let descriptors = builtin_tool_descriptors();
        assert_eq!(descriptors.len(), 2);
        assert!(descriptors[0].parameters.to_string().contains("answer"));
        assert!(descriptors[1].parameters.to_string().contains("question"));
    }

    #[test]
    fn test_ask_user_details_optional() {
        let args: AskUserArgs = serde_json::from_str(r#"{"question":"Name?"}"#).unwrap();
        assert_eq!(args.question, "Name?");
        assert!(args.details.is_none());
    }
}
