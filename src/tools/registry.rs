//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），由 ToolRegistry 按名注册与查找，
//! ToolExecutor 在调用时加超时并统一转 AgentError。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// 工具执行结果：观察文本 + 可选的旁路元数据
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub observation: String,
    /// 非 None 时覆盖当前生效的任务列表
    pub task_list: Option<Vec<String>>,
}

impl ToolOutput {
    pub fn text(observation: impl Into<String>) -> Self {
        Self {
            observation: observation.into(),
            task_list: None,
        }
    }

    pub fn with_task_list(mut self, tasks: Vec<String>) -> Self {
        self.task_list = Some(tasks);
        self
    }
}

/// 工具描述（写入 system prompt 的工具目录）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// 工具 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（对应 `Action: <name> = {...}` 中的 name）
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// 默认返回空对象 schema，表示参数格式不限
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String>;
}

/// 按名称存储 Arc<dyn Tool>；BTreeMap 保证工具目录顺序稳定
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// scope 为空时返回全部工具，否则只返回 scope 中已注册的工具
    pub fn descriptors(&self, scope: &[String]) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .filter(|t| scope.is_empty() || scope.iter().any(|s| s == t.name()))
            .map(|t| ToolDescriptor {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{EchoTool, UpdateTasksTool};

    #[test]
    fn test_descriptors_respect_scope() {
        let registry = ToolRegistry::new()
            .with_tool(EchoTool)
            .with_tool(UpdateTasksTool);
        assert_eq!(registry.descriptors(&[]).len(), 2);
        let scoped = registry.descriptors(&["echo".to_string(), "missing".to_string()]);
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].name, "echo");
    }

    #[test]
    fn test_names_are_sorted() {
        let registry = ToolRegistry::new()
            .with_tool(UpdateTasksTool)
            .with_tool(EchoTool);
        assert_eq!(registry.tool_names(), vec!["echo", "update_tasks"]);
    }
}
