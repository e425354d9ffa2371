//! 任务列表工具：通过旁路元数据覆盖当前生效的任务列表

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::tools::{Tool, ToolOutput};

pub struct UpdateTasksTool;

#[async_trait]
impl Tool for UpdateTasksTool {
    fn name(&self) -> &str {
        "update_tasks"
    }

    fn description(&self) -> &str {
        "Replace the active task list. Use it to plan multi-step work and tick items off."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tasks": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["tasks"]
        })
    }

    async fn execute(&self, args: Value) -> Result<ToolOutput, String> {
        let tasks: Vec<String> = args
            .get("tasks")
            .and_then(|v| v.as_array())
            .ok_or_else(|| "missing array field 'tasks'".to_string())?
            .iter()
            .map(|t| match t.as_str() {
                Some(s) => s.to_string(),
                None => t.to_string(),
            })
            .collect();
        let observation = format!("Task list updated ({} items)", tasks.len());
        Ok(ToolOutput::text(observation).with_task_list(tasks))
    }
}
