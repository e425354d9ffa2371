//! System Prompt 模式注册表
//!
//! 模式名 → 构建函数。注册表由调用方显式创建并放进 AgentDeps，注册顺序与作用域完全确定，测试之间互不影响。

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::core::AgentError;
use crate::tools::{builtin_tool_descriptors, ToolDescriptor};

/// 构建 system prompt 所需的输入
#[derive(Debug, Clone, Copy)]
pub struct PromptContext<'a> {
    pub identity: &'a str,
    pub additional_instructions: Option<&'a str>,
    /// 当前智能体可用的（非内置）工具
    pub tools: &'a [ToolDescriptor],
    pub task_list: Option<&'a [String]>,
}

type ModeBuilder = Arc<dyn Fn(&PromptContext<'_>) -> String + Send + Sync>;

/// 模式注册表
#[derive(Clone, Default)]
pub struct PromptRegistry {
    modes: HashMap<String, ModeBuilder>,
}

impl PromptRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置 chat 与 react 两种模式
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("chat", chat_prompt);
        registry.register("react", react_prompt);
        registry
    }

    /// 注册（或覆盖）一个模式
    pub fn register<F>(&mut self, mode: impl Into<String>, builder: F)
    where
        F: Fn(&PromptContext<'_>) -> String + Send + Sync + 'static,
    {
        self.modes.insert(mode.into(), Arc::new(builder));
    }

    pub fn contains(&self, mode: &str) -> bool {
        self.modes.contains_key(mode)
    }

    pub fn modes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modes.keys().cloned().collect();
        names.sort();
        names
    }

    /// 未注册的模式直接失败
    pub fn build(&self, mode: &str, ctx: &PromptContext<'_>) -> Result<String, AgentError> {
        let builder = self
            .modes
            .get(mode)
            .ok_or_else(|| AgentError::UnknownMode(mode.to_string()))?;
        Ok(builder(ctx))
    }
}

fn push_common(prompt: &mut String, ctx: &PromptContext<'_>) {
    if let Some(extra) = ctx.additional_instructions {
        let _ = write!(prompt, "\n\n## Additional instructions\n{}", extra.trim());
    }
    if let Some(tasks) = ctx.task_list {
        if !tasks.is_empty() {
            prompt.push_str("\n\n## Current task list\n");
            for (i, t) in tasks.iter().enumerate() {
                let _ = writeln!(prompt, "{}. {}", i + 1, t);
            }
        }
    }
}

/// 单次对话：只有身份与附加指令
pub fn chat_prompt(ctx: &PromptContext<'_>) -> String {
    let mut prompt = format!("You are {}.", ctx.identity);
    push_common(&mut prompt, ctx);
    prompt
}

/// ReAct：身份 + 协议说明 + 工具目录（含两个内置工具的 JSON Schema）
pub fn react_prompt(ctx: &PromptContext<'_>) -> String {
    let mut prompt = format!(
        "You are {}. Solve the task step by step. In every reply, first write \
         `Thought: <your reasoning>` and then exactly one line \
         `Action: <tool_name> = {{<json parameters>}}`.\n\
         Observations from tools are returned to you as tool messages.\n\
         When you are done, call `final_answer`. If you need information only the user has, call `ask_user`.",
        ctx.identity
    );

    prompt.push_str("\n\n## Tools\n");
    let builtins = builtin_tool_descriptors();
    for tool in ctx.tools.iter().chain(builtins.iter()) {
        let _ = writeln!(
            prompt,
            "- {}: {}\n  parameters: {}",
            tool.name, tool.description, tool.parameters
        );
    }
    push_common(&mut prompt, ctx);
    prompt
}
