//! 智能体依赖与配置
//!
//! AgentDeps 汇集引擎需要的全部协作者（记忆、模型、prompt 模式注册表、工具执行器、Tool Call 检测器），
//! 都由调用方显式构造后传入，没有进程级全局注册表；AgentConfig 描述单个智能体（模式、身份、工具集、策略）。

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::LlmSection;
use crate::llm::{GenerationParams, LlmClient};
use crate::memory::MemoryTracker;
use crate::react::{PromptRegistry, SapDetector, ToolCallDetector};
use crate::tools::{ToolExecutor, ToolRegistry};

/// 引擎协作者集合（全部为 Arc，克隆代价低）
#[derive(Clone)]
pub struct AgentDeps {
    pub memory: Arc<dyn MemoryTracker>,
    pub llm: Arc<dyn LlmClient>,
    pub prompts: Arc<PromptRegistry>,
    pub tools: Arc<ToolExecutor>,
    pub detector: Arc<dyn ToolCallDetector>,
}

impl AgentDeps {
    /// 默认协作者：chat/react 两种 prompt 模式、空工具集、SAP 检测器
    pub fn new(memory: Arc<dyn MemoryTracker>, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            memory,
            llm,
            prompts: Arc::new(PromptRegistry::with_defaults()),
            tools: Arc::new(ToolExecutor::new(ToolRegistry::new(), 30)),
            detector: Arc::new(SapDetector::new()),
        }
    }

    pub fn with_prompts(mut self, prompts: PromptRegistry) -> Self {
        self.prompts = Arc::new(prompts);
        self
    }

    pub fn with_tools(mut self, tools: ToolExecutor) -> Self {
        self.tools = Arc::new(tools);
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn ToolCallDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// 同一套协作者，换一个模型客户端（流水线中单个智能体覆盖模型时使用）
    pub fn with_llm(&self, llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm,
            ..self.clone()
        }
    }
}

/// 执行策略：单次对话或 ReAct 多轮
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// 调一次模型，不处理工具
    SingleShot,
    #[default]
    React,
}

/// 单个智能体的模型来源：显式区分「按配置新建」与「直接使用现成实例」
#[derive(Clone)]
pub enum LlmBinding {
    Config(LlmSection),
    Instance(Arc<dyn LlmClient>),
}

impl fmt::Debug for LlmBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmBinding::Config(section) => f.debug_tuple("Config").field(section).finish(),
            LlmBinding::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

/// 智能体配置
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// prompt 模式名，需已在 PromptRegistry 注册
    pub mode: String,
    pub identity: String,
    pub additional_instructions: Option<String>,
    /// 允许调用的工具；为空表示执行器中全部工具
    pub tools: Vec<String>,
    pub task_list: Option<Vec<String>>,
    pub strategy: Strategy,
    /// run_flow 未指定 max_turns 时使用
    pub max_turns: Option<usize>,
    pub generation: GenerationParams,
    /// None 时使用 AgentDeps 中共享的模型
    pub llm: Option<LlmBinding>,
}

impl AgentConfig {
    pub fn new(mode: impl Into<String>, identity: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            identity: identity.into(),
            additional_instructions: None,
            tools: Vec::new(),
            task_list: None,
            strategy: Strategy::React,
            max_turns: None,
            generation: GenerationParams::default(),
            llm: None,
        }
    }

    /// 单次对话配置（chat 模式 + SingleShot）
    pub fn chat(identity: impl Into<String>) -> Self {
        Self::new("chat", identity).with_strategy(Strategy::SingleShot)
    }

    /// ReAct 配置（react 模式 + 多轮）
    pub fn react(identity: impl Into<String>) -> Self {
        Self::new("react", identity)
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_task_list(mut self, tasks: Vec<String>) -> Self {
        self.task_list = Some(tasks);
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.additional_instructions = Some(instructions.into());
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn with_llm(mut self, binding: LlmBinding) -> Self {
        self.llm = Some(binding);
        self
    }

    /// 工具是否在该智能体的工具集内
    pub fn allows_tool(&self, name: &str) -> bool {
        self.tools.is_empty() || self.tools.iter().any(|t| t == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tool_list_allows_everything() {
        let cfg = AgentConfig::react("a");
        assert!(cfg.allows_tool("search"));
        let cfg = cfg.with_tools(["echo"]);
        assert!(cfg.allows_tool("echo"));
        assert!(!cfg.allows_tool("search"));
    }

    #[test]
    fn test_chat_preset() {
        let cfg = AgentConfig::chat("writer");
        assert_eq!(cfg.mode, "chat");
        assert_eq!(cfg.strategy, Strategy::SingleShot);
    }

    #[test]
    fn test_binding_debug_hides_instance() {
        let binding = LlmBinding::Instance(Arc::new(crate::llm::MockLlmClient::new()));
        assert_eq!(format!("{:?}", binding), "Instance(..)");
    }
}
