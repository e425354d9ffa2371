//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `HIVE__*` 覆盖（双下划线表示嵌套，如 `HIVE__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::agent::{AgentConfig, LlmBinding, Strategy};
use crate::llm::GenerationParams;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub agent: AgentSection,
    pub memory: MemorySection,
    pub tools: ToolsSection,
    /// 多智能体流水线，按声明顺序执行；为空时只跑 [agent]
    pub pipeline: Vec<AgentSection>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppSection {
    pub name: Option<String>,
}

/// [llm] 段：后端选择、超时与重试
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：mock / openai / deepseek
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    /// 未设置时读环境变量
    pub api_key: Option<String>,
    pub timeouts: LlmTimeoutsSection,
    pub retry: LlmRetrySection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: None,
            base_url: None,
            api_key: None,
            timeouts: LlmTimeoutsSection::default(),
            retry: LlmRetrySection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmTimeoutsSection {
    /// 单次请求超时（秒）
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self { request: 60 }
    }
}

/// [llm.retry] 段；max_retries = 0 关闭重试
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmRetrySection {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for LlmRetrySection {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
        }
    }
}

/// [agent] 段，也用于 [[pipeline]] 的每一项
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    /// prompt 模式名（chat / react / 自定义注册的模式）
    pub mode: String,
    pub identity: String,
    pub strategy: Strategy,
    pub max_turns: Option<usize>,
    pub additional_instructions: Option<String>,
    /// 可用工具名；为空表示全部已注册工具
    pub tools: Vec<String>,
    pub task_list: Option<Vec<String>>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// 该智能体单独使用的模型配置
    pub llm: Option<LlmSection>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            mode: "react".to_string(),
            identity: "Hive".to_string(),
            strategy: Strategy::React,
            max_turns: None,
            additional_instructions: None,
            tools: Vec::new(),
            task_list: None,
            temperature: None,
            max_tokens: None,
            llm: None,
        }
    }
}

impl AgentSection {
    pub fn to_agent_config(&self) -> AgentConfig {
        AgentConfig {
            mode: self.mode.clone(),
            identity: self.identity.clone(),
            additional_instructions: self.additional_instructions.clone(),
            tools: self.tools.clone(),
            task_list: self.task_list.clone(),
            strategy: self.strategy,
            max_turns: self.max_turns,
            generation: GenerationParams {
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            },
            llm: self.llm.clone().map(LlmBinding::Config),
        }
    }
}

/// [memory] 段：上下文窗口与总预算（估算 token）
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    pub context_window: usize,
    pub total_budget: usize,
    /// 设置后启动时加载、退出时保存对话，用于挂起后继续
    pub persist_path: Option<PathBuf>,
}

impl Default for MemorySection {
    fn default() -> Self {
        Self {
            context_window: 6_000,
            total_budget: 32_000,
            persist_path: None,
        }
    }
}

/// [tools] 段
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    pub tool_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: 30,
        }
    }
}

/// 从 config 目录加载配置，环境变量 HIVE__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 HIVE__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("HIVE")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.llm.provider, "mock");
        assert_eq!(cfg.agent.mode, "react");
        assert_eq!(cfg.tools.tool_timeout_secs, 30);
        assert!(cfg.pipeline.is_empty());
    }

    #[test]
    fn test_load_explicit_file_with_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[agent]
identity = "Tester"
max_turns = 3

[[pipeline]]
mode = "chat"
identity = "Writer"
strategy = "single_shot"

[[pipeline]]
mode = "chat"
identity = "Critic"
strategy = "single_shot"
llm = { provider = "mock" }
"#,
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.agent.identity, "Tester");
        assert_eq!(cfg.agent.max_turns, Some(3));
        assert_eq!(cfg.pipeline.len(), 2);
        assert_eq!(cfg.pipeline[0].strategy, Strategy::SingleShot);

        let critic = cfg.pipeline[1].to_agent_config();
        assert!(matches!(critic.llm, Some(LlmBinding::Config(ref s)) if s.provider == "mock"));
    }
}
