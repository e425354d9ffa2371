//! Hive - 智能体回合执行引擎
//!
//! 模块划分：
//! - **agent**: 运行依赖（AgentDeps）与智能体配置（AgentConfig）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 编排器、运行状态、步骤序列器、多智能体流水线
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **memory**: 追加式对话记忆、Token 预算与持久化
//! - **react**: Tool Call 检测、System Prompt 模式、ReAct 主循环
//! - **tools**: 工具注册表与带超时的执行器

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod react;
pub mod tools;

pub use crate::agent::{AgentConfig, AgentDeps, LlmBinding, Strategy};
pub use crate::core::{AgentError, FlowResult, Orchestrator, RunOptions};
