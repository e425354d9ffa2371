//! 编排器：引擎对外入口
//!
//! 由 (AgentDeps, AgentConfig) 构造；run_flow 按配置跑单次对话或 ReAct 多轮，
//! run 执行通用步骤序列，add_agent / execute_agents 组成多智能体流水线。
//! 每次顶层调用都新建 OrchestrationState，调用之间只通过记忆（MemoryTracker）衔接。

use tokio::sync::mpsc::UnboundedSender;
use tracing::Instrument;

use crate::agent::{AgentConfig, AgentDeps, Strategy};
use crate::core::pipeline::{resume_pipeline, run_pipeline};
use crate::core::sequencer::{run_steps, Step};
use crate::core::{AgentError, FlowResult};
use crate::react::{chat_once, react_loop, ReactEvent, ReactSession, DEFAULT_MAX_TURNS};

/// run_flow 的可选参数
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// 覆盖 AgentConfig::max_turns
    pub max_turns: Option<usize>,
}

impl RunOptions {
    pub fn max_turns(max_turns: usize) -> Self {
        Self {
            max_turns: Some(max_turns),
        }
    }
}

pub struct Orchestrator {
    deps: AgentDeps,
    config: AgentConfig,
    agents: Vec<AgentConfig>,
    event_tx: Option<UnboundedSender<ReactEvent>>,
}

impl Orchestrator {
    pub fn new(deps: AgentDeps, config: AgentConfig) -> Self {
        Self {
            deps,
            config,
            agents: Vec::new(),
            event_tx: None,
        }
    }

    /// 设置事件推送通道
    pub fn with_event_tx(mut self, tx: UnboundedSender<ReactEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    /// 追加一个流水线阶段；不会执行任何东西
    pub fn add_agent(mut self, config: AgentConfig) -> Self {
        self.agents.push(config);
        self
    }

    pub fn agents(&self) -> &[AgentConfig] {
        &self.agents
    }

    pub fn deps(&self) -> &AgentDeps {
        &self.deps
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// 回合引擎入口
    pub async fn run_flow(
        &self,
        user_input: &str,
        options: RunOptions,
    ) -> Result<FlowResult, AgentError> {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("run_flow", %run_id, agent = %self.config.identity);
        async {
            let session = ReactSession::new(&self.deps, &self.config)
                .with_event_tx(self.event_tx.as_ref());
            let result = match self.config.strategy {
                Strategy::SingleShot => chat_once(&session, user_input).await?,
                Strategy::React => {
                    let max_turns = options
                        .max_turns
                        .or(self.config.max_turns)
                        .unwrap_or(DEFAULT_MAX_TURNS);
                    react_loop(&session, user_input, max_turns).await?
                }
            };
            tracing::info!(
                has_final = result.final_output.is_some(),
                suspended = result.is_suspended(),
                "run_flow finished"
            );
            Ok::<_, AgentError>(result)
        }
        .instrument(span)
        .await
    }

    /// 通用步骤序列器
    pub async fn run(
        &self,
        steps: &[Box<dyn Step>],
        user_input: &str,
    ) -> Result<FlowResult, AgentError> {
        run_steps(&self.deps, &self.config, steps, user_input).await
    }

    /// 执行已排队的流水线；队列为空时等同于 run_flow
    pub async fn execute_agents(&self, user_input: &str) -> Result<FlowResult, AgentError> {
        if self.agents.is_empty() {
            return self.run_flow(user_input, RunOptions::default()).await;
        }
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("execute_agents", %run_id, stages = self.agents.len());
        run_pipeline(&self.deps, &self.agents, user_input, self.event_tx.as_ref())
            .instrument(span)
            .await
    }

    /// 流水线挂起后继续：从挂起的阶段起，以用户回答作为该阶段的输入
    pub async fn resume_agents(
        &self,
        from_stage: usize,
        answer: &str,
    ) -> Result<FlowResult, AgentError> {
        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("resume_agents", %run_id, from_stage);
        resume_pipeline(
            &self.deps,
            &self.agents,
            from_stage,
            answer,
            self.event_tx.as_ref(),
        )
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::llm::MockLlmClient;
    use crate::memory::BudgetedMemory;

    fn orchestrator(replies: &[&str], config: AgentConfig) -> (Arc<MockLlmClient>, Orchestrator) {
        let llm = Arc::new(MockLlmClient::scripted(replies.iter().copied()));
        let deps = AgentDeps::new(Arc::new(BudgetedMemory::default()), llm.clone());
        (llm, Orchestrator::new(deps, config))
    }

    #[tokio::test]
    async fn test_strategy_selects_single_shot() {
        let (llm, o) = orchestrator(&["Action: search = {}"], AgentConfig::chat("a"));
        let result = o.run_flow("Hi", RunOptions::default()).await.unwrap();
        // 单次对话不解析 Action
        assert_eq!(result.final_output.as_deref(), Some("Action: search = {}"));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_max_turns_precedence() {
        let bad = "Action: x = {";
        let (llm, o) = orchestrator(&[bad; 10], AgentConfig::react("a").with_max_turns(4));
        o.run_flow("q", RunOptions::default()).await.unwrap();
        assert_eq!(llm.call_count(), 4);

        o.run_flow("q", RunOptions::max_turns(2)).await.unwrap();
        assert_eq!(llm.call_count(), 6);
    }

    #[tokio::test]
    async fn test_default_max_turns() {
        let bad = "Action: x = {";
        let (llm, o) = orchestrator(&[bad; 20], AgentConfig::react("a"));
        o.run_flow("q", RunOptions::default()).await.unwrap();
        assert_eq!(llm.call_count(), DEFAULT_MAX_TURNS);
    }

    #[tokio::test]
    async fn test_execute_agents_falls_back_to_run_flow() {
        let (_, o) = orchestrator(&["solo"], AgentConfig::chat("a"));
        assert!(o.agents().is_empty());
        let result = o.execute_agents("go").await.unwrap();
        assert_eq!(result.final_output.as_deref(), Some("solo"));
    }

    #[tokio::test]
    async fn test_add_agent_is_lazy_and_ordered() {
        let (llm, o) = orchestrator(&["one", "two"], AgentConfig::react("root"));
        let o = o
            .add_agent(AgentConfig::chat("first"))
            .add_agent(AgentConfig::chat("second"));
        assert_eq!(llm.call_count(), 0);
        assert_eq!(o.agents()[1].identity, "second");

        let result = o.execute_agents("go").await.unwrap();
        assert_eq!(result.final_output.as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_resume_agents_after_suspension() {
        let (llm, o) = orchestrator(
            &[
                r#"Action: ask_user = {"question":"Tone?"}"#,
                r#"Action: final_answer = {"answer":"formal"}"#,
                "Dear Sir",
            ],
            AgentConfig::react("root"),
        );
        let o = o
            .add_agent(AgentConfig::react("Clarifier"))
            .add_agent(AgentConfig::chat("Writer"));

        let first = o.execute_agents("write a letter").await.unwrap();
        let stage = first.state.data[crate::core::SUSPENDED_STAGE_KEY]
            .as_u64()
            .unwrap() as usize;
        assert_eq!(stage, 0);

        let result = o.resume_agents(stage, "formal please").await.unwrap();
        assert_eq!(result.final_output.as_deref(), Some("Dear Sir"));
        assert_eq!(llm.call_count(), 3);
        assert!(llm.requests()[1].system.contains("Clarifier"));
    }
}
