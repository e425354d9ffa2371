//! 多智能体流水线
//!
//! 按顺序为每个 AgentConfig 新建一次运行：模型取配置覆盖（新建或现成实例）或共享模型，
//! 以当前输入执行，data 浅合并进汇总状态，final 作为下一个智能体的输入。
//! 任一智能体挂起（ask_user）时立即停止并向上返回挂起标记，保留最近一次成功产出的 final，
//! 并在 data 中记下挂起的阶段序号；resume_pipeline 从该阶段起以用户回答为输入继续。

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::agent::{AgentConfig, AgentDeps, LlmBinding};
use crate::core::{
    AgentError, FlowResult, OrchestrationState, Orchestrator, RunOptions, SUSPENDED_STAGE_KEY,
};
use crate::llm::{create_llm_client, LlmClient};
use crate::react::ReactEvent;

/// 解析单个智能体的模型来源
pub fn resolve_llm(
    binding: Option<&LlmBinding>,
    shared: &Arc<dyn LlmClient>,
) -> Result<Arc<dyn LlmClient>, AgentError> {
    match binding {
        None => Ok(shared.clone()),
        Some(LlmBinding::Instance(client)) => Ok(client.clone()),
        Some(LlmBinding::Config(section)) => create_llm_client(section),
    }
}

pub async fn run_pipeline(
    deps: &AgentDeps,
    stages: &[AgentConfig],
    user_input: &str,
    event_tx: Option<&UnboundedSender<ReactEvent>>,
) -> Result<FlowResult, AgentError> {
    resume_pipeline(deps, stages, 0, user_input, event_tx).await
}

/// 从第 from 个阶段开始执行（序号与完整流水线一致）
pub async fn resume_pipeline(
    deps: &AgentDeps,
    stages: &[AgentConfig],
    from: usize,
    user_input: &str,
    event_tx: Option<&UnboundedSender<ReactEvent>>,
) -> Result<FlowResult, AgentError> {
    if from > 0 && from >= stages.len() {
        return Err(AgentError::ConfigError(format!(
            "pipeline has {} stages, cannot resume at stage {}",
            stages.len(),
            from
        )));
    }

    let mut aggregate = OrchestrationState::new();
    let mut current_input = user_input.to_string();

    for (index, config) in stages.iter().enumerate().skip(from) {
        tracing::info!(stage = index, agent = %config.identity, "pipeline stage");
        if let Some(tx) = event_tx {
            let _ = tx.send(ReactEvent::StageStarted {
                index,
                identity: config.identity.clone(),
            });
        }

        let llm = resolve_llm(config.llm.as_ref(), &deps.llm)?;
        let mut engine = Orchestrator::new(deps.with_llm(llm), config.clone());
        if let Some(tx) = event_tx {
            engine = engine.with_event_tx(tx.clone());
        }
        let result = engine
            .run_flow(&current_input, RunOptions::default())
            .await?;

        aggregate.merge_data(result.state.data);
        if result.state.last_model_output.is_some() {
            aggregate.last_model_output = result.state.last_model_output;
        }

        if let Some(pending) = result.pending_ask_user {
            tracing::info!(stage = index, "pipeline suspended for user input");
            aggregate
                .data
                .insert(SUSPENDED_STAGE_KEY.to_string(), index.into());
            return Ok(FlowResult::suspended_with_final(aggregate, pending));
        }

        match result.final_output {
            Some(text) => {
                aggregate.final_output = Some(text.clone());
                current_input = text;
            }
            None => {
                tracing::warn!(
                    stage = index,
                    "agent produced no final output, passing its input through"
                );
            }
        }
    }

    Ok(FlowResult::finished(aggregate))
}
