//! ReAct 主循环
//!
//! 单次对话：写入用户消息 -> 构建 system prompt -> 调一次模型 -> 回复写入记忆并作为最终结果。
//! 多轮：预算检查 -> 调模型（原始输出先写入记忆再解析）-> 检测 Action ->
//! 纠正提示重试 / 隐式最终回复 / final_answer / ask_user 挂起 / 执行工具并回写观察，直到 max_turns 用尽。

use serde_json::json;
use tokio::sync::mpsc::UnboundedSender;

use crate::agent::{AgentConfig, AgentDeps};
use crate::core::{
    AgentError, FlowResult, OrchestrationState, PendingAskUser, StepLogEntry, ASK_USER_KEY,
    METADATA_KEY, STEPS_KEY, TASK_LIST_KEY,
};
use crate::llm::CompletionRequest;
use crate::memory::Message;
use crate::react::{extract_thought, DetectionFailure, PromptContext, ReactEvent};
use crate::tools::{AskUserArgs, FinalAnswerArgs, ASK_USER_TOOL, FINAL_ANSWER_TOOL};

/// 未指定时的最大轮数
pub const DEFAULT_MAX_TURNS: usize = 8;
/// Observation 预览最大字符数
const OBSERVATION_PREVIEW_CHARS: usize = 200;
/// 模型输出预览最大字符数
const OUTPUT_PREVIEW_CHARS: usize = 800;

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    } else {
        text.to_string()
    }
}

/// 一次运行所需的协作者与配置
pub struct ReactSession<'a> {
    pub deps: &'a AgentDeps,
    pub config: &'a AgentConfig,
    /// 可选：事件推送通道
    pub event_tx: Option<&'a UnboundedSender<ReactEvent>>,
}

impl<'a> ReactSession<'a> {
    pub fn new(deps: &'a AgentDeps, config: &'a AgentConfig) -> Self {
        Self {
            deps,
            config,
            event_tx: None,
        }
    }

    pub fn with_event_tx(mut self, tx: Option<&'a UnboundedSender<ReactEvent>>) -> Self {
        self.event_tx = tx;
        self
    }

    fn emit(&self, ev: ReactEvent) {
        if let Some(tx) = self.event_tx {
            let _ = tx.send(ev);
        }
    }

    fn system_prompt(&self, task_list: Option<&[String]>) -> Result<String, AgentError> {
        let tools = self.deps.tools.descriptors(&self.config.tools);
        let ctx = PromptContext {
            identity: &self.config.identity,
            additional_instructions: self.config.additional_instructions.as_deref(),
            tools: &tools,
            task_list,
        };
        self.deps.prompts.build(&self.config.mode, &ctx)
    }

    /// 调一次模型：记录原始输出与元数据，并在解析前写入记忆
    async fn invoke(
        &self,
        state: &mut OrchestrationState,
        task_list: Option<&[String]>,
    ) -> Result<String, AgentError> {
        let request = CompletionRequest {
            system: self.system_prompt(task_list)?,
            messages: self.deps.memory.trimmed().await,
            params: self.config.generation.clone(),
        };
        let completion = self.deps.llm.complete(&request).await?;

        state.last_model_output = Some(completion.text.clone());
        state
            .data
            .insert(METADATA_KEY.to_string(), completion.metadata);
        self.deps
            .memory
            .append(Message::assistant(completion.text.clone()))
            .await?;
        self.emit(ReactEvent::ModelOutput {
            text: preview(&completion.text, OUTPUT_PREVIEW_CHARS),
        });
        Ok(completion.text)
    }
}

fn record_steps(state: &mut OrchestrationState, steps: &[StepLogEntry]) {
    state.data.insert(STEPS_KEY.to_string(), json!(steps));
}

/// 单次对话：不处理工具
pub async fn chat_once(
    session: &ReactSession<'_>,
    user_input: &str,
) -> Result<FlowResult, AgentError> {
    session
        .deps
        .memory
        .append(Message::user(user_input))
        .await?;

    let mut state = OrchestrationState::new();
    let text = session
        .invoke(&mut state, session.config.task_list.as_deref())
        .await?;
    state.final_output = Some(text.clone());
    session.emit(ReactEvent::FinalAnswer { text });
    Ok(FlowResult::finished(state))
}

/// 多轮 ReAct：最多 max_turns 次模型调用
pub async fn react_loop(
    session: &ReactSession<'_>,
    user_input: &str,
    max_turns: usize,
) -> Result<FlowResult, AgentError> {
    let deps = session.deps;
    let config = session.config;

    deps.memory.append(Message::user(user_input)).await?;

    let mut state = OrchestrationState::new();
    let mut steps: Vec<StepLogEntry> = Vec::new();
    let mut task_list = config.task_list.clone();
    if let Some(ref tasks) = task_list {
        state.data.insert(TASK_LIST_KEY.to_string(), json!(tasks));
    }
    record_steps(&mut state, &steps);

    for turn in 1..=max_turns {
        let remaining = deps.memory.remaining_budget().await;
        if remaining <= 0 {
            tracing::warn!(turn, remaining, "budget exhausted, stopping");
            session.emit(ReactEvent::BudgetExhausted { remaining });
            return Ok(FlowResult::finished(state));
        }

        session.emit(ReactEvent::TurnStarted { turn, max_turns });
        tracing::debug!(turn, max_turns, "react turn");
        let output = session.invoke(&mut state, task_list.as_deref()).await?;

        let call = match deps.detector.detect(&output) {
            Ok(call) => call,
            Err(DetectionFailure {
                message,
                llm_hint: Some(hint),
            }) => {
                tracing::warn!(turn, %message, "unparsable action, sending corrective hint");
                deps.memory.append(Message::system(hint)).await?;
                session.emit(ReactEvent::CorrectiveHint { message });
                continue;
            }
            Err(DetectionFailure { llm_hint: None, .. }) => {
                // 没有 Action：原文即最终回复
                if let Some(thought) = extract_thought(&output) {
                    steps.push(StepLogEntry {
                        thought: Some(thought),
                        ..StepLogEntry::default()
                    });
                    record_steps(&mut state, &steps);
                }
                state.final_output = Some(output.clone());
                session.emit(ReactEvent::FinalAnswer { text: output });
                return Ok(FlowResult::finished(state));
            }
        };

        let thought = extract_thought(&output);
        match call.tool_name.as_str() {
            FINAL_ANSWER_TOOL => {
                let answer = serde_json::from_value::<FinalAnswerArgs>(call.params.clone())
                    .map(|a| a.answer)
                    .unwrap_or_else(|_| call.params.to_string());
                steps.push(StepLogEntry {
                    thought,
                    action_name: Some(FINAL_ANSWER_TOOL.to_string()),
                    observation: None,
                });
                record_steps(&mut state, &steps);
                deps.memory.append(Message::assistant(answer.clone())).await?;
                state.final_output = Some(answer.clone());
                tracing::info!(turn, "final answer");
                session.emit(ReactEvent::FinalAnswer { text: answer });
                return Ok(FlowResult::finished(state));
            }
            ASK_USER_TOOL => {
                let pending = match serde_json::from_value::<AskUserArgs>(call.params.clone()) {
                    Ok(a) => PendingAskUser {
                        question: a.question,
                        details: a.details,
                    },
                    Err(_) => PendingAskUser {
                        question: call.params.to_string(),
                        details: None,
                    },
                };
                state
                    .data
                    .insert(ASK_USER_KEY.to_string(), json!(pending));
                tracing::info!(turn, question = %pending.question, "suspending for user input");
                session.emit(ReactEvent::AskUser {
                    question: pending.question.clone(),
                    details: pending.details.clone(),
                });
                return Ok(FlowResult::suspended(state, pending));
            }
            tool => {
                if !config.allows_tool(tool) {
                    return Err(AgentError::ToolNotAvailable(tool.to_string()));
                }
                steps.push(StepLogEntry {
                    thought,
                    action_name: Some(tool.to_string()),
                    observation: None,
                });
                record_steps(&mut state, &steps);
                session.emit(ReactEvent::ToolCall {
                    tool: tool.to_string(),
                    params: call.params.clone(),
                });

                let output = deps.tools.execute(tool, call.params).await?;
                deps.memory
                    .append(Message::tool(output.observation.clone()))
                    .await?;
                if let Some(entry) = steps.last_mut() {
                    entry.observation = Some(output.observation.clone());
                }
                record_steps(&mut state, &steps);
                if let Some(tasks) = output.task_list {
                    state
                        .data
                        .insert(TASK_LIST_KEY.to_string(), json!(tasks));
                    task_list = Some(tasks);
                }
                session.emit(ReactEvent::Observation {
                    tool: tool.to_string(),
                    preview: preview(&output.observation, OBSERVATION_PREVIEW_CHARS),
                });
            }
        }
    }

    tracing::warn!(max_turns, "max turns reached without a final answer");
    Ok(FlowResult::finished(state))
}
