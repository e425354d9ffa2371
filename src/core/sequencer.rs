//! 通用步骤序列器
//!
//! 有序步骤共享同一个 OrchestrationState：合并 data、覆盖 final、halt 即停止、next 按 id 跳转。
//! next 指向不存在的 id 时不报错，按顺序继续执行下一个步骤。

use async_trait::async_trait;

use crate::agent::{AgentConfig, AgentDeps};
use crate::core::{AgentError, FlowResult, OrchestrationState, StepContext, StepResultUpdate};
use crate::memory::Message;

/// 一个工作单元
#[async_trait]
pub trait Step: Send + Sync {
    /// 跳转目标用的 id
    fn id(&self) -> &str;

    async fn execute(&self, ctx: &mut StepContext<'_>) -> Result<StepResultUpdate, AgentError>;
}

/// 执行步骤列表；开始前把用户输入写入记忆
pub async fn run_steps(
    deps: &AgentDeps,
    config: &AgentConfig,
    steps: &[Box<dyn Step>],
    user_input: &str,
) -> Result<FlowResult, AgentError> {
    deps.memory.append(Message::user(user_input)).await?;

    let mut state = OrchestrationState::new();
    let mut idx = 0usize;
    while let Some(step) = steps.get(idx) {
        tracing::debug!(step = step.id(), index = idx, "running step");
        let update = {
            let mut ctx = StepContext {
                deps,
                config,
                state: &mut state,
            };
            step.execute(&mut ctx).await?
        };

        if let Some(data) = update.data {
            state.merge_data(data);
        }
        if let Some(text) = update.final_output {
            state.final_output = Some(text);
        }
        if update.halt {
            tracing::debug!(step = step.id(), "halted");
            break;
        }

        idx = match update.next {
            Some(target) => match steps.iter().position(|s| s.id() == target) {
                Some(found) => found,
                None => {
                    tracing::warn!(step = step.id(), jump = %target, "jump target not found, continuing sequentially");
                    idx + 1
                }
            },
            None => idx + 1,
        };
    }

    Ok(FlowResult::finished(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use serde_json::json;

    use crate::llm::MockLlmClient;
    use crate::memory::{BudgetedMemory, MemoryTracker};

    /// 记录执行顺序，并返回预设的 update
    struct Recorder {
        id: &'static str,
        update: StepResultUpdate,
        log: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Step for Recorder {
        fn id(&self) -> &str {
            self.id
        }

        async fn execute(&self, ctx: &mut StepContext<'_>) -> Result<StepResultUpdate, AgentError> {
            self.log.lock().unwrap().push(self.id);
            ctx.state
                .data
                .insert(format!("seen_{}", self.id), json!(true));
            Ok(self.update.clone())
        }
    }

    /// 第一次执行时跳回 target，之后正常前进
    struct LoopOnce {
        target: &'static str,
        runs: AtomicUsize,
    }

    #[async_trait]
    impl Step for LoopOnce {
        fn id(&self) -> &str {
            "loop"
        }

        async fn execute(&self, _ctx: &mut StepContext<'_>) -> Result<StepResultUpdate, AgentError> {
            let n = self.runs.fetch_add(1, Ordering::SeqCst);
            let update = StepResultUpdate::default().with_data("loops", json!(n + 1));
            Ok(if n == 0 { update.jump_to(self.target) } else { update })
        }
    }

    struct Failing;

    #[async_trait]
    impl Step for Failing {
        fn id(&self) -> &str {
            "boom"
        }

        async fn execute(&self, _ctx: &mut StepContext<'_>) -> Result<StepResultUpdate, AgentError> {
            Err(AgentError::ToolExecutionFailed("boom".to_string()))
        }
    }

    fn deps() -> (Arc<BudgetedMemory>, AgentDeps) {
        let memory = Arc::new(BudgetedMemory::default());
        let deps = AgentDeps::new(memory.clone(), Arc::new(MockLlmClient::new()));
        (memory, deps)
    }

    type Log = Arc<std::sync::Mutex<Vec<&'static str>>>;

    fn step(id: &'static str, update: StepResultUpdate, log: &Log) -> Box<dyn Step> {
        Box::new(Recorder {
            id,
            update,
            log: log.clone(),
        })
    }

    #[tokio::test]
    async fn test_sequential_merge_and_final() {
        let (memory, deps) = deps();
        let log = Log::default();
        let steps = vec![
            step("a", StepResultUpdate::default().with_data("k", json!(1)), &log),
            step(
                "b",
                StepResultUpdate::default()
                    .with_data("k", json!(2))
                    .with_final("from b"),
                &log,
            ),
            step("c", StepResultUpdate::default(), &log),
        ];
        let result = run_steps(&deps, &AgentConfig::react("x"), &steps, "start")
            .await
            .unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "c"]);
        assert_eq!(result.state.data["k"], 2);
        assert_eq!(result.state.data["seen_c"], true);
        assert_eq!(result.final_output.as_deref(), Some("from b"));
        assert_eq!(memory.snapshot().await, vec![Message::user("start")]);
    }

    #[tokio::test]
    async fn test_halt_stops_everything_after() {
        let (_, deps) = deps();
        let log = Log::default();
        let steps = vec![
            step("a", StepResultUpdate::default().with_final("early").halt(), &log),
            step("b", StepResultUpdate::default().with_final("late"), &log),
        ];
        let result = run_steps(&deps, &AgentConfig::react("x"), &steps, "go")
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
        assert_eq!(result.final_output.as_deref(), Some("early"));
    }

    #[tokio::test]
    async fn test_jump_to_known_id() {
        let (_, deps) = deps();
        let log = Log::default();
        let steps = vec![
            step("a", StepResultUpdate::default().jump_to("c"), &log),
            step("b", StepResultUpdate::default(), &log),
            step("c", StepResultUpdate::default(), &log),
        ];
        run_steps(&deps, &AgentConfig::react("x"), &steps, "go")
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_jump_to_unknown_id_falls_through() {
        let (_, deps) = deps();
        let log = Log::default();
        let steps = vec![
            step("a", StepResultUpdate::default().jump_to("nowhere"), &log),
            step("b", StepResultUpdate::default(), &log),
        ];
        run_steps(&deps, &AgentConfig::react("x"), &steps, "go")
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_backward_jump() {
        let (_, deps) = deps();
        let log = Log::default();
        let steps: Vec<Box<dyn Step>> = vec![
            step("a", StepResultUpdate::default(), &log),
            Box::new(LoopOnce {
                target: "a",
                runs: AtomicUsize::new(0),
            }),
        ];
        let result = run_steps(&deps, &AgentConfig::react("x"), &steps, "go")
            .await
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["a", "a"]);
        assert_eq!(result.state.data["loops"], 2);
    }

    #[tokio::test]
    async fn test_step_error_propagates() {
        let (_, deps) = deps();
        let log = Log::default();
        let steps: Vec<Box<dyn Step>> = vec![
            Box::new(Failing),
            step("never", StepResultUpdate::default(), &log),
        ];
        assert!(run_steps(&deps, &AgentConfig::react("x"), &steps, "go")
            .await
            .is_err());
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_list() {
        let (memory, deps) = deps();
        let result = run_steps(&deps, &AgentConfig::react("x"), &[], "go")
            .await
            .unwrap();
        assert!(result.final_output.is_none());
        assert_eq!(memory.snapshot().await.len(), 1);
    }
}
