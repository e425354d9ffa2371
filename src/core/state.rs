//! 运行状态与结果类型
//!
//! OrchestrationState 在每次顶层调用（run_flow / run / execute_agents）开始时新建，返回时交给调用方；
//! 引擎本身不持久化它。ReAct 循环写入 data 的保留键见下方常量。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agent::{AgentConfig, AgentDeps};

/// 转录（StepLogEntry 数组）
pub const STEPS_KEY: &str = "steps";
/// 最近一次模型调用的元数据，每轮覆盖
pub const METADATA_KEY: &str = "metadata";
/// 当前生效的任务列表
pub const TASK_LIST_KEY: &str = "task_list";
/// ask_user 挂起时的问题与说明
pub const ASK_USER_KEY: &str = "ask_user";
/// 流水线挂起时所在的阶段序号（从 0 计）
pub const SUSPENDED_STAGE_KEY: &str = "suspended_stage";

/// 一次运行中被各步骤共享并修改的状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationState {
    pub data: Map<String, Value>,
    pub final_output: Option<String>,
    pub last_model_output: Option<String>,
}

impl OrchestrationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 浅合并：同名键被后写覆盖
    pub fn merge_data(&mut self, update: Map<String, Value>) {
        for (k, v) in update {
            self.data.insert(k, v);
        }
    }

    /// 从 data 读回转录；缺失或格式不符时为空
    pub fn steps(&self) -> Vec<StepLogEntry> {
        self.data
            .get(STEPS_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn task_list(&self) -> Option<Vec<String>> {
        self.data
            .get(TASK_LIST_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// 单个步骤的返回；各字段缺省表示「不变」
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepResultUpdate {
    pub data: Option<Map<String, Value>>,
    pub final_output: Option<String>,
    /// 跳转目标步骤 id
    pub next: Option<String>,
    pub halt: bool,
}

impl StepResultUpdate {
    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    pub fn with_final(mut self, text: impl Into<String>) -> Self {
        self.final_output = Some(text.into());
        self
    }

    pub fn jump_to(mut self, id: impl Into<String>) -> Self {
        self.next = Some(id.into());
        self
    }

    pub fn halt(mut self) -> Self {
        self.halt = true;
        self
    }
}

/// 单个步骤看到的读写视图；state 在整个运行期间是同一个实例
pub struct StepContext<'a> {
    pub deps: &'a AgentDeps,
    pub config: &'a AgentConfig,
    pub state: &'a mut OrchestrationState,
}

/// 转录条目：按时间顺序追加，除了在工具返回后补上 observation 外不再修改
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepLogEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

/// 挂起记录：调用方需在获得用户回答后重新调用引擎
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAskUser {
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// 顶层调用的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowResult {
    pub final_output: Option<String>,
    pub state: OrchestrationState,
    pub pending_ask_user: Option<PendingAskUser>,
}

impl FlowResult {
    /// 以 state 当前的 final_output 作为结果
    pub fn finished(state: OrchestrationState) -> Self {
        Self {
            final_output: state.final_output.clone(),
            state,
            pending_ask_user: None,
        }
    }

    pub fn suspended(state: OrchestrationState, pending: PendingAskUser) -> Self {
        Self {
            final_output: None,
            state,
            pending_ask_user: Some(pending),
        }
    }

    /// 挂起但保留此前已产出的 final（流水线用）
    pub fn suspended_with_final(state: OrchestrationState, pending: PendingAskUser) -> Self {
        Self {
            final_output: state.final_output.clone(),
            state,
            pending_ask_user: Some(pending),
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.pending_ask_user.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_is_shallow_and_overwrites() {
        let mut state = OrchestrationState::new();
        state.data.insert("a".into(), json!({"x": 1, "y": 2}));
        state.data.insert("b".into(), json!(1));

        let mut update = Map::new();
        update.insert("a".into(), json!({"x": 9}));
        state.merge_data(update);

        assert_eq!(state.data["a"], json!({"x": 9}));
        assert_eq!(state.data["b"], json!(1));
    }

    #[test]
    fn test_steps_roundtrip_through_data() {
        let mut state = OrchestrationState::new();
        assert!(state.steps().is_empty());
        let steps = vec![StepLogEntry {
            thought: Some("t".into()),
            action_name: Some("search".into()),
            observation: None,
        }];
        state.data.insert(STEPS_KEY.into(), json!(steps));
        assert_eq!(state.steps(), steps);
    }

    #[test]
    fn test_update_builders() {
        let u = StepResultUpdate::default()
            .with_data("k", json!(1))
            .jump_to("end")
            .halt();
        assert_eq!(u.data.unwrap()["k"], 1);
        assert_eq!(u.next.as_deref(), Some("end"));
        assert!(u.halt);
        assert!(u.final_output.is_none());
    }
}
