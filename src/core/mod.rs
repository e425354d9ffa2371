//! 核心编排层：错误、运行状态、编排器入口、通用步骤序列器、多智能体流水线

pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod sequencer;
pub mod state;

pub use error::AgentError;
pub use orchestrator::{Orchestrator, RunOptions};
pub use pipeline::{resolve_llm, resume_pipeline, run_pipeline};
pub use sequencer::{run_steps, Step};
pub use state::{
    FlowResult, OrchestrationState, PendingAskUser, StepContext, StepLogEntry, StepResultUpdate,
    ASK_USER_KEY, METADATA_KEY, STEPS_KEY, SUSPENDED_STAGE_KEY, TASK_LIST_KEY,
};
