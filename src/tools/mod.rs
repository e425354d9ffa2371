//! 工具箱：Tool trait、注册表、带超时的执行器、内置工具参数 Schema

pub mod echo;
pub mod executor;
pub mod registry;
pub mod schema;
pub mod tasks;

pub use echo::EchoTool;
pub use executor::ToolExecutor;
pub use registry::{Tool, ToolDescriptor, ToolOutput, ToolRegistry};
pub use schema::{
    builtin_tool_descriptors, AskUserArgs, FinalAnswerArgs, ASK_USER_TOOL, FINAL_ANSWER_TOOL,
};
pub use tasks::UpdateTasksTool;
