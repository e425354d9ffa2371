//! 认知层：Tool Call 检测、System Prompt 模式、ReAct 主循环与过程事件

pub mod detector;
pub mod events;
pub mod loop_;
pub mod prompt;

pub use detector::{extract_thought, DetectionFailure, SapDetector, ToolCall, ToolCallDetector};
pub use events::ReactEvent;
pub use loop_::{chat_once, react_loop, ReactSession, DEFAULT_MAX_TURNS};
pub use prompt::{chat_prompt, react_prompt, PromptContext, PromptRegistry};
