//! LLM 层：客户端抽象、重试装饰器与实现（OpenAI 兼容 / DeepSeek / Mock）

pub mod factory;
pub mod mock;
pub mod openai;
pub mod traits;

pub use factory::{create_llm_client, DEEPSEEK_CHAT};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{
    Completion, CompletionRequest, GenerationParams, LlmClient, LlmError, RetryConfig,
    RetryingLlmClient,
};
