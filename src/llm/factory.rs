//! 按配置创建 LLM 客户端
//!
//! provider：mock / openai / deepseek。API Key 取配置中的 api_key，其次环境变量
//! （OPENAI_API_KEY / DEEPSEEK_API_KEY）；retry.max_retries > 0 时外包一层 RetryingLlmClient。

use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmSection;
use crate::core::AgentError;
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient, RetryConfig, RetryingLlmClient};

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

fn api_key(section: &LlmSection, env_names: &[&str]) -> Option<String> {
    section
        .api_key
        .clone()
        .or_else(|| env_names.iter().find_map(|n| std::env::var(n).ok()))
}

/// 创建客户端；缺少 Key 或 provider 未知时返回 ConfigError
pub fn create_llm_client(section: &LlmSection) -> Result<Arc<dyn LlmClient>, AgentError> {
    let provider = section.provider.to_lowercase();
    let timeout = Duration::from_secs(section.timeouts.request);

    let base: Arc<dyn LlmClient> = match provider.as_str() {
        "mock" => {
            tracing::info!("Using Mock LLM");
            return Ok(Arc::new(MockLlmClient::new()));
        }
        "deepseek" => {
            let key = api_key(section, &["DEEPSEEK_API_KEY", "OPENAI_API_KEY"]).ok_or_else(|| {
                AgentError::ConfigError("DEEPSEEK_API_KEY is not set".to_string())
            })?;
            let model = section.model.as_deref().unwrap_or(DEEPSEEK_CHAT);
            let base_url = section.base_url.as_deref().unwrap_or(DEEPSEEK_BASE_URL);
            tracing::info!("Using DeepSeek LLM ({})", model);
            Arc::new(OpenAiClient::new(Some(base_url), model, &key, timeout)?)
        }
        "openai" => {
            let key = api_key(section, &["OPENAI_API_KEY"]).ok_or_else(|| {
                AgentError::ConfigError("OPENAI_API_KEY is not set".to_string())
            })?;
            let model = section.model.as_deref().unwrap_or(OPENAI_DEFAULT_MODEL);
            tracing::info!("Using OpenAI LLM ({})", model);
            Arc::new(OpenAiClient::new(
                section.base_url.as_deref(),
                model,
                &key,
                timeout,
            )?)
        }
        other => {
            return Err(AgentError::ConfigError(format!(
                "unknown LLM provider: {}",
                other
            )))
        }
    };

    if section.retry.max_retries == 0 {
        return Ok(base);
    }
    Ok(Arc::new(RetryingLlmClient::new(
        base,
        RetryConfig {
            max_retries: section.retry.max_retries,
            base_delay_ms: section.retry.base_delay_ms,
            max_delay_ms: section.retry.max_delay_ms,
        },
    )))
}
