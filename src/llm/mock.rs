//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 先按顺序返回预置脚本；脚本用完后回显最后一条 User 消息（不含 Action，循环会把它当作最终回复）。
//! 每次调用的请求都会被记录，便于断言流水线输入与调用次数。

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::json;

use crate::llm::{Completion, CompletionRequest, LlmClient, LlmError};
use crate::memory::Role;

/// Mock 客户端：脚本回复 + 回显
#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按顺序返回给定回复
    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        locked(&self.requests).len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        locked(&self.requests).clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let call = {
            let mut requests = locked(&self.requests);
            requests.push(request.clone());
            requests.len()
        };

        let text = match locked(&self.script).pop_front() {
            Some(reply) => reply,
            None => {
                let last_user = request
                    .messages
                    .iter()
                    .rev()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.as_str())
                    .unwrap_or("(no input)");
                format!("Echo from Mock: {}", last_user)
            }
        };

        Ok(Completion::new(text).with_metadata(json!({ "model": "mock", "call": call })))
    }
}
