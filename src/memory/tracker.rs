//! 记忆 / 预算跟踪
//!
//! MemoryTracker 是引擎与记忆之间的接缝：追加消息、给出按上下文窗口裁剪后的视图、报告剩余预算。
//! 同一实例不能被两个并发运行的引擎调用共享，调用方需自行串行化或为每个会话单独创建。

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::core::AgentError;
use crate::memory::{ConversationMemory, Message, TokenEstimator};

/// 记忆跟踪器 trait
#[async_trait]
pub trait MemoryTracker: Send + Sync {
    /// 追加一条消息（只追加，不修改已有条目）
    async fn append(&self, message: Message) -> Result<(), AgentError>;

    /// 送入模型的裁剪视图（按时间顺序）
    async fn trimmed(&self) -> Vec<Message>;

    /// 剩余可用预算；≤ 0 表示必须停止
    async fn remaining_budget(&self) -> i64;

    /// 完整日志快照（持久化、测试用）
    async fn snapshot(&self) -> Vec<Message>;
}

/// 内存实现：上下文窗口决定裁剪视图，总预算决定剩余预算
pub struct BudgetedMemory {
    log: Mutex<ConversationMemory>,
    context_window: usize,
    total_budget: usize,
}

impl BudgetedMemory {
    pub fn new(context_window: usize, total_budget: usize) -> Self {
        Self {
            log: Mutex::new(ConversationMemory::new()),
            context_window,
            total_budget,
        }
    }

    /// 从已有消息恢复（如挂起后由另一进程继续）
    pub fn with_messages(self, messages: Vec<Message>) -> Self {
        Self {
            log: Mutex::new(ConversationMemory::from_messages(messages)),
            ..self
        }
    }

    pub fn context_window(&self) -> usize {
        self.context_window
    }

    pub fn total_budget(&self) -> usize {
        self.total_budget
    }
}

impl Default for BudgetedMemory {
    fn default() -> Self {
        Self::new(6_000, 32_000)
    }
}

#[async_trait]
impl MemoryTracker for BudgetedMemory {
    async fn append(&self, message: Message) -> Result<(), AgentError> {
        self.log.lock().await.push(message);
        Ok(())
    }

    /// 从最新消息向前取，直到放不进上下文窗口；至少保留最新一条
    async fn trimmed(&self) -> Vec<Message> {
        let log = self.log.lock().await;
        let mut used = 0usize;
        let mut kept: Vec<Message> = Vec::new();
        for message in log.messages().iter().rev() {
            let cost = TokenEstimator::estimate_message(message);
            if !kept.is_empty() && used + cost > self.context_window {
                break;
            }
            used += cost;
            kept.push(message.clone());
        }
        kept.reverse();
        kept
    }

    async fn remaining_budget(&self) -> i64 {
        let log = self.log.lock().await;
        let used = TokenEstimator::estimate_messages(log.messages());
        self.total_budget as i64 - used as i64
    }

    async fn snapshot(&self) -> Vec<Message> {
        self.log.lock().await.messages().to_vec()
    }
}
