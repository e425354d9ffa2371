//! 记忆层：追加式对话日志、Token 估算、记忆/预算跟踪、持久化

pub mod conversation;
pub mod persistence;
pub mod token_budget;
pub mod tracker;

pub use conversation::{ConversationMemory, Message, Role};
pub use persistence::ConversationPersistence;
pub use token_budget::TokenEstimator;
pub use tracker::{BudgetedMemory, MemoryTracker};
