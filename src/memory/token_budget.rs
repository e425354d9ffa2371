//! Token 估算
//!
//! 不依赖具体分词器的近似估算，供记忆裁剪与剩余预算计算使用。

use crate::memory::Message;

/// 每条消息的固定开销（角色标记等）
const MESSAGE_OVERHEAD_TOKENS: usize = 4;

/// Token 估算器（简单的字符计数近似）
pub struct TokenEstimator;

impl TokenEstimator {
    /// 英文约 4 字符/token，中文等非 ASCII 约 1.5 字符/token；非空文本至少 1
    pub fn estimate(text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let (ascii, non_ascii) = text.chars().fold((0usize, 0usize), |(a, n), c| {
            if c.is_ascii() {
                (a + 1, n)
            } else {
                (a, n + 1)
            }
        });
        let tokens = ascii / 4 + (non_ascii as f64 / 1.5).ceil() as usize;
        tokens.max(1)
    }

    pub fn estimate_message(message: &Message) -> usize {
        Self::estimate(&message.content) + MESSAGE_OVERHEAD_TOKENS
    }

    pub fn estimate_messages(messages: &[Message]) -> usize {
        messages.iter().map(Self::estimate_message).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_estimator_english() {
        let text = "Hello, world! This is a test.";
        let tokens = TokenEstimator::estimate(text);
        assert!(tokens > 0);
        assert!(tokens < text.len());
    }

    #[test]
    fn test_token_estimator_chinese() {
        assert_eq!(TokenEstimator::estimate("你好世界"), 3);
    }

    #[test]
    fn test_empty_text_is_free() {
        assert_eq!(TokenEstimator::estimate(""), 0);
        assert_eq!(
            TokenEstimator::estimate_message(&Message::user("")),
            MESSAGE_OVERHEAD_TOKENS
        );
    }
}
