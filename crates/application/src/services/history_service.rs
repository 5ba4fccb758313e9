//! 历史消息查询
//!
//! 只读视图，直接来自持久化消息日志，不经过连接注册表。

use std::sync::Arc;

use crate::{
    dto::{GlobalMessageDto, PrivateMessageDto},
    error::ApplicationError,
    repository::MessageRepository,
};

pub struct HistoryService {
    messages: Arc<dyn MessageRepository>,
    global_limit: u32,
}

impl HistoryService {
    pub fn new(messages: Arc<dyn MessageRepository>, global_limit: u32) -> Self {
        Self {
            messages,
            global_limit,
        }
    }

    /// 最近的全局消息，按时间升序
    pub async fn recent_global(&self) -> Result<Vec<GlobalMessageDto>, ApplicationError> {
        let messages = self.messages.recent_global(self.global_limit).await?;
        Ok(messages.iter().map(GlobalMessageDto::from).collect())
    }

    pub async fn conversation(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<PrivateMessageDto>, ApplicationError> {
        let messages = self.messages.conversation(user_a, user_b).await?;
        Ok(messages.iter().map(PrivateMessageDto::from).collect())
    }
}
