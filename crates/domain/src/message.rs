use crate::value_objects::{MessageId, Timestamp, Username};

/// 全局频道中的一条持久化消息
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GlobalMessage {
    pub id: MessageId,
    pub username: Username,
    pub content: String,
    /// 客户端展示用的 `HH:MM` 时间
    pub time: String,
    pub created_at: Timestamp,
}

/// 两个用户之间的一条持久化私信
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PrivateMessage {
    pub id: MessageId,
    pub from_user: Username,
    /// 接收方只是一个用户名，持久化前不校验其是否存在或在线
    pub to_user: String,
    pub content: String,
    pub time: String,
    pub created_at: Timestamp,
}

impl PrivateMessage {
    /// 是否属于 `a` 与 `b` 之间的会话（不区分方向）
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        let from = self.from_user.as_str();
        (from == a && self.to_user == b) || (from == b && self.to_user == a)
    }
}
