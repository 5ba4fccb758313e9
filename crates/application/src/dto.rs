use domain::{GlobalMessage, PrivateMessage, Timestamp};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalMessageDto {
    pub id: Uuid,
    pub username: String,
    pub content: String,
    pub time: String,
    pub created_at: Timestamp,
}

impl From<&GlobalMessage> for GlobalMessageDto {
    fn from(message: &GlobalMessage) -> Self {
        Self {
            id: Uuid::from(message.id),
            username: message.username.as_str().to_owned(),
            content: message.content.clone(),
            time: message.time.clone(),
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessageDto {
    pub id: Uuid,
    pub from_user: String,
    pub to_user: String,
    pub content: String,
    pub time: String,
    pub created_at: Timestamp,
}

impl From<&PrivateMessage> for PrivateMessageDto {
    fn from(message: &PrivateMessage) -> Self {
        Self {
            id: Uuid::from(message.id),
            from_user: message.from_user.as_str().to_owned(),
            to_user: message.to_user.clone(),
            content: message.content.clone(),
            time: message.time.clone(),
            created_at: message.created_at,
        }
    }
}

/// 注册/登录成功后返回给客户端的会话令牌
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDto {
    pub token: String,
    pub username: String,
}
