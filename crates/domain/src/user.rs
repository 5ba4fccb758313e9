use crate::value_objects::{PasswordHash, Timestamp, UserId, Username};

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    #[serde(skip_serializing)] // 密码字段不暴露给客户端
    pub password: PasswordHash,
    pub created_at: Timestamp,
}

impl User {
    pub fn register(id: UserId, username: Username, password: PasswordHash, now: Timestamp) -> Self {
        Self {
            id,
            username,
            password,
            created_at: now,
        }
    }

    /// 通过会话令牌首次出现的用户，只能经由令牌进入聊天
    pub fn external(id: UserId, username: Username, now: Timestamp) -> Self {
        Self::register(id, username, PasswordHash::external(), now)
    }

    pub fn can_login_with_password(&self) -> bool {
        !self.password.is_external()
    }
}

/// 已通过会话令牌认证的身份，在连接的生命周期内不可变
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Identity {
    pub username: Username,
}

impl Identity {
    pub fn new(username: Username) -> Self {
        Self { username }
    }
}
