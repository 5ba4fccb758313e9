use async_trait::async_trait;
use domain::{GlobalMessage, PrivateMessage, RepositoryError, User, Username};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User, RepositoryError>;
    async fn find_by_username(&self, username: &Username)
        -> Result<Option<User>, RepositoryError>;

    /// 用户名不存在时插入 `user`，存在时返回已有记录；并发调用同样幂等
    async fn ensure_exists(&self, user: User) -> Result<User, RepositoryError>;
}

/// 只追加的持久化消息日志
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn append_global(&self, message: GlobalMessage) -> Result<(), RepositoryError>;
    async fn append_private(&self, message: PrivateMessage) -> Result<(), RepositoryError>;

    // 最近 limit 条全局消息，按创建时间升序
    async fn recent_global(&self, limit: u32) -> Result<Vec<GlobalMessage>, RepositoryError>;

    // 两个用户之间双向的私信，按创建时间升序
    async fn conversation(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<PrivateMessage>, RepositoryError>;
}
