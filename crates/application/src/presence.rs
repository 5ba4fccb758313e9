use std::sync::Arc;

use domain::ServerEnvelope;
use tracing::debug;

use crate::registry::ConnectionRegistry;

/// 在线状态通知
///
/// 每次调用都广播一次当前在线列表，不做去抖，也不与上一次结果比较。
#[derive(Clone)]
pub struct PresenceNotifier {
    registry: Arc<ConnectionRegistry>,
}

impl PresenceNotifier {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// 广播在线用户列表，返回成功投递的连接数
    pub async fn announce(&self) -> usize {
        let users = self.registry.snapshot().await;
        let online = users.len();
        let delivered = self
            .registry
            .broadcast(&ServerEnvelope::OnlineUsers { users })
            .await;
        debug!(online, delivered, "presence announced");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionHandle;
    use domain::{Identity, Username};

    #[tokio::test]
    async fn announce_sends_snapshot_to_every_connection() {
        let registry = Arc::new(ConnectionRegistry::new());
        let notifier = PresenceNotifier::new(registry.clone());
        let (alice, mut alice_rx) = ConnectionHandle::open();
        let (bob, mut bob_rx) = ConnectionHandle::open();
        registry
            .register(&alice, Identity::new(Username::parse("alice").unwrap()))
            .await;
        registry
            .register(&bob, Identity::new(Username::parse("bob").unwrap()))
            .await;

        assert_eq!(notifier.announce().await, 2);
        let expected = ServerEnvelope::OnlineUsers {
            users: vec!["alice".into(), "bob".into()],
        };
        assert_eq!(alice_rx.try_recv().unwrap(), expected);
        assert_eq!(bob_rx.try_recv().unwrap(), expected);
    }

    #[tokio::test]
    async fn repeated_announcements_are_not_debounced() {
        let registry = Arc::new(ConnectionRegistry::new());
        let notifier = PresenceNotifier::new(registry.clone());
        let (alice, mut rx) = ConnectionHandle::open();
        registry
            .register(&alice, Identity::new(Username::parse("alice").unwrap()))
            .await;

        notifier.announce().await;
        notifier.announce().await;
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
